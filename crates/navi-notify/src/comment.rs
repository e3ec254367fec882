//! Comment notifications.
//!
//! Comments are attached to many kinds of graph elements. Each element
//! table notifies with its own line shape; `bn_comments` itself notifies
//! when the text of an existing comment is edited or a comment is removed
//! from the middle of a thread.
//!
//! Local comments belong to one element of one view. Global comments
//! belong to an address and therefore to every loaded element at that
//! address, which is why global notifications can resolve to several
//! events.

use navi_core::{Address, CommentId, EdgeId, ModuleId, NodeId, TypeInstanceId, UserId};
use serde::Serialize;
use tracing::debug;

use crate::error::NotifyError;
use crate::grammar::{int, nullable, ops, seq, Grammar, ANY_OP, INT};
use crate::resolver::{LocalComment, ModelResolver, NodeKind};
use crate::table::{Channel, Operation, TableName};

/// A parsed comment notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CommentRecord {
    /// `bn_comments`: an existing comment was edited or deleted.
    Comment {
        operation: Operation,
        id: CommentId,
        parent: Option<CommentId>,
        user: UserId,
        text: Option<String>,
    },
    /// `bn_type_instances`: the comment thread of a type instance changed.
    TypeInstance {
        module: ModuleId,
        instance: TypeInstanceId,
        comment: Option<CommentId>,
    },
    /// `bn_edges`: the local comment thread of one edge changed.
    LocalEdge {
        edge: EdgeId,
        comment: Option<CommentId>,
    },
    /// `bn_global_edge_comments`
    GlobalEdge {
        operation: Operation,
        source_module: ModuleId,
        target_module: ModuleId,
        source: Address,
        target: Address,
        comment: Option<CommentId>,
    },
    /// `bn_code_nodes`
    LocalCodeNode {
        module: ModuleId,
        node: NodeId,
        address: Address,
        comment: Option<CommentId>,
    },
    /// `bn_global_node_comments`
    GlobalCodeNode {
        operation: Operation,
        module: ModuleId,
        address: Address,
        comment: Option<CommentId>,
    },
    /// `bn_codenode_instructions`
    LocalInstruction {
        module: ModuleId,
        node: NodeId,
        position: u32,
        address: Address,
        comment: Option<CommentId>,
    },
    /// `bn_instructions`
    GlobalInstruction {
        module: ModuleId,
        address: Address,
        comment: Option<CommentId>,
    },
    /// `bn_function_nodes`
    FunctionNode {
        module: ModuleId,
        node: NodeId,
        address: Address,
        comment: Option<CommentId>,
    },
    /// `bn_functions` on the comment channel.
    Function {
        module: ModuleId,
        address: Address,
        comment: Option<CommentId>,
    },
    /// `bn_group_nodes`
    GroupNode {
        node: NodeId,
        comment: Option<CommentId>,
    },
    /// `bn_text_nodes`
    TextNode {
        node: NodeId,
        comment: Option<CommentId>,
    },
}

impl CommentRecord {
    /// Every module whose model the record touches. Global edges touch
    /// both ends.
    pub fn modules(&self) -> Vec<ModuleId> {
        match self {
            CommentRecord::TypeInstance { module, .. }
            | CommentRecord::LocalCodeNode { module, .. }
            | CommentRecord::GlobalCodeNode { module, .. }
            | CommentRecord::LocalInstruction { module, .. }
            | CommentRecord::GlobalInstruction { module, .. }
            | CommentRecord::FunctionNode { module, .. }
            | CommentRecord::Function { module, .. } => vec![*module],
            CommentRecord::GlobalEdge {
                source_module,
                target_module,
                ..
            } => vec![*source_module, *target_module],
            CommentRecord::Comment { .. }
            | CommentRecord::LocalEdge { .. }
            | CommentRecord::GroupNode { .. }
            | CommentRecord::TextNode { .. } => Vec::new(),
        }
    }
}

/// The element a comment thread hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CommentTarget {
    Edge(EdgeId),
    CodeNode(NodeId),
    /// An instruction, either inside one code node (local) or at an
    /// address of a module (global).
    Instruction {
        module: ModuleId,
        address: Address,
        node: Option<NodeId>,
    },
    FunctionNode(NodeId),
    Function {
        module: ModuleId,
        address: Address,
    },
    GroupNode(NodeId),
    TextNode(NodeId),
    TypeInstance {
        module: ModuleId,
        instance: TypeInstanceId,
    },
}

/// Whether a comment belongs to one element or to an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CommentScope {
    Local,
    Global,
}

/// What happened to a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CommentAction {
    Append,
    Delete,
    Edit,
}

/// A resolved comment change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CommentEvent {
    /// The comment thread of one element changed. `comment` is the newly
    /// appended comment, absent for deletions of the last comment.
    Thread {
        target: CommentTarget,
        scope: CommentScope,
        action: CommentAction,
        comment: Option<CommentId>,
    },
    /// A known comment was edited or deleted. `current` is the comment as
    /// it reads after the change.
    Comment {
        action: CommentAction,
        previous: LocalComment,
        current: LocalComment,
    },
}

/// Parser for every table carried on the comment channel.
#[derive(Debug, Clone)]
pub struct CommentParser {
    comments: Grammar,
    type_instances: Grammar,
    local_edges: Grammar,
    global_edges: Grammar,
    local_code_nodes: Grammar,
    global_code_nodes: Grammar,
    local_instructions: Grammar,
    global_instructions: Grammar,
    function_nodes: Grammar,
    functions: Grammar,
    group_nodes: Grammar,
    text_nodes: Grammar,
}

const UPDATE: &[Operation] = &[Operation::Update];

/// `( <name>)?` at the end of a line.
fn trailing(name: &str) -> String {
    format!(r"(?:\s(?P<{name}>{INT}))?")
}

impl CommentParser {
    /// Compiles all comment grammars.
    pub fn new() -> Result<Self, NotifyError> {
        let comment_body = format!(
            r"{}(?:\s(?P<text>.*))?",
            seq(&[
                ops(&[Operation::Update, Operation::Delete]),
                int("id"),
                nullable("parent"),
                int("user"),
            ])
        );
        Ok(Self {
            comments: Grammar::new(TableName::Comments, &comment_body)?,
            type_instances: Grammar::new(
                TableName::TypeInstances,
                &seq(&[ops(UPDATE), int("module"), int("instance"), nullable("comment")]),
            )?,
            local_edges: Grammar::new(
                TableName::Edges,
                &seq(&[ops(UPDATE), int("edge"), nullable("comment")]),
            )?,
            global_edges: Grammar::new(
                TableName::GlobalEdgeComments,
                &(seq(&[
                    ops(ANY_OP),
                    int("source_module"),
                    int("target_module"),
                    int("source"),
                    int("target"),
                ]) + &trailing("comment")),
            )?,
            local_code_nodes: Grammar::new(
                TableName::CodeNodes,
                &seq(&[
                    ops(UPDATE),
                    int("module"),
                    int("node"),
                    int("address"),
                    nullable("comment"),
                ]),
            )?,
            global_code_nodes: Grammar::new(
                TableName::GlobalNodeComments,
                &(seq(&[ops(ANY_OP), int("module"), int("address")]) + &trailing("comment")),
            )?,
            local_instructions: Grammar::new(
                TableName::CodeNodeInstructions,
                &seq(&[
                    ops(UPDATE),
                    int("module"),
                    int("node"),
                    int("position"),
                    int("address"),
                    nullable("comment"),
                ]),
            )?,
            global_instructions: Grammar::new(
                TableName::Instructions,
                &seq(&[ops(UPDATE), int("module"), int("address"), nullable("comment")]),
            )?,
            function_nodes: Grammar::new(
                TableName::FunctionNodes,
                &seq(&[
                    ops(UPDATE),
                    int("module"),
                    int("node"),
                    int("address"),
                    nullable("comment"),
                ]),
            )?,
            functions: Grammar::new(
                TableName::Functions,
                &seq(&[ops(UPDATE), int("module"), int("address"), nullable("comment")]),
            )?,
            group_nodes: Grammar::new(
                TableName::GroupNodes,
                &seq(&[ops(UPDATE), int("node"), nullable("comment")]),
            )?,
            text_nodes: Grammar::new(
                TableName::TextNodes,
                &seq(&[ops(UPDATE), int("node"), nullable("comment")]),
            )?,
        })
    }

    /// Parses a line already known to start with `table`.
    pub fn parse(&self, table: TableName, line: &str) -> Result<CommentRecord, NotifyError> {
        let record = match table {
            TableName::Comments => {
                let f = self.comments.fields(line)?;
                CommentRecord::Comment {
                    operation: f.operation()?,
                    id: f.get("id")?,
                    parent: f.optional("parent")?,
                    user: f.get("user")?,
                    text: f.text("text").map(str::to_string),
                }
            }
            TableName::TypeInstances => {
                let f = self.type_instances.fields(line)?;
                CommentRecord::TypeInstance {
                    module: f.get("module")?,
                    instance: f.get("instance")?,
                    comment: f.optional("comment")?,
                }
            }
            TableName::Edges => {
                let f = self.local_edges.fields(line)?;
                CommentRecord::LocalEdge {
                    edge: f.get("edge")?,
                    comment: f.optional("comment")?,
                }
            }
            TableName::GlobalEdgeComments => {
                let f = self.global_edges.fields(line)?;
                CommentRecord::GlobalEdge {
                    operation: f.operation()?,
                    source_module: f.get("source_module")?,
                    target_module: f.get("target_module")?,
                    source: f.get("source")?,
                    target: f.get("target")?,
                    comment: f.optional("comment")?,
                }
            }
            TableName::CodeNodes => {
                let f = self.local_code_nodes.fields(line)?;
                CommentRecord::LocalCodeNode {
                    module: f.get("module")?,
                    node: f.get("node")?,
                    address: f.get("address")?,
                    comment: f.optional("comment")?,
                }
            }
            TableName::GlobalNodeComments => {
                let f = self.global_code_nodes.fields(line)?;
                CommentRecord::GlobalCodeNode {
                    operation: f.operation()?,
                    module: f.get("module")?,
                    address: f.get("address")?,
                    comment: f.optional("comment")?,
                }
            }
            TableName::CodeNodeInstructions => {
                let f = self.local_instructions.fields(line)?;
                CommentRecord::LocalInstruction {
                    module: f.get("module")?,
                    node: f.get("node")?,
                    position: f.get("position")?,
                    address: f.get("address")?,
                    comment: f.optional("comment")?,
                }
            }
            TableName::Instructions => {
                let f = self.global_instructions.fields(line)?;
                CommentRecord::GlobalInstruction {
                    module: f.get("module")?,
                    address: f.get("address")?,
                    comment: f.optional("comment")?,
                }
            }
            TableName::FunctionNodes => {
                let f = self.function_nodes.fields(line)?;
                CommentRecord::FunctionNode {
                    module: f.get("module")?,
                    node: f.get("node")?,
                    address: f.get("address")?,
                    comment: f.optional("comment")?,
                }
            }
            TableName::Functions => {
                let f = self.functions.fields(line)?;
                CommentRecord::Function {
                    module: f.get("module")?,
                    address: f.get("address")?,
                    comment: f.optional("comment")?,
                }
            }
            TableName::GroupNodes => {
                let f = self.group_nodes.fields(line)?;
                CommentRecord::GroupNode {
                    node: f.get("node")?,
                    comment: f.optional("comment")?,
                }
            }
            TableName::TextNodes => {
                let f = self.text_nodes.fields(line)?;
                CommentRecord::TextNode {
                    node: f.get("node")?,
                    comment: f.optional("comment")?,
                }
            }
            other => {
                return Err(NotifyError::Unsupported {
                    table: other.as_str(),
                    channel: Channel::Comments.name(),
                })
            }
        };
        Ok(record)
    }

    /// Resolves a record against the loaded model.
    ///
    /// Elements that are not loaded resolve to no events. Global records
    /// resolve to one event per loaded element at the address.
    pub fn resolve<M: ModelResolver + ?Sized>(
        &self,
        record: &CommentRecord,
        model: &M,
    ) -> Result<Vec<CommentEvent>, NotifyError> {
        let events = match *record {
            CommentRecord::Comment {
                operation,
                id,
                parent,
                user,
                ref text,
            } => {
                let Some(local) = model.comment(id) else {
                    debug!(comment = %id, "comment not loaded");
                    return Ok(Vec::new());
                };
                let text = text.clone().unwrap_or_default();
                check_identity(&local, operation, parent, user, &text)?;
                let action = match operation {
                    Operation::Delete => CommentAction::Delete,
                    _ => CommentAction::Edit,
                };
                let current = LocalComment {
                    id,
                    parent,
                    user: local.user,
                    text,
                };
                vec![CommentEvent::Comment {
                    action,
                    previous: local,
                    current,
                }]
            }
            CommentRecord::TypeInstance {
                module,
                instance,
                comment,
            } => {
                if !model.is_module_loaded(module) || !model.has_type_instance(module, instance) {
                    return Ok(Vec::new());
                }
                vec![local(CommentTarget::TypeInstance { module, instance }, comment)]
            }
            CommentRecord::LocalEdge { edge, comment } => {
                if !model.has_edge(edge) {
                    return Ok(Vec::new());
                }
                vec![local(CommentTarget::Edge(edge), comment)]
            }
            CommentRecord::GlobalEdge {
                operation,
                source_module,
                target_module,
                source,
                target,
                comment,
            } => {
                if !model.is_module_loaded(source_module) || !model.is_module_loaded(target_module)
                {
                    return Ok(Vec::new());
                }
                model
                    .edges_between(source_module, source, target_module, target)
                    .into_iter()
                    .map(|edge| global(CommentTarget::Edge(edge), operation, comment))
                    .collect()
            }
            CommentRecord::LocalCodeNode {
                module,
                node,
                comment,
                ..
            } => {
                if !model.is_module_loaded(module)
                    || model.node_kind(node) != Some(NodeKind::Code)
                {
                    return Ok(Vec::new());
                }
                vec![local(CommentTarget::CodeNode(node), comment)]
            }
            CommentRecord::GlobalCodeNode {
                operation,
                module,
                address,
                comment,
            } => {
                if !model.is_module_loaded(module) {
                    return Ok(Vec::new());
                }
                model
                    .code_nodes_at(module, address)
                    .into_iter()
                    .map(|node| global(CommentTarget::CodeNode(node), operation, comment))
                    .collect()
            }
            CommentRecord::LocalInstruction {
                module,
                node,
                address,
                comment,
                ..
            } => {
                if !model.is_module_loaded(module)
                    || !model.has_instruction(module, address)
                    || model.node_kind(node) != Some(NodeKind::Code)
                {
                    return Ok(Vec::new());
                }
                let target = CommentTarget::Instruction {
                    module,
                    address,
                    node: Some(node),
                };
                vec![local(target, comment)]
            }
            CommentRecord::GlobalInstruction {
                module,
                address,
                comment,
            } => {
                if !model.is_module_loaded(module) || !model.has_instruction(module, address) {
                    return Ok(Vec::new());
                }
                let target = CommentTarget::Instruction {
                    module,
                    address,
                    node: None,
                };
                vec![CommentEvent::Thread {
                    target,
                    scope: CommentScope::Global,
                    action: append_or_delete(comment),
                    comment,
                }]
            }
            CommentRecord::FunctionNode {
                module,
                node,
                comment,
                ..
            } => {
                if !model.is_module_loaded(module)
                    || model.node_kind(node) != Some(NodeKind::Function)
                {
                    return Ok(Vec::new());
                }
                vec![local(CommentTarget::FunctionNode(node), comment)]
            }
            CommentRecord::Function {
                module,
                address,
                comment,
            } => {
                if !model.is_module_loaded(module) || !model.has_function(module, address) {
                    return Ok(Vec::new());
                }
                vec![local(CommentTarget::Function { module, address }, comment)]
            }
            CommentRecord::GroupNode { node, comment } => {
                if model.node_kind(node) != Some(NodeKind::Group) {
                    return Ok(Vec::new());
                }
                vec![local(CommentTarget::GroupNode(node), comment)]
            }
            CommentRecord::TextNode { node, comment } => {
                if model.node_kind(node) != Some(NodeKind::Text) {
                    return Ok(Vec::new());
                }
                vec![local(CommentTarget::TextNode(node), comment)]
            }
        };
        Ok(events)
    }
}

fn append_or_delete(comment: Option<CommentId>) -> CommentAction {
    match comment {
        Some(_) => CommentAction::Append,
        None => CommentAction::Delete,
    }
}

fn local(target: CommentTarget, comment: Option<CommentId>) -> CommentEvent {
    CommentEvent::Thread {
        target,
        scope: CommentScope::Local,
        action: append_or_delete(comment),
        comment,
    }
}

fn global(target: CommentTarget, operation: Operation, comment: Option<CommentId>) -> CommentEvent {
    let action = match operation {
        Operation::Delete => CommentAction::Delete,
        _ => CommentAction::Append,
    };
    CommentEvent::Thread {
        target,
        scope: CommentScope::Global,
        action,
        comment,
    }
}

/// Parent and user must agree for every operation; deletions must also
/// agree on the text.
fn check_identity(
    local: &LocalComment,
    operation: Operation,
    parent: Option<CommentId>,
    user: UserId,
    text: &str,
) -> Result<(), NotifyError> {
    let diverged = |field, held: String, notified: String| NotifyError::ConsistencyViolation {
        comment: local.id,
        field,
        local: held,
        notified,
    };

    if local.parent != parent {
        return Err(diverged("parent", show(local.parent), show(parent)));
    }
    if local.user != user {
        return Err(diverged("user", local.user.to_string(), user.to_string()));
    }
    if operation == Operation::Delete && local.text != text {
        return Err(diverged("text", local.text.clone(), text.to_string()));
    }
    Ok(())
}

fn show(id: Option<CommentId>) -> String {
    id.map_or_else(|| "null".to_string(), |id| id.to_string())
}

// ── tests ───────────────────────────────────────────────────────────
