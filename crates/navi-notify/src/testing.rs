//! In-memory model used by the unit tests of this crate.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc;
use std::time::Duration;

use navi_core::{
    Address, CommentId, EdgeId, ExpressionId, ModuleId, NodeId, ProjectId, TypeInstanceId,
    UserId, ViewId,
};

use crate::comment::CommentEvent;
use crate::dispatcher::Event;
use crate::error::NotifyError;
use crate::function::FunctionEvent;
use crate::operand::OperandTree;
use crate::resolver::{
    CommentInformer, DataLoader, FunctionData, FunctionInformer, LocalComment, LocalView,
    ModelResolver, NodeKind, TypeInformer, TypeInstanceInformer, TypeSubstitution,
    ViewConfiguration, ViewInformer, ViewOwner,
};
use crate::type_instance::TypeInstanceEvent;
use crate::types::TypeEvent;
use crate::view::ViewEvent;

pub(crate) struct LoadedEdge {
    pub id: EdgeId,
    pub source_module: ModuleId,
    pub source: Address,
    pub target_module: ModuleId,
    pub target: Address,
}

/// Holds each informer call until the test lets it through.
pub(crate) struct Gate {
    pub entered: tokio::sync::mpsc::UnboundedSender<()>,
    pub open: mpsc::Receiver<()>,
}

#[derive(Default)]
pub(crate) struct MockModel {
    pub modules: HashSet<ModuleId>,
    pub projects: HashSet<ProjectId>,
    pub comments: HashMap<CommentId, LocalComment>,
    pub edges: Vec<LoadedEdge>,
    pub nodes: HashMap<NodeId, (NodeKind, ModuleId, Address)>,
    pub instructions: HashSet<(ModuleId, Address)>,
    pub functions: HashMap<(ModuleId, Address), FunctionData>,
    pub type_instances: HashSet<(ModuleId, TypeInstanceId)>,
    pub operands: HashMap<(ModuleId, Address, u32), OperandTree>,
    pub views: HashMap<ViewId, LocalView>,
    pub view_rows: HashMap<ViewId, ViewConfiguration>,
    pub substitutions: HashMap<(ModuleId, Address, u32, ExpressionId), TypeSubstitution>,
    /// Makes every informer call fail with a load error.
    pub failing_informer: bool,
    /// Makes informer calls fail once this many events were accepted.
    pub accept_limit: Option<usize>,
    pub gate: Option<Gate>,
    pub informed: Vec<Event>,
}

impl MockModel {
    pub fn with_module(mut self, module: u32) -> Self {
        self.modules.insert(ModuleId(module));
        self
    }

    pub fn with_comment(mut self, id: u32, parent: Option<u32>, user: u32, text: &str) -> Self {
        self.comments.insert(
            CommentId(id),
            LocalComment {
                id: CommentId(id),
                parent: parent.map(CommentId),
                user: UserId(user),
                text: text.to_string(),
            },
        );
        self
    }

    pub fn with_edge(mut self, id: u32, modules: (u32, u32), source: u64, target: u64) -> Self {
        self.edges.push(LoadedEdge {
            id: EdgeId(id),
            source_module: ModuleId(modules.0),
            source: Address(source),
            target_module: ModuleId(modules.1),
            target: Address(target),
        });
        self
    }

    pub fn with_node(mut self, id: u32, kind: NodeKind, module: u32, address: u64) -> Self {
        self.nodes
            .insert(NodeId(id), (kind, ModuleId(module), Address(address)));
        self
    }

    pub fn with_instruction(mut self, module: u32, address: u64) -> Self {
        self.instructions.insert((ModuleId(module), Address(address)));
        self
    }

    fn inform(&mut self, event: Event) -> Result<(), NotifyError> {
        if let Some(gate) = &self.gate {
            let _ = gate.entered.send(());
            if gate.open.recv_timeout(Duration::from_secs(5)).is_err() {
                return Err(NotifyError::load("model", "gate stayed closed"));
            }
        }
        let full = self.accept_limit.is_some_and(|n| self.informed.len() >= n);
        if self.failing_informer || full {
            return Err(NotifyError::load("model", "informer refused"));
        }
        self.informed.push(event);
        Ok(())
    }
}

impl ModelResolver for MockModel {
    fn is_module_loaded(&self, module: ModuleId) -> bool {
        self.modules.contains(&module)
    }

    fn is_project_loaded(&self, project: ProjectId) -> bool {
        self.projects.contains(&project)
    }

    fn comment(&self, id: CommentId) -> Option<LocalComment> {
        self.comments.get(&id).cloned()
    }

    fn has_edge(&self, edge: EdgeId) -> bool {
        self.edges.iter().any(|e| e.id == edge)
    }

    fn edges_between(
        &self,
        source_module: ModuleId,
        source: Address,
        target_module: ModuleId,
        target: Address,
    ) -> Vec<EdgeId> {
        self.edges
            .iter()
            .filter(|e| {
                e.source_module == source_module
                    && e.source == source
                    && e.target_module == target_module
                    && e.target == target
            })
            .map(|e| e.id)
            .collect()
    }

    fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(&node).map(|(kind, _, _)| *kind)
    }

    fn code_nodes_at(&self, module: ModuleId, address: Address) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, (kind, m, a))| *kind == NodeKind::Code && *m == module && *a == address)
            .map(|(id, _)| *id)
            .collect();
        nodes.sort();
        nodes
    }

    fn has_instruction(&self, module: ModuleId, address: Address) -> bool {
        self.instructions.contains(&(module, address))
    }

    fn has_function(&self, module: ModuleId, address: Address) -> bool {
        self.functions.contains_key(&(module, address))
    }

    fn has_type_instance(&self, module: ModuleId, instance: TypeInstanceId) -> bool {
        self.type_instances.contains(&(module, instance))
    }

    fn operand_tree(
        &self,
        module: ModuleId,
        address: Address,
        position: u32,
    ) -> Option<OperandTree> {
        self.operands.get(&(module, address, position)).cloned()
    }

    fn view(&self, view: ViewId) -> Option<LocalView> {
        self.views.get(&view).cloned()
    }
}

impl DataLoader for MockModel {
    fn load_function(
        &self,
        module: ModuleId,
        address: Address,
    ) -> Result<FunctionData, NotifyError> {
        self.functions
            .get(&(module, address))
            .cloned()
            .ok_or_else(|| NotifyError::load(format!("function {address}"), "no such row"))
    }

    fn load_view_configuration(
        &self,
        _owner: ViewOwner,
        view: ViewId,
    ) -> Result<Option<ViewConfiguration>, NotifyError> {
        Ok(self.view_rows.get(&view).cloned())
    }

    fn load_type_substitution(
        &self,
        module: ModuleId,
        address: Address,
        position: u32,
        expression: ExpressionId,
    ) -> Result<TypeSubstitution, NotifyError> {
        self.substitutions
            .get(&(module, address, position, expression))
            .cloned()
            .ok_or_else(|| NotifyError::load(format!("substitution {expression}"), "no such row"))
    }
}

impl CommentInformer for MockModel {
    fn inform_comment(&mut self, event: &CommentEvent) -> Result<(), NotifyError> {
        self.inform(Event::Comment(event.clone()))
    }
}

impl FunctionInformer for MockModel {
    fn inform_function(&mut self, event: &FunctionEvent) -> Result<(), NotifyError> {
        self.inform(Event::Function(event.clone()))
    }
}

impl TypeInstanceInformer for MockModel {
    fn inform_type_instance(&mut self, event: &TypeInstanceEvent) -> Result<(), NotifyError> {
        self.inform(Event::TypeInstance(event.clone()))
    }
}

impl TypeInformer for MockModel {
    fn inform_type(&mut self, event: &TypeEvent) -> Result<(), NotifyError> {
        self.inform(Event::Type(event.clone()))
    }
}

impl ViewInformer for MockModel {
    fn inform_view(&mut self, event: &ViewEvent) -> Result<(), NotifyError> {
        self.inform(Event::View(event.clone()))
    }
}
