//! Operand expression trees and their in-order walk.
//!
//! Trees are arenas: nodes refer to their children by index. The model
//! hands out snapshots of a single operand's tree; the walk visits each
//! node once, so lookups are linear in the operand size.

use navi_core::{Address, ExpressionId, ModuleId};
use serde::Serialize;

use crate::resolver::ModelResolver;

/// Index of a node inside its [`OperandTree`].
pub type NodeIndex = usize;

/// One expression node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperandNode {
    pub id: ExpressionId,
    /// Rendered expression (register, operator, immediate …).
    pub value: String,
    pub children: Vec<NodeIndex>,
}

/// The expression tree of one instruction operand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperandTree {
    nodes: Vec<OperandNode>,
    root: Option<NodeIndex>,
}

impl OperandTree {
    /// An empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the root, replacing any previous tree contents.
    pub fn set_root(&mut self, id: ExpressionId, value: impl Into<String>) -> NodeIndex {
        self.nodes.clear();
        self.nodes.push(OperandNode {
            id,
            value: value.into(),
            children: Vec::new(),
        });
        self.root = Some(0);
        0
    }

    /// Appends a child to `parent`. Returns `None` if `parent` does not exist.
    pub fn add_child(
        &mut self,
        parent: NodeIndex,
        id: ExpressionId,
        value: impl Into<String>,
    ) -> Option<NodeIndex> {
        if parent >= self.nodes.len() {
            return None;
        }
        let index = self.nodes.len();
        self.nodes.push(OperandNode {
            id,
            value: value.into(),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(index);
        Some(index)
    }

    pub fn root(&self) -> Option<NodeIndex> {
        self.root
    }

    pub fn node(&self, index: NodeIndex) -> Option<&OperandNode> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walks the tree in order: first subtree, node, remaining subtrees.
    pub fn in_order(&self) -> InOrder<'_> {
        InOrder {
            tree: self,
            stack: self.root.map(Step::Expand).into_iter().collect(),
        }
    }

    /// Finds the node with the given expression id.
    pub fn find(&self, id: ExpressionId) -> Option<NodeIndex> {
        self.in_order()
            .find(|&(_, node)| node.id == id)
            .map(|(index, _)| index)
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Expand(NodeIndex),
    Emit(NodeIndex),
}

/// In-order iterator over an [`OperandTree`].
#[derive(Debug)]
pub struct InOrder<'a> {
    tree: &'a OperandTree,
    stack: Vec<Step>,
}

impl<'a> Iterator for InOrder<'a> {
    type Item = (NodeIndex, &'a OperandNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(step) = self.stack.pop() {
            match step {
                Step::Emit(index) => {
                    return self.tree.nodes.get(index).map(|node| (index, node));
                }
                Step::Expand(index) => {
                    let Some(node) = self.tree.nodes.get(index) else {
                        continue;
                    };
                    for &child in node.children.iter().skip(1).rev() {
                        self.stack.push(Step::Expand(child));
                    }
                    self.stack.push(Step::Emit(index));
                    if let Some(&first) = node.children.first() {
                        self.stack.push(Step::Expand(first));
                    }
                }
            }
        }
        None
    }
}

/// Finds the node for `expression` in operand `position` of the loaded
/// instruction at `address`. `None` if the instruction, the operand or the
/// node is not loaded.
pub fn locate<M: ModelResolver + ?Sized>(
    model: &M,
    module: ModuleId,
    address: Address,
    position: u32,
    expression: ExpressionId,
) -> Option<NodeIndex> {
    if !model.has_instruction(module, address) {
        return None;
    }
    model
        .operand_tree(module, address, position)
        .and_then(|tree| tree.find(expression))
}

// ── tests ───────────────────────────────────────────────────────────
