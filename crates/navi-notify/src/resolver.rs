//! Capabilities the notification layer needs from the loaded model.
//!
//! [`ModelResolver`] answers read-only questions about what is currently
//! loaded. [`DataLoader`] reads fresh rows from the database. The informer
//! traits apply resolved events to the live model. Every lookup may
//! legitimately come back empty: another front end may have loaded a
//! different part of the database.

use navi_core::{
    Address, BaseTypeId, CommentId, EdgeId, ExpressionId, ModuleId, NodeId, ProjectId,
    TypeInstanceId, TypeMemberId, UserId, ViewId,
};
use serde::Serialize;

use crate::comment::CommentEvent;
use crate::error::NotifyError;
use crate::function::FunctionEvent;
use crate::operand::OperandTree;
use crate::type_instance::TypeInstanceEvent;
use crate::types::TypeEvent;
use crate::view::ViewEvent;

/// A comment as the local model holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalComment {
    pub id: CommentId,
    pub parent: Option<CommentId>,
    pub user: UserId,
    pub text: String,
}

/// The flavour of a loaded graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    Code,
    Function,
    Group,
    Text,
}

/// What a view belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ViewOwner {
    Module(ModuleId),
    Project(ProjectId),
}

/// Attributes of a view that notifications can change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewConfiguration {
    pub name: String,
    pub description: String,
    pub starred: bool,
    /// Seconds since the Unix epoch.
    pub modified_at: i64,
}

/// A view as the local model holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalView {
    pub id: ViewId,
    pub owner: ViewOwner,
    pub configuration: ViewConfiguration,
}

/// Freshly loaded function attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionData {
    pub name: String,
    pub description: String,
    pub stack_frame: Option<BaseTypeId>,
    pub prototype: Option<BaseTypeId>,
    /// Module and address the function forwards to, for imported stubs.
    pub forwarded_to: Option<(ModuleId, Address)>,
}

/// Freshly loaded type substitution of one operand expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeSubstitution {
    pub base_type: BaseTypeId,
    /// Member path from the base type to the substituted member.
    pub path: Vec<TypeMemberId>,
    pub offset: Option<i64>,
}

/// Read-only view of what is currently loaded.
pub trait ModelResolver {
    fn is_module_loaded(&self, module: ModuleId) -> bool;

    fn is_project_loaded(&self, project: ProjectId) -> bool;

    fn comment(&self, id: CommentId) -> Option<LocalComment>;

    fn has_edge(&self, edge: EdgeId) -> bool;

    /// Every loaded edge between two addresses. More than one edge can
    /// match when the same code is loaded in several views.
    fn edges_between(
        &self,
        source_module: ModuleId,
        source: Address,
        target_module: ModuleId,
        target: Address,
    ) -> Vec<EdgeId>;

    fn node_kind(&self, node: NodeId) -> Option<NodeKind>;

    /// Every loaded code node starting at an address.
    fn code_nodes_at(&self, module: ModuleId, address: Address) -> Vec<NodeId>;

    fn has_instruction(&self, module: ModuleId, address: Address) -> bool;

    fn has_function(&self, module: ModuleId, address: Address) -> bool;

    fn has_type_instance(&self, module: ModuleId, instance: TypeInstanceId) -> bool;

    /// Snapshot of one operand's expression tree.
    fn operand_tree(&self, module: ModuleId, address: Address, position: u32)
        -> Option<OperandTree>;

    fn view(&self, view: ViewId) -> Option<LocalView>;
}

/// Database reads needed to resolve a notification.
pub trait DataLoader {
    fn load_function(&self, module: ModuleId, address: Address)
        -> Result<FunctionData, NotifyError>;

    /// `Ok(None)` when the row vanished in the meantime.
    fn load_view_configuration(
        &self,
        owner: ViewOwner,
        view: ViewId,
    ) -> Result<Option<ViewConfiguration>, NotifyError>;

    fn load_type_substitution(
        &self,
        module: ModuleId,
        address: Address,
        position: u32,
        expression: ExpressionId,
    ) -> Result<TypeSubstitution, NotifyError>;
}

/// Applies comment changes.
pub trait CommentInformer {
    fn inform_comment(&mut self, event: &CommentEvent) -> Result<(), NotifyError>;
}

/// Applies function changes.
pub trait FunctionInformer {
    fn inform_function(&mut self, event: &FunctionEvent) -> Result<(), NotifyError>;
}

/// Applies type instance changes. Load operations read from the database
/// and may fail with [`NotifyError::Load`].
pub trait TypeInstanceInformer {
    fn inform_type_instance(&mut self, event: &TypeInstanceEvent) -> Result<(), NotifyError>;
}

/// Applies base type, member and substitution changes.
pub trait TypeInformer {
    fn inform_type(&mut self, event: &TypeEvent) -> Result<(), NotifyError>;
}

/// Applies view changes, generating new views where needed.
pub trait ViewInformer {
    fn inform_view(&mut self, event: &ViewEvent) -> Result<(), NotifyError>;
}

/// All informers together.
pub trait Informer:
    CommentInformer + FunctionInformer + TypeInstanceInformer + TypeInformer + ViewInformer
{
}

impl<T> Informer for T where
    T: CommentInformer + FunctionInformer + TypeInstanceInformer + TypeInformer + ViewInformer
{
}
