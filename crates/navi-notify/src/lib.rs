//! navi-notify: decoder for the database's textual change notifications.
//!
//! Every change to a shared database row is announced as one line of text
//! on a LISTEN/NOTIFY channel. This crate parses those lines, resolves
//! them against whatever part of the model this front end has loaded, and
//! applies the result through informer callbacks.
//!
//! ```text
//!  NotificationSource ──► NotificationProvider ──► Dispatcher
//!                                                    │ parse   (grammar)
//!                                                    │ resolve (ModelResolver, DataLoader)
//!                                                    ▼ apply   (Informer, per-module lock)
//! ```

pub mod comment;
pub mod dispatcher;
pub mod error;
pub mod function;
pub mod grammar;
pub mod locks;
pub mod operand;
pub mod provider;
pub mod resolver;
pub mod table;
pub mod type_instance;
pub mod types;
pub mod view;

#[cfg(test)]
mod testing;

// Re-export key types for convenience.
pub use comment::{CommentAction, CommentEvent, CommentRecord, CommentScope, CommentTarget};
pub use dispatcher::{BatchReport, Dispatcher, Event, Record};
pub use error::NotifyError;
pub use function::{FunctionEvent, FunctionRecord};
pub use locks::ModuleLocks;
pub use operand::{NodeIndex, OperandNode, OperandTree};
pub use provider::{
    provider_task, Notification, NotificationProvider, NotificationSource, PollReport,
    ProviderCommand, ProviderSettings,
};
pub use resolver::{
    CommentInformer, DataLoader, FunctionData, FunctionInformer, Informer, LocalComment,
    LocalView, ModelResolver, NodeKind, TypeInformer, TypeInstanceInformer, TypeSubstitution,
    ViewConfiguration, ViewInformer, ViewOwner,
};
pub use table::{Channel, Operation, TableName};
pub use type_instance::{TypeInstanceEvent, TypeInstanceRecord};
pub use types::{SubstitutionChange, TypeChange, TypeEvent, TypeRecord};
pub use view::{ViewChanges, ViewEvent, ViewRecord};
