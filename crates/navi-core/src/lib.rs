//! navi-core: shared identifiers and logging helpers for naviwire.
//!
//! Both the debug reply decoder and the notification decoder address the
//! same loaded model (modules, nodes, instructions, views) by integer ids
//! and 64-bit addresses; those identifiers live here so neither crate has
//! to depend on the other.

pub mod ids;
pub mod logging;

// Re-export key types for convenience.
pub use ids::{
    Address, BaseTypeId, CommentId, EdgeId, ExpressionId, ModuleId, NodeId, ProjectId,
    TypeInstanceId, TypeMemberId, UserId, ViewId,
};
