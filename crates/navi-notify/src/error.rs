//! Notification decoding errors.

use thiserror::Error;

/// Errors from decoding and applying database change notifications.
///
/// The variants fall into three fatal classes (structural corruption,
/// consistency violations, unsupported operations) and two recoverable
/// ones (load failures and listen-channel failures). Use
/// [`is_fatal`](NotifyError::is_fatal) to tell them apart.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// A grammar failed to compile.
    #[error("invalid grammar for {table}: {detail}")]
    InvalidPattern {
        /// Table the grammar belongs to.
        table: &'static str,
        /// Regex compiler message.
        detail: String,
    },

    /// A notification does not fit the grammar of its table.
    #[error("malformed {table} notification: '{line}'")]
    Malformed {
        /// Table named by the first token.
        table: &'static str,
        /// The full notification text.
        line: String,
    },

    /// The notification disagrees with the locally held comment. Local and
    /// database state have diverged; applying the change would corrupt it.
    #[error(
        "comment {comment} diverged: local {field} is {local}, notification says {notified}"
    )]
    ConsistencyViolation {
        /// Comment the notification refers to.
        comment: navi_core::CommentId,
        /// Which attribute disagrees (`parent`, `user` or `text`).
        field: &'static str,
        /// The locally held value.
        local: String,
        /// The value carried by the notification.
        notified: String,
    },

    /// A known table arrived on a channel that does not carry it.
    #[error("{table} notifications are not accepted on {channel}")]
    Unsupported {
        /// Table named by the first token.
        table: &'static str,
        /// Channel the notification arrived on.
        channel: &'static str,
    },

    /// Loading fresh data for one notification failed. Other notifications
    /// in the batch are unaffected.
    #[error("could not load {what}: {message}")]
    Load {
        /// What was being loaded.
        what: String,
        /// Why it failed.
        message: String,
    },

    /// The listen channel failed.
    #[error("notification source error: {0}")]
    Source(String),
}

impl NotifyError {
    /// Returns `true` for errors that must stop processing: corrupted
    /// input, diverged state, or an operation the decoder cannot apply.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            NotifyError::InvalidPattern { .. }
                | NotifyError::Malformed { .. }
                | NotifyError::ConsistencyViolation { .. }
                | NotifyError::Unsupported { .. }
        )
    }

    /// Convenience constructor for [`NotifyError::Load`].
    pub fn load(what: impl Into<String>, message: impl Into<String>) -> Self {
        NotifyError::Load {
            what: what.into(),
            message: message.into(),
        }
    }
}
