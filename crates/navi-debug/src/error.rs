//! Debug reply decoding errors.

use thiserror::Error;

use crate::reader::ArgType;
use crate::reply::ReplyKind;

/// A nested payload (registers, module descriptor, target information …)
/// that could not be decoded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PayloadError {
    /// The blob is not well-formed markup.
    #[error("malformed markup at byte {offset}: {message}")]
    Markup {
        /// Byte offset into the blob.
        offset: usize,
        /// What the decoder expected.
        message: String,
    },

    /// A required element is missing.
    #[error("missing element <{0}>")]
    MissingElement(&'static str),

    /// An element carries no value for a required attribute.
    #[error("element <{element}> lacks attribute '{attribute}'")]
    MissingAttribute {
        /// Element name.
        element: String,
        /// Attribute name.
        attribute: &'static str,
    },

    /// An attribute or text node could not be converted.
    #[error("invalid value '{value}' for {field}")]
    InvalidValue {
        /// Which field was being decoded.
        field: &'static str,
        /// The offending text.
        value: String,
    },

    /// An element the decoder does not understand.
    #[error("unexpected element <{found}> inside <{parent}>")]
    UnexpectedElement {
        /// Parent element name.
        parent: String,
        /// Offending child name.
        found: String,
    },

    /// A debugger option name outside the known set.
    #[error("unknown debugger option '{0}'")]
    UnknownOption(String),
}

/// Errors from reading and decoding debug agent replies.
#[derive(Debug, Error)]
pub enum DebugError {
    /// The underlying stream failed or closed mid-message.
    #[error("wire read failed: {0}")]
    Io(#[from] std::io::Error),

    /// No parser is registered for the message type.
    #[error("unknown message type {code}")]
    UnknownMessage {
        /// The wire code that was received.
        code: u32,
    },

    /// An argument header announced a different type than the decoder needs.
    #[error("expected {expected} argument, found type tag {found}")]
    ArgumentMismatch {
        /// The argument type the decoder asked for.
        expected: ArgType,
        /// The raw tag found on the wire.
        found: u32,
    },

    /// An argument header announced an impossible size.
    #[error("invalid size {size} for {arg_type} argument")]
    ArgumentSize {
        /// Argument type.
        arg_type: ArgType,
        /// The announced size.
        size: u32,
    },

    /// The argument count does not fit the shape of the message kind.
    #[error("{kind} reply carries {actual} arguments, expected {expected}")]
    ArgumentCount {
        /// The message kind being decoded.
        kind: ReplyKind,
        /// The count read from the wire.
        actual: u32,
        /// Human-readable expectation.
        expected: String,
    },

    /// A nested payload failed to decode. Reply parsers downgrade this to a
    /// `PARSER_ERROR` reply for every kind except the fatal ones.
    #[error("malformed payload: {0}")]
    Payload(#[from] PayloadError),

    /// A nested payload failed to decode for a kind where that is fatal.
    #[error("{kind} payload could not be decoded: {source}")]
    FatalPayload {
        /// The message kind being decoded.
        kind: ReplyKind,
        /// The underlying decode failure.
        #[source]
        source: PayloadError,
    },

    /// An error reply arrived for a kind the agent only ever sends as a
    /// success. This is a protocol defect, never a recoverable condition.
    #[error("{kind} has no error reply but message type {code} was routed to it")]
    UnexpectedErrorReply {
        /// The message kind.
        kind: ReplyKind,
        /// The observed message type.
        code: u32,
    },
}

impl DebugError {
    /// Returns `true` when the stream ended cleanly or mid-message.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, DebugError::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}
