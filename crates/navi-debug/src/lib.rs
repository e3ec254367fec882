//! navi-debug: reply decoding for the binary debug agent protocol.
//!
//! The agent answers requests and reports events as framed messages built
//! from typed arguments. This crate reads those arguments, routes each
//! message code to a parser from a declarative reply table, and decodes
//! the markup blobs some replies carry (registers, modules, target
//! description).

pub mod command;
pub mod error;
pub mod events;
pub mod factory;
pub mod listing;
pub mod packet;
pub mod parser;
pub mod reader;
pub mod receiver;
pub mod registers;
pub mod reply;
pub mod table;
pub mod target_info;
mod xml;

// Re-export key types for convenience.
pub use command::{message_name, CommandType};
pub use error::{DebugError, PayloadError};
pub use factory::ParserFactory;
pub use packet::PacketWriter;
pub use parser::ReplyParser;
pub use reader::{ArgType, PrimitiveReader, WireReader};
pub use receiver::ReplyReceiver;
pub use reply::{Payload, Reply, ReplyKind, PARSER_ERROR};
