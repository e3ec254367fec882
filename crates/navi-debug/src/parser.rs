//! Applies one reply-table row to a message.

use tracing::warn;

use crate::error::DebugError;
use crate::reader::PrimitiveReader;
use crate::reply::{Payload, Reply, ReplyKind, PARSER_ERROR};
use crate::table::{expect_args, ErrorPath, Frame, ReplyRow};

/// Parser for one message kind. Stateless apart from its table row, so a
/// single instance serves every message of that kind.
#[derive(Debug)]
pub struct ReplyParser {
    row: &'static ReplyRow,
}

impl ReplyParser {
    /// Creates a parser for one table row.
    pub fn new(row: &'static ReplyRow) -> Self {
        Self { row }
    }

    /// The message kind this parser decodes.
    pub fn kind(&self) -> ReplyKind {
        self.row.kind
    }

    /// The table row behind this parser.
    pub fn row(&self) -> &'static ReplyRow {
        self.row
    }

    /// Decodes the rest of a message whose header has already been read.
    ///
    /// Reads the argument count, then the success payload when `observed` is
    /// the kind's success code and the error payload otherwise. Framing
    /// problems and I/O failures are returned as errors; a nested payload
    /// that fails to decode yields a reply with [`PARSER_ERROR`] unless the
    /// kind treats that as fatal.
    pub fn parse(
        &self,
        reader: &mut dyn PrimitiveReader,
        observed: u32,
        message_id: u32,
    ) -> Result<Reply, DebugError> {
        let frame = Frame {
            kind: self.row.kind,
            message_id,
            argument_count: reader.read_u32()?,
        };

        if observed == self.row.success.code() {
            self.parse_success(reader, &frame)
        } else {
            self.parse_error(reader, &frame, observed)
        }
    }

    fn parse_success(
        &self,
        reader: &mut dyn PrimitiveReader,
        frame: &Frame,
    ) -> Result<Reply, DebugError> {
        match (self.row.decode)(reader, frame) {
            Ok(payload) => Ok(self.reply(frame, 0, payload)),
            Err(DebugError::Payload(source)) if self.row.fatal_payload => {
                Err(DebugError::FatalPayload {
                    kind: frame.kind,
                    source,
                })
            }
            Err(DebugError::Payload(source)) => {
                warn!(kind = %frame.kind, id = frame.message_id, "payload decode failed: {source}");
                Ok(self.reply(frame, PARSER_ERROR, None))
            }
            Err(e) => Err(e),
        }
    }

    fn parse_error(
        &self,
        reader: &mut dyn PrimitiveReader,
        frame: &Frame,
        observed: u32,
    ) -> Result<Reply, DebugError> {
        match self.row.error {
            ErrorPath::ServerInitiated => Err(DebugError::UnexpectedErrorReply {
                kind: frame.kind,
                code: observed,
            }),
            ErrorPath::Code(_) => {
                expect_args(frame, 1)?;
                let code = reader.read_dword()?;
                Ok(self.reply(frame, code, None))
            }
            ErrorPath::CodeAndThread(_) => {
                expect_args(frame, 2)?;
                let code = reader.read_dword()?;
                let thread_id = reader.read_thread_id()?;
                Ok(self.reply(frame, code, Some(Payload::Thread { thread_id })))
            }
        }
    }

    fn reply(&self, frame: &Frame, error_code: u32, payload: Option<Payload>) -> Reply {
        Reply {
            packet_id: frame.message_id,
            error_code,
            kind: frame.kind,
            payload,
        }
    }
}

// ── tests ───────────────────────────────────────────────────────────
