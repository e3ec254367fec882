//! The single reader of a debug connection.

use std::io::Read;

use tracing::debug;

use crate::command::message_name;
use crate::error::DebugError;
use crate::factory::ParserFactory;
use crate::reader::WireReader;
use crate::reply::Reply;

/// Reads whole messages off a stream and decodes them.
///
/// Exactly one receiver may own a connection's read half; messages are
/// decoded strictly in arrival order.
#[derive(Debug)]
pub struct ReplyReceiver<R> {
    reader: WireReader<R>,
    factory: ParserFactory,
}

impl<R: Read> ReplyReceiver<R> {
    /// Wraps the read half of a connection.
    pub fn new(stream: R) -> Self {
        Self {
            reader: WireReader::new(stream),
            factory: ParserFactory::new(),
        }
    }

    /// Reads and decodes the next message.
    ///
    /// Returns `Ok(None)` when the agent closed the connection between
    /// messages. Any error leaves the stream at an unknown position; the
    /// connection should be dropped.
    pub fn next_reply(&mut self) -> Result<Option<Reply>, DebugError> {
        let Some((command, message_id)) = self.reader.read_header()? else {
            debug!("agent closed the connection");
            return Ok(None);
        };
        debug!(id = message_id, "received {}", message_name(command));

        let parser = self.factory.get_parser(command)?;
        parser.parse(&mut self.reader, command, message_id).map(Some)
    }

    /// Unwraps the underlying stream.
    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}

impl<R: Read> Iterator for ReplyReceiver<R> {
    type Item = Result<Reply, DebugError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_reply().transpose()
    }
}

// ── tests ───────────────────────────────────────────────────────────
