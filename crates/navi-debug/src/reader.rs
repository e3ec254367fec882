//! Binary primitive reader for the debug agent protocol.
//!
//! Every argument on the wire is preceded by a `{u32 size, u32 type}`
//! header, all big-endian. The reader validates the header against the
//! primitive being asked for and then pulls exactly the announced bytes;
//! nothing is buffered beyond the current primitive.

use std::fmt;
use std::io::{ErrorKind, Read};

use navi_core::Address;
use serde::Serialize;

use crate::error::DebugError;

/// Largest data argument accepted from the agent (64 MiB).
pub const MAX_DATA_LEN: u32 = 64 * 1024 * 1024;

/// Argument type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u32)]
pub enum ArgType {
    /// 64-bit address sent as high then low 32-bit halves.
    Address = 0,
    /// 32-bit integer.
    Value = 1,
    /// Length-prefixed byte buffer.
    DataBuffer = 2,
    /// 64-bit integer.
    Long = 3,
}

impl ArgType {
    /// Maps a raw wire tag to an argument type.
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(ArgType::Address),
            1 => Some(ArgType::Value),
            2 => Some(ArgType::DataBuffer),
            3 => Some(ArgType::Long),
            _ => None,
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgType::Address => "address",
            ArgType::Value => "integer",
            ArgType::DataBuffer => "data",
            ArgType::Long => "long",
        };
        f.write_str(name)
    }
}

/// Typed primitives a reply decoder pulls from one message.
///
/// Implementations block until the bytes arrive; a short read or a stream
/// fault is returned as [`DebugError::Io`] and aborts the message.
pub trait PrimitiveReader {
    /// Reads an unframed big-endian `u32` (message header words, argument count).
    fn read_u32(&mut self) -> Result<u32, DebugError>;

    /// Reads an integer argument.
    fn read_dword(&mut self) -> Result<u32, DebugError>;

    /// Reads a thread id. Agents send either a 32-bit integer or a 64-bit
    /// long argument; both widen to `u64`.
    fn read_thread_id(&mut self) -> Result<u64, DebugError>;

    /// Reads an address argument.
    fn read_address(&mut self) -> Result<Address, DebugError>;

    /// Reads a data argument: the header size is the length prefix.
    fn read_data(&mut self) -> Result<Vec<u8>, DebugError>;
}

/// [`PrimitiveReader`] over any blocking byte stream.
#[derive(Debug)]
pub struct WireReader<R> {
    inner: R,
}

impl<R: Read> WireReader<R> {
    /// Wraps a byte stream.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Unwraps the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Reads a `{command, messageId}` message header.
    ///
    /// Returns `Ok(None)` when the stream is closed before the first header
    /// byte, which is how an agent ends a session. A header cut short is an
    /// error like any other short read.
    pub fn read_header(&mut self) -> Result<Option<(u32, u32)>, DebugError> {
        let mut buf = [0u8; 8];
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => return Err(std::io::Error::from(ErrorKind::UnexpectedEof).into()),
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        let command = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let id = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        Ok(Some((command, id)))
    }

    fn read_exact_array<const N: usize>(&mut self) -> Result<[u8; N], DebugError> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads an argument header and checks its tag.
    fn read_arg_header(&mut self, expected: &[ArgType]) -> Result<(ArgType, u32), DebugError> {
        let size = self.read_u32()?;
        let tag = self.read_u32()?;
        match ArgType::from_tag(tag) {
            Some(arg_type) if expected.contains(&arg_type) => Ok((arg_type, size)),
            _ => Err(DebugError::ArgumentMismatch {
                expected: expected[0],
                found: tag,
            }),
        }
    }
}

impl<R: Read> PrimitiveReader for WireReader<R> {
    fn read_u32(&mut self) -> Result<u32, DebugError> {
        Ok(u32::from_be_bytes(self.read_exact_array()?))
    }

    fn read_dword(&mut self) -> Result<u32, DebugError> {
        let (arg_type, size) = self.read_arg_header(&[ArgType::Value])?;
        if size != 4 {
            return Err(DebugError::ArgumentSize { arg_type, size });
        }
        self.read_u32()
    }

    fn read_thread_id(&mut self) -> Result<u64, DebugError> {
        let (arg_type, size) = self.read_arg_header(&[ArgType::Value, ArgType::Long])?;
        match (arg_type, size) {
            (ArgType::Value, 4) => Ok(u64::from(self.read_u32()?)),
            (ArgType::Long, 8) => Ok(u64::from_be_bytes(self.read_exact_array()?)),
            _ => Err(DebugError::ArgumentSize { arg_type, size }),
        }
    }

    fn read_address(&mut self) -> Result<Address, DebugError> {
        let (arg_type, size) = self.read_arg_header(&[ArgType::Address])?;
        if size != 8 {
            return Err(DebugError::ArgumentSize { arg_type, size });
        }
        let high = u64::from(self.read_u32()?);
        let low = u64::from(self.read_u32()?);
        Ok(Address((high << 32) | low))
    }

    fn read_data(&mut self) -> Result<Vec<u8>, DebugError> {
        let (arg_type, size) = self.read_arg_header(&[ArgType::DataBuffer])?;
        if size > MAX_DATA_LEN {
            return Err(DebugError::ArgumentSize { arg_type, size });
        }
        let mut data = vec![0u8; size as usize];
        self.inner.read_exact(&mut data)?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketWriter;

    fn reader_for(bytes: Vec<u8>) -> WireReader<std::io::Cursor<Vec<u8>>> {
        WireReader::new(std::io::Cursor::new(bytes))
    }

    #[test]
    fn reads_dword_argument() {
        let bytes = PacketWriter::new().dword(0xDEAD_BEEF).into_args();
        assert_eq!(reader_for(bytes).read_dword().unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn reads_address_without_truncation() {
        let bytes = PacketWriter::new()
            .address(Address(0xFFFF_8000_0040_1000))
            .into_args();
        assert_eq!(
            reader_for(bytes).read_address().unwrap(),
            Address(0xFFFF_8000_0040_1000)
        );
    }

    #[test]
    fn thread_id_accepts_value_and_long() {
        let bytes = PacketWriter::new()
            .dword(1234)
            .long(0x1_0000_0001)
            .into_args();
        let mut reader = reader_for(bytes);
        assert_eq!(reader.read_thread_id().unwrap(), 1234);
        assert_eq!(reader.read_thread_id().unwrap(), 0x1_0000_0001);
    }

    #[test]
    fn reads_data_of_announced_length() {
        let bytes = PacketWriter::new().data(b"\x90\x90\xcc").dword(7).into_args();
        let mut reader = reader_for(bytes);
        assert_eq!(reader.read_data().unwrap(), vec![0x90, 0x90, 0xcc]);
        assert_eq!(reader.read_dword().unwrap(), 7);
    }

    #[test]
    fn empty_data_is_allowed() {
        let bytes = PacketWriter::new().data(b"").into_args();
        assert!(reader_for(bytes).read_data().unwrap().is_empty());
    }

    #[test]
    fn wrong_tag_is_mismatch() {
        let bytes = PacketWriter::new().dword(5).into_args();
        let err = reader_for(bytes).read_address().unwrap_err();
        assert!(
            matches!(
                err,
                DebugError::ArgumentMismatch {
                    expected: ArgType::Address,
                    found: 1
                }
            ),
            "got: {err}"
        );
    }

    #[test]
    fn wrong_size_is_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2u32.to_be_bytes());
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(&[0, 1]);
        let err = reader_for(bytes).read_dword().unwrap_err();
        assert!(matches!(err, DebugError::ArgumentSize { size: 2, .. }), "got: {err}");
    }

    #[test]
    fn oversized_data_is_rejected_before_allocation() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(MAX_DATA_LEN + 1).to_be_bytes());
        bytes.extend_from_slice(&2u32.to_be_bytes());
        let err = reader_for(bytes).read_data().unwrap_err();
        assert!(matches!(err, DebugError::ArgumentSize { .. }), "got: {err}");
    }

    #[test]
    fn short_read_surfaces_as_io_error() {
        let mut bytes = PacketWriter::new().data(b"abcdef").into_args();
        bytes.truncate(bytes.len() - 2);
        let err = reader_for(bytes).read_data().unwrap_err();
        assert!(err.is_disconnect(), "got: {err}");
    }

    #[test]
    fn header_on_closed_stream_is_none() {
        assert!(reader_for(Vec::new()).read_header().unwrap().is_none());
    }

    #[test]
    fn partial_header_is_error() {
        let err = reader_for(vec![0, 0, 0, 45, 0]).read_header().unwrap_err();
        assert!(err.is_disconnect(), "got: {err}");
    }

    #[test]
    fn header_words_are_big_endian() {
        let bytes = vec![0, 0, 0, 45, 0, 0, 1, 0];
        assert_eq!(
            reader_for(bytes).read_header().unwrap(),
            Some((45, 256))
        );
    }
}
