//! Encoder for agent-side packets.
//!
//! Produces exactly the framing [`WireReader`](crate::reader::WireReader)
//! consumes. Used to replay captured sessions and to feed the decoders in
//! tests.

use navi_core::Address;

use crate::command::CommandType;
use crate::reader::ArgType;

/// Builds one reply packet argument by argument.
#[derive(Debug, Default, Clone)]
pub struct PacketWriter {
    args: Vec<u8>,
    count: u32,
}

impl PacketWriter {
    /// Starts an empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    fn header(mut self, size: u32, arg_type: ArgType) -> Self {
        self.args.extend_from_slice(&size.to_be_bytes());
        self.args.extend_from_slice(&(arg_type as u32).to_be_bytes());
        self.count += 1;
        self
    }

    /// Appends an integer argument.
    pub fn dword(self, value: u32) -> Self {
        let mut this = self.header(4, ArgType::Value);
        this.args.extend_from_slice(&value.to_be_bytes());
        this
    }

    /// Appends a 64-bit integer argument.
    pub fn long(self, value: u64) -> Self {
        let mut this = self.header(8, ArgType::Long);
        this.args.extend_from_slice(&value.to_be_bytes());
        this
    }

    /// Appends an address argument.
    pub fn address(self, address: Address) -> Self {
        let mut this = self.header(8, ArgType::Address);
        this.args
            .extend_from_slice(&((address.0 >> 32) as u32).to_be_bytes());
        this.args.extend_from_slice(&(address.0 as u32).to_be_bytes());
        this
    }

    /// Appends a data argument.
    pub fn data(self, bytes: &[u8]) -> Self {
        let len = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
        let mut this = self.header(len, ArgType::DataBuffer);
        this.args.extend_from_slice(bytes);
        this
    }

    /// Number of arguments appended so far.
    pub fn argument_count(&self) -> u32 {
        self.count
    }

    /// The encoded arguments without any count or header.
    pub fn into_args(self) -> Vec<u8> {
        self.args
    }

    /// The argument count followed by the arguments; what a reply parser
    /// consumes after the header.
    pub fn into_body(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.args.len());
        out.extend_from_slice(&self.count.to_be_bytes());
        out.extend_from_slice(&self.args);
        out
    }

    /// A complete packet: header, argument count, arguments.
    pub fn into_packet(self, command: CommandType, message_id: u32) -> Vec<u8> {
        self.into_packet_with_code(command.code(), message_id)
    }

    /// Like [`into_packet`](Self::into_packet) with a raw command code.
    pub fn into_packet_with_code(self, code: u32, message_id: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity(12 + self.args.len());
        out.extend_from_slice(&code.to_be_bytes());
        out.extend_from_slice(&message_id.to_be_bytes());
        out.extend_from_slice(&self.into_body());
        out
    }
}
