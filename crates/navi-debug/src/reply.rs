//! Decoded replies and events from the debug agent.

use std::fmt;

use navi_core::Address;
use serde::Serialize;

use crate::events::{
    ExceptionEvent, ModuleDescriptor, ModuleLoadedEvent, ProcessStartEvent, ThreadState,
};
use crate::listing::{FileListing, ProcessDescription};
use crate::registers::RegisterSnapshot;
use crate::target_info::TargetInformation;

/// Error code of a reply whose nested payload could not be decoded.
pub const PARSER_ERROR: u32 = 0xFFFF_FFFF;

/// The message kind a reply belongs to. One kind covers a success code and
/// its paired error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReplyKind {
    Attach,
    BreakpointSet,
    EchoBreakpointSet,
    StepBreakpointSet,
    BreakpointRemoved,
    EchoBreakpointRemoved,
    StepBreakpointRemoved,
    BreakpointHit,
    EchoBreakpointHit,
    StepBreakpointHit,
    BreakpointConditionSet,
    Resume,
    Detach,
    Terminate,
    Halt,
    Registers,
    ReadMemory,
    WriteMemory,
    SetRegister,
    SingleStep,
    ValidateMemory,
    Search,
    MemoryMap,
    ListProcesses,
    SelectProcess,
    CancelTargetSelection,
    ListFiles,
    SelectFile,
    ResumeThread,
    SuspendThread,
    SetActiveThread,
    SetExceptionSettings,
    SetDebuggerEventSettings,
    QueryDebuggerEventSettings,
    ThreadCreated,
    ThreadClosed,
    ProcessClosed,
    ProcessStart,
    ExceptionOccurred,
    ModuleLoaded,
    ModuleUnloaded,
    TargetInformation,
    RequestTarget,
}

impl fmt::Display for ReplyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// One decoded message. Replies are built once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    /// Message id, echoing the request for solicited replies.
    pub packet_id: u32,
    /// `0` on success, the agent's code on error, or [`PARSER_ERROR`].
    pub error_code: u32,
    pub kind: ReplyKind,
    /// Kind-specific data. Absent for kinds that carry none and for most
    /// error replies.
    pub payload: Option<Payload>,
}

impl Reply {
    /// Returns `true` for a successful reply.
    pub fn is_success(&self) -> bool {
        self.error_code == 0
    }
}

/// Outcome of one breakpoint in a set or remove reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreakpointResult {
    pub address: Address,
    /// `0` when the breakpoint was applied.
    pub error: u32,
}

/// A half-open memory range `[start, end)` as reported by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryRange {
    pub start: Address,
    pub end: Address,
}

/// Kind-specific reply contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Payload {
    Breakpoints(Vec<BreakpointResult>),
    BreakpointHit {
        thread_id: u64,
        registers: RegisterSnapshot,
    },
    Thread {
        thread_id: u64,
    },
    ThreadCreated {
        thread_id: u64,
        state: ThreadState,
    },
    Registers(RegisterSnapshot),
    Memory {
        address: Address,
        data: Vec<u8>,
    },
    RegisterWritten {
        thread_id: u64,
        index: u32,
    },
    SingleStep {
        thread_id: u64,
        address: Address,
        registers: RegisterSnapshot,
    },
    MemoryRange(MemoryRange),
    SearchHit(Address),
    MemoryMap(Vec<MemoryRange>),
    Processes(Vec<ProcessDescription>),
    FileSystem(FileListing),
    Exception(ExceptionEvent),
    ModuleLoaded(ModuleLoadedEvent),
    ModuleUnloaded(ModuleDescriptor),
    ProcessStart(ProcessStartEvent),
    TargetInformation(TargetInformation),
}

// ── tests ───────────────────────────────────────────────────────────
