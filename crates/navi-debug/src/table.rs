//! The reply table: one row per message kind.
//!
//! A row names the success code, how the paired error reply is shaped, and
//! a small function that decodes the success payload. Adding a message kind
//! means adding its codes to [`CommandType`] and one row here.

use crate::command::CommandType;
use crate::command::CommandType as C;
use crate::error::{DebugError, PayloadError};
use crate::events::{self, ThreadState};
use crate::listing;
use crate::reader::PrimitiveReader;
use crate::registers;
use crate::reply::{BreakpointResult, MemoryRange, Payload, ReplyKind};
use crate::reply::ReplyKind as K;
use crate::target_info;

/// Framing facts a success decoder may need.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    pub kind: ReplyKind,
    pub message_id: u32,
    pub argument_count: u32,
}

/// Decodes the success payload of one kind.
pub type SuccessDecoder =
    fn(&mut dyn PrimitiveReader, &Frame) -> Result<Option<Payload>, DebugError>;

/// How the error reply of a kind is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPath {
    /// The agent only sends this kind as a success.
    ServerInitiated,
    /// One error code argument.
    Code(CommandType),
    /// An error code followed by the thread id the request named.
    CodeAndThread(CommandType),
}

impl ErrorPath {
    /// The error message type, if the kind has one.
    pub fn command(self) -> Option<CommandType> {
        match self {
            ErrorPath::ServerInitiated => None,
            ErrorPath::Code(command) | ErrorPath::CodeAndThread(command) => Some(command),
        }
    }
}

/// One message kind.
#[derive(Debug, Clone, Copy)]
pub struct ReplyRow {
    pub kind: ReplyKind,
    pub success: CommandType,
    pub error: ErrorPath,
    pub decode: SuccessDecoder,
    /// A nested payload failure aborts instead of producing a
    /// `PARSER_ERROR` reply.
    pub fatal_payload: bool,
}

const fn row(
    kind: ReplyKind,
    success: CommandType,
    error: ErrorPath,
    decode: SuccessDecoder,
) -> ReplyRow {
    ReplyRow {
        kind,
        success,
        error,
        decode,
        fatal_payload: false,
    }
}

use ErrorPath::{Code, CodeAndThread, ServerInitiated};

/// Every reply kind the agent can send.
pub static REPLY_TABLE: &[ReplyRow] = &[
    row(K::Attach, C::RespAttachSuccess, Code(C::RespAttachError), no_payload),
    row(K::BreakpointSet, C::RespBreakpointSetSuccess, Code(C::RespBreakpointSetError), breakpoints),
    row(K::EchoBreakpointSet, C::RespEchoBreakpointSetSuccess, Code(C::RespEchoBreakpointSetError), breakpoints),
    row(K::StepBreakpointSet, C::RespStepBreakpointSetSuccess, Code(C::RespStepBreakpointSetError), breakpoints),
    row(K::BreakpointRemoved, C::RespBreakpointRemoveSuccess, Code(C::RespBreakpointRemoveError), breakpoints),
    row(K::EchoBreakpointRemoved, C::RespEchoBreakpointRemoveSuccess, Code(C::RespEchoBreakpointRemoveError), breakpoints),
    row(K::StepBreakpointRemoved, C::RespStepBreakpointRemoveSuccess, Code(C::RespStepBreakpointRemoveError), breakpoints),
    row(K::BreakpointHit, C::RespBreakpointHit, ServerInitiated, breakpoint_hit),
    row(K::EchoBreakpointHit, C::RespEchoBreakpointHit, ServerInitiated, breakpoint_hit),
    row(K::StepBreakpointHit, C::RespStepBreakpointHit, ServerInitiated, breakpoint_hit),
    row(K::BreakpointConditionSet, C::RespSetBreakpointConditionSuccess, Code(C::RespSetBreakpointConditionError), no_payload),
    row(K::Resume, C::RespResumeSuccess, Code(C::RespResumeError), no_payload),
    row(K::Detach, C::RespDetachSuccess, Code(C::RespDetachError), no_payload),
    row(K::Terminate, C::RespTerminateSuccess, Code(C::RespTerminateError), no_payload),
    row(K::Halt, C::RespHaltSuccess, Code(C::RespHaltError), thread),
    row(K::Registers, C::RespRegistersSuccess, Code(C::RespRegistersError), register_values),
    row(K::ReadMemory, C::RespReadMemorySuccess, Code(C::RespReadMemoryError), memory),
    row(K::WriteMemory, C::RespWriteMemorySuccess, Code(C::RespWriteMemoryError), no_payload),
    row(K::SetRegister, C::RespSetRegisterSuccess, Code(C::RespSetRegisterError), register_written),
    row(K::SingleStep, C::RespSingleStepSuccess, Code(C::RespSingleStepError), single_step),
    row(K::ValidateMemory, C::RespValidateMemorySuccess, Code(C::RespValidateMemoryError), memory_range),
    row(K::Search, C::RespSearchSuccess, Code(C::RespSearchError), search_hit),
    row(K::MemoryMap, C::RespMemoryMapSuccess, Code(C::RespMemoryMapError), memory_map),
    row(K::ListProcesses, C::RespListProcessesSuccess, ServerInitiated, processes),
    row(K::SelectProcess, C::RespSelectProcessSuccess, Code(C::RespSelectProcessError), no_payload),
    row(K::CancelTargetSelection, C::RespCancelTargetSelectionSuccess, ServerInitiated, no_payload),
    row(K::ListFiles, C::RespListFilesSuccess, Code(C::RespListFilesError), file_system),
    row(K::SelectFile, C::RespSelectFileSuccess, Code(C::RespSelectFileError), no_payload),
    row(K::ResumeThread, C::RespResumeThreadSuccess, CodeAndThread(C::RespResumeThreadError), thread),
    row(K::SuspendThread, C::RespSuspendThreadSuccess, CodeAndThread(C::RespSuspendThreadError), thread),
    row(K::SetActiveThread, C::RespSetActiveThreadSuccess, CodeAndThread(C::RespSetActiveThreadError), thread),
    row(K::SetExceptionSettings, C::RespSetExceptionsSuccess, Code(C::RespSetExceptionsError), no_payload),
    row(K::SetDebuggerEventSettings, C::RespSetDebuggerEventSettingsSuccess, Code(C::RespSetDebuggerEventSettingsError), no_payload),
    row(K::QueryDebuggerEventSettings, C::RespQueryDebuggerEventSettings, ServerInitiated, no_payload),
    row(K::ThreadCreated, C::RespThreadCreated, ServerInitiated, thread_created),
    row(K::ThreadClosed, C::RespThreadClosed, ServerInitiated, thread),
    row(K::ProcessClosed, C::RespProcessClosed, ServerInitiated, no_payload),
    ReplyRow {
        kind: K::ProcessStart,
        success: C::RespProcessStart,
        error: ServerInitiated,
        decode: process_start,
        fatal_payload: true,
    },
    row(K::ExceptionOccurred, C::RespExceptionOccurred, ServerInitiated, exception),
    row(K::ModuleLoaded, C::RespModuleLoaded, ServerInitiated, module_loaded),
    row(K::ModuleUnloaded, C::RespModuleUnloaded, ServerInitiated, module_unloaded),
    row(K::TargetInformation, C::RespInfo, ServerInitiated, target_information),
    row(K::RequestTarget, C::RespRequestTarget, ServerInitiated, no_payload),
];

/// Fails unless the message carries exactly `expected` arguments.
pub(crate) fn expect_args(frame: &Frame, expected: u32) -> Result<(), DebugError> {
    if frame.argument_count == expected {
        Ok(())
    } else {
        Err(DebugError::ArgumentCount {
            kind: frame.kind,
            actual: frame.argument_count,
            expected: expected.to_string(),
        })
    }
}

fn no_payload(_: &mut dyn PrimitiveReader, frame: &Frame) -> Result<Option<Payload>, DebugError> {
    expect_args(frame, 0)?;
    Ok(None)
}

fn breakpoints(
    reader: &mut dyn PrimitiveReader,
    frame: &Frame,
) -> Result<Option<Payload>, DebugError> {
    if frame.argument_count == 0 {
        return Err(DebugError::ArgumentCount {
            kind: frame.kind,
            actual: 0,
            expected: "at least 1".into(),
        });
    }
    let count = reader.read_dword()?;
    let expected = 1 + 2 * u64::from(count);
    if u64::from(frame.argument_count) != expected {
        return Err(DebugError::ArgumentCount {
            kind: frame.kind,
            actual: frame.argument_count,
            expected: expected.to_string(),
        });
    }

    let mut results = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let address = reader.read_address()?;
        let error = reader.read_dword()?;
        results.push(BreakpointResult { address, error });
    }
    Ok(Some(Payload::Breakpoints(results)))
}

fn breakpoint_hit(
    reader: &mut dyn PrimitiveReader,
    frame: &Frame,
) -> Result<Option<Payload>, DebugError> {
    expect_args(frame, 2)?;
    let thread_id = reader.read_thread_id()?;
    let blob = reader.read_data()?;
    Ok(Some(Payload::BreakpointHit {
        thread_id,
        registers: registers::parse_registers(&blob)?,
    }))
}

fn thread(reader: &mut dyn PrimitiveReader, frame: &Frame) -> Result<Option<Payload>, DebugError> {
    expect_args(frame, 1)?;
    Ok(Some(Payload::Thread {
        thread_id: reader.read_thread_id()?,
    }))
}

fn thread_created(
    reader: &mut dyn PrimitiveReader,
    frame: &Frame,
) -> Result<Option<Payload>, DebugError> {
    expect_args(frame, 2)?;
    let thread_id = reader.read_thread_id()?;
    let raw_state = reader.read_dword()?;
    // The state travels as a plain argument, so a bad value is a payload
    // problem rather than framing corruption.
    let state = ThreadState::from_wire(raw_state).ok_or_else(|| PayloadError::InvalidValue {
        field: "threadState",
        value: raw_state.to_string(),
    })?;
    Ok(Some(Payload::ThreadCreated { thread_id, state }))
}

fn register_values(
    reader: &mut dyn PrimitiveReader,
    frame: &Frame,
) -> Result<Option<Payload>, DebugError> {
    expect_args(frame, 1)?;
    let blob = reader.read_data()?;
    Ok(Some(Payload::Registers(registers::parse_registers(&blob)?)))
}

fn memory(reader: &mut dyn PrimitiveReader, frame: &Frame) -> Result<Option<Payload>, DebugError> {
    expect_args(frame, 2)?;
    let address = reader.read_address()?;
    let data = reader.read_data()?;
    Ok(Some(Payload::Memory { address, data }))
}

fn register_written(
    reader: &mut dyn PrimitiveReader,
    frame: &Frame,
) -> Result<Option<Payload>, DebugError> {
    expect_args(frame, 2)?;
    let thread_id = reader.read_thread_id()?;
    let index = reader.read_dword()?;
    Ok(Some(Payload::RegisterWritten { thread_id, index }))
}

fn single_step(
    reader: &mut dyn PrimitiveReader,
    frame: &Frame,
) -> Result<Option<Payload>, DebugError> {
    expect_args(frame, 3)?;
    let thread_id = reader.read_thread_id()?;
    let address = reader.read_address()?;
    let blob = reader.read_data()?;
    Ok(Some(Payload::SingleStep {
        thread_id,
        address,
        registers: registers::parse_registers(&blob)?,
    }))
}

fn memory_range(
    reader: &mut dyn PrimitiveReader,
    frame: &Frame,
) -> Result<Option<Payload>, DebugError> {
    expect_args(frame, 2)?;
    let start = reader.read_address()?;
    let end = reader.read_address()?;
    Ok(Some(Payload::MemoryRange(MemoryRange { start, end })))
}

fn search_hit(
    reader: &mut dyn PrimitiveReader,
    frame: &Frame,
) -> Result<Option<Payload>, DebugError> {
    expect_args(frame, 1)?;
    Ok(Some(Payload::SearchHit(reader.read_address()?)))
}

fn memory_map(
    reader: &mut dyn PrimitiveReader,
    frame: &Frame,
) -> Result<Option<Payload>, DebugError> {
    if frame.argument_count % 2 != 0 {
        return Err(DebugError::ArgumentCount {
            kind: frame.kind,
            actual: frame.argument_count,
            expected: "an even count".into(),
        });
    }
    let mut ranges = Vec::with_capacity((frame.argument_count / 2) as usize);
    for _ in 0..frame.argument_count / 2 {
        let start = reader.read_address()?;
        let end = reader.read_address()?;
        ranges.push(MemoryRange { start, end });
    }
    Ok(Some(Payload::MemoryMap(ranges)))
}

fn processes(
    reader: &mut dyn PrimitiveReader,
    frame: &Frame,
) -> Result<Option<Payload>, DebugError> {
    expect_args(frame, 1)?;
    let blob = reader.read_data()?;
    Ok(Some(Payload::Processes(listing::parse_process_list(&blob)?)))
}

fn file_system(
    reader: &mut dyn PrimitiveReader,
    frame: &Frame,
) -> Result<Option<Payload>, DebugError> {
    expect_args(frame, 1)?;
    let blob = reader.read_data()?;
    Ok(Some(Payload::FileSystem(listing::parse_file_listing(&blob)?)))
}

fn exception(
    reader: &mut dyn PrimitiveReader,
    frame: &Frame,
) -> Result<Option<Payload>, DebugError> {
    expect_args(frame, 1)?;
    let blob = reader.read_data()?;
    Ok(Some(Payload::Exception(events::parse_exception(&blob)?)))
}

fn module_loaded(
    reader: &mut dyn PrimitiveReader,
    frame: &Frame,
) -> Result<Option<Payload>, DebugError> {
    expect_args(frame, 1)?;
    let blob = reader.read_data()?;
    Ok(Some(Payload::ModuleLoaded(events::parse_module_loaded(&blob)?)))
}

fn module_unloaded(
    reader: &mut dyn PrimitiveReader,
    frame: &Frame,
) -> Result<Option<Payload>, DebugError> {
    expect_args(frame, 1)?;
    let blob = reader.read_data()?;
    Ok(Some(Payload::ModuleUnloaded(events::parse_module_unloaded(&blob)?)))
}

fn process_start(
    reader: &mut dyn PrimitiveReader,
    frame: &Frame,
) -> Result<Option<Payload>, DebugError> {
    expect_args(frame, 1)?;
    let blob = reader.read_data()?;
    Ok(Some(Payload::ProcessStart(events::parse_process_start(&blob)?)))
}

fn target_information(
    reader: &mut dyn PrimitiveReader,
    frame: &Frame,
) -> Result<Option<Payload>, DebugError> {
    expect_args(frame, 1)?;
    let blob = reader.read_data()?;
    Ok(Some(Payload::TargetInformation(
        target_info::parse_target_information(&blob)?,
    )))
}

// ── tests ───────────────────────────────────────────────────────────
