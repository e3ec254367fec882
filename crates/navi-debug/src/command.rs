//! Wire message type codes shared with the debug agent.
//!
//! The set is closed and versioned together with the agent: adding a
//! message kind means adding its codes here and a row to the reply table.

use std::fmt;

use serde::Serialize;

/// Name reported for codes outside the known set.
pub const INVALID_PACKET_NAME: &str = "ERROR_INVALID_PACKET";

macro_rules! command_types {
    ($($variant:ident = $code:literal => $name:literal,)+) => {
        /// A debug protocol message type.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        #[repr(u32)]
        pub enum CommandType {
            $(
                #[doc = $name]
                $variant = $code,
            )+
        }

        impl CommandType {
            /// Every known message type, in code order.
            pub const ALL: &'static [CommandType] = &[$(CommandType::$variant,)+];

            /// Looks up a message type by its wire code.
            pub fn from_code(code: u32) -> Option<Self> {
                match code {
                    $($code => Some(CommandType::$variant),)+
                    _ => None,
                }
            }

            /// The protocol name of this message type.
            pub fn name(self) -> &'static str {
                match self {
                    $(CommandType::$variant => $name,)+
                }
            }
        }
    };
}

command_types! {
    CmdSetBreakpoint = 1 => "CMD_SETBP",
    CmdSetEchoBreakpoint = 2 => "CMD_SETBPE",
    CmdSetStepBreakpoint = 3 => "CMD_SETBPS",
    CmdRemoveBreakpoint = 4 => "CMD_REMBP",
    CmdRemoveEchoBreakpoint = 5 => "CMD_REMBPE",
    CmdRemoveStepBreakpoint = 6 => "CMD_REMBPS",
    CmdReadMemory = 7 => "CMD_READ_MEMORY",
    CmdRegisters = 8 => "CMD_REGISTERS",
    CmdResume = 9 => "CMD_RESUME",
    CmdDetach = 10 => "CMD_DETACH",
    RespBreakpointHit = 14 => "RESP_BP_HIT",
    RespEchoBreakpointHit = 15 => "RESP_BPE_HIT",
    RespStepBreakpointHit = 16 => "RESP_BPS_HIT",
    RespReadMemorySuccess = 17 => "RESP_READ_MEMORY_SUCCESS",
    RespRegistersSuccess = 18 => "RESP_REGISTERS_SUCCESS",
    RespResumeSuccess = 19 => "RESP_RESUME_SUCCESS",
    RespAttachError = 23 => "RESP_ATTACH_ERROR",
    RespAttachSuccess = 24 => "RESP_ATTACH_SUCCESS",
    RespBreakpointSetSuccess = 25 => "RESP_BP_SET_SUCCESS",
    RespBreakpointSetError = 26 => "RESP_BP_SET_ERROR",
    RespResumeError = 27 => "RESP_RESUME_ERROR",
    RespEchoBreakpointSetSuccess = 28 => "RESP_BPE_SET_SUCCESS",
    RespEchoBreakpointSetError = 29 => "RESP_BPE_SET_ERROR",
    RespBreakpointRemoveSuccess = 30 => "RESP_BP_REM_SUCCESS",
    RespBreakpointRemoveError = 31 => "RESP_BP_REM_ERROR",
    RespDetachSuccess = 32 => "RESP_DETACH_SUCCESS",
    RespDetachError = 33 => "RESP_DETACH_ERROR",
    RespRegistersError = 34 => "RESP_REGISTERS_ERROR",
    RespReadMemoryError = 35 => "RESP_READ_MEMORY_ERROR",
    CmdTerminate = 36 => "CMD_TERMINATE",
    RespTerminateSuccess = 37 => "RESP_TERMINATE_SUCCESS",
    RespTerminateError = 38 => "RESP_TERMINATE_ERROR",
    RespEchoBreakpointRemoveSuccess = 39 => "RESP_BPE_REM_SUCCESS",
    RespEchoBreakpointRemoveError = 40 => "RESP_BPE_REM_ERROR",
    RespStepBreakpointSetSuccess = 41 => "RESP_BPS_SET_SUCCESS",
    RespStepBreakpointSetError = 42 => "RESP_BPS_SET_ERROR",
    RespStepBreakpointRemoveSuccess = 43 => "RESP_BPS_REM_SUCCESS",
    RespStepBreakpointRemoveError = 44 => "RESP_BPS_REM_ERROR",
    RespInfo = 45 => "RESP_INFO",
    CmdSetRegister = 46 => "CMD_SET_REGISTER",
    RespSetRegisterSuccess = 47 => "RESP_SET_REGISTER_SUCCESS",
    RespSetRegisterError = 48 => "RESP_SET_REGISTER_ERROR",
    CmdSingleStep = 49 => "CMD_SINGLE_STEP",
    RespSingleStepSuccess = 50 => "RESP_SINGLE_STEP_SUCCESS",
    RespSingleStepError = 51 => "RESP_SINGLE_STEP_ERROR",
    CmdValidateMemory = 52 => "CMD_VALID_MEMORY",
    RespValidateMemorySuccess = 53 => "RESP_VALID_MEMORY_SUCCESS",
    RespValidateMemoryError = 54 => "RESP_VALID_MEMORY_ERROR",
    RespThreadCreated = 55 => "RESP_THREAD_CREATED",
    RespThreadClosed = 56 => "RESP_THREAD_CLOSED",
    CmdSearch = 57 => "CMD_SEARCH",
    RespSearchSuccess = 58 => "RESP_SEARCH_SUCCESS",
    RespSearchError = 59 => "RESP_SEARCH_ERROR",
    CmdMemoryMap = 60 => "CMD_MEMMAP",
    RespMemoryMapSuccess = 61 => "RESP_MEMMAP_SUCCESS",
    RespMemoryMapError = 62 => "RESP_MEMMAP_ERROR",
    RespProcessClosed = 63 => "RESP_PROCESS_CLOSED",
    RespExceptionOccurred = 64 => "RESP_EXCEPTION_OCCURED",
    CmdHalt = 65 => "CMD_HALT",
    RespHaltSuccess = 66 => "RESP_HALTED_SUCCESS",
    RespHaltError = 67 => "RESP_HALTED_ERROR",
    RespRequestTarget = 68 => "RESP_REQUEST_TARGET",
    CmdListProcesses = 69 => "CMD_LIST_PROCESSES",
    RespListProcessesSuccess = 70 => "RESP_LIST_PROCESSES_SUCCESS",
    CmdCancelTargetSelection = 71 => "CMD_CANCEL_TARGET_SELECTION",
    RespCancelTargetSelectionSuccess = 72 => "RESP_CANCEL_TARGET_SELECTION_SUCCESS",
    CmdSelectProcess = 73 => "CMD_SELECT_PROCESS",
    RespSelectProcessSuccess = 74 => "RESP_SELECT_PROCESS_SUCCESS",
    RespSelectProcessError = 75 => "RESP_SELECT_PROCESS_ERROR",
    CmdListFiles = 76 => "CMD_LIST_FILES",
    CmdListFilesPath = 77 => "CMD_LIST_FILES_PATH",
    RespListFilesSuccess = 78 => "RESP_LIST_FILES_SUCCESS",
    RespListFilesError = 79 => "RESP_LIST_FILES_ERROR",
    CmdSelectFile = 80 => "CMD_SELECT_FILE",
    RespSelectFileSuccess = 81 => "RESP_SELECT_FILE_SUCCESS",
    RespSelectFileError = 82 => "RESP_SELECT_FILE_ERROR",
    RespModuleLoaded = 83 => "RESP_MODULE_LOADED",
    RespModuleUnloaded = 84 => "RESP_MODULE_UNLOADED",
    CmdResumeThread = 85 => "CMD_RESUME_THREAD",
    RespResumeThreadSuccess = 86 => "RESP_RESUME_THREAD_SUCCESS",
    RespResumeThreadError = 87 => "RESP_RESUME_THREAD_ERROR",
    CmdSuspendThread = 88 => "CMD_SUSPEND_THREAD",
    RespSuspendThreadSuccess = 89 => "RESP_SUSPEND_THREAD_SUCCESS",
    RespSuspendThreadError = 90 => "RESP_SUSPEND_THREAD_ERROR",
    CmdSetActiveThread = 91 => "CMD_SET_ACTIVE_THREAD",
    RespSetActiveThreadSuccess = 92 => "RESP_SET_ACTIVE_THREAD_SUCCESS",
    RespSetActiveThreadError = 93 => "RESP_SET_ACTIVE_THREAD_ERROR",
    CmdSetBreakpointCondition = 94 => "CMD_SET_BREAKPOINT_CONDITION",
    RespSetBreakpointConditionSuccess = 95 => "RESP_SET_BREAKPOINT_CONDITION_SUCCESS",
    RespSetBreakpointConditionError = 96 => "RESP_SET_BREAKPOINT_CONDITION_ERROR",
    CmdWriteMemory = 97 => "CMD_WRITE_MEMORY",
    RespWriteMemorySuccess = 98 => "RESP_WRITE_MEMORY_SUCCESS",
    RespWriteMemoryError = 99 => "RESP_WRITE_MEMORY_ERROR",
    CmdSetExceptions = 100 => "CMD_SET_EXCEPTIONS_OPTIONS",
    RespSetExceptionsSuccess = 101 => "RESP_SET_EXCEPTIONS_SUCCESS",
    RespSetExceptionsError = 102 => "RESP_SET_EXCEPTIONS_ERROR",
    CmdSetDebuggerEventSettings = 103 => "CMD_SET_DEBUGGER_EVENT_SETTINGS",
    RespSetDebuggerEventSettingsSuccess = 104 => "RESP_SET_DEBUGGER_EVENT_SETTINGS_SUCCESS",
    RespSetDebuggerEventSettingsError = 105 => "RESP_SET_DEBUGGER_EVENT_SETTINGS_ERROR",
    RespQueryDebuggerEventSettings = 106 => "RESP_QUERY_DEBUGGER_EVENT_SETTINGS",
    RespProcessStart = 107 => "RESP_PROCESS_START",
}

impl CommandType {
    /// The wire code of this message type.
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns the protocol name for any wire code, known or not.
pub fn message_name(code: u32) -> &'static str {
    CommandType::from_code(code)
        .map(CommandType::name)
        .unwrap_or(INVALID_PACKET_NAME)
}
