//! Blobs carried by agent-initiated events: exceptions, module loads and
//! process start.

use navi_core::Address;
use serde::Serialize;

use crate::error::PayloadError;
use crate::xml::Element;

/// An exception raised in the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionEvent {
    pub thread_id: u64,
    pub address: Address,
    pub code: u64,
    pub name: String,
}

/// A module mapped into the target process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDescriptor {
    pub name: String,
    pub path: String,
    pub base_address: Address,
    pub size: u64,
}

/// A module load together with the thread that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleLoadedEvent {
    pub module: ModuleDescriptor,
    pub thread_id: u64,
}

/// Run state of a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ThreadState {
    Running,
    Suspended,
}

impl ThreadState {
    /// Maps the wire value (0 running, 1 suspended).
    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Running),
            1 => Some(Self::Suspended),
            _ => None,
        }
    }
}

/// The executable module and initial thread of a freshly started process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessStartEvent {
    pub module: ModuleDescriptor,
    pub thread_id: u64,
    pub thread_state: ThreadState,
}

/// Decodes an `<exception_raised>` blob.
pub fn parse_exception(blob: &[u8]) -> Result<ExceptionEvent, PayloadError> {
    let root = expect_root(Element::parse_bytes(blob)?, "exception_raised")?;
    Ok(ExceptionEvent {
        thread_id: root.number_attr("threadId")?,
        address: Address(root.number_attr("address")?),
        code: root.number_attr("exceptionCode")?,
        name: root.required_attr("exceptionName")?.to_string(),
    })
}

/// Decodes a `<module>` blob sent on module load.
pub fn parse_module_loaded(blob: &[u8]) -> Result<ModuleLoadedEvent, PayloadError> {
    let root = expect_root(Element::parse_bytes(blob)?, "module")?;
    Ok(ModuleLoadedEvent {
        module: module_descriptor(&root)?,
        thread_id: root.number_attr("threadid")?,
    })
}

/// Decodes a `<module>` blob sent on module unload.
pub fn parse_module_unloaded(blob: &[u8]) -> Result<ModuleDescriptor, PayloadError> {
    let root = expect_root(Element::parse_bytes(blob)?, "module")?;
    module_descriptor(&root)
}

/// Decodes a `<processStart>` blob.
pub fn parse_process_start(blob: &[u8]) -> Result<ProcessStartEvent, PayloadError> {
    let root = expect_root(Element::parse_bytes(blob)?, "processStart")?;
    let module = module_descriptor(root.required_child("module")?)?;
    let thread = root.required_child("thread")?;
    let raw_state: u32 = thread.number_attr("threadState")?;
    let thread_state = ThreadState::from_wire(raw_state).ok_or_else(|| PayloadError::InvalidValue {
        field: "threadState",
        value: raw_state.to_string(),
    })?;
    Ok(ProcessStartEvent {
        module,
        thread_id: thread.number_attr("threadId")?,
        thread_state,
    })
}

fn module_descriptor(element: &Element) -> Result<ModuleDescriptor, PayloadError> {
    Ok(ModuleDescriptor {
        name: element.required_attr("name")?.to_string(),
        path: element.required_attr("path")?.to_string(),
        base_address: Address(element.number_attr("address")?),
        size: element.number_attr("size")?,
    })
}

fn expect_root(root: Element, name: &'static str) -> Result<Element, PayloadError> {
    if root.name == name {
        Ok(root)
    } else {
        Err(PayloadError::MissingElement(name))
    }
}
