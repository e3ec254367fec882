//! Register snapshot blobs attached to halts, steps and breakpoint hits.

use serde::Serialize;

use crate::error::PayloadError;
use crate::xml::Element;

/// Register values of every reported thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterSnapshot {
    /// One entry per `<Thread>`.
    pub threads: Vec<ThreadRegisters>,
}

/// Register values of one thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadRegisters {
    /// Thread id.
    pub thread_id: u64,
    /// Registers in the order the agent listed them.
    pub registers: Vec<RegisterValue>,
}

/// One register value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterValue {
    /// Register name as the agent spells it.
    pub name: String,
    /// Register contents. Vector registers can exceed 64 bits.
    pub value: u128,
    /// Memory the register points to, when the agent sampled it.
    pub memory: Vec<u8>,
    /// This register is the program counter.
    pub is_pc: bool,
    /// This register is the stack pointer.
    pub is_sp: bool,
}

impl RegisterSnapshot {
    /// Registers of a specific thread.
    pub fn thread(&self, thread_id: u64) -> Option<&ThreadRegisters> {
        self.threads.iter().find(|t| t.thread_id == thread_id)
    }
}

impl ThreadRegisters {
    /// The register flagged as program counter.
    pub fn program_counter(&self) -> Option<&RegisterValue> {
        self.registers.iter().find(|r| r.is_pc)
    }

    /// The register flagged as stack pointer.
    pub fn stack_pointer(&self) -> Option<&RegisterValue> {
        self.registers.iter().find(|r| r.is_sp)
    }
}

/// Decodes a `<Registers>` blob.
pub fn parse_registers(blob: &[u8]) -> Result<RegisterSnapshot, PayloadError> {
    let root = Element::parse_bytes(blob)?;
    if root.name != "Registers" {
        return Err(PayloadError::MissingElement("Registers"));
    }

    let mut threads = Vec::with_capacity(root.children.len());
    for thread in &root.children {
        if thread.name != "Thread" {
            return Err(PayloadError::UnexpectedElement {
                parent: root.name.clone(),
                found: thread.name.clone(),
            });
        }
        let thread_id = thread.number_attr("id")?;
        let registers = thread
            .children
            .iter()
            .map(parse_register)
            .collect::<Result<Vec<_>, _>>()?;
        threads.push(ThreadRegisters {
            thread_id,
            registers,
        });
    }
    Ok(RegisterSnapshot { threads })
}

fn parse_register(element: &Element) -> Result<RegisterValue, PayloadError> {
    if element.name != "Register" {
        return Err(PayloadError::UnexpectedElement {
            parent: "Thread".to_string(),
            found: element.name.clone(),
        });
    }
    let raw_value = element.required_attr("value")?;
    let value = parse_hex_u128(raw_value).ok_or_else(|| PayloadError::InvalidValue {
        field: "value",
        value: raw_value.to_string(),
    })?;
    let raw_memory = element.attr("memory").unwrap_or_default();
    let memory = parse_hex_bytes(raw_memory).ok_or_else(|| PayloadError::InvalidValue {
        field: "memory",
        value: raw_memory.to_string(),
    })?;

    Ok(RegisterValue {
        name: element.required_attr("name")?.to_string(),
        value,
        memory,
        is_pc: element.attr("pc") == Some("true"),
        is_sp: element.attr("sp") == Some("true"),
    })
}

fn parse_hex_u128(raw: &str) -> Option<u128> {
    let digits = raw
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    if digits.is_empty() {
        return None;
    }
    u128::from_str_radix(digits, 16).ok()
}

fn parse_hex_bytes(raw: &str) -> Option<Vec<u8>> {
    let raw = raw.trim();
    if raw.len() % 2 != 0 || !raw.is_ascii() {
        return None;
    }
    (0..raw.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&raw[i..i + 2], 16).ok())
        .collect()
}
