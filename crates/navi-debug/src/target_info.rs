//! Target description sent by the agent right after a connection is made.

use serde::Serialize;

use crate::error::PayloadError;
use crate::xml::Element;

/// Capabilities, register layout and address width of a debug target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetInformation {
    /// Address width in bits.
    pub address_size: u32,
    /// Registers the target exposes.
    pub registers: Vec<RegisterDescription>,
    /// What the agent can do.
    pub options: DebuggerOptions,
}

/// One register the target exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterDescription {
    /// Register name.
    pub name: String,
    /// Size in bytes.
    pub size: u32,
    /// The register can be written with a set-register request.
    pub editable: bool,
}

/// Agent capability flags. Options the agent leaves out are off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DebuggerOptions {
    pub can_attach: bool,
    pub can_detach: bool,
    pub can_terminate: bool,
    pub can_memmap: bool,
    pub can_multithread: bool,
    pub can_validate_memory: bool,
    pub can_software_breakpoints: bool,
    pub can_halt: bool,
    pub can_halt_before_communicating: bool,
    pub has_stack: bool,
    pub can_break_on_module_load: bool,
    pub can_break_on_module_unload: bool,
    pub can_trace_count: bool,
    /// Hardware breakpoint slots; `None` when the agent does not say.
    pub breakpoint_count: Option<u32>,
    pub page_size: u32,
    /// Exceptions the agent knows how to handle.
    pub exceptions: Vec<DebuggerException>,
}

/// An exception the agent reports, with its default handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebuggerException {
    pub name: String,
    pub code: u64,
    pub action: ExceptionHandlingAction,
}

/// What the agent does when the exception is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExceptionHandlingAction {
    Continue,
    Halt,
    Log,
}

impl ExceptionHandlingAction {
    /// Maps the wire value (0 continue, 1 halt, 2 log).
    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Continue),
            1 => Some(Self::Halt),
            2 => Some(Self::Log),
            _ => None,
        }
    }
}

/// Decodes an `<info>` blob.
pub fn parse_target_information(blob: &[u8]) -> Result<TargetInformation, PayloadError> {
    let root = Element::parse_bytes(blob)?;

    let mut address_size = None;
    let mut registers = None;
    let mut options = None;

    for child in &root.children {
        match child.name.as_str() {
            "registers" => registers = Some(parse_registers(child)?),
            "size" => {
                let size = child.text.parse().map_err(|_| PayloadError::InvalidValue {
                    field: "size",
                    value: child.text.clone(),
                })?;
                address_size = Some(size);
            }
            "options" => options = Some(parse_options(child)?),
            _ => {
                return Err(PayloadError::UnexpectedElement {
                    parent: root.name.clone(),
                    found: child.name.clone(),
                })
            }
        }
    }

    Ok(TargetInformation {
        address_size: address_size.ok_or(PayloadError::MissingElement("size"))?,
        registers: registers.ok_or(PayloadError::MissingElement("registers"))?,
        options: options.ok_or(PayloadError::MissingElement("options"))?,
    })
}

fn parse_registers(element: &Element) -> Result<Vec<RegisterDescription>, PayloadError> {
    element
        .children
        .iter()
        .map(|register| {
            Ok(RegisterDescription {
                name: register.required_attr("name")?.to_string(),
                size: register.number_attr("size")?,
                editable: register.bool_attr("editable")?,
            })
        })
        .collect()
}

fn parse_options(element: &Element) -> Result<DebuggerOptions, PayloadError> {
    let mut options = DebuggerOptions::default();

    for option in &element.children {
        let name = option.required_attr("name")?;
        // Option names are matched without regard to case.
        match name.to_ascii_lowercase().as_str() {
            "attach" => options.can_attach = option.bool_attr("value")?,
            "detach" => options.can_detach = option.bool_attr("value")?,
            "terminate" => options.can_terminate = option.bool_attr("value")?,
            "memmap" => options.can_memmap = option.bool_attr("value")?,
            "multithread" => options.can_multithread = option.bool_attr("value")?,
            "validmemory" => options.can_validate_memory = option.bool_attr("value")?,
            "softwarebreakpoints" => options.can_software_breakpoints = option.bool_attr("value")?,
            "halt" => options.can_halt = option.bool_attr("value")?,
            "haltbeforecommunicating" => {
                options.can_halt_before_communicating = option.bool_attr("value")?
            }
            "hasstack" => options.has_stack = option.bool_attr("value")?,
            "canbreakonmoduleload" => options.can_break_on_module_load = option.bool_attr("value")?,
            "canbreakonmoduleunload" => {
                options.can_break_on_module_unload = option.bool_attr("value")?
            }
            "cantracecount" => options.can_trace_count = option.bool_attr("value")?,
            "breakpointcount" => options.breakpoint_count = Some(option.number_attr("value")?),
            "pagesize" => options.page_size = option.number_attr("value")?,
            "exception" => options.exceptions.push(parse_exception(option)?),
            _ => return Err(PayloadError::UnknownOption(name.to_string())),
        }
    }
    Ok(options)
}

fn parse_exception(option: &Element) -> Result<DebuggerException, PayloadError> {
    let raw_action: u32 = option.number_attr("handlingAction")?;
    let action =
        ExceptionHandlingAction::from_wire(raw_action).ok_or_else(|| PayloadError::InvalidValue {
            field: "handlingAction",
            value: raw_action.to_string(),
        })?;
    Ok(DebuggerException {
        name: option.required_attr("exceptionName")?.to_string(),
        code: option.number_attr("exceptionCode")?,
        action,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIN32_INFO: &str = r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<info>
  <options>
    <option name="attach" value="true"/>
    <option name="detach" value="true"/>
    <option name="terminate" value="true"/>
    <option name="memmap" value="true"/>
    <option name="multithread" value="true"/>
    <option name="validmemory" value="true"/>
    <option name="softwareBreakpoints" value="true"/>
    <option name="halt" value="true"/>
    <option name="haltBeforeCommunicating" value="false"/>
    <option name="hasStack" value="true"/>
    <option name="pageSize" value="4096"/>
    <option name="canBreakOnModuleLoad" value="true"/>
    <option name="canBreakOnModuleUnload" value="false"/>
    <option name="canTraceCount" value="true"/>
    <option name="exception" exceptionName="Access violation" exceptionCode="3221225477" handlingAction="1"/>
    <option name="exception" exceptionName="Breakpoint" exceptionCode="2147483651" handlingAction="0"/>
  </options>
  <registers>
    <register name="EAX" size="4" editable="true"/>
    <register name="EFLAGS" size="4" editable="false"/>
  </registers>
  <size>32</size>
</info>"#;

    #[test]
    fn decodes_full_description() {
        let info = parse_target_information(WIN32_INFO.as_bytes()).unwrap();
        assert_eq!(info.address_size, 32);
        assert_eq!(info.registers.len(), 2);
        assert!(info.registers[0].editable);
        assert!(!info.registers[1].editable);

        let options = &info.options;
        assert!(options.can_attach && options.can_memmap && options.has_stack);
        assert!(!options.can_halt_before_communicating);
        assert!(!options.can_break_on_module_unload);
        assert_eq!(options.page_size, 4096);
        assert_eq!(options.breakpoint_count, None);
        assert_eq!(options.exceptions.len(), 2);
        assert_eq!(options.exceptions[0].code, 0xC000_0005);
        assert_eq!(options.exceptions[0].action, ExceptionHandlingAction::Halt);
        assert_eq!(options.exceptions[1].action, ExceptionHandlingAction::Continue);
    }

    #[test]
    fn option_names_ignore_case() {
        let blob = r#"<info><options><option name="CANBREAKONMODULEUNLOAD" value="1"/><option name="BreakpointCount" value="4"/></options><registers/><size>64</size></info>"#;
        let info = parse_target_information(blob.as_bytes()).unwrap();
        assert!(info.options.can_break_on_module_unload);
        assert_eq!(info.options.breakpoint_count, Some(4));
    }

    #[test]
    fn unknown_option_is_rejected() {
        let blob = r#"<info><options><option name="teleport" value="true"/></options><registers/><size>32</size></info>"#;
        let err = parse_target_information(blob.as_bytes()).unwrap_err();
        assert_eq!(err, PayloadError::UnknownOption("teleport".into()));
    }

    #[test]
    fn unknown_section_is_rejected() {
        let blob = r#"<info><options/><registers/><size>32</size><extras/></info>"#;
        let err = parse_target_information(blob.as_bytes()).unwrap_err();
        assert!(matches!(err, PayloadError::UnexpectedElement { .. }), "got: {err}");
    }

    #[test]
    fn missing_sections_are_rejected() {
        let no_size = r#"<info><options/><registers/></info>"#;
        assert_eq!(
            parse_target_information(no_size.as_bytes()).unwrap_err(),
            PayloadError::MissingElement("size")
        );
        let no_registers = r#"<info><options/><size>32</size></info>"#;
        assert_eq!(
            parse_target_information(no_registers.as_bytes()).unwrap_err(),
            PayloadError::MissingElement("registers")
        );
        let no_options = r#"<info><registers/><size>32</size></info>"#;
        assert_eq!(
            parse_target_information(no_options.as_bytes()).unwrap_err(),
            PayloadError::MissingElement("options")
        );
    }

    #[test]
    fn bad_handling_action_is_rejected() {
        let blob = r#"<info><options><option name="exception" exceptionName="x" exceptionCode="1" handlingAction="7"/></options><registers/><size>32</size></info>"#;
        let err = parse_target_information(blob.as_bytes()).unwrap_err();
        assert!(
            matches!(err, PayloadError::InvalidValue { field: "handlingAction", .. }),
            "got: {err}"
        );
    }

    #[test]
    fn non_numeric_size_is_rejected() {
        let blob = r#"<info><options/><registers/><size>wide</size></info>"#;
        assert!(parse_target_information(blob.as_bytes()).is_err());
    }
}
