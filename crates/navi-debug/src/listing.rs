//! Process and file listings used while choosing a debug target.

use serde::Serialize;

use crate::error::PayloadError;
use crate::xml::Element;

/// A process the agent could attach to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessDescription {
    pub pid: u32,
    pub name: String,
}

/// Contents of one directory on the agent's machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileListing {
    /// The directory that was listed.
    pub current_directory: String,
    pub drives: Vec<String>,
    pub directories: Vec<String>,
    pub files: Vec<String>,
}

/// Decodes a `<Processes>` blob.
pub fn parse_process_list(blob: &[u8]) -> Result<Vec<ProcessDescription>, PayloadError> {
    let root = Element::parse_bytes(blob)?;
    if root.name != "Processes" {
        return Err(PayloadError::MissingElement("Processes"));
    }
    root.children
        .iter()
        .map(|process| {
            Ok(ProcessDescription {
                pid: process.number_attr("pid")?,
                name: process.required_attr("name")?.to_string(),
            })
        })
        .collect()
}

/// Decodes a `<FileSystem>` blob.
pub fn parse_file_listing(blob: &[u8]) -> Result<FileListing, PayloadError> {
    let root = Element::parse_bytes(blob)?;
    if root.name != "FileSystem" {
        return Err(PayloadError::MissingElement("FileSystem"));
    }

    let mut listing = FileListing::default();
    for child in &root.children {
        match child.name.as_str() {
            "Directory" => listing.current_directory = child.required_attr("name")?.to_string(),
            "Drives" => listing.drives = names(child, "Drive")?,
            "Directories" => listing.directories = names(child, "Directory")?,
            "Files" => listing.files = names(child, "File")?,
            _ => {
                return Err(PayloadError::UnexpectedElement {
                    parent: root.name.clone(),
                    found: child.name.clone(),
                })
            }
        }
    }
    Ok(listing)
}

fn names(group: &Element, entry: &'static str) -> Result<Vec<String>, PayloadError> {
    group
        .children_named(entry)
        .map(|e| e.required_attr("name").map(str::to_string))
        .collect()
}
