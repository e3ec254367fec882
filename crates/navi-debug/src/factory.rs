//! Maps wire message codes to reply parsers.

use std::collections::HashMap;

use crate::error::DebugError;
use crate::parser::ReplyParser;
use crate::table::{ReplyRow, REPLY_TABLE};

/// One parser per message kind, looked up by either of its codes.
///
/// Built once per connection; lookup does no parsing work.
#[derive(Debug)]
pub struct ParserFactory {
    parsers: Vec<ReplyParser>,
    by_code: HashMap<u32, usize>,
}

impl ParserFactory {
    /// Builds parsers for every row of the reply table.
    pub fn new() -> Self {
        Self::from_rows(REPLY_TABLE)
    }

    /// Builds parsers for an explicit set of rows.
    pub fn from_rows(rows: &'static [ReplyRow]) -> Self {
        let mut parsers = Vec::with_capacity(rows.len());
        let mut by_code = HashMap::with_capacity(rows.len() * 2);
        for (index, row) in rows.iter().enumerate() {
            parsers.push(ReplyParser::new(row));
            by_code.insert(row.success.code(), index);
            if let Some(error) = row.error.command() {
                by_code.insert(error.code(), index);
            }
        }
        Self { parsers, by_code }
    }

    /// The parser for a message code.
    pub fn get_parser(&self, code: u32) -> Result<&ReplyParser, DebugError> {
        self.by_code
            .get(&code)
            .map(|&index| &self.parsers[index])
            .ok_or(DebugError::UnknownMessage { code })
    }

    /// Number of distinct parsers.
    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    /// Returns `true` if no parser is registered.
    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

impl Default for ParserFactory {
    fn default() -> Self {
        Self::new()
    }
}

// ── tests ───────────────────────────────────────────────────────────
