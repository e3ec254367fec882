//! Anchored field grammars for notification lines.
//!
//! A grammar is the table name followed by whitespace-separated fields.
//! Fields are named regex groups; the `op` group, when present, holds the
//! row operation.

use std::str::FromStr;

use regex::{Captures, Regex};

use crate::error::NotifyError;
use crate::table::{Operation, TableName};

/// Integer field.
pub const INT: &str = r"\d+";
/// The literal absent-value token.
pub const NULL: &str = "null";

/// One compiled notification grammar.
#[derive(Debug, Clone)]
pub struct Grammar {
    table: TableName,
    regex: Regex,
}

impl Grammar {
    /// Compiles `^<table>\s<body>$`.
    pub fn new(table: TableName, body: &str) -> Result<Self, NotifyError> {
        let pattern = format!(r"(?s)^{}\s{}$", regex::escape(table.as_str()), body);
        let regex = Regex::new(&pattern).map_err(|e| NotifyError::InvalidPattern {
            table: table.as_str(),
            detail: e.to_string(),
        })?;
        Ok(Self { table, regex })
    }

    /// The table this grammar belongs to.
    pub fn table(&self) -> TableName {
        self.table
    }

    /// Returns `true` if the whole line fits the grammar.
    pub fn matches(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }

    /// Matches a line that was routed here by its table name. A mismatch
    /// is structural corruption.
    pub fn fields<'l>(&self, line: &'l str) -> Result<Fields<'l>, NotifyError> {
        let captures = self.regex.captures(line).ok_or_else(|| self.malformed(line))?;
        Ok(Fields {
            table: self.table,
            line,
            captures,
        })
    }

    fn malformed(&self, line: &str) -> NotifyError {
        NotifyError::Malformed {
            table: self.table.as_str(),
            line: line.to_string(),
        }
    }
}

/// Named groups of one matched line.
#[derive(Debug)]
pub struct Fields<'l> {
    table: TableName,
    line: &'l str,
    captures: Captures<'l>,
}

impl<'l> Fields<'l> {
    /// The `op` group.
    pub fn operation(&self) -> Result<Operation, NotifyError> {
        self.captures
            .name("op")
            .and_then(|m| Operation::from_token(m.as_str()))
            .ok_or_else(|| self.malformed())
    }

    /// A required numeric field. Values that overflow the target type are
    /// malformed.
    pub fn get<T: FromStr>(&self, name: &str) -> Result<T, NotifyError> {
        self.raw(name)
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| self.malformed())
    }

    /// A field that may be missing or the literal `null`.
    pub fn optional<T: FromStr>(&self, name: &str) -> Result<Option<T>, NotifyError> {
        match self.raw(name) {
            None | Some(NULL) => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| self.malformed()),
        }
    }

    /// Free text, if the group matched.
    pub fn text(&self, name: &str) -> Option<&'l str> {
        self.raw(name)
    }

    fn raw(&self, name: &str) -> Option<&'l str> {
        self.captures.name(name).map(|m| m.as_str())
    }

    fn malformed(&self) -> NotifyError {
        NotifyError::Malformed {
            table: self.table.as_str(),
            line: self.line.to_string(),
        }
    }
}

/// `(?P<name>\d+)`
pub fn int(name: &str) -> String {
    format!(r"(?P<{name}>{INT})")
}

/// `(?P<name>null|\d+)`
pub fn nullable(name: &str) -> String {
    format!(r"(?P<{name}>{NULL}|{INT})")
}

/// `(?P<op>a|b|…)`
pub fn ops(allowed: &[Operation]) -> String {
    let alternatives: Vec<String> = allowed.iter().map(|op| op.to_string()).collect();
    format!("(?P<op>{})", alternatives.join("|"))
}

/// Joins field patterns with single whitespace separators.
pub fn seq(parts: &[String]) -> String {
    parts.join(r"\s")
}

/// Every operation.
pub const ANY_OP: &[Operation] = &[Operation::Insert, Operation::Update, Operation::Delete];

// ── tests ───────────────────────────────────────────────────────────
