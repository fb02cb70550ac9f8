//! Output parsers: one per external command shape.
//!
//! JSON mode is preferred wherever the tool offers it; text mode is a
//! finite-state line scan for commands without one. Either way a parser never
//! fails past its boundary: it returns the best partial result it could get,
//! and notes why when it got nothing.

pub mod beads;
pub mod json;
pub mod mail;
pub mod members;
pub mod scan;
pub mod status;

/// Why a parser produced nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// The command whose output was being parsed, e.g. `gt status`.
    pub command: &'static str,
    pub reason: String,
}

/// Parser output: records, or nothing plus a failure note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub failure: Option<ParseFailure>,
}

impl<T> Parsed<T> {
    pub fn ok(records: Vec<T>) -> Self {
        Self {
            records,
            failure: None,
        }
    }

    /// An empty result. The failure is logged here so callers don't have to.
    pub fn failed(command: &'static str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::warn!(command, %reason, "unparseable output, continuing with no records");
        Self {
            records: Vec::new(),
            failure: Some(ParseFailure { command, reason }),
        }
    }

    pub fn into_records(self) -> Vec<T> {
        self.records
    }

    /// The first record, for commands that print a single object.
    pub fn into_first(self) -> Option<T> {
        self.records.into_iter().next()
    }
}
