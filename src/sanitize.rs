//! Argument validation for everything that reaches a `gt` or `bd` command line.
//!
//! Commands are spawned with an argument vector, never through a shell, but
//! user-supplied tokens still compose into addresses and filesystem paths on
//! the other side. Identifiers are checked fail-closed: a token with any
//! foreign character is rejected, never silently trimmed.
//!
//! Free text (subjects, bodies, nudges) keeps its content and is only bounded
//! in length. [`shell_quote`] renders any argument for human-readable log lines.

use std::fmt;

/// Maximum subject length, in characters.
pub const SUBJECT_MAX: usize = 200;

/// Maximum nudge message length, in characters.
pub const NUDGE_MAX: usize = 1000;

/// Maximum mail body length, in characters.
pub const BODY_MAX: usize = 5000;

/// A rejected input, raised before any process is spawned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = core::result::Result<T, ValidationError>;

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Validate an identifier: rig names, member names, message and issue ids.
///
/// Only `[A-Za-z0-9_-]` is accepted.
pub fn identifier(field: &'static str, raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    if let Some(bad) = raw.chars().find(|c| !is_identifier_char(*c)) {
        return Err(ValidationError::new(
            field,
            format!("contains disallowed character {bad:?}"),
        ));
    }
    Ok(raw.to_string())
}

/// Validate a name for something the dashboard creates (e.g. a crew member).
///
/// An identifier that must also start with a letter.
pub fn name(field: &'static str, raw: &str) -> Result<String> {
    let value = identifier(field, raw)?;
    if !value.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(ValidationError::new(field, "must start with a letter"));
    }
    Ok(value)
}

/// Validate an agent address such as `mayor/` or `gastown/crew/joe`.
///
/// Each `/`-separated segment must be an identifier. A single trailing `/`
/// is allowed; empty inner segments are not.
pub fn address(field: &'static str, raw: &str) -> Result<String> {
    let trimmed = raw.strip_suffix('/').unwrap_or(raw);
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    for segment in trimmed.split('/') {
        if segment.is_empty() {
            return Err(ValidationError::new(field, "contains an empty segment"));
        }
        identifier(field, segment)?;
    }
    Ok(raw.to_string())
}

/// Free text that passed validation.
///
/// Holds the original content unchanged; argv invocation needs no escaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeText(String);

impl FreeText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The text as a single-quoted shell token.
    pub fn shell_quoted(&self) -> String {
        shell_quote(&self.0)
    }
}

impl fmt::Display for FreeText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate free text: non-blank and at most `max` characters.
pub fn free_text(field: &'static str, raw: &str, max: usize) -> Result<FreeText> {
    if raw.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    let len = raw.chars().count();
    if len > max {
        return Err(ValidationError::new(
            field,
            format!("is {len} characters, limit is {max}"),
        ));
    }
    Ok(FreeText(raw.to_string()))
}

/// Escape single quotes for interpolation inside a single-quoted shell string.
///
/// `it's` becomes `it'\''s`.
pub fn escape_single_quotes(raw: &str) -> String {
    raw.replace('\'', r"'\''")
}

/// Render one argument as a shell token.
///
/// Plain identifier-like tokens pass through; everything else is wrapped in
/// single quotes with embedded quotes escaped.
pub fn shell_quote(raw: &str) -> String {
    let plain = !raw.is_empty()
        && raw
            .chars()
            .all(|c| is_identifier_char(c) || matches!(c, '/' | '.' | ':' | '=' | ','));
    if plain {
        raw.to_string()
    } else {
        format!("'{}'", escape_single_quotes(raw))
    }
}

/// Render a program and its arguments as one human-readable command line.
pub fn command_line(program: &str, args: &[String]) -> String {
    let mut line = shell_quote(program);
    for arg in args {
        line.push(' ');
        line.push_str(&shell_quote(arg));
    }
    line
}
