//! Errors surfaced by dashboard operations.
//!
//! Validation failures are raised before anything is spawned. Invocation
//! failures carry the classified kind plus the raw diagnostic text so a
//! caller can show something useful even when classification gave up.
//! Parse failures never reach here.

use serde::{Deserialize, Serialize};

use crate::classify::{self, ErrorKind, PhraseTable};
use crate::invoke::{ExitInfo, InvocationError};
use crate::sanitize::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum DashError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{message}")]
    Invocation {
        kind: ErrorKind,
        message: String,

        /// Raw stderr (or stdout) from the failed command.
        detail: String,

        #[source]
        source: InvocationError,
    },
}

pub type Result<T> = core::result::Result<T, DashError>;

impl DashError {
    /// Classify a failed invocation against the call site's phrase table.
    ///
    /// `what` names the operation for the message, e.g. `stop crew gastown/joe`.
    /// Only real exits are classified; a timeout, a spawn failure or a missing
    /// working directory has no stderr worth reading and stays
    /// [`ErrorKind::Unknown`].
    pub fn from_invocation(table: &PhraseTable, source: InvocationError, what: &str) -> Self {
        let kind = match source.exit {
            ExitInfo::Status(_) => {
                let text = format!("{}\n{}", source.stderr, source.stdout);
                classify::classify(table, &text)
            }
            ExitInfo::TimedOut(_) | ExitInfo::Spawn(_) | ExitInfo::MissingWorkdir(_) => {
                ErrorKind::Unknown
            }
        };

        let message = match (kind, &source.exit) {
            (ErrorKind::Unknown, exit) => format!("{what}: {exit}"),
            (kind, _) => format!("{what}: {}", kind.summary()),
        };

        Self::Invocation {
            kind,
            message,
            detail: source.diagnostic(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::InvalidInput,
            Self::Invocation { kind, .. } => *kind,
        }
    }

    /// Caller-facing summary. No backtraces, no internal state.
    pub fn report(&self) -> ErrorReport {
        match self {
            Self::Validation(e) => ErrorReport {
                kind: ErrorKind::InvalidInput,
                message: e.to_string(),
                detail: None,
            },
            Self::Invocation {
                kind,
                message,
                detail,
                ..
            } => ErrorReport {
                kind: *kind,
                message: message.clone(),
                detail: Some(detail.clone()).filter(|d| !d.is_empty()),
            },
        }
    }
}

/// The serializable form of a [`DashError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
