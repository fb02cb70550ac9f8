//! Failure classification: map the free-text stderr of a failed `gt` call to
//! a semantic error kind.
//!
//! The external tool has no structured error protocol, so classification is a
//! case-insensitive phrase match. The same phrase means different things to
//! different commands ("not found" is a missing workspace for `crew remove`
//! but a dead session for `nudge`), so every call site owns its table.
//! Tables are never merged.

use serde::{Deserialize, Serialize};

/// What a failed invocation most likely means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// The target agent has no live session.
    NotRunning,

    /// The target is already running, or already exists.
    AlreadyRunning,

    /// The target does not exist.
    NotFound,

    /// A workspace has uncommitted or unpushed work and was left alone.
    DirtyWorkspace,

    /// The external tool rejected the arguments.
    InvalidInput,

    /// Nothing in the call site's table matched.
    Unknown,
}

impl ErrorKind {
    /// Short message for callers.
    pub fn summary(self) -> &'static str {
        match self {
            Self::NotRunning => "not running",
            Self::AlreadyRunning => "already running",
            Self::NotFound => "not found",
            Self::DirtyWorkspace => "workspace has uncommitted or unpushed work",
            Self::InvalidInput => "rejected as invalid",
            Self::Unknown => "failed",
        }
    }
}

/// One row of a phrase table: any of `phrases` maps to `kind`.
#[derive(Debug)]
pub struct Rule {
    pub phrases: &'static [&'static str],
    pub kind: ErrorKind,
}

/// The phrase table for one call site. Rules are tried in order.
#[derive(Debug)]
pub struct PhraseTable {
    pub call_site: &'static str,
    pub rules: &'static [Rule],
}

/// Classify stderr text against a call site's table.
///
/// Phrases are written lowercase; matching lowercases the input.
/// Unmatched or empty text is [`ErrorKind::Unknown`].
pub fn classify(table: &PhraseTable, text: &str) -> ErrorKind {
    let haystack = text.to_lowercase();
    let kind = table
        .rules
        .iter()
        .find(|rule| rule.phrases.iter().any(|p| haystack.contains(p)))
        .map_or(ErrorKind::Unknown, |rule| rule.kind);
    tracing::debug!(call_site = table.call_site, ?kind, "classified failure");
    kind
}

// ── Phrase tables ──

const DIRTY: &[&str] = &[
    "uncommitted",
    "unpushed",
    "dirty",
    "safety check",
    "stash",
];

pub static STATUS: PhraseTable = PhraseTable {
    call_site: "status",
    rules: &[Rule {
        phrases: &["not a town", "no town", "not in a gas town"],
        kind: ErrorKind::NotFound,
    }],
};

pub static AGENT_START: PhraseTable = PhraseTable {
    call_site: "agent start",
    rules: &[
        Rule {
            phrases: &["already running", "already exists", "session already"],
            kind: ErrorKind::AlreadyRunning,
        },
        Rule {
            phrases: &["rig not found", "unknown rig", "does not exist"],
            kind: ErrorKind::NotFound,
        },
    ],
};

pub static AGENT_STOP: PhraseTable = PhraseTable {
    call_site: "agent stop",
    rules: &[
        Rule {
            phrases: &["no session", "not running", "session not found"],
            kind: ErrorKind::NotRunning,
        },
        Rule {
            phrases: &["rig not found", "unknown rig", "does not exist"],
            kind: ErrorKind::NotFound,
        },
    ],
};

pub static CREW_ADD: PhraseTable = PhraseTable {
    call_site: "crew add",
    rules: &[
        Rule {
            phrases: &["already exists", "already running"],
            kind: ErrorKind::AlreadyRunning,
        },
        Rule {
            phrases: &["invalid name", "invalid crew name", "must start with"],
            kind: ErrorKind::InvalidInput,
        },
        Rule {
            phrases: &["rig not found", "unknown rig", "does not exist"],
            kind: ErrorKind::NotFound,
        },
    ],
};

pub static CREW_REMOVE: PhraseTable = PhraseTable {
    call_site: "crew remove",
    rules: &[
        Rule {
            phrases: DIRTY,
            kind: ErrorKind::DirtyWorkspace,
        },
        Rule {
            phrases: &["not found", "does not exist", "no such"],
            kind: ErrorKind::NotFound,
        },
        Rule {
            phrases: &["is running", "still running", "stop it first"],
            kind: ErrorKind::AlreadyRunning,
        },
    ],
};

pub static CREW_START: PhraseTable = PhraseTable {
    call_site: "crew start",
    rules: &[
        Rule {
            phrases: &["already running", "session already exists", "already exists"],
            kind: ErrorKind::AlreadyRunning,
        },
        Rule {
            phrases: &["not found", "does not exist", "no such"],
            kind: ErrorKind::NotFound,
        },
    ],
};

pub static CREW_STOP: PhraseTable = PhraseTable {
    call_site: "crew stop",
    rules: &[
        Rule {
            phrases: &["no session", "not running", "session not found"],
            kind: ErrorKind::NotRunning,
        },
        Rule {
            phrases: &["not found", "does not exist"],
            kind: ErrorKind::NotFound,
        },
    ],
};

/// For a nudge, every "missing" phrase means the session is gone.
pub static CREW_NUDGE: PhraseTable = PhraseTable {
    call_site: "crew nudge",
    rules: &[Rule {
        phrases: &["no session", "not found", "does not exist", "not running"],
        kind: ErrorKind::NotRunning,
    }],
};

pub static MAIL_SEND: PhraseTable = PhraseTable {
    call_site: "mail send",
    rules: &[
        Rule {
            phrases: &["unknown recipient", "no such address", "not found", "does not exist"],
            kind: ErrorKind::NotFound,
        },
        Rule {
            phrases: &["invalid", "required", "too long"],
            kind: ErrorKind::InvalidInput,
        },
    ],
};

pub static MAIL_READ: PhraseTable = PhraseTable {
    call_site: "mail read",
    rules: &[Rule {
        phrases: &["not found", "no such message", "does not exist"],
        kind: ErrorKind::NotFound,
    }],
};

pub static MAIL_LIST: PhraseTable = PhraseTable {
    call_site: "mail inbox",
    rules: &[Rule {
        phrases: &["unknown address", "no such mailbox", "not found"],
        kind: ErrorKind::NotFound,
    }],
};

pub static MEMBER_LIST: PhraseTable = PhraseTable {
    call_site: "member list",
    rules: &[Rule {
        phrases: &["rig not found", "unknown rig", "does not exist"],
        kind: ErrorKind::NotFound,
    }],
};

pub static BEADS_LIST: PhraseTable = PhraseTable {
    call_site: "beads list",
    rules: &[Rule {
        phrases: &["no beads database", "not initialized", "no .beads"],
        kind: ErrorKind::NotFound,
    }],
};
