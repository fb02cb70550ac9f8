//! `gt crew list` and `gt polecat list`: workspace-bound agents.
//!
//! `crew list` has no JSON mode. Its text output, shared by `polecat list`:
//!
//! ```text
//! Crew workspaces in gastown:
//!
//!   ● gastown/joe
//!     /home/me/gt/gastown/crew/joe
//!     Branch: main  Git: clean
//!   ○ gastown/max (stopped)
//!     Branch: feat/x  Git: dirty
//!     Mail: 3
//! ```
//!
//! `●` marks a running session, `○` a stopped one. The header's `rig/name`
//! identifies the record.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::scan::{self, Grammar, LineKind};
use super::{Parsed, json};

const POLECAT_LIST: &str = "gt polecat list";

/// A workspace member as the tool printed it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WireMember {
    pub name: Option<String>,
    pub rig: Option<String>,

    #[serde(alias = "workdir", alias = "worktree", alias = "clone_path")]
    pub path: Option<String>,

    pub branch: Option<String>,

    /// Cleanliness label: `clean`, `dirty`, `3 uncommitted`...
    #[serde(alias = "git_status", alias = "tree")]
    pub git: Option<String>,

    pub clean: Option<bool>,

    #[serde(alias = "active", alias = "session_running")]
    pub running: Option<bool>,

    /// Session state word, e.g. `running`, `stopped`, `working`, `idle`.
    #[serde(alias = "status")]
    pub state: Option<String>,

    /// Mailbox count, when the listing shows one.
    #[serde(alias = "mail_count", alias = "unread_mail")]
    pub mail: Option<u32>,
}

/// Parse `gt polecat list --json`.
pub fn parse_json(text: &str) -> Parsed<WireMember> {
    json::parse_list(POLECAT_LIST, text, &["polecats", "members", "workers"])
}

/// Parse the text listing shared by `gt crew list` and `gt polecat list`.
pub fn parse_text(text: &str) -> Parsed<WireMember> {
    Parsed::ok(scan::scan(&MemberGrammar, text))
}

/// Whether a state word means the session is live.
pub fn state_is_running(state: &str) -> bool {
    matches!(
        state.trim().to_lowercase().as_str(),
        "running" | "active" | "working" | "idle" | "busy" | "up"
    )
}

// ── Text grammar ──

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<mark>[●○◉◯✓✗•*])\s+(?P<rig>[A-Za-z0-9_-]+)/(?:(?:crew|polecats)/)?(?P<name>[A-Za-z0-9_-]+)(?P<rest>(?:\s.*)?)$",
    )
    .expect("valid member header regex")
});

static BRANCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?i:branch):\s*(?P<branch>\S+)(?:\s+(?i:git):\s*(?P<git>\S.*?))?\s*$")
        .expect("valid branch regex")
});

static GIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?i:git):\s*(?P<git>\S.*?)\s*$").expect("valid git regex")
});

static PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<path>(?:/|~/)\S*)\s*$").expect("valid path regex")
});

static MAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?i:mail):\s*(?P<count>\d+)").expect("valid mail regex")
});

static STATE_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(running|stopped|working|idle|active|dead|busy)\b")
        .expect("valid state regex")
});

struct MemberGrammar;

struct Header {
    rig: String,
    name: String,
    running: Option<bool>,
    state: Option<String>,
}

enum Attribute {
    Branch { branch: String, git: Option<String> },
    Git(String),
    Path(String),
    Mail(u32),
}

impl Grammar for MemberGrammar {
    type Header = Header;
    type Attribute = Attribute;
    type Record = WireMember;

    fn classify(&self, line: &str) -> LineKind<Header, Attribute> {
        if let Some(caps) = HEADER.captures(line) {
            let running = match &caps["mark"] {
                "●" | "◉" | "✓" | "•" | "*" => Some(true),
                "○" | "◯" | "✗" => Some(false),
                _ => None,
            };
            let state = STATE_WORD
                .captures(&caps["rest"])
                .map(|c| c[1].to_lowercase());
            return LineKind::Header(Header {
                rig: caps["rig"].to_string(),
                name: caps["name"].to_string(),
                running,
                state,
            });
        }

        if let Some(caps) = BRANCH.captures(line) {
            return LineKind::Attribute(Attribute::Branch {
                branch: caps["branch"].to_string(),
                git: caps.name("git").map(|m| m.as_str().to_string()),
            });
        }

        if let Some(caps) = GIT.captures(line) {
            return LineKind::Attribute(Attribute::Git(caps["git"].to_string()));
        }

        if let Some(caps) = MAIL.captures(line)
            && let Ok(count) = caps["count"].parse()
        {
            return LineKind::Attribute(Attribute::Mail(count));
        }

        if let Some(caps) = PATH.captures(line) {
            return LineKind::Attribute(Attribute::Path(caps["path"].to_string()));
        }

        LineKind::Noise
    }

    fn open(&self, header: Header) -> WireMember {
        // A state word in the header outranks the glyph.
        let running = header
            .state
            .as_deref()
            .map(state_is_running)
            .or(header.running);
        WireMember {
            name: Some(header.name),
            rig: Some(header.rig),
            running,
            state: header.state,
            ..WireMember::default()
        }
    }

    fn apply(&self, record: &mut WireMember, attribute: Attribute) {
        match attribute {
            Attribute::Branch { branch, git } => {
                record.branch = Some(branch);
                if git.is_some() {
                    record.git = git;
                }
            }
            Attribute::Git(git) => record.git = Some(git),
            Attribute::Path(path) => record.path = Some(path),
            Attribute::Mail(count) => record.mail = Some(count),
        }
    }

    fn is_identified(&self, record: &WireMember) -> bool {
        record.name.as_deref().is_some_and(|n| !n.is_empty())
    }
}
