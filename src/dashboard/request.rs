//! Request and response shapes for dashboard operations.
//!
//! Both are plain serde types so any front end (the CLI, the stdio server)
//! can speak them as JSON.

use serde::{Deserialize, Serialize};

use crate::model::{Agent, Issue, MailMessage, Member, Rig, SendReceipt, Thread, TownStatus};

/// One dashboard operation, tagged by `action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    /// Full town snapshot.
    Status,

    /// Every agent, optionally only those in one rig.
    Agents { rig: Option<String> },

    Rigs,

    /// Start a mayor, deacon or witness. Witness needs `rig`.
    AgentStart { role: String, rig: Option<String> },

    AgentStop { role: String, rig: Option<String> },

    CrewList { rig: String },
    CrewAdd { rig: String, name: String },

    CrewRemove {
        rig: String,
        name: String,
        #[serde(default)]
        force: bool,
    },

    CrewStart { rig: String, name: String },
    CrewStop { rig: String, name: String },

    /// Type a message into a crew member's session.
    CrewNudge {
        rig: String,
        name: String,
        message: String,
    },

    PolecatList { rig: String },

    MailInbox { address: String },
    MailThreads { address: String },
    MailRead { id: String },

    MailSend {
        to: String,
        subject: String,
        body: String,
        priority: Option<String>,
        reply_to: Option<String>,
    },

    /// Messages in `address` not delivered by an earlier poll, narrowed by
    /// sender rig and member.
    MailPoll {
        address: String,
        rig: Option<String>,
        member: Option<String>,
    },

    /// Beads issues, optionally filtered by tracker status.
    Issues { status: Option<String> },
}

impl Request {
    /// The `action` tag, for logs.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Agents { .. } => "agents",
            Self::Rigs => "rigs",
            Self::AgentStart { .. } => "agentStart",
            Self::AgentStop { .. } => "agentStop",
            Self::CrewList { .. } => "crewList",
            Self::CrewAdd { .. } => "crewAdd",
            Self::CrewRemove { .. } => "crewRemove",
            Self::CrewStart { .. } => "crewStart",
            Self::CrewStop { .. } => "crewStop",
            Self::CrewNudge { .. } => "crewNudge",
            Self::PolecatList { .. } => "polecatList",
            Self::MailInbox { .. } => "mailInbox",
            Self::MailThreads { .. } => "mailThreads",
            Self::MailRead { .. } => "mailRead",
            Self::MailSend { .. } => "mailSend",
            Self::MailPoll { .. } => "mailPoll",
            Self::Issues { .. } => "issues",
        }
    }
}

/// The result of a [`Request`], tagged by `kind` with the payload in `data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum Response {
    Status(TownStatus),
    Agents(Vec<Agent>),
    Rigs(Vec<Rig>),
    Members(Vec<Member>),
    Messages(Vec<MailMessage>),

    /// `None` when the tool printed nothing readable.
    Message(Option<MailMessage>),

    Threads(Vec<Thread>),
    Sent(SendReceipt),
    Issues(Vec<Issue>),
    Done(Done),
}

/// Acknowledgement of a state-changing action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Done {
    pub action: String,

    /// What was acted on, e.g. `gastown/crew/joe`.
    pub target: String,

    /// The tool's own confirmation text, trimmed.
    pub output: String,
}

impl Done {
    pub fn new(action: &str, target: impl Into<String>, output: &str) -> Self {
        Self {
            action: action.to_string(),
            target: target.into(),
            output: output.trim().to_string(),
        }
    }
}
