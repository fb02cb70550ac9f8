//! Workspace-bound agents: crew and polecats.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which kind of workspace a member lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MemberKind {
    Crew,
    Polecat,
}

impl MemberKind {
    /// The address segment for this kind: `crew` or `polecats`.
    pub fn segment(self) -> &'static str {
        match self {
            Self::Crew => "crew",
            Self::Polecat => "polecats",
        }
    }
}

/// Working-tree cleanliness of a member's workspace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkingTree {
    Clean,
    Dirty,

    /// The tool did not say.
    #[default]
    Unknown,
}

impl WorkingTree {
    /// Read the tool's wording: `clean`, `dirty`, `modified`, `uncommitted`...
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        if label.is_empty() {
            Self::Unknown
        } else if label.starts_with("clean") || label == "ok" {
            Self::Clean
        } else if ["dirty", "modified", "uncommitted", "unpushed", "changes"]
            .iter()
            .any(|w| label.contains(w))
        {
            Self::Dirty
        } else {
            Self::Unknown
        }
    }
}

/// A crew member or polecat snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub name: String,
    pub rig: String,
    pub kind: MemberKind,

    /// Workspace directory. Empty when the tool didn't print one.
    pub path: PathBuf,

    pub branch: Option<String>,
    pub tree: WorkingTree,
    pub running: bool,

    /// Messages waiting in the workspace's mailbox directory.
    pub mail_count: u32,
}

impl Member {
    /// The member's mail address, e.g. `gastown/crew/joe`.
    pub fn address(&self) -> String {
        format!("{}/{}/{}", self.rig, self.kind.segment(), self.name)
    }
}
