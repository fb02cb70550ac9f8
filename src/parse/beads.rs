//! `bd list --json`: issues from the beads tracker.

use serde::Deserialize;
use serde_json::Value;

use super::{Parsed, json};

const COMMAND: &str = "bd list";

/// JSON shape of one `bd list --json` entry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WireIssue {
    pub id: Option<String>,
    pub title: Option<String>,
    pub status: Option<String>,

    /// Numeric level or `P1`-style label.
    pub priority: Option<Value>,

    #[serde(alias = "type")]
    pub issue_type: Option<String>,

    #[serde(alias = "owner")]
    pub assignee: Option<String>,

    pub labels: Vec<String>,

    #[serde(alias = "updatedAt", alias = "updated")]
    pub updated_at: Option<String>,
}

pub fn parse(text: &str) -> Parsed<WireIssue> {
    json::parse_list(COMMAND, text, &["issues"])
}
