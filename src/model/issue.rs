//! Beads: issues in the external tracker, observed read-only.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// One issue from `bd list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub title: String,

    /// Tracker status, verbatim (`open`, `in_progress`, `closed`...).
    pub status: String,

    pub priority: Option<u8>,
    pub issue_type: Option<String>,
    pub assignee: Option<String>,
    pub labels: Vec<String>,
    pub updated_at: Option<Timestamp>,
}
