//! Mail: the external tool's asynchronous messaging, as the dashboard sees it.

use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Whether a message came from a managed agent or went out to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Sent,
    Received,
}

/// Message priority tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Priority {
    Urgent,
    High,
    Normal,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }

    /// Read a priority from a name (`high`) or a numeric level (`0`-`4`, `P1`).
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_lowercase();
        let level = raw.strip_prefix('p').unwrap_or(raw.as_str());
        if let Ok(n) = level.parse::<u8>() {
            return Some(Self::from_level(n));
        }
        match raw.as_str() {
            "urgent" | "critical" => Some(Self::Urgent),
            "high" => Some(Self::High),
            "normal" | "medium" => Some(Self::Normal),
            "low" | "backlog" => Some(Self::Low),
            _ => None,
        }
    }

    /// Map a numeric level, 0 most urgent.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Self::Urgent,
            1 => Self::High,
            2 => Self::Normal,
            _ => Self::Low,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single mail message.
///
/// `id` is unique within the external store and is the dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailMessage {
    pub id: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub timestamp: Timestamp,
    pub read: bool,
    pub thread_id: Option<String>,
    pub reply_to: Option<String>,
    pub priority: Option<Priority>,

    /// Message type tag (`task`, `notification`, `reply`...).
    pub kind: Option<String>,

    pub labels: Vec<String>,
    pub direction: Direction,
}

/// Messages sharing a thread id, latest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,

    /// Subject of the earliest message in the thread.
    pub subject: String,

    pub messages: Vec<MailMessage>,

    /// Timestamp of the most recent message.
    pub latest: Timestamp,

    pub unread: u32,
}

/// What `gt mail send` reported back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    /// The new message id, when the tool printed one.
    pub id: Option<String>,
    pub to: String,
    pub subject: String,
}
