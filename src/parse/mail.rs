//! `gt mail`: inbox listings in JSON or text, and send receipts.
//!
//! Both modes produce [`WireMail`]. Text listings look like:
//!
//! ```text
//! 📬 Inbox: mayor/ (2 messages, 1 unread)
//!
//!   ● gastown/crew/joe: Status update
//!       ID: hq-a1b2
//!       Date: 2025-10-01T12:00:00Z
//!   ○ gastown/witness: Patrol report
//! ```
//!
//! `●` marks unread, `○` read. A record is identified by its sender.
//! Records without an id (text mode never guarantees one) get a stable
//! synthetic id derived from their content. Repeats of an identical message
//! within one listing are told apart by position, so a listing that grows
//! at the front can shift which repeat counts as new, though the number of
//! new repeats stays right.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::scan::{self, Grammar, LineKind};
use super::{Parsed, json};

const INBOX: &str = "gt mail inbox";
const READ: &str = "gt mail read";

/// Prefix for ids the dashboard made up.
pub const SYNTHETIC_PREFIX: &str = "local-";

/// A message as the tool printed it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WireMail {
    pub id: Option<String>,

    #[serde(alias = "sender")]
    pub from: Option<String>,

    #[serde(alias = "recipient")]
    pub to: Option<String>,

    #[serde(alias = "title")]
    pub subject: Option<String>,

    #[serde(alias = "content", alias = "message")]
    pub body: Option<String>,

    /// RFC 3339 string, civil date-time, or epoch number.
    #[serde(alias = "created_at", alias = "createdAt", alias = "date", alias = "sent_at")]
    pub timestamp: Option<Value>,

    pub read: Option<bool>,
    pub unread: Option<bool>,

    #[serde(alias = "threadId", alias = "thread")]
    pub thread_id: Option<String>,

    #[serde(alias = "replyTo", alias = "in_reply_to")]
    pub reply_to: Option<String>,

    /// Name (`high`) or level (`1`).
    pub priority: Option<Value>,

    #[serde(rename = "type", alias = "kind", alias = "message_type")]
    pub kind: Option<String>,

    pub labels: Vec<String>,
}

/// Parse `gt mail inbox --json`.
pub fn parse_json(text: &str) -> Parsed<WireMail> {
    let mut parsed = json::parse_list(INBOX, text, &["messages", "mail", "inbox"]);
    assign_synthetic_ids(&mut parsed.records);
    parsed
}

/// Parse `gt mail read --json`.
pub fn parse_one(text: &str) -> Parsed<WireMail> {
    let mut parsed = json::parse_one(READ, text);
    assign_synthetic_ids(&mut parsed.records);
    parsed
}

/// Parse the text listing of `gt mail inbox`.
pub fn parse_text(text: &str) -> Parsed<WireMail> {
    let mut records = scan::scan(&InboxGrammar, text);
    assign_synthetic_ids(&mut records);
    Parsed::ok(records)
}

/// Pull the new message id out of `gt mail send` output.
///
/// Understands a JSON object with an `id`, or text like
/// `Message sent: hq-x1`, `✓ Sent message hq-x1 to mayor/`, `ID: hq-x1`.
pub fn sent_id(stdout: &str) -> Option<String> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(stdout.trim())
        && let Some(Value::String(id)) = map.get("id")
    {
        return Some(id.clone());
    }
    SENT_ID
        .captures(stdout)
        .map(|caps| caps["id"].to_string())
}

/// Give every record without an id a deterministic one.
fn assign_synthetic_ids(records: &mut [WireMail]) {
    let mut repeats: HashMap<String, u32> = HashMap::new();
    for record in records.iter_mut().filter(|r| r.id.as_deref().is_none_or(str::is_empty)) {
        let digest = content_digest(record);
        let occurrence = repeats.entry(digest.clone()).or_default();
        let id = if *occurrence == 0 {
            digest
        } else {
            hex::encode(Sha256::digest(format!("{digest}#{occurrence}")))
        };
        *occurrence += 1;
        record.id = Some(format!("{SYNTHETIC_PREFIX}{}", &id[..12]));
    }
}

/// Hex SHA-256 over sender, recipient, subject, date and body.
fn content_digest(record: &WireMail) -> String {
    let date = match &record.timestamp {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    let mut hasher = Sha256::new();
    for part in [
        record.from.as_deref().unwrap_or_default(),
        record.to.as_deref().unwrap_or_default(),
        record.subject.as_deref().unwrap_or_default(),
        date.as_str(),
        record.body.as_deref().unwrap_or_default(),
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0]);
    }
    hex::encode(hasher.finalize())
}

// ── Text grammar ──

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:(?P<mark>[●○•◦✉*])\s+)?(?P<from>[A-Za-z0-9_-]+/[A-Za-z0-9_/-]*):\s+(?P<subject>\S.*?)\s*$",
    )
    .expect("valid header regex")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?i:(?P<key>id|to|date|sent|time|priority|thread|reply-to|type)):\s*(?P<value>\S.*?)\s*$")
        .expect("valid attribute regex")
});

static SENT_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:id|sent)\b:?\s+(?:message\s+)?(?P<id>[A-Za-z0-9][A-Za-z0-9_-]*-[A-Za-z0-9_-]+)")
        .expect("valid sent-id regex")
});

struct InboxGrammar;

struct Header {
    unread: Option<bool>,
    from: String,
    subject: String,
}

enum Attribute {
    Id(String),
    To(String),
    Date(String),
    Priority(String),
    Thread(String),
    ReplyTo(String),
    Kind(String),
}

impl Grammar for InboxGrammar {
    type Header = Header;
    type Attribute = Attribute;
    type Record = WireMail;

    fn classify(&self, line: &str) -> LineKind<Header, Attribute> {
        if let Some(caps) = HEADER.captures(line) {
            let unread = caps.name("mark").and_then(|m| match m.as_str() {
                "●" | "•" | "✉" | "*" => Some(true),
                "○" | "◦" => Some(false),
                _ => None,
            });
            return LineKind::Header(Header {
                unread,
                from: caps["from"].to_string(),
                subject: caps["subject"].to_string(),
            });
        }

        if let Some(caps) = ATTRIBUTE.captures(line) {
            let value = caps["value"].to_string();
            let attribute = match caps["key"].to_lowercase().as_str() {
                "id" => Attribute::Id(value),
                "to" => Attribute::To(value),
                "priority" => Attribute::Priority(value),
                "thread" => Attribute::Thread(value),
                "reply-to" => Attribute::ReplyTo(value),
                "type" => Attribute::Kind(value),
                _ => Attribute::Date(value),
            };
            return LineKind::Attribute(attribute);
        }

        LineKind::Noise
    }

    fn open(&self, header: Header) -> WireMail {
        WireMail {
            from: Some(header.from),
            subject: Some(header.subject),
            unread: header.unread,
            ..WireMail::default()
        }
    }

    fn apply(&self, record: &mut WireMail, attribute: Attribute) {
        match attribute {
            Attribute::Id(id) => record.id = Some(id),
            Attribute::To(to) => record.to = Some(to),
            Attribute::Date(date) => record.timestamp = Some(Value::String(date)),
            Attribute::Priority(p) => record.priority = Some(Value::String(p)),
            Attribute::Thread(t) => record.thread_id = Some(t),
            Attribute::ReplyTo(r) => record.reply_to = Some(r),
            Attribute::Kind(k) => record.kind = Some(k),
        }
    }

    fn is_identified(&self, record: &WireMail) -> bool {
        record.from.as_deref().is_some_and(|f| !f.is_empty())
    }
}
