//! `gt status --json`: the town snapshot.
//!
//! Field names have drifted across tool versions, so the wire shapes accept
//! the spellings seen in the wild and default everything. The report is one
//! object, so its lists decode element by element and a mistyped scalar
//! reads as absent: one odd agent never costs the whole snapshot.

use serde::Deserialize;
use serde_json::Value;

use super::{Parsed, json};

const COMMAND: &str = "gt status";

/// JSON shape of `gt status --json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatusReport {
    #[serde(alias = "town", alias = "town_name", deserialize_with = "json::lenient")]
    pub name: Option<String>,

    #[serde(deserialize_with = "json::lenient_list")]
    pub agents: Vec<WireAgent>,

    #[serde(deserialize_with = "json::lenient_list")]
    pub rigs: Vec<WireRig>,
}

/// One agent entry, town-level or nested under a rig.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireAgent {
    #[serde(deserialize_with = "json::lenient")]
    pub name: Option<String>,
    #[serde(deserialize_with = "json::lenient")]
    pub address: Option<String>,
    #[serde(deserialize_with = "json::lenient")]
    pub role: Option<String>,

    #[serde(alias = "active", alias = "alive", deserialize_with = "json::lenient")]
    pub running: Option<bool>,

    #[serde(
        alias = "hasWork",
        alias = "has_hook",
        alias = "hooked",
        deserialize_with = "json::lenient"
    )]
    pub has_work: Option<bool>,

    #[serde(alias = "unreadMail", alias = "unread", deserialize_with = "json::lenient")]
    pub unread_mail: Option<u32>,

    #[serde(alias = "status", deserialize_with = "json::lenient")]
    pub state: Option<String>,
}

/// One rig entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireRig {
    #[serde(deserialize_with = "json::lenient")]
    pub name: Option<String>,

    #[serde(deserialize_with = "json::lenient_list")]
    pub agents: Vec<WireAgent>,

    /// Names or objects; only counted and named.
    #[serde(alias = "crews", deserialize_with = "json::lenient_list")]
    pub crew: Vec<Value>,

    #[serde(deserialize_with = "json::lenient_list")]
    pub polecats: Vec<Value>,

    #[serde(alias = "crewCount", deserialize_with = "json::lenient")]
    pub crew_count: Option<u32>,

    #[serde(alias = "polecatCount", deserialize_with = "json::lenient")]
    pub polecat_count: Option<u32>,

    #[serde(alias = "hasWitness", deserialize_with = "json::lenient")]
    pub has_witness: Option<bool>,

    #[serde(alias = "hasRefinery", deserialize_with = "json::lenient")]
    pub has_refinery: Option<bool>,
}

/// Parse `gt status --json`. At most one report.
pub fn parse(text: &str) -> Parsed<StatusReport> {
    json::parse_one(COMMAND, text)
}
