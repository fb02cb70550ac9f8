//! Public record types: what the dashboard hands to its callers.
//!
//! These are stable shapes. Parsers produce wire records that track whatever
//! the external tool prints; [`crate::projection`] maps those into these
//! types with every field filled in.

mod agent;
mod issue;
mod mail;
mod member;
mod rig;

use serde::{Deserialize, Serialize};

pub use agent::{Agent, Role};
pub use issue::Issue;
pub use mail::{Direction, MailMessage, Priority, SendReceipt, Thread};
pub use member::{Member, MemberKind, WorkingTree};
pub use rig::Rig;

/// A full town snapshot from one `gt status` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TownStatus {
    /// Town name, when the tool reports one.
    pub name: Option<String>,

    /// Every agent, town-level and rig-level.
    pub agents: Vec<Agent>,

    pub rigs: Vec<Rig>,
}
