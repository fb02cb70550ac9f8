//! Rigs: named work groups.

use serde::{Deserialize, Serialize};

/// A named work group and the agents in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rig {
    pub name: String,

    /// Addresses of the agents belonging to this rig.
    pub agents: Vec<String>,

    pub crew_count: u32,
    pub polecat_count: u32,
    pub has_witness: bool,
    pub has_refinery: bool,
}
