//! Agents: supervised long-running processes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The fixed set of agent roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// Town-level coordinator.
    Mayor,

    /// Town-level background worker.
    Deacon,

    /// Rig-level supervisor.
    Witness,

    /// Persistent worker with its own workspace.
    Crew,

    /// Transient worker on an ephemeral worktree.
    Polecat,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mayor => "mayor",
            Self::Deacon => "deacon",
            Self::Witness => "witness",
            Self::Crew => "crew",
            Self::Polecat => "polecat",
        }
    }

    /// Infer a role from an address like `gastown/crew/joe` or `mayor/`.
    pub fn from_address(address: &str) -> Option<Self> {
        let segments: Vec<&str> = address.split('/').filter(|s| !s.is_empty()).collect();
        if segments.contains(&"crew") {
            return Some(Self::Crew);
        }
        if segments.contains(&"polecats") || segments.contains(&"polecat") {
            return Some(Self::Polecat);
        }
        segments.iter().rev().find_map(|s| s.parse().ok())
    }

    /// Roles with a town-level start/stop command.
    pub fn has_lifecycle_command(self) -> bool {
        matches!(self, Self::Mayor | Self::Deacon | Self::Witness)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mayor" => Ok(Self::Mayor),
            "deacon" => Ok(Self::Deacon),
            "witness" => Ok(Self::Witness),
            "crew" => Ok(Self::Crew),
            "polecat" | "polecats" => Ok(Self::Polecat),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// One agent as seen in a status snapshot.
///
/// Observed fresh on every poll; the address is its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub address: String,
    pub role: Role,
    pub running: bool,

    /// Work is hooked and waiting.
    pub has_work: bool,

    pub unread_mail: u32,

    /// Free-text status line, if the tool printed one.
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_role_from_address() {
        assert_eq!(Role::from_address("gastown/crew/joe"), Some(Role::Crew));
        assert_eq!(Role::from_address("gastown/polecats/nux"), Some(Role::Polecat));
        assert_eq!(Role::from_address("gastown/witness"), Some(Role::Witness));
        assert_eq!(Role::from_address("mayor/"), Some(Role::Mayor));
        assert_eq!(Role::from_address("deacon"), Some(Role::Deacon));
        assert_eq!(Role::from_address("gastown/refinery"), None);
    }

    #[test]
    fn parses_role_names_case_insensitively() {
        assert_eq!("Witness".parse::<Role>().unwrap(), Role::Witness);
        assert!("refinery".parse::<Role>().is_err());
    }
}
