//! Town-level operations: status snapshots and agent lifecycle.

use super::{Dashboard, Done};
use crate::classify;
use crate::error::Result;
use crate::model::{Agent, Rig, Role, TownStatus};
use crate::parse;
use crate::projection;
use crate::sanitize::{self, ValidationError};

impl Dashboard {
    /// `gt status --json`, projected.
    ///
    /// Unparseable output is an empty town, not an error.
    pub async fn status(&self) -> Result<TownStatus> {
        let invocation = self
            .gt(self.config.timeouts.status())
            .args(["status", "--json"]);
        let captured = self.run(invocation, &classify::STATUS, "town status").await?;

        let report = parse::status::parse(&captured.stdout)
            .into_first()
            .unwrap_or_default();
        let status = projection::town_status(report);
        tracing::debug!(
            agents = status.agents.len(),
            rigs = status.rigs.len(),
            "town status"
        );
        Ok(status)
    }

    /// Every agent, or only those whose address is under `rig`.
    pub async fn agents(&self, rig: Option<&str>) -> Result<Vec<Agent>> {
        let prefix = rig
            .map(|r| sanitize::identifier("rig", r).map(|r| format!("{r}/")))
            .transpose()?;

        let agents = self.status().await?.agents;
        Ok(match prefix {
            Some(prefix) => agents
                .into_iter()
                .filter(|a| a.address.starts_with(&prefix))
                .collect(),
            None => agents,
        })
    }

    pub async fn rigs(&self) -> Result<Vec<Rig>> {
        Ok(self.status().await?.rigs)
    }

    /// `gt <role> start [rig]`.
    pub async fn agent_start(&self, role: &str, rig: Option<&str>) -> Result<Done> {
        let (role, rig) = lifecycle_target(role, rig)?;
        let invocation = self
            .gt(self.config.timeouts.provision())
            .args([role.as_str(), "start"])
            .args(rig.clone());
        let target = target_name(role, rig.as_deref());
        let captured = self
            .run(
                invocation,
                &classify::AGENT_START,
                &format!("start {target}"),
            )
            .await?;
        Ok(Done::new("agentStart", target, &captured.stdout))
    }

    /// `gt <role> stop [rig]`.
    pub async fn agent_stop(&self, role: &str, rig: Option<&str>) -> Result<Done> {
        let (role, rig) = lifecycle_target(role, rig)?;
        let invocation = self
            .gt(self.config.timeouts.fast())
            .args([role.as_str(), "stop"])
            .args(rig.clone());
        let target = target_name(role, rig.as_deref());
        let captured = self
            .run(invocation, &classify::AGENT_STOP, &format!("stop {target}"))
            .await?;
        Ok(Done::new("agentStop", target, &captured.stdout))
    }
}

/// Validate a start/stop target.
///
/// Only mayor, deacon and witness have lifecycle commands; crew use
/// `crewStart`/`crewStop`. A witness belongs to a rig and needs one.
fn lifecycle_target(role: &str, rig: Option<&str>) -> Result<(Role, Option<String>)> {
    let role: Role = role
        .parse()
        .map_err(|reason: String| ValidationError::new("role", reason))?;
    if !role.has_lifecycle_command() {
        return Err(ValidationError::new(
            "role",
            format!("{role} has no start/stop command; use the crew or polecat actions"),
        )
        .into());
    }

    let rig = rig.map(|r| sanitize::identifier("rig", r)).transpose()?;
    if role == Role::Witness && rig.is_none() {
        return Err(ValidationError::new("rig", "required for witness").into());
    }
    Ok((role, rig))
}

fn target_name(role: Role, rig: Option<&str>) -> String {
    match rig {
        Some(rig) => format!("{rig}/{role}"),
        None => format!("{role}/"),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    use crate::classify::ErrorKind;
    use crate::dashboard::tests::{argv_log, town_with_gt};

    const STATUS_JSON: &str = r#"{"name":"hq","agents":[{"name":"mayor","running":true}],"rigs":[{"name":"gastown","crew":["joe"],"agents":[{"name":"witness","running":true},{"name":"joe","role":"crew"}]},{"name":"beads","agents":[{"name":"witness","running":false}]}]}"#;

    fn status_town() -> (tempfile::TempDir, Dashboard) {
        town_with_gt(&format!("cat <<'JSON'\n{STATUS_JSON}\nJSON"))
    }

    #[tokio::test]
    async fn status_projects_the_snapshot() {
        let (town, dashboard) = status_town();

        let status = dashboard.status().await.unwrap();

        assert_eq!(status.name.as_deref(), Some("hq"));
        assert_eq!(status.agents.len(), 4);
        assert_eq!(status.rigs.len(), 2);
        assert_eq!(argv_log(town.path()), ["status --json"]);
    }

    #[tokio::test]
    async fn agents_filter_by_rig() {
        let (_town, dashboard) = status_town();

        let agents = dashboard.agents(Some("gastown")).await.unwrap();
        let addresses: Vec<_> = agents.iter().map(|a| a.address.as_str()).collect();

        assert_eq!(addresses, ["gastown/witness", "gastown/crew/joe"]);
    }

    #[tokio::test]
    async fn mistyped_agent_fields_keep_the_snapshot() {
        let (_town, dashboard) = town_with_gt(
            r#"echo '{"name":"hq","agents":[{"name":"mayor","role":"mayor","running":true},{"name":"deacon","running":true,"unread_mail":"3"}],"rigs":[{"name":"gastown"}]}'"#,
        );

        let status = dashboard.status().await.unwrap();

        assert_eq!(status.name.as_deref(), Some("hq"));
        assert_eq!(status.agents.len(), 2);
        assert_eq!(status.rigs.len(), 1);
    }

    #[tokio::test]
    async fn garbage_status_is_an_empty_town() {
        let (_town, dashboard) = town_with_gt("echo 'Town: hq'");

        let status = dashboard.status().await.unwrap();
        assert!(status.agents.is_empty());
        assert!(status.rigs.is_empty());
    }

    #[tokio::test]
    async fn witness_start_needs_a_rig() {
        let (town, dashboard) = town_with_gt("exit 0");

        let err = dashboard.agent_start("witness", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = dashboard.agent_start("crew", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        assert!(argv_log(town.path()).is_empty());
    }

    #[tokio::test]
    async fn witness_start_passes_the_rig() {
        let (town, dashboard) = town_with_gt("echo 'Witness started'");

        let done = dashboard.agent_start("witness", Some("gastown")).await.unwrap();

        assert_eq!(done.target, "gastown/witness");
        assert_eq!(done.output, "Witness started");
        assert_eq!(argv_log(town.path()), ["witness start gastown"]);
    }

    #[tokio::test]
    async fn mayor_already_running() {
        let (_town, dashboard) =
            town_with_gt("echo 'Error: mayor session already running' >&2; exit 1");

        let err = dashboard.agent_start("mayor", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyRunning);
    }
}
