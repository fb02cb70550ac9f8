//! Beads issues, read-only.

use super::Dashboard;
use crate::classify;
use crate::error::Result;
use crate::model::Issue;
use crate::parse;
use crate::projection;
use crate::sanitize;

impl Dashboard {
    /// `bd list --json [--status <status>]`.
    pub async fn issues(&self, status: Option<&str>) -> Result<Vec<Issue>> {
        let status = status
            .map(|s| sanitize::identifier("status", s))
            .transpose()?;

        let mut invocation = self
            .bd(self.config.timeouts.status())
            .args(["list", "--json"]);
        if let Some(status) = &status {
            invocation = invocation.args(["--status", status.as_str()]);
        }

        let captured = self
            .run(invocation, &classify::BEADS_LIST, "list issues")
            .await?;
        Ok(parse::beads::parse(&captured.stdout)
            .into_records()
            .into_iter()
            .filter_map(projection::issue)
            .collect())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use crate::classify::ErrorKind;
    use crate::dashboard::tests::{argv_log, town_with_gt};

    #[tokio::test]
    async fn lists_issues_with_status_filter() {
        let (town, dashboard) = town_with_gt(
            r#"echo '{"issues":[{"id":"gt-1","title":"Fix","status":"open","priority":"P1"},{"title":"no id"}]}'"#,
        );

        let issues = dashboard.issues(Some("open")).await.unwrap();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].priority, Some(1));
        assert_eq!(argv_log(town.path()), ["list --json --status open"]);
    }

    #[tokio::test]
    async fn missing_database_is_not_found() {
        let (_town, dashboard) =
            town_with_gt("echo 'Error: no beads database found' >&2; exit 1");

        let err = dashboard.issues(None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn status_filter_is_validated() {
        let (town, dashboard) = town_with_gt("exit 0");

        let err = dashboard.issues(Some("open --all")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(argv_log(town.path()).is_empty());
    }
}
