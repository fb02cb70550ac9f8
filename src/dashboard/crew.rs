//! Crew and polecat operations.

use std::path::{Path, PathBuf};

use tokio::fs;

use super::{Dashboard, Done};
use crate::classify::{self, PhraseTable};
use crate::error::Result;
use crate::invoke::Invocation;
use crate::model::{Member, MemberKind};
use crate::parse::members::{self, WireMember};
use crate::projection;
use crate::sanitize::{self, NUDGE_MAX};

/// Where a crew workspace keeps its delivered mail.
const MAILBOX: [&str; 2] = ["mail", "inbox"];

impl Dashboard {
    /// `gt crew list --rig <rig>`. The command has no JSON mode.
    ///
    /// Mail counts are read from each workspace's mailbox directory.
    pub async fn crew_list(&self, rig: &str) -> Result<Vec<Member>> {
        let rig = sanitize::identifier("rig", rig)?;
        let invocation = self
            .gt(self.config.timeouts.fast())
            .args(["crew", "list", "--rig", rig.as_str()]);
        let captured = self
            .run(invocation, &classify::MEMBER_LIST, &format!("list crew in {rig}"))
            .await?;

        let wire = members::parse_text(&captured.stdout).into_records();
        let mut crew = self.project_members(wire, MemberKind::Crew, &rig);
        for member in &mut crew {
            member.mail_count = mailbox_count(&member.path).await;
            tracing::debug!(address = %member.address(), mail = member.mail_count, "mailbox counted");
        }
        Ok(crew)
    }

    /// `gt polecat list --rig <rig> --json`, falling back to the text listing.
    pub async fn polecat_list(&self, rig: &str) -> Result<Vec<Member>> {
        let rig = sanitize::identifier("rig", rig)?;
        let base = ["polecat", "list", "--rig", rig.as_str()];
        let json = self.gt(self.config.timeouts.fast()).args(base).arg("--json");
        let text = self.gt(self.config.timeouts.fast()).args(base);

        let wire = self
            .json_or_text(
                json,
                text,
                &classify::MEMBER_LIST,
                &format!("list polecats in {rig}"),
                members::parse_json,
                members::parse_text,
            )
            .await?;
        Ok(self.project_members(wire, MemberKind::Polecat, &rig))
    }

    /// `gt crew add <name> --rig <rig>`.
    pub async fn crew_add(&self, rig: &str, name: &str) -> Result<Done> {
        let rig = sanitize::identifier("rig", rig)?;
        let name = sanitize::name("name", name)?;
        let invocation = self
            .gt(self.config.timeouts.provision())
            .args(["crew", "add", name.as_str(), "--rig", rig.as_str()]);
        self.crew_action("crewAdd", "add", invocation, &classify::CREW_ADD, &rig, &name)
            .await
    }

    /// `gt crew remove <name> --rig <rig> [--force]`.
    ///
    /// Without `force` the tool refuses to remove a workspace with
    /// uncommitted or unpushed work, which classifies as `DirtyWorkspace`.
    pub async fn crew_remove(&self, rig: &str, name: &str, force: bool) -> Result<Done> {
        let rig = sanitize::identifier("rig", rig)?;
        let name = sanitize::identifier("name", name)?;
        let mut invocation = self
            .gt(self.config.timeouts.provision())
            .args(["crew", "remove", name.as_str(), "--rig", rig.as_str()]);
        if force {
            invocation = invocation.arg("--force");
        }
        self.crew_action(
            "crewRemove",
            "remove",
            invocation,
            &classify::CREW_REMOVE,
            &rig,
            &name,
        )
        .await
    }

    /// `gt crew start <name> --rig <rig>`.
    pub async fn crew_start(&self, rig: &str, name: &str) -> Result<Done> {
        let rig = sanitize::identifier("rig", rig)?;
        let name = sanitize::identifier("name", name)?;
        let invocation = self
            .gt(self.config.timeouts.provision())
            .args(["crew", "start", name.as_str(), "--rig", rig.as_str()]);
        self.crew_action("crewStart", "start", invocation, &classify::CREW_START, &rig, &name)
            .await
    }

    /// `gt crew stop <name> --rig <rig>`.
    pub async fn crew_stop(&self, rig: &str, name: &str) -> Result<Done> {
        let rig = sanitize::identifier("rig", rig)?;
        let name = sanitize::identifier("name", name)?;
        let invocation = self
            .gt(self.config.timeouts.fast())
            .args(["crew", "stop", name.as_str(), "--rig", rig.as_str()]);
        self.crew_action("crewStop", "stop", invocation, &classify::CREW_STOP, &rig, &name)
            .await
    }

    /// `gt nudge <rig>/crew/<name> <message>`.
    pub async fn crew_nudge(&self, rig: &str, name: &str, message: &str) -> Result<Done> {
        let rig = sanitize::identifier("rig", rig)?;
        let name = sanitize::identifier("name", name)?;
        let message = sanitize::free_text("message", message, NUDGE_MAX)?;
        let address = format!("{rig}/crew/{name}");

        let invocation = self
            .gt(self.config.timeouts.fast())
            .args(["nudge", address.as_str(), message.as_str()]);
        let captured = self
            .run(invocation, &classify::CREW_NUDGE, &format!("nudge {address}"))
            .await?;
        Ok(Done::new("crewNudge", address, &captured.stdout))
    }

    async fn crew_action(
        &self,
        action: &str,
        verb: &str,
        invocation: Invocation,
        table: &PhraseTable,
        rig: &str,
        name: &str,
    ) -> Result<Done> {
        let address = format!("{rig}/crew/{name}");
        let captured = self
            .run(invocation, table, &format!("{verb} crew {address}"))
            .await?;
        tracing::info!(action, %address, "crew action done");
        Ok(Done::new(action, address, &captured.stdout))
    }

    /// Project listing entries, filling in the conventional workspace path
    /// (`<town>/<rig>/<crew|polecats>/<name>`) when the tool didn't print one.
    fn project_members(&self, wire: Vec<WireMember>, kind: MemberKind, rig: &str) -> Vec<Member> {
        wire.into_iter()
            .filter_map(|w| projection::member(w, kind, rig))
            .map(|mut member| {
                if member.path.as_os_str().is_empty() {
                    member.path = workspace_path(self.config.town_root(), &member);
                }
                member
            })
            .collect()
    }
}

fn workspace_path(town: &Path, member: &Member) -> PathBuf {
    town.join(&member.rig)
        .join(member.kind.segment())
        .join(&member.name)
}

/// Count regular files in `<workspace>/mail/inbox`. A missing or unreadable
/// mailbox counts as empty.
pub async fn mailbox_count(workspace: &Path) -> u32 {
    let dir = MAILBOX.iter().fold(workspace.to_path_buf(), |p, s| p.join(s));
    let Ok(mut entries) = fs::read_dir(&dir).await else {
        return 0;
    };

    let mut count: u32 = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_type().await.is_ok_and(|t| t.is_file()) {
            count = count.saturating_add(1);
        }
    }
    count
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    use std::fs as std_fs;

    use tempfile::TempDir;

    use crate::classify::ErrorKind;
    use crate::dashboard::tests::{argv_log, town_with_gt};

    #[tokio::test]
    async fn mailbox_counts_regular_files_only() {
        let workspace = TempDir::new().unwrap();
        let inbox = workspace.path().join("mail").join("inbox");
        std_fs::create_dir_all(inbox.join("archive")).unwrap();
        std_fs::write(inbox.join("1.json"), "{}").unwrap();
        std_fs::write(inbox.join("2.json"), "{}").unwrap();

        assert_eq!(mailbox_count(workspace.path()).await, 2);
        assert_eq!(mailbox_count(&workspace.path().join("nope")).await, 0);
    }

    #[tokio::test]
    async fn crew_list_reads_text_and_mailboxes() {
        let (town, dashboard) =
            town_with_gt("printf '  ● gastown/joe\\n    Branch: main  Git: clean\\n  ○ gastown/max\\n'");
        let inbox = town.path().join("gastown/crew/joe/mail/inbox");
        std_fs::create_dir_all(&inbox).unwrap();
        std_fs::write(inbox.join("m1"), "").unwrap();

        let crew = dashboard.crew_list("gastown").await.unwrap();

        assert_eq!(crew.len(), 2);
        assert_eq!(crew[0].name, "joe");
        assert!(crew[0].running);
        assert_eq!(crew[0].mail_count, 1);
        assert_eq!(crew[0].path, town.path().join("gastown/crew/joe"));
        assert!(!crew[1].running);
        assert_eq!(crew[1].mail_count, 0);
        assert_eq!(argv_log(town.path()), ["crew list --rig gastown"]);
    }

    #[tokio::test]
    async fn crew_add_requires_a_leading_letter() {
        let (town, dashboard) = town_with_gt("exit 0");

        let err = dashboard.crew_add("gastown", "9lives").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(argv_log(town.path()).is_empty());
    }

    #[tokio::test]
    async fn crew_remove_dirty_workspace() {
        let (town, dashboard) = town_with_gt(
            "echo 'Error: joe has uncommitted changes; use --force to remove anyway' >&2; exit 1",
        );

        let err = dashboard.crew_remove("gastown", "joe", false).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DirtyWorkspace);
        assert_eq!(argv_log(town.path()), ["crew remove joe --rig gastown"]);
    }

    #[tokio::test]
    async fn crew_remove_force_passes_the_flag() {
        let (town, dashboard) = town_with_gt("echo 'Removed joe'");

        let done = dashboard.crew_remove("gastown", "joe", true).await.unwrap();

        assert_eq!(done.target, "gastown/crew/joe");
        assert_eq!(argv_log(town.path()), ["crew remove joe --rig gastown --force"]);
    }

    #[tokio::test]
    async fn nudge_passes_message_as_one_argument() {
        let (town, dashboard) = town_with_gt("printf '%s\\n' \"$3\" > \"$PWD/message.txt\"");
        let message = "it's time; $(whoami) && `ls`";

        dashboard.crew_nudge("gastown", "joe", message).await.unwrap();

        let received = std_fs::read_to_string(town.path().join("message.txt")).unwrap();
        assert_eq!(received.trim_end(), message);
    }

    #[tokio::test]
    async fn nudge_missing_session_is_not_running() {
        let (_town, dashboard) = town_with_gt("echo 'session not found' >&2; exit 1");

        let err = dashboard.crew_nudge("gastown", "joe", "hi").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotRunning);
    }

    #[tokio::test]
    async fn polecat_json_listing() {
        let (_town, dashboard) = town_with_gt(
            r#"echo '[{"name":"nux","rig":"gastown","state":"working","clean":true,"path":"/tmp/nux"}]'"#,
        );

        let polecats = dashboard.polecat_list("gastown").await.unwrap();

        assert_eq!(polecats.len(), 1);
        assert_eq!(polecats[0].kind, MemberKind::Polecat);
        assert!(polecats[0].running);
        assert_eq!(polecats[0].address(), "gastown/polecats/nux");
    }
}
