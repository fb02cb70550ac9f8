//! Typed projection: wire records into public model types.
//!
//! Everything here is pure. Wire records carry whatever the tool printed;
//! these functions settle every field to a definite value so callers never
//! see a half-filled record.

use std::path::PathBuf;

use jiff::Timestamp;
use jiff::civil::DateTime;
use jiff::tz::TimeZone;
use serde_json::Value;

use crate::model::{
    Agent, Direction, Issue, MailMessage, Member, MemberKind, Priority, Rig, Role, TownStatus,
    WorkingTree,
};
use crate::parse::beads::WireIssue;
use crate::parse::mail::WireMail;
use crate::parse::members::{WireMember, state_is_running};
use crate::parse::status::{StatusReport, WireAgent, WireRig};
use crate::{reconcile, sanitize};

/// Subject given to messages that arrive without one.
pub const NO_SUBJECT: &str = "(no subject)";

/// Title given to issues that arrive without one.
pub const NO_TITLE: &str = "(untitled)";

/// Epoch values above this are taken as milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

// ── Town ──

/// Flatten a status report: town agents first, then each rig's agents.
pub fn town_status(report: StatusReport) -> TownStatus {
    let mut agents: Vec<Agent> = report
        .agents
        .into_iter()
        .filter_map(|a| agent(a, None))
        .collect();

    let mut rigs = Vec::with_capacity(report.rigs.len());
    for wire in report.rigs {
        if let Some((summary, rig_agents)) = rig(wire) {
            rigs.push(summary);
            agents.extend(rig_agents);
        }
    }

    TownStatus {
        name: report.name.filter(|n| !n.trim().is_empty()),
        agents,
        rigs,
    }
}

/// Project one agent entry. `rig` is the enclosing rig, if any.
///
/// Returns `None` for entries with no usable identity or an unknown role.
pub fn agent(wire: WireAgent, rig: Option<&str>) -> Option<Agent> {
    let declared_role = wire.role.as_deref().and_then(|r| r.parse::<Role>().ok());

    let address = match (wire.address.filter(|a| !a.is_empty()), wire.name.as_deref()) {
        (Some(address), _) => address,
        (None, Some(name)) if !name.is_empty() => compose_address(name, rig, declared_role),
        _ => {
            tracing::debug!(?rig, "skipping agent without name or address");
            return None;
        }
    };

    let Some(role) = declared_role
        .or_else(|| Role::from_address(&address))
        .or_else(|| wire.name.as_deref().and_then(|n| n.parse().ok()))
    else {
        tracing::debug!(%address, "skipping agent with unknown role");
        return None;
    };

    let running = wire
        .running
        .or_else(|| wire.state.as_deref().map(state_is_running))
        .unwrap_or(false);

    Some(Agent {
        address,
        role,
        running,
        has_work: wire.has_work.unwrap_or(false),
        unread_mail: wire.unread_mail.unwrap_or(0),
        status: wire.state.filter(|s| !s.trim().is_empty()),
    })
}

fn compose_address(name: &str, rig: Option<&str>, role: Option<Role>) -> String {
    match (rig, role) {
        (Some(rig), Some(Role::Crew)) => format!("{rig}/crew/{name}"),
        (Some(rig), Some(Role::Polecat)) => format!("{rig}/polecats/{name}"),
        (Some(rig), _) => format!("{rig}/{name}"),
        (None, _) => format!("{name}/"),
    }
}

/// Project one rig entry into its summary and its agents.
///
/// Rigs whose name is not a valid identifier are dropped: the name ends up
/// on command lines and in filesystem paths.
pub fn rig(wire: WireRig) -> Option<(Rig, Vec<Agent>)> {
    let name = wire.name.as_deref().unwrap_or_default();
    let name = match sanitize::identifier("rig", name) {
        Ok(name) => name,
        Err(e) => {
            tracing::warn!(error = %e, "dropping rig from status");
            return None;
        }
    };

    let has_refinery = wire.has_refinery.unwrap_or_else(|| {
        wire.agents.iter().any(|a| {
            [&a.name, &a.address, &a.role]
                .iter()
                .any(|f| f.as_deref().is_some_and(|s| s.contains("refinery")))
        })
    });

    let agents: Vec<Agent> = wire
        .agents
        .into_iter()
        .filter_map(|a| agent(a, Some(&name)))
        .collect();

    let count_role = |role: Role| count(agents.iter().filter(|a| a.role == role).count());
    let crew_count = wire.crew_count.unwrap_or_else(|| {
        if wire.crew.is_empty() {
            count_role(Role::Crew)
        } else {
            count(wire.crew.len())
        }
    });
    let polecat_count = wire.polecat_count.unwrap_or_else(|| {
        if wire.polecats.is_empty() {
            count_role(Role::Polecat)
        } else {
            count(wire.polecats.len())
        }
    });
    let has_witness = wire
        .has_witness
        .unwrap_or_else(|| agents.iter().any(|a| a.role == Role::Witness));

    let summary = Rig {
        name,
        agents: agents.iter().map(|a| a.address.clone()).collect(),
        crew_count,
        polecat_count,
        has_witness,
        has_refinery,
    };
    Some((summary, agents))
}

// ── Members ──

/// Project a crew or polecat listing entry.
///
/// `rig` is the rig the listing was requested for; it fills in when the
/// entry doesn't name one.
pub fn member(wire: WireMember, kind: MemberKind, rig: &str) -> Option<Member> {
    let raw_name = wire.name.unwrap_or_default();
    let name = match sanitize::identifier("member", &raw_name) {
        Ok(name) => name,
        Err(e) => {
            tracing::warn!(error = %e, "dropping member from listing");
            return None;
        }
    };

    let tree = match (wire.clean, wire.git.as_deref()) {
        (Some(true), _) => WorkingTree::Clean,
        (Some(false), _) => WorkingTree::Dirty,
        (None, Some(label)) => WorkingTree::from_label(label),
        (None, None) => WorkingTree::Unknown,
    };

    let running = wire
        .running
        .or_else(|| wire.state.as_deref().map(state_is_running))
        .unwrap_or(false);

    Some(Member {
        name,
        rig: wire
            .rig
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| rig.to_string()),
        kind,
        path: wire.path.map(expand_home).unwrap_or_default(),
        branch: wire.branch.filter(|b| !b.is_empty()),
        tree,
        running,
        mail_count: wire.mail.unwrap_or(0),
    })
}

fn expand_home(path: String) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

// ── Mail ──

/// Project a message.
///
/// `captured_at` stands in for a missing or unreadable timestamp.
/// `default_direction` applies when the sender is not a managed agent.
pub fn mail(wire: WireMail, captured_at: Timestamp, default_direction: Direction) -> MailMessage {
    let (label_thread, label_reply) = reconcile::thread_labels(&wire.labels);
    let from = wire.from.unwrap_or_default();
    let direction = reconcile::direction(&from, default_direction);

    MailMessage {
        id: wire.id.unwrap_or_default(),
        to: wire.to.unwrap_or_default(),
        subject: wire
            .subject
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| NO_SUBJECT.to_string()),
        body: wire.body.unwrap_or_default(),
        timestamp: timestamp(wire.timestamp.as_ref()).unwrap_or(captured_at),
        read: wire.read.or(wire.unread.map(|u| !u)).unwrap_or(false),
        thread_id: wire.thread_id.filter(|t| !t.is_empty()).or(label_thread),
        reply_to: wire.reply_to.filter(|r| !r.is_empty()).or(label_reply),
        priority: wire.priority.as_ref().and_then(priority),
        kind: wire.kind.filter(|k| !k.is_empty()),
        labels: wire.labels,
        direction,
        from,
    }
}

fn priority(value: &Value) -> Option<Priority> {
    match value {
        Value::String(s) => Priority::parse(s),
        Value::Number(n) => n
            .as_u64()
            .map(|n| Priority::from_level(u8::try_from(n).unwrap_or(u8::MAX))),
        _ => None,
    }
}

/// Read a timestamp in any of the shapes the tool prints.
///
/// RFC 3339 with offset, a civil date-time taken as UTC, or epoch seconds
/// or milliseconds (as a number or a numeric string).
pub fn timestamp(value: Option<&Value>) -> Option<Timestamp> {
    match value? {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(ts) = s.parse::<Timestamp>() {
                return Some(ts);
            }
            if let Ok(dt) = s.parse::<DateTime>() {
                return dt.to_zoned(TimeZone::UTC).ok().map(|z| z.timestamp());
            }
            s.parse::<i64>().ok().and_then(epoch)
        }
        Value::Number(n) => n.as_i64().and_then(epoch),
        _ => None,
    }
}

fn epoch(n: i64) -> Option<Timestamp> {
    if n.abs() >= MILLIS_THRESHOLD {
        Timestamp::from_millisecond(n).ok()
    } else {
        Timestamp::from_second(n).ok()
    }
}

// ── Issues ──

/// Project an issue. Entries without an id are dropped.
pub fn issue(wire: WireIssue) -> Option<Issue> {
    let id = wire.id.filter(|id| !id.trim().is_empty())?;

    let priority = match &wire.priority {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u8::try_from(n).ok()),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.strip_prefix(['P', 'p']).unwrap_or(s).parse().ok()
        }
        _ => None,
    };

    Some(Issue {
        id,
        title: wire
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| NO_TITLE.to_string()),
        status: wire
            .status
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "unknown".to_string()),
        priority,
        issue_type: wire.issue_type.filter(|t| !t.is_empty()),
        assignee: wire.assignee.filter(|a| !a.is_empty()),
        labels: wire.labels,
        updated_at: wire
            .updated_at
            .and_then(|s| timestamp(Some(&Value::String(s)))),
    })
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::parse;

    fn captured() -> Timestamp {
        "2025-10-02T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn town_status_flattens_agents_and_summarizes_rigs() {
        let text = r#"{
            "name": "hq",
            "agents": [
                {"name": "mayor", "running": true, "unread_mail": 2},
                {"name": "deacon", "state": "stopped"}
            ],
            "rigs": [{
                "name": "gastown",
                "crew": ["joe", "max"],
                "agents": [
                    {"name": "witness", "running": true},
                    {"name": "refinery", "running": true},
                    {"name": "nux", "role": "polecat", "hasWork": true}
                ]
            }]
        }"#;
        let report = parse::status::parse(text).into_first().unwrap();
        let status = town_status(report);

        let addresses: Vec<_> = status.agents.iter().map(|a| a.address.as_str()).collect();
        assert_eq!(
            addresses,
            ["mayor/", "deacon/", "gastown/witness", "gastown/polecats/nux"]
        );
        assert_eq!(status.agents[0].unread_mail, 2);
        assert!(!status.agents[1].running);
        assert!(status.agents[3].has_work);

        let rig = &status.rigs[0];
        assert_eq!(rig.name, "gastown");
        assert_eq!(rig.crew_count, 2);
        assert_eq!(rig.polecat_count, 1);
        assert!(rig.has_witness);
        assert!(rig.has_refinery);
    }

    #[test]
    fn rig_with_unsafe_name_is_dropped() {
        let wire = WireRig {
            name: Some("gas town; rm".into()),
            ..WireRig::default()
        };
        assert!(rig(wire).is_none());
    }

    #[test]
    fn agent_role_from_address() {
        let wire = WireAgent {
            address: Some("gastown/crew/joe".into()),
            state: Some("working".into()),
            ..WireAgent::default()
        };
        let agent = agent(wire, None).unwrap();
        assert_eq!(agent.role, Role::Crew);
        assert!(agent.running);
        assert_eq!(agent.status.as_deref(), Some("working"));
    }

    #[test]
    fn agent_without_identity_is_dropped() {
        assert!(agent(WireAgent::default(), None).is_none());
    }

    #[test]
    fn mail_defaults() {
        let wire = WireMail {
            id: Some("hq-1".into()),
            from: Some("mayor/".into()),
            ..WireMail::default()
        };
        let message = mail(wire, captured(), Direction::Sent);

        assert_eq!(message.subject, NO_SUBJECT);
        assert_eq!(message.body, "");
        assert_eq!(message.timestamp, captured());
        assert!(!message.read);
        assert_eq!(message.direction, Direction::Sent);
    }

    #[test]
    fn mail_threads_from_labels_and_direction_from_sender() {
        let wire = WireMail {
            id: Some("hq-1".into()),
            from: Some("gastown/crew/joe".into()),
            subject: Some("hi".into()),
            unread: Some(false),
            priority: Some(Value::from(1)),
            labels: vec!["thread:abc".into(), "reply-to:xyz".into(), "other:1".into()],
            ..WireMail::default()
        };
        let message = mail(wire, captured(), Direction::Sent);

        assert_eq!(message.thread_id.as_deref(), Some("abc"));
        assert_eq!(message.reply_to.as_deref(), Some("xyz"));
        assert_eq!(message.direction, Direction::Received);
        assert_eq!(message.priority, Some(Priority::High));
        assert!(message.read);
    }

    #[test]
    fn explicit_thread_outranks_label() {
        let wire = WireMail {
            thread_id: Some("t-explicit".into()),
            labels: vec!["thread:t-label".into()],
            ..WireMail::default()
        };
        let message = mail(wire, captured(), Direction::Received);
        assert_eq!(message.thread_id.as_deref(), Some("t-explicit"));
    }

    #[test]
    fn timestamp_shapes() {
        let expected: Timestamp = "2025-10-01T12:00:00Z".parse().unwrap();

        for value in [
            Value::from("2025-10-01T12:00:00Z"),
            Value::from("2025-10-01T14:00:00+02:00"),
            Value::from("2025-10-01T12:00:00"),
            Value::from("2025-10-01 12:00:00"),
            Value::from(expected.as_second()),
            Value::from(expected.as_millisecond()),
            Value::from(expected.as_second().to_string()),
        ] {
            assert_eq!(timestamp(Some(&value)), Some(expected), "{value}");
        }
        assert_eq!(timestamp(Some(&Value::from("yesterday"))), None);
        assert_eq!(timestamp(None), None);
    }

    #[test]
    fn member_from_text_listing() {
        let wire = WireMember {
            name: Some("joe".into()),
            path: Some("/home/me/gt/gastown/crew/joe".into()),
            branch: Some("main".into()),
            git: Some("3 uncommitted".into()),
            state: Some("idle".into()),
            ..WireMember::default()
        };
        let member = member(wire, MemberKind::Crew, "gastown").unwrap();

        assert_eq!(member.rig, "gastown");
        assert_eq!(member.tree, WorkingTree::Dirty);
        assert!(member.running);
        assert_eq!(member.address(), "gastown/crew/joe");
        assert_eq!(member.path, PathBuf::from("/home/me/gt/gastown/crew/joe"));
    }

    #[test]
    fn member_clean_flag_outranks_label() {
        let wire = WireMember {
            name: Some("nux".into()),
            clean: Some(true),
            git: Some("dirty".into()),
            ..WireMember::default()
        };
        let member = member(wire, MemberKind::Polecat, "gastown").unwrap();
        assert_eq!(member.tree, WorkingTree::Clean);
        assert!(!member.running);
        assert_eq!(member.path, PathBuf::new());
    }

    #[test]
    fn member_with_bad_name_is_dropped() {
        let wire = WireMember {
            name: Some("../etc".into()),
            ..WireMember::default()
        };
        assert!(member(wire, MemberKind::Crew, "gastown").is_none());
    }

    #[test]
    fn issue_priority_shapes() {
        let numeric = WireIssue {
            id: Some("gt-1".into()),
            priority: Some(Value::from(2)),
            ..WireIssue::default()
        };
        let labelled = WireIssue {
            id: Some("gt-2".into()),
            priority: Some(Value::from("P0")),
            updated_at: Some("2025-10-01T12:00:00Z".into()),
            ..WireIssue::default()
        };

        let numeric = issue(numeric).unwrap();
        assert_eq!(numeric.priority, Some(2));
        assert_eq!(numeric.title, NO_TITLE);
        assert_eq!(numeric.status, "unknown");

        let labelled = issue(labelled).unwrap();
        assert_eq!(labelled.priority, Some(0));
        assert!(labelled.updated_at.is_some());
    }

    #[test]
    fn issue_without_id_is_dropped() {
        assert!(issue(WireIssue::default()).is_none());
    }
}
