//! Output formatting for CLI display.

use crate::dashboard::Response;
use crate::error::ErrorReport;
use crate::model::Member;

/// Format an error report for stderr: message, kind, then the tool's own
/// words indented underneath.
pub(super) fn format_error(report: &ErrorReport) -> String {
    let kind = serde_json::to_value(report.kind)
        .ok()
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_default();
    match &report.detail {
        Some(detail) if detail != &report.message => {
            let indented = detail
                .lines()
                .map(|l| format!("  {l}"))
                .collect::<Vec<_>>()
                .join("\n");
            format!("{} [{kind}]\n{indented}", report.message)
        }
        _ => format!("{} [{kind}]", report.message),
    }
}

/// One-line human summary of a response, when there is something to say.
pub(super) fn describe_response(response: &Response) -> Option<String> {
    match response {
        Response::Status(status) => Some(format!(
            "{}: {} agent(s), {} rig(s)",
            status.name.as_deref().unwrap_or("town"),
            status.agents.len(),
            status.rigs.len()
        )),
        Response::Agents(agents) => {
            let running = agents.iter().filter(|a| a.running).count();
            Some(format!("{} agent(s), {running} running", agents.len()))
        }
        Response::Rigs(rigs) => Some(format!("{} rig(s)", rigs.len())),
        Response::Members(members) => Some(describe_members(members)),
        Response::Messages(messages) => {
            let unread = messages.iter().filter(|m| !m.read).count();
            Some(format!("{} message(s), {unread} unread", messages.len()))
        }
        Response::Message(None) => Some("message output was unreadable".to_string()),
        Response::Threads(threads) => Some(format!("{} thread(s)", threads.len())),
        Response::Sent(receipt) => Some(match &receipt.id {
            Some(id) => format!("Sent {id} to {}", receipt.to),
            None => format!("Sent to {}", receipt.to),
        }),
        Response::Issues(issues) => Some(format!("{} issue(s)", issues.len())),
        Response::Done(done) => Some(format!("{} {}", done.action, done.target)),
        Response::Message(Some(_)) => None,
    }
}

fn describe_members(members: &[Member]) -> String {
    let running = members.iter().filter(|m| m.running).count();
    let mail: u32 = members.iter().map(|m| m.mail_count).sum();
    format!(
        "{} member(s), {running} running, {mail} message(s) waiting",
        members.len()
    )
}
