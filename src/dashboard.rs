//! The dashboard service: validated requests in, typed records out.
//!
//! Each operation validates its arguments, runs one or two `gt`/`bd`
//! commands from the town root under a timeout, parses what came back and
//! projects it into model types. Failures are classified against the
//! operation's own phrase table.

mod beads;
mod crew;
mod mail;
mod request;
mod town;

use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;
use uuid::Uuid;

use crate::classify::PhraseTable;
use crate::config::Config;
use crate::error::{DashError, Result};
use crate::invoke::{Captured, Invocation, InvocationError};
use crate::parse::Parsed;
use crate::reconcile::Reconciler;

pub use request::{Done, Request, Response};

/// Shared, cheap to clone behind an `Arc`. Holds no per-request state; the
/// reconciler's seen sets are the only thing that persists between calls.
#[derive(Debug)]
pub struct Dashboard {
    config: Config,
    reconciler: Arc<Reconciler>,
}

impl Dashboard {
    pub fn new(config: Config, reconciler: Arc<Reconciler>) -> Self {
        Self { config, reconciler }
    }

    /// Handle one request inside its own tracing span.
    pub async fn handle(&self, request: Request) -> Result<Response> {
        let id = Uuid::new_v4();
        let span = tracing::info_span!("request", %id, action = request.action());
        async move {
            let result = self.dispatch(request).await;
            if let Err(e) = &result {
                tracing::info!(kind = ?e.kind(), error = %e, "request failed");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, request: Request) -> Result<Response> {
        match request {
            Request::Status => self.status().await.map(Response::Status),
            Request::Agents { rig } => self.agents(rig.as_deref()).await.map(Response::Agents),
            Request::Rigs => self.rigs().await.map(Response::Rigs),
            Request::AgentStart { role, rig } => self
                .agent_start(&role, rig.as_deref())
                .await
                .map(Response::Done),
            Request::AgentStop { role, rig } => self
                .agent_stop(&role, rig.as_deref())
                .await
                .map(Response::Done),
            Request::CrewList { rig } => self.crew_list(&rig).await.map(Response::Members),
            Request::CrewAdd { rig, name } => self.crew_add(&rig, &name).await.map(Response::Done),
            Request::CrewRemove { rig, name, force } => self
                .crew_remove(&rig, &name, force)
                .await
                .map(Response::Done),
            Request::CrewStart { rig, name } => {
                self.crew_start(&rig, &name).await.map(Response::Done)
            }
            Request::CrewStop { rig, name } => {
                self.crew_stop(&rig, &name).await.map(Response::Done)
            }
            Request::CrewNudge { rig, name, message } => self
                .crew_nudge(&rig, &name, &message)
                .await
                .map(Response::Done),
            Request::PolecatList { rig } => self.polecat_list(&rig).await.map(Response::Members),
            Request::MailInbox { address } => {
                self.mail_inbox(&address).await.map(Response::Messages)
            }
            Request::MailThreads { address } => {
                self.mail_threads(&address).await.map(Response::Threads)
            }
            Request::MailRead { id } => self.mail_read(&id).await.map(Response::Message),
            Request::MailSend {
                to,
                subject,
                body,
                priority,
                reply_to,
            } => self
                .mail_send(&to, &subject, &body, priority.as_deref(), reply_to.as_deref())
                .await
                .map(Response::Sent),
            Request::MailPoll {
                address,
                rig,
                member,
            } => self
                .mail_poll(&address, rig.as_deref(), member.as_deref())
                .await
                .map(Response::Messages),
            Request::Issues { status } => self.issues(status.as_deref()).await.map(Response::Issues),
        }
    }

    // ── Invocation helpers ──

    /// A `gt` command rooted at the town.
    fn gt(&self, timeout: Duration) -> Invocation {
        Invocation::new(&self.config.gt_program, timeout).current_dir(self.config.town_root())
    }

    /// A `bd` command rooted at the town.
    fn bd(&self, timeout: Duration) -> Invocation {
        Invocation::new(&self.config.bd_program, timeout).current_dir(self.config.town_root())
    }

    async fn run(
        &self,
        invocation: Invocation,
        table: &PhraseTable,
        what: &str,
    ) -> Result<Captured> {
        let captured = invocation
            .run()
            .await
            .map_err(|e| DashError::from_invocation(table, e, what))?;
        let stderr = captured.stderr.trim();
        if !stderr.is_empty() {
            tracing::debug!(%stderr, "command succeeded with stderr output");
        }
        Ok(captured)
    }

    /// Run the `--json` form of a command, falling back to its text form.
    ///
    /// The text form runs when the JSON form exits non-zero (older tools
    /// reject the flag) or prints something unparseable. A timed-out JSON
    /// form is not retried.
    async fn json_or_text<T>(
        &self,
        json: Invocation,
        text: Invocation,
        table: &PhraseTable,
        what: &str,
        parse_json: fn(&str) -> Parsed<T>,
        parse_text: fn(&str) -> Parsed<T>,
    ) -> Result<Vec<T>> {
        match json.run().await {
            Ok(captured) => {
                let parsed = parse_json(&captured.stdout);
                match &parsed.failure {
                    None => return Ok(parsed.into_records()),
                    Some(failure) => tracing::debug!(
                        command = failure.command,
                        reason = %failure.reason,
                        "json form unreadable, trying text"
                    ),
                }
            }
            Err(e) if e.timed_out() => return Err(DashError::from_invocation(table, e, what)),
            Err(e) => log_json_rejected(&e),
        }

        let captured = self.run(text, table, what).await?;
        Ok(parse_text(&captured.stdout).into_records())
    }
}

fn log_json_rejected(e: &InvocationError) {
    tracing::debug!(command = %e.command, exit = %e.exit, "json form failed, trying text");
}
