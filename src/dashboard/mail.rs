//! Mail operations.

use jiff::Timestamp;

use super::Dashboard;
use crate::classify;
use crate::error::Result;
use crate::model::{Direction, MailMessage, Priority, SendReceipt, Thread};
use crate::parse;
use crate::projection;
use crate::reconcile::{self, ScopeFilter};
use crate::sanitize::{self, BODY_MAX, SUBJECT_MAX, ValidationError};

impl Dashboard {
    /// Every message in `address`'s inbox, latest first.
    pub async fn mail_inbox(&self, address: &str) -> Result<Vec<MailMessage>> {
        let address = sanitize::address("address", address)?;
        let mut messages = self.fetch_inbox(&address, Direction::Received).await?;
        reconcile::sort_latest_first(&mut messages);
        Ok(messages)
    }

    /// The inbox grouped into threads, most recently active first.
    pub async fn mail_threads(&self, address: &str) -> Result<Vec<Thread>> {
        let address = sanitize::address("address", address)?;
        let messages = self.fetch_inbox(&address, Direction::Received).await?;
        Ok(reconcile::threads(&messages))
    }

    /// `gt mail read <id> --json`. `None` when the output was unreadable.
    pub async fn mail_read(&self, id: &str) -> Result<Option<MailMessage>> {
        let id = sanitize::identifier("id", id)?;
        let invocation = self
            .gt(self.config.timeouts.fast())
            .args(["mail", "read", id.as_str(), "--json"]);
        let captured = self
            .run(invocation, &classify::MAIL_READ, &format!("read message {id}"))
            .await?;

        let captured_at = Timestamp::now();
        Ok(parse::mail::parse_one(&captured.stdout)
            .into_first()
            .map(|wire| projection::mail(wire, captured_at, Direction::Received)))
    }

    /// `gt mail send <to> -s <subject> -m <body> [--priority p] [--reply-to id]`.
    pub async fn mail_send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        priority: Option<&str>,
        reply_to: Option<&str>,
    ) -> Result<SendReceipt> {
        let to = sanitize::address("to", to)?;
        let subject = sanitize::free_text("subject", subject, SUBJECT_MAX)?;
        let body = sanitize::free_text("body", body, BODY_MAX)?;
        let priority = priority
            .map(|p| {
                Priority::parse(p).ok_or_else(|| {
                    ValidationError::new("priority", format!("unknown priority '{p}'"))
                })
            })
            .transpose()?;
        let reply_to = reply_to
            .map(|r| sanitize::identifier("reply_to", r))
            .transpose()?;

        let mut invocation = self.gt(self.config.timeouts.mail()).args([
            "mail",
            "send",
            to.as_str(),
            "-s",
            subject.as_str(),
            "-m",
            body.as_str(),
        ]);
        if let Some(priority) = priority {
            invocation = invocation.args(["--priority", priority.as_str()]);
        }
        if let Some(reply_to) = &reply_to {
            invocation = invocation.args(["--reply-to", reply_to.as_str()]);
        }

        let captured = self
            .run(invocation, &classify::MAIL_SEND, &format!("send mail to {to}"))
            .await?;
        let id = parse::mail::sent_id(&captured.stdout);
        tracing::info!(
            %to,
            subject = %subject.shell_quoted(),
            id = id.as_deref().unwrap_or("?"),
            "mail sent"
        );

        Ok(SendReceipt {
            id,
            to,
            subject: subject.as_str().to_string(),
        })
    }

    /// New messages in `address` since the last poll through the same filter.
    ///
    /// With a member filter the poll is watching traffic to and from that
    /// member, so mail not sent by a managed agent counts as sent.
    pub async fn mail_poll(
        &self,
        address: &str,
        rig: Option<&str>,
        member: Option<&str>,
    ) -> Result<Vec<MailMessage>> {
        let address = sanitize::address("address", address)?;
        let filter = ScopeFilter {
            rig: rig.map(|r| sanitize::identifier("rig", r)).transpose()?,
            member: member
                .map(|m| sanitize::identifier("member", m))
                .transpose()?,
        };
        let default_direction = if filter.member.is_some() {
            Direction::Sent
        } else {
            Direction::Received
        };

        let batch = self.fetch_inbox(&address, default_direction).await?;
        let stream = filter.stream_key(&address);
        let fresh = self.reconciler.poll(&stream, batch, &filter);
        tracing::debug!(
            %stream,
            new = fresh.len(),
            seen = self.reconciler.seen_count(&stream),
            "mail poll"
        );
        Ok(fresh)
    }

    /// `gt mail inbox <address> --json`, falling back to the text listing.
    async fn fetch_inbox(
        &self,
        address: &str,
        default_direction: Direction,
    ) -> Result<Vec<MailMessage>> {
        let timeout = self.config.timeouts.mail();
        let json = self
            .gt(timeout)
            .args(["mail", "inbox", address, "--json"]);
        let text = self.gt(timeout).args(["mail", "inbox", address]);

        let wire = self
            .json_or_text(
                json,
                text,
                &classify::MAIL_LIST,
                &format!("list mail for {address}"),
                parse::mail::parse_json,
                parse::mail::parse_text,
            )
            .await?;

        let captured_at = Timestamp::now();
        Ok(wire
            .into_iter()
            .map(|w| projection::mail(w, captured_at, default_direction))
            .collect())
    }
}
