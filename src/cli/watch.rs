//! `townwatch watch`: poll one mailbox and stream new messages.
//!
//! Each poll goes through the dashboard's reconciler, so a message is
//! printed once no matter how many polls see it. A failed poll is logged
//! and the loop carries on with the next tick.

use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};

use crate::classify::ErrorKind;
use crate::dashboard::Dashboard;

use super::format::format_error;

pub(super) struct Options {
    pub address: String,
    pub rig: Option<String>,
    pub member: Option<String>,
    pub interval: Duration,

    /// Stop after this many polls. `None` runs until interrupted.
    pub count: Option<u64>,
}

pub(super) async fn run(dashboard: &Dashboard, options: Options) -> Result<(), String> {
    let mut ticker = time::interval(options.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut polls: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!(polls, "interrupted");
                return Ok(());
            }
        }

        let result = dashboard
            .mail_poll(
                &options.address,
                options.rig.as_deref(),
                options.member.as_deref(),
            )
            .await;
        polls += 1;

        match result {
            Ok(messages) => {
                // Oldest first reads naturally in a stream.
                for message in messages.iter().rev() {
                    let line = serde_json::to_string(message)
                        .map_err(|e| format!("failed to serialize message: {e}"))?;
                    println!("{line}");
                }
            }
            Err(e) if e.kind() == ErrorKind::InvalidInput => {
                return Err(format_error(&e.report()));
            }
            Err(e) => {
                tracing::warn!(error = %e, "poll failed, will retry next tick");
            }
        }

        if options.count.is_some_and(|max| polls >= max) {
            return Ok(());
        }
    }
}
