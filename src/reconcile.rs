//! Message reconciliation for polled mail streams.
//!
//! A [`Reconciler`] remembers which message ids each stream has already
//! delivered. Polling hands it a fresh batch and gets back only the messages
//! not seen before, latest first. The seen sets live for the life of the
//! process and are never persisted, so a restart re-delivers everything once.

mod threads;

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::model::{Direction, MailMessage};

pub use threads::threads;

/// Address segments that identify a managed agent as the sender.
pub const MANAGED_SEGMENTS: &[&str] = &["/crew/", "/polecats/"];

/// Label prefix carrying a thread id.
pub const THREAD_LABEL: &str = "thread:";

/// Label prefix carrying the id of the message being replied to.
pub const REPLY_TO_LABEL: &str = "reply-to:";

/// Narrows a poll to traffic from one rig, one member, or both.
///
/// Matching is a substring test against the sender address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeFilter {
    pub rig: Option<String>,
    pub member: Option<String>,
}

impl ScopeFilter {
    pub fn matches(&self, from: &str) -> bool {
        self.rig.as_deref().is_none_or(|rig| from.contains(rig))
            && self.member.as_deref().is_none_or(|m| from.contains(m))
    }

    /// The seen-set key for a mailbox polled through this filter.
    ///
    /// Each distinct filter is its own stream: a narrow poll never hides
    /// messages from a broader one.
    pub fn stream_key(&self, address: &str) -> String {
        format!(
            "{address}|{}|{}",
            self.rig.as_deref().unwrap_or_default(),
            self.member.as_deref().unwrap_or_default()
        )
    }
}

/// Per-stream record of delivered message ids.
#[derive(Debug, Default)]
pub struct Reconciler {
    seen: Mutex<HashMap<String, HashSet<String>>>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the messages in `batch` that `stream` has not delivered yet.
    ///
    /// The filter is applied first. Checking and marking happen under one
    /// lock, so two concurrent polls of the same stream never both deliver
    /// a message. Duplicates within the batch are delivered once.
    pub fn poll(
        &self,
        stream: &str,
        batch: Vec<MailMessage>,
        filter: &ScopeFilter,
    ) -> Vec<MailMessage> {
        let in_scope: Vec<MailMessage> = batch
            .into_iter()
            .filter(|m| filter.matches(&m.from))
            .collect();

        let mut fresh = {
            let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
            let ids = seen.entry(stream.to_string()).or_default();
            in_scope
                .into_iter()
                .filter(|m| ids.insert(m.id.clone()))
                .collect::<Vec<_>>()
        };

        sort_latest_first(&mut fresh);
        tracing::debug!(stream, new = fresh.len(), "reconciled poll");
        fresh
    }

    /// How many ids `stream` has delivered so far.
    pub fn seen_count(&self, stream: &str) -> usize {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(stream)
            .map_or(0, HashSet::len)
    }
}

/// Classify a message by its sender.
///
/// Mail from a managed agent is received; anything else takes the call
/// site's default.
pub fn direction(from: &str, default: Direction) -> Direction {
    if MANAGED_SEGMENTS.iter().any(|s| from.contains(s)) {
        Direction::Received
    } else {
        default
    }
}

/// Recover thread and reply-to ids from `thread:<id>` / `reply-to:<id>` labels.
///
/// The first label per prefix wins; empty values are ignored.
pub fn thread_labels(labels: &[String]) -> (Option<String>, Option<String>) {
    let first = |prefix: &str| {
        labels
            .iter()
            .filter_map(|l| l.strip_prefix(prefix))
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(String::from)
    };
    (first(THREAD_LABEL), first(REPLY_TO_LABEL))
}

/// Sort by timestamp, most recent first. Ties keep their order.
pub fn sort_latest_first(messages: &mut [MailMessage]) {
    messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::sync::Arc;

    use jiff::Timestamp;

    pub(crate) fn message(id: &str, from: &str, second: i64) -> MailMessage {
        MailMessage {
            id: id.to_string(),
            from: from.to_string(),
            to: "mayor/".to_string(),
            subject: format!("subject {id}"),
            body: String::new(),
            timestamp: Timestamp::from_second(1_700_000_000 + second).unwrap(),
            read: false,
            thread_id: None,
            reply_to: None,
            priority: None,
            kind: None,
            labels: Vec::new(),
            direction: Direction::Received,
        }
    }

    fn batch() -> Vec<MailMessage> {
        vec![
            message("a", "gastown/crew/joe", 1),
            message("b", "gastown/witness", 3),
            message("c", "beads/crew/max", 2),
        ]
    }

    fn ids(messages: &[MailMessage]) -> Vec<&str> {
        messages.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn second_identical_poll_is_empty() {
        let reconciler = Reconciler::new();
        let all = ScopeFilter::default();

        let first = reconciler.poll("mayor/", batch(), &all);
        let second = reconciler.poll("mayor/", batch(), &all);

        assert_eq!(ids(&first), ["b", "c", "a"]);
        assert!(second.is_empty());
        assert_eq!(reconciler.seen_count("mayor/"), 3);
    }

    #[test]
    fn only_new_messages_are_delivered() {
        let reconciler = Reconciler::new();
        let all = ScopeFilter::default();
        reconciler.poll("mayor/", batch(), &all);

        let mut next = batch();
        next.push(message("d", "gastown/crew/joe", 9));
        let fresh = reconciler.poll("mayor/", next, &all);

        assert_eq!(ids(&fresh), ["d"]);
    }

    #[test]
    fn streams_are_independent() {
        let reconciler = Reconciler::new();
        let all = ScopeFilter::default();
        reconciler.poll("mayor/", batch(), &all);

        assert_eq!(reconciler.poll("deacon/", batch(), &all).len(), 3);
    }

    #[test]
    fn duplicates_within_a_batch_are_delivered_once() {
        let reconciler = Reconciler::new();
        let dupes = vec![message("a", "x/crew/y", 1), message("a", "x/crew/y", 1)];

        assert_eq!(
            reconciler
                .poll("s", dupes, &ScopeFilter::default())
                .len(),
            1
        );
    }

    #[test]
    fn filter_applies_before_dedup() {
        let reconciler = Reconciler::new();
        let joe = ScopeFilter {
            rig: Some("gastown".into()),
            member: Some("joe".into()),
        };

        let fresh = reconciler.poll("stream", batch(), &joe);
        assert_eq!(ids(&fresh), ["a"]);

        // Filtered-out messages were never marked seen.
        let all = reconciler.poll("stream", batch(), &ScopeFilter::default());
        assert_eq!(ids(&all), ["b", "c"]);
    }

    #[test]
    fn stream_keys_differ_by_filter() {
        let address = "mayor/";
        let all = ScopeFilter::default();
        let rig = ScopeFilter {
            rig: Some("gastown".into()),
            member: None,
        };
        assert_ne!(all.stream_key(address), rig.stream_key(address));
    }

    #[test]
    fn ties_keep_arrival_order() {
        let mut messages = vec![
            message("first", "a/crew/b", 5),
            message("second", "a/crew/b", 5),
            message("newest", "a/crew/b", 6),
        ];
        sort_latest_first(&mut messages);
        assert_eq!(ids(&messages), ["newest", "first", "second"]);
    }

    #[test]
    fn concurrent_polls_never_double_deliver() {
        let reconciler = Arc::new(Reconciler::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reconciler = Arc::clone(&reconciler);
                std::thread::spawn(move || {
                    reconciler
                        .poll("shared", batch(), &ScopeFilter::default())
                        .len()
                })
            })
            .collect();

        let delivered: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(delivered, 3);
    }

    #[test]
    fn direction_by_sender() {
        assert_eq!(
            direction("gastown/crew/joe", Direction::Sent),
            Direction::Received
        );
        assert_eq!(
            direction("gastown/polecats/nux", Direction::Sent),
            Direction::Received
        );
        assert_eq!(direction("mayor/", Direction::Sent), Direction::Sent);
        assert_eq!(direction("mayor/", Direction::Received), Direction::Received);
    }

    #[test]
    fn thread_labels_recovered() {
        let labels = vec![
            "thread:abc".to_string(),
            "reply-to:xyz".to_string(),
            "other:1".to_string(),
        ];
        assert_eq!(
            thread_labels(&labels),
            (Some("abc".to_string()), Some("xyz".to_string()))
        );
    }

    #[test]
    fn first_label_per_prefix_wins() {
        let labels = vec![
            "thread:".to_string(),
            "thread:one".to_string(),
            "thread:two".to_string(),
        ];
        assert_eq!(thread_labels(&labels), (Some("one".to_string()), None));
    }
}
