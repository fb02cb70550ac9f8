//! Grouping messages into conversation threads.

use std::collections::{HashMap, HashSet};

use crate::model::{MailMessage, Thread};

use super::sort_latest_first;

/// Group `messages` into threads, most recently active first.
///
/// A message without a thread id joins the thread of the message it
/// replies to, following the reply chain through the set. Anything left
/// unresolved forms a thread under its own id.
pub fn threads(messages: &[MailMessage]) -> Vec<Thread> {
    let by_id: HashMap<&str, &MailMessage> =
        messages.iter().map(|m| (m.id.as_str(), m)).collect();

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<MailMessage>> = HashMap::new();
    for message in messages {
        let key = thread_of(message, &by_id);
        groups
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(message.clone());
    }

    let mut threads: Vec<Thread> = order
        .into_iter()
        .filter_map(|id| {
            let messages = groups.remove(&id)?;
            Some(build(id, messages))
        })
        .collect();
    threads.sort_by(|a, b| b.latest.cmp(&a.latest));
    threads
}

fn thread_of(message: &MailMessage, by_id: &HashMap<&str, &MailMessage>) -> String {
    let mut current = message;
    let mut visited = HashSet::new();
    loop {
        if let Some(thread) = current.thread_id.as_deref().filter(|t| !t.is_empty()) {
            return thread.to_string();
        }
        if !visited.insert(current.id.as_str()) {
            break;
        }
        match current.reply_to.as_deref().and_then(|r| by_id.get(r).copied()) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    // Root of an unthreaded chain names the thread.
    current.id.clone()
}

fn build(id: String, mut messages: Vec<MailMessage>) -> Thread {
    sort_latest_first(&mut messages);
    let subject = messages
        .last()
        .map(|m| m.subject.clone())
        .unwrap_or_default();
    let latest = messages
        .first()
        .map(|m| m.timestamp)
        .unwrap_or_default();
    let unread = u32::try_from(messages.iter().filter(|m| !m.read).count()).unwrap_or(u32::MAX);
    Thread {
        id,
        subject,
        messages,
        latest,
        unread,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::reconcile::tests::message;

    fn threaded(id: &str, second: i64, thread: Option<&str>, reply_to: Option<&str>) -> MailMessage {
        MailMessage {
            thread_id: thread.map(String::from),
            reply_to: reply_to.map(String::from),
            ..message(id, "gastown/crew/joe", second)
        }
    }

    #[test]
    fn groups_by_thread_id() {
        let messages = vec![
            threaded("a", 1, Some("t1"), None),
            threaded("b", 5, Some("t2"), None),
            threaded("c", 3, Some("t1"), None),
        ];
        let threads = threads(&messages);

        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].id, "t2");
        assert_eq!(threads[1].id, "t1");
        let ids: Vec<_> = threads[1].messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["c", "a"]);
        assert_eq!(threads[1].subject, "subject a");
        assert_eq!(threads[1].unread, 2);
    }

    #[test]
    fn replies_inherit_their_target_thread() {
        let messages = vec![
            threaded("root", 1, Some("t1"), None),
            threaded("reply", 2, None, Some("root")),
            threaded("reply2", 3, None, Some("reply")),
        ];
        let threads = threads(&messages);

        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].messages.len(), 3);
    }

    #[test]
    fn unthreaded_chain_is_named_by_its_root() {
        let messages = vec![
            threaded("root", 1, None, None),
            threaded("reply", 2, None, Some("root")),
        ];
        let threads = threads(&messages);

        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].id, "root");
    }

    #[test]
    fn reply_to_missing_message_is_a_singleton() {
        let messages = vec![threaded("orphan", 1, None, Some("gone"))];
        let threads = threads(&messages);

        assert_eq!(threads[0].id, "orphan");
    }

    #[test]
    fn reply_cycle_terminates() {
        let messages = vec![
            threaded("a", 1, None, Some("b")),
            threaded("b", 2, None, Some("a")),
        ];
        let threads = threads(&messages);
        let total: usize = threads.iter().map(|t| t.messages.len()).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn empty_input() {
        assert!(threads(&[]).is_empty());
    }
}
