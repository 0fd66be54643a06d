//! Messages waiting for players other than the one who triggered them.
//!
//! A transfer offer goes to the receiver and a resolution notice goes to
//! the sender. Neither is the requester, so both are parked here until
//! the recipient's client drains its inbox. Each inbox holds at most
//! [`INBOX_CAPACITY`] messages; the oldest is dropped to make room.

use std::collections::{HashMap, VecDeque};

use lifegame_types::PlayerId;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::message::OutgoingMessage;

/// Most messages kept for one player who has not polled.
pub const INBOX_CAPACITY: usize = 50;

/// Per-player queue of undelivered messages.
#[derive(Debug, Default)]
pub struct Mailbox {
    inner: Mutex<HashMap<PlayerId, VecDeque<OutgoingMessage>>>,
}

impl Mailbox {
    /// An empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a message for `to`.
    pub async fn push(&self, to: PlayerId, message: OutgoingMessage) {
        let mut inner = self.inner.lock().await;
        let inbox = inner.entry(to).or_default();
        if inbox.len() >= INBOX_CAPACITY && inbox.pop_front().is_some() {
            warn!(player_id = %to, "inbox full, dropped oldest message");
        }
        inbox.push_back(message);
        debug!(player_id = %to, waiting = inbox.len(), "message parked");
    }

    /// Take every message waiting for `id`, oldest first.
    pub async fn drain(&self, id: PlayerId) -> Vec<OutgoingMessage> {
        self.inner
            .lock()
            .await
            .remove(&id)
            .map(Vec::from)
            .unwrap_or_default()
    }

    /// Number of messages waiting for `id`.
    pub async fn waiting(&self, id: PlayerId) -> usize {
        self.inner.lock().await.get(&id).map_or(0, VecDeque::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_empties_only_that_inbox() {
        let mailbox = Mailbox::new();
        mailbox.push(PlayerId(1), OutgoingMessage::text("a")).await;
        mailbox.push(PlayerId(1), OutgoingMessage::text("b")).await;
        mailbox.push(PlayerId(2), OutgoingMessage::text("c")).await;

        let texts: Vec<String> = mailbox
            .drain(PlayerId(1))
            .await
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["a", "b"]);
        assert!(mailbox.drain(PlayerId(1)).await.is_empty());
        assert_eq!(mailbox.waiting(PlayerId(2)).await, 1);
    }

    #[tokio::test]
    async fn full_inbox_drops_the_oldest_message() {
        let mailbox = Mailbox::new();
        for i in 0..=INBOX_CAPACITY {
            mailbox.push(PlayerId(7), OutgoingMessage::text(format!("m{i}"))).await;
        }
        assert_eq!(mailbox.waiting(PlayerId(7)).await, INBOX_CAPACITY);

        let drained = mailbox.drain(PlayerId(7)).await;
        assert_eq!(drained.first().map(|m| m.text.as_str()), Some("m1"));
        assert_eq!(
            drained.last().map(|m| m.text.clone()),
            Some(format!("m{INBOX_CAPACITY}"))
        );
    }
}
