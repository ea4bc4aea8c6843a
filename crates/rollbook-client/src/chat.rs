//! Chat merging and polling.
//!
//! There is no push channel: the registry entry is fetched on a fixed
//! interval and its message list replaces the confirmed view verbatim.
//! Messages this client has sent but not yet seen come back in a poll are
//! tracked separately and re-appended after the confirmed list, keyed by
//! message id — never by position — so a send that lands between two polls
//! is shown exactly once at every point of the race.
//!
//! [`ChatFeed`] is the pure merge state; [`ChatSession`] wires it to a
//! [`SyncClient`] and owns the poll task.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use rollbook_shared::chat::{ChatMessage, MessageKind, SenderId};
use rollbook_shared::code::ShareCode;
use rollbook_shared::constants::CHAT_POLL_INTERVAL_SECS;

use crate::error::SyncError;
use crate::sync::SyncClient;

/// Where a locally tracked message is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    /// Network send still in flight.
    Sending,
    /// The registry confirmed the append, but no poll has shown the
    /// message yet.
    Delivered,
}

/// The merged message view: confirmed server state plus optimistic local
/// sends.
#[derive(Debug, Default)]
pub struct ChatFeed {
    confirmed: Vec<ChatMessage>,
    local: Vec<(ChatMessage, Delivery)>,
    is_locked: bool,
}

impl ChatFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the feed from a freshly fetched snapshot.
    pub fn from_snapshot(messages: Vec<ChatMessage>, is_locked: bool) -> Self {
        Self {
            confirmed: messages,
            local: Vec::new(),
            is_locked,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked
    }

    /// Client-side mirror of the server's lock rule, used to fail sends
    /// fast.  The server check stays authoritative.
    pub fn can_send(&self, sender: &SenderId) -> bool {
        !self.is_locked || sender.is_teacher()
    }

    /// Start tracking an optimistic send.  The message becomes visible
    /// immediately.
    pub fn track_pending(&mut self, message: ChatMessage) {
        self.local.push((message, Delivery::Sending));
    }

    /// The registry confirmed a send.  The entry is kept (still visible)
    /// until some poll includes its id, at which point the server copy
    /// takes over.
    pub fn mark_delivered(&mut self, id: &str) {
        if let Some(entry) = self.local.iter_mut().find(|(m, _)| m.id == id) {
            entry.1 = Delivery::Delivered;
        }
    }

    /// A send failed: roll the optimistic entry back out.
    pub fn discard_pending(&mut self, id: &str) {
        self.local.retain(|(m, _)| m.id != id);
    }

    /// Optimistically remove a message (local delete).  Polling restores it
    /// if the registry refuses the deletion.
    pub fn remove(&mut self, id: &str) {
        self.confirmed.retain(|m| m.id != id);
        self.local.retain(|(m, _)| m.id != id);
    }

    /// Apply one poll result: the server list replaces the confirmed view
    /// verbatim, and any locally tracked message whose id now appears
    /// server-side stops being tracked.  Messages deleted on the server
    /// simply stop appearing.
    pub fn apply_poll(&mut self, messages: Vec<ChatMessage>, is_locked: bool) {
        self.local
            .retain(|(m, _)| !messages.iter().any(|s| s.id == m.id));
        self.confirmed = messages;
        self.is_locked = is_locked;
    }

    /// The merged, ordered view: confirmed messages first, then local
    /// not-yet-confirmed sends in send order.  Ids are unique across the
    /// result.
    pub fn visible(&self) -> Vec<&ChatMessage> {
        self.confirmed
            .iter()
            .chain(self.local.iter().map(|(m, _)| m))
            .collect()
    }
}

/// An open chat against one registry entry: send path plus the poll loop.
///
/// Dropping (or [`close`](Self::close)-ing) the session aborts the poll
/// task, which is how polling is cancelled when the chat view goes away.
pub struct ChatSession {
    client: SyncClient,
    code: ShareCode,
    sender: SenderId,
    sender_name: String,
    feed: Arc<Mutex<ChatFeed>>,
    poller: Option<JoinHandle<()>>,
}

impl ChatSession {
    /// Fetch the entry once to seed the feed, then start polling every
    /// three seconds.
    pub async fn open(
        client: SyncClient,
        code: ShareCode,
        sender: SenderId,
        sender_name: impl Into<String>,
    ) -> Result<Self, SyncError> {
        let snapshot = client.fetch(&code).await?;
        let feed = Arc::new(Mutex::new(ChatFeed::from_snapshot(
            snapshot.class.messages,
            snapshot.class.is_chat_locked,
        )));

        let poller = tokio::spawn(poll_loop(client.clone(), code.clone(), feed.clone()));

        Ok(Self {
            client,
            code,
            sender,
            sender_name: sender_name.into(),
            feed,
            poller: Some(poller),
        })
    }

    /// Current merged message list (cloned out of the feed).
    pub fn messages(&self) -> Vec<ChatMessage> {
        let feed = self.feed.lock().expect("feed lock");
        feed.visible().into_iter().cloned().collect()
    }

    pub fn is_locked(&self) -> bool {
        self.feed.lock().expect("feed lock").is_locked()
    }

    /// Send a text message with optimistic display: the message shows up in
    /// [`messages`](Self::messages) before the network call resolves and is
    /// rolled back if the call fails.
    pub async fn send_text(&self, content: impl Into<String>) -> Result<ChatMessage, SyncError> {
        let message = ChatMessage::text(self.sender.clone(), &self.sender_name, content.into());
        self.send(message).await
    }

    /// Send an image or file message carrying an inline data URL.
    pub async fn send_attachment(
        &self,
        kind: MessageKind,
        file_url: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Result<ChatMessage, SyncError> {
        let message = ChatMessage::attachment(
            self.sender.clone(),
            &self.sender_name,
            kind,
            file_url.into(),
            file_name.into(),
        );
        self.send(message).await
    }

    async fn send(&self, message: ChatMessage) -> Result<ChatMessage, SyncError> {
        {
            let mut feed = self.feed.lock().expect("feed lock");
            if !feed.can_send(&self.sender) {
                return Err(SyncError::Forbidden("Chat is locked by teacher".to_string()));
            }
            feed.track_pending(message.clone());
        }

        match self.client.send_message(&self.code, &message).await {
            Ok(()) => {
                self.feed
                    .lock()
                    .expect("feed lock")
                    .mark_delivered(&message.id);
                Ok(message)
            }
            Err(e) => {
                self.feed
                    .lock()
                    .expect("feed lock")
                    .discard_pending(&message.id);
                Err(e)
            }
        }
    }

    /// Delete a message, optimistically removing it from the view.  If the
    /// registry refuses, the error is returned and the next poll restores
    /// the message.
    pub async fn delete(&self, message_id: &str) -> Result<(), SyncError> {
        self.feed.lock().expect("feed lock").remove(message_id);
        self.client
            .delete_message(&self.code, message_id, &self.sender)
            .await
    }

    /// Toggle the chat lock (teacher only), flipping the local flag
    /// optimistically and reverting it if the registry refuses.
    pub async fn set_lock(&self, locked: bool) -> Result<(), SyncError> {
        let previous = {
            let mut feed = self.feed.lock().expect("feed lock");
            let previous = feed.is_locked;
            feed.is_locked = locked;
            previous
        };

        match self
            .client
            .set_chat_lock(&self.code, locked, &self.sender)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => {
                self.feed.lock().expect("feed lock").is_locked = previous;
                Err(e)
            }
        }
    }

    /// Stop polling.  Also happens on drop.
    pub fn close(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
            debug!(code = %self.code, "chat polling stopped");
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.close();
    }
}

async fn poll_loop(client: SyncClient, code: ShareCode, feed: Arc<Mutex<ChatFeed>>) {
    let mut interval =
        tokio::time::interval(std::time::Duration::from_secs(CHAT_POLL_INTERVAL_SECS));
    // The session seeded the feed already; skip the immediate first tick.
    interval.tick().await;

    loop {
        interval.tick().await;
        match client.fetch(&code).await {
            Ok(snapshot) => {
                let mut feed = feed.lock().expect("feed lock");
                feed.apply_poll(snapshot.class.messages, snapshot.class.is_chat_locked);
            }
            Err(e) => {
                // A failed poll never clears state; the next tick retries.
                warn!(code = %code, error = %e, "poll failed, keeping previous state");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str, sender: SenderId, content: &str) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            sender_id: sender,
            sender_name: "x".to_string(),
            content: content.to_string(),
            timestamp: chrono::DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
            kind: MessageKind::Text,
            file_url: None,
            file_name: None,
        }
    }

    fn ids(feed: &ChatFeed) -> Vec<String> {
        feed.visible().iter().map(|m| m.id.clone()).collect()
    }

    #[test]
    fn optimistic_send_is_visible_immediately() {
        let mut feed = ChatFeed::new();
        feed.track_pending(message("m1", SenderId::teacher(), "hi"));
        assert_eq!(ids(&feed), ["m1"]);
    }

    #[test]
    fn failed_send_rolls_back() {
        let mut feed = ChatFeed::new();
        feed.track_pending(message("m1", SenderId::teacher(), "hi"));
        feed.discard_pending("m1");
        assert!(feed.visible().is_empty());
    }

    #[test]
    fn a_message_never_appears_twice_across_the_confirmation_race() {
        let mut feed = ChatFeed::new();
        let m = message("m1", SenderId::teacher(), "hi");

        // Send fired, poll returns BEFORE the send confirmation: the server
        // list does not contain m1 yet.
        feed.track_pending(m.clone());
        feed.apply_poll(vec![], false);
        assert_eq!(ids(&feed), ["m1"]);

        // Send confirms.
        feed.mark_delivered("m1");
        assert_eq!(ids(&feed), ["m1"]);

        // Next poll includes m1: still exactly one copy.
        feed.apply_poll(vec![m.clone()], false);
        assert_eq!(ids(&feed), ["m1"]);

        // And again — the local entry is gone, the server copy remains.
        feed.apply_poll(vec![m], false);
        assert_eq!(ids(&feed), ["m1"]);
    }

    #[test]
    fn delivered_message_survives_a_stale_poll() {
        let mut feed = ChatFeed::new();
        let m = message("m1", SenderId::teacher(), "hi");

        feed.track_pending(m.clone());
        feed.mark_delivered("m1");
        // A fetch that raced ahead of the append still doesn't show m1.
        feed.apply_poll(vec![], false);
        assert_eq!(ids(&feed), ["m1"]);
    }

    #[test]
    fn deletions_propagate_by_absence() {
        let mut feed = ChatFeed::from_snapshot(
            vec![
                message("m1", SenderId::teacher(), "one"),
                message("m2", SenderId::teacher(), "two"),
            ],
            false,
        );
        feed.apply_poll(vec![message("m2", SenderId::teacher(), "two")], false);
        assert_eq!(ids(&feed), ["m2"]);
    }

    #[test]
    fn remote_messages_interleave_with_local_pending() {
        let mut feed = ChatFeed::new();
        feed.track_pending(message("local", SenderId::teacher(), "mine"));

        let viewer = SenderId::new_viewer();
        feed.apply_poll(vec![message("remote", viewer, "theirs")], false);

        // Confirmed first, then still-pending local sends.
        assert_eq!(ids(&feed), ["remote", "local"]);
    }

    #[test]
    fn lock_gates_non_teacher_sends_only() {
        let viewer = SenderId::new_viewer();
        let mut feed = ChatFeed::new();

        feed.apply_poll(vec![], true);
        assert!(feed.is_locked());
        assert!(!feed.can_send(&viewer));
        assert!(feed.can_send(&SenderId::teacher()));

        // Lock change observed on a later poll is reflected immediately.
        feed.apply_poll(vec![], false);
        assert!(feed.can_send(&viewer));
    }

    #[test]
    fn optimistic_remove_drops_both_copies() {
        let mut feed = ChatFeed::from_snapshot(
            vec![message("m1", SenderId::teacher(), "one")],
            false,
        );
        feed.track_pending(message("m2", SenderId::teacher(), "two"));
        feed.remove("m1");
        feed.remove("m2");
        assert!(feed.visible().is_empty());
    }
}
