//! Per-channel message log with optimistic-send reconciliation.

use tracing::debug;

use banter_shared::constants::RECONCILE_WINDOW_SECS;
use banter_shared::model::Message;
use banter_shared::protocol::{ReactionAction, ReactionUpdate};
use banter_shared::types::MessageId;

/// Ordered message log for the active channel.
///
/// History snapshots replace the whole log.  Incoming messages append,
/// except when they are the server echo of a pending optimistic send, in
/// which case they replace that entry in place so the message keeps its
/// position.
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole log with a history snapshot, keeping server order.
    pub fn replace_all(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    /// Append a local optimistic send.
    pub fn push_pending(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Remove a message by id, returning it if present.
    pub fn remove(&mut self, id: &MessageId) -> Option<Message> {
        let index = self.messages.iter().position(|m| &m.id == id)?;
        Some(self.messages.remove(index))
    }

    /// Fold a pushed message into the log.
    ///
    /// The echo of an optimistic send replaces the pending entry in place,
    /// matched by the `client_ref` correlation tag first and, for echoes
    /// that lost the tag, by sender and content close in time.  Anything
    /// else appends.  Returns false when the log did not change.
    pub fn apply_incoming(&mut self, incoming: Message) -> bool {
        if incoming.client_ref.is_some() {
            if let Some(entry) = self
                .messages
                .iter_mut()
                .find(|m| m.pending && m.client_ref == incoming.client_ref)
            {
                *entry = incoming;
                entry.pending = false;
                return true;
            }
        }

        if self.messages.iter().any(|m| m.id == incoming.id) {
            debug!(id = %incoming.id, "Dropping duplicate message");
            return false;
        }

        if let Some(entry) = self.messages.iter_mut().find(|m| {
            m.pending
                && m.sender_id == incoming.sender_id
                && m.content == incoming.content
                && (incoming.created_at - m.created_at).num_seconds().abs()
                    <= RECONCILE_WINDOW_SECS
        }) {
            *entry = incoming;
            entry.pending = false;
            return true;
        }

        self.messages.push(incoming);
        true
    }

    /// Apply a server-confirmed reaction change.  Returns true when the log
    /// changed.
    pub fn apply_reaction(&mut self, update: &ReactionUpdate) -> bool {
        let message = match self.messages.iter_mut().find(|m| m.id == update.message_id) {
            Some(message) => message,
            None => {
                debug!(id = %update.message_id, "Reaction update for unknown message");
                return false;
            }
        };

        match update.action {
            ReactionAction::Add => {
                if message.reactions.iter().any(|r| r.id == update.reaction.id) {
                    return false;
                }
                message.reactions.push(update.reaction.clone());
                true
            }
            ReactionAction::Remove => {
                let before = message.reactions.len();
                message.reactions.retain(|r| r.id != update.reaction.id);
                message.reactions.len() != before
            }
        }
    }

    /// Mark every message as read.
    pub fn mark_all_read(&mut self) {
        for message in &mut self.messages {
            message.read = true;
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of optimistic sends still awaiting their echo.
    pub fn pending_count(&self) -> usize {
        self.messages.iter().filter(|m| m.pending).count()
    }
}
