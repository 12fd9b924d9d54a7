//! JSON wire protocol for the event socket.
//!
//! Every frame is a text message of the form
//! `{"event": "<kebab-case-name>", "data": {...}}`.  [`ClientEvent`] covers
//! the client-to-server vocabulary, [`ServerEvent`] the server-to-client
//! one.  Transport conditions (connect failures, disconnects) are not wire
//! events; they surface as `ConnectionStatus` transitions.

use serde::{Deserialize, Serialize};

use crate::error::WireError;
use crate::model::{Attachment, Message, Reaction, ReactionKind};
use crate::types::{ChannelId, MessageId, ReactionId, UserId};

/// Events sent from the client to the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Enter a channel room and request its history.
    JoinChannel(ChannelRef),

    /// Leave the current channel room.
    LeaveChannel(ChannelRef),

    /// The channel is on screen; unread state may be cleared.
    FocusChannel(ChannelRef),

    /// The channel left the screen.
    UnfocusChannel(ChannelRef),

    /// Post a message (carries the optimistic `clientRef` tag).
    NewMessage(Message),

    /// Local typing state changed.
    Typing(TypingSignal),

    /// Place a reaction on a message.
    AddReaction(ReactionIntent),

    /// Withdraw a previously placed reaction.
    RemoveReaction(ReactionRemoval),

    /// Announce that an out-of-band upload finished.
    FileUploadComplete(UploadNotice),
}

/// Events pushed from the server to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// The join request was accepted.
    ChannelJoined(ChannelRef),

    /// Full history snapshot, ordered oldest first.
    ChannelHistory(HistoryPayload),

    /// A single new or echoed message.
    Message(Message),

    /// A reaction was added to or removed from a message.
    ReactionUpdate(ReactionUpdate),

    /// A user entered the channel.
    UserJoined(PresencePayload),

    /// A user left the channel.
    UserLeft(PresencePayload),

    /// A remote user's typing state changed.
    UserTyping(TypingSignal),

    /// The server rejected a request or hit an internal failure.
    Error(ErrorPayload),
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Minimal payload naming a channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRef {
    pub channel_id: ChannelId,
}

impl ChannelRef {
    pub fn new(channel_id: ChannelId) -> Self {
        Self { channel_id }
    }
}

/// Wholesale history snapshot for one channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPayload {
    pub channel_id: ChannelId,
    /// Pre-ordered by the server; the client keeps the given order.
    pub messages: Vec<Message>,
}

/// Typing state for one user in one channel, used in both directions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TypingSignal {
    pub channel_id: ChannelId,
    /// Display name shown in the typing line.
    pub user_name: String,
    /// True while the user is typing.
    pub active: bool,
}

/// Request to place a reaction.  The server assigns the reaction id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReactionIntent {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub kind: ReactionKind,
}

/// Request to withdraw a reaction, keyed by its server-assigned id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReactionRemoval {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub reaction_id: ReactionId,
}

/// Server confirmation that a reaction was added or removed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReactionUpdate {
    pub message_id: MessageId,
    /// The full reaction record; its id keys removal.
    pub reaction: Reaction,
    pub action: ReactionAction,
}

/// Whether a `reaction-update` adds or removes the carried reaction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReactionAction {
    Add,
    Remove,
}

/// A user entering or leaving a channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PresencePayload {
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub user_name: String,
}

/// Application-level error reported by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub message: String,
}

/// Notification that an upload finished, so other clients refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadNotice {
    pub channel_id: ChannelId,
    pub attachment: Attachment,
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

impl ClientEvent {
    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from a JSON text frame.
    pub fn from_json(text: &str) -> Result<Self, WireError> {
        Ok(serde_json::from_str(text)?)
    }
}

impl ServerEvent {
    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from a JSON text frame.
    pub fn from_json(text: &str) -> Result<Self, WireError> {
        Ok(serde_json::from_str(text)?)
    }
}
