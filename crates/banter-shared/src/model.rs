//! Domain model structs shared between the wire protocol and the client.
//!
//! Every struct serializes with camelCase field names, matching what the
//! backend exchanges with its web clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{AttachmentId, ChannelId, LocalUser, MessageId, ReactionId, TeamId, UserId};

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message.
///
/// Messages are created either optimistically on the sending client (with a
/// provisional id and a `client_ref` correlation tag) or authoritatively by
/// the server.  The server echo of an optimistic send replaces the local
/// entry in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message identifier.  Provisional until the server echo for an
    /// optimistic send arrives.
    pub id: MessageId,
    /// The channel or private chat this message belongs to.
    pub channel_id: ChannelId,
    /// Sender's user id.
    pub sender_id: UserId,
    /// Sender's display name at send time.
    pub sender_name: String,
    /// Plain text content.
    pub content: String,
    /// When the message was created.
    pub created_at: DateTime<Utc>,
    /// When the message was last edited (equal to `created_at` if never).
    pub updated_at: DateTime<Utc>,
    /// Files attached to this message.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Reactions currently placed on this message.
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    /// Whether the local user has read this message.
    #[serde(default)]
    pub read: bool,
    /// Client-generated correlation tag carried by optimistic sends and
    /// echoed back by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ref: Option<Uuid>,
    /// True while this entry is a local optimistic send awaiting its echo.
    /// Never serialized.
    #[serde(skip)]
    pub pending: bool,
}

impl Message {
    /// Build a local optimistic message awaiting its server echo.
    ///
    /// The id is provisional and the `client_ref` tag is fresh; both are
    /// superseded when the echo is reconciled.
    pub fn outgoing(
        user: &LocalUser,
        channel_id: ChannelId,
        content: String,
        attachments: Vec<Attachment>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: MessageId(Uuid::new_v4().to_string()),
            channel_id,
            sender_id: user.id.clone(),
            sender_name: user.display_name.clone(),
            content,
            created_at: now,
            updated_at: now,
            attachments,
            reactions: Vec::new(),
            read: true,
            client_ref: Some(Uuid::new_v4()),
            pending: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Attachment
// ---------------------------------------------------------------------------

/// Metadata for an uploaded file, created once by the upload endpoint and
/// immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Unique attachment identifier.
    pub id: AttachmentId,
    /// Team the upload belongs to.
    pub team_id: TeamId,
    /// Channel the upload was targeted at.
    pub channel_id: ChannelId,
    /// User who uploaded the file.
    pub uploader_id: UserId,
    /// Original file name.
    pub file_name: String,
    /// MIME type as reported by the uploader.
    pub content_type: String,
    /// File size in bytes.
    pub size: u64,
    /// Server-side storage key.
    pub storage_key: String,
    /// Public download URL.
    pub url: String,
    /// When the upload completed.
    pub uploaded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Reaction
// ---------------------------------------------------------------------------

/// A reaction placed on a message by one user.
///
/// Reactions are never created optimistically; the applied record always
/// comes from a server confirmation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    /// Unique reaction identifier, the key for removal.
    pub id: ReactionId,
    /// The message this reaction is placed on.
    pub message_id: MessageId,
    /// The channel the message lives in.
    pub channel_id: ChannelId,
    /// Who placed the reaction.
    pub user_id: UserId,
    /// Which reaction was placed.
    pub kind: ReactionKind,
}

/// The fixed set of reactions a message can receive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ReactionKind {
    ThumbsUp,
    ThumbsDown,
    Heart,
    Laugh,
    Surprised,
    Sad,
}

impl ReactionKind {
    /// The emoji rendered for this reaction.
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::ThumbsUp => "👍",
            Self::ThumbsDown => "👎",
            Self::Heart => "❤️",
            Self::Laugh => "😂",
            Self::Surprised => "😮",
            Self::Sad => "😢",
        }
    }
}
