use serde::{Deserialize, Serialize};

/// Declares a transparent string identifier newtype.
///
/// Ids are opaque server-assigned strings; the client never inspects them
/// beyond equality and display.
macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// A user account.
    UserId
);
string_id!(
    /// A team channel or private chat room.
    ChannelId
);
string_id!(
    /// A chat message.
    MessageId
);
string_id!(
    /// A single reaction placed on a message.
    ReactionId
);
string_id!(
    /// An uploaded file.
    AttachmentId
);
string_id!(
    /// A team (workspace) that channels belong to.
    TeamId
);

/// What a live socket is scoped to: a team channel or a private chat.
///
/// Exactly one target is active per connection; switching targets tears the
/// old connection down before the new one is opened.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChatTarget {
    /// A named team channel.
    Channel(ChannelId),
    /// A one-to-one private chat.
    Direct(ChannelId),
}

impl ChatTarget {
    /// The room identifier used on the wire for this target.
    pub fn channel_id(&self) -> &ChannelId {
        match self {
            Self::Channel(id) | Self::Direct(id) => id,
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, Self::Direct(_))
    }
}

impl std::fmt::Display for ChatTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel(id) => write!(f, "channel:{id}"),
            Self::Direct(id) => write!(f, "direct:{id}"),
        }
    }
}

/// Transport state of the event socket.
///
/// Owned by the connection task; everything else observes it through a
/// `tokio::sync::watch` receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No socket is open and no attempt is in flight.
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// The socket is open and events flow.
    Connected,
    /// The attempt budget was exhausted; waiting for an explicit reconnect.
    Error(String),
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// The locally signed-in user, fixed for the lifetime of a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LocalUser {
    pub id: UserId,
    pub display_name: String,
}

impl LocalUser {
    pub fn new(id: impl Into<UserId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// An opaque bearer credential presented on the socket handshake and on
/// uploads.  `Debug` never reveals the token value.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for AccessToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccessToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_target_channel_id() {
        let channel = ChatTarget::Channel(ChannelId::from("general"));
        let direct = ChatTarget::Direct(ChannelId::from("dm-42"));

        assert_eq!(channel.channel_id().as_str(), "general");
        assert_eq!(direct.channel_id().as_str(), "dm-42");
        assert!(!channel.is_direct());
        assert!(direct.is_direct());
        assert_eq!(channel.to_string(), "channel:general");
    }

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("super-secret");
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn test_string_id_serde_is_transparent() {
        let id = ChannelId::from("general");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"general\"");
    }
}
