//! Client connection configuration loaded from environment variables.
//!
//! All settings have sensible defaults so a client can connect with nothing
//! but a server URL and an access token.

use std::time::Duration;

use banter_shared::constants::{
    CONNECT_TIMEOUT_SECS, MAX_CONNECT_ATTEMPTS, MAX_RECONNECT_DELAY_MS, RECONNECT_DELAY_MS,
};
use banter_shared::types::AccessToken;

use crate::error::{NetError, Result};

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Base URL of the chat server.  `http(s)://` URLs are mapped to the
    /// matching `ws(s)://` scheme for the socket; the path is kept as given.
    /// Env: `BANTER_SERVER_URL`
    /// Default: `http://127.0.0.1:8080`
    pub server_url: String,

    /// Bearer token presented on the socket handshake and on uploads.
    /// Env: `BANTER_ACCESS_TOKEN`
    /// Default: none (connecting without one is rejected).
    pub access_token: Option<AccessToken>,

    /// Budget for a single connect attempt.
    /// Env: `BANTER_CONNECT_TIMEOUT_MS`
    /// Default: 5s
    pub connect_timeout: Duration,

    /// Consecutive failed attempts tolerated before the client gives up and
    /// waits for an explicit reconnect.
    /// Default: 5
    pub max_attempts: u32,

    /// Base delay between reconnect attempts, doubled per failure.
    /// Default: 500ms
    pub reconnect_delay: Duration,

    /// Upper bound for the exponential backoff delay.
    /// Default: 10s
    pub max_reconnect_delay: Duration,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".to_string(),
            access_token: None,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            max_attempts: MAX_CONNECT_ATTEMPTS,
            reconnect_delay: Duration::from_millis(RECONNECT_DELAY_MS),
            max_reconnect_delay: Duration::from_millis(MAX_RECONNECT_DELAY_MS),
        }
    }
}

impl ConnectConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("BANTER_SERVER_URL") {
            config.server_url = url;
        }

        if let Ok(token) = std::env::var("BANTER_ACCESS_TOKEN") {
            if !token.is_empty() {
                config.access_token = Some(AccessToken::new(token));
            }
        }

        if let Ok(val) = std::env::var("BANTER_CONNECT_TIMEOUT_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                config.connect_timeout = Duration::from_millis(ms);
            } else {
                tracing::warn!(
                    value = %val,
                    "Invalid BANTER_CONNECT_TIMEOUT_MS, using default"
                );
            }
        }

        config
    }

    /// Resolve the WebSocket endpoint for the event socket.
    pub fn ws_url(&self) -> Result<String> {
        let url = self.server_url.trim_end_matches('/');
        if let Some(rest) = url.strip_prefix("https://") {
            Ok(format!("wss://{rest}"))
        } else if let Some(rest) = url.strip_prefix("http://") {
            Ok(format!("ws://{rest}"))
        } else if url.starts_with("ws://") || url.starts_with("wss://") {
            Ok(url.to_string())
        } else {
            Err(NetError::InvalidUrl(self.server_url.clone()))
        }
    }

    /// Resolve the HTTP base URL used by the upload endpoint.
    pub fn http_url(&self) -> Result<String> {
        let url = self.server_url.trim_end_matches('/');
        if let Some(rest) = url.strip_prefix("wss://") {
            Ok(format!("https://{rest}"))
        } else if let Some(rest) = url.strip_prefix("ws://") {
            Ok(format!("http://{rest}"))
        } else if url.starts_with("http://") || url.starts_with("https://") {
            Ok(url.to_string())
        } else {
            Err(NetError::InvalidUrl(self.server_url.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConnectConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.max_attempts, 5);
        assert!(config.access_token.is_none());
    }

    #[test]
    fn test_ws_url_scheme_mapping() {
        let mut config = ConnectConfig {
            server_url: "http://chat.example.com:8080".to_string(),
            ..Default::default()
        };
        assert_eq!(config.ws_url().unwrap(), "ws://chat.example.com:8080");

        config.server_url = "https://chat.example.com/socket/".to_string();
        assert_eq!(config.ws_url().unwrap(), "wss://chat.example.com/socket");

        config.server_url = "ws://127.0.0.1:9000".to_string();
        assert_eq!(config.ws_url().unwrap(), "ws://127.0.0.1:9000");
    }

    #[test]
    fn test_http_url_scheme_mapping() {
        let config = ConnectConfig {
            server_url: "wss://chat.example.com".to_string(),
            ..Default::default()
        };
        assert_eq!(config.http_url().unwrap(), "https://chat.example.com");
    }

    #[test]
    fn test_unsupported_scheme_is_rejected() {
        let config = ConnectConfig {
            server_url: "ftp://chat.example.com".to_string(),
            ..Default::default()
        };
        assert!(config.ws_url().is_err());
        assert!(config.http_url().is_err());
    }
}
