//! Connection lifecycle management.
//!
//! [`ConnectionManager`] owns at most one live socket task at a time and
//! enforces the connect rules: credentials are required up front, connecting
//! to the current target while already live is a no-op, and switching targets
//! tears the previous task down before the new one starts.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use banter_shared::protocol::{ClientEvent, ServerEvent};
use banter_shared::types::{ChatTarget, ConnectionStatus};

use crate::config::ConnectConfig;
use crate::error::{NetError, Result};
use crate::socket::{spawn_socket, SocketCommand};

/// Receiving ends handed to the caller for a freshly spawned connection.
pub struct SessionChannels {
    /// Decoded server events.
    pub events: mpsc::Receiver<ServerEvent>,
    /// Live transport status.
    pub status: watch::Receiver<ConnectionStatus>,
}

struct ActiveConnection {
    target: ChatTarget,
    commands: mpsc::Sender<SocketCommand>,
    status: watch::Receiver<ConnectionStatus>,
    task: JoinHandle<()>,
}

/// Owns the single live socket task and its command channel.
pub struct ConnectionManager {
    config: ConnectConfig,
    active: Option<ActiveConnection>,
}

impl ConnectionManager {
    pub fn new(config: ConnectConfig) -> Self {
        Self {
            config,
            active: None,
        }
    }

    /// Current transport status, `Disconnected` when no task is live.
    pub fn status(&self) -> ConnectionStatus {
        match self.active {
            Some(ref active) => active.status.borrow().clone(),
            None => ConnectionStatus::Disconnected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    /// Target of the live connection, if any.
    pub fn target(&self) -> Option<&ChatTarget> {
        self.active.as_ref().map(|active| &active.target)
    }

    /// Connect to `target`, returning the event/status channels of the new
    /// connection.
    ///
    /// Requires an access token. Connecting to the current target while the
    /// transport is already live (connecting or connected) is a no-op and
    /// returns `Ok(None)`; the previously returned channels stay valid.
    /// Anything else tears down the old connection before spawning the new
    /// one, so at most one socket task exists at a time.
    pub async fn connect(&mut self, target: ChatTarget) -> Result<Option<SessionChannels>> {
        if self.config.access_token.is_none() {
            return Err(NetError::MissingCredential);
        }

        if let Some(ref active) = self.active {
            let live = matches!(
                *active.status.borrow(),
                ConnectionStatus::Connecting | ConnectionStatus::Connected
            );
            if active.target == target && live {
                debug!(room = %target, "Already connected, ignoring connect request");
                return Ok(None);
            }
        }

        self.teardown().await;

        let handles = spawn_socket(self.config.clone())?;
        info!(room = %target, "Connection task spawned");

        let channels = SessionChannels {
            events: handles.events,
            status: handles.status.clone(),
        };
        self.active = Some(ActiveConnection {
            target,
            commands: handles.commands,
            status: handles.status,
            task: handles.task,
        });
        Ok(Some(channels))
    }

    /// Send an event over the live socket.
    ///
    /// Rejected with [`NetError::NotConnected`] unless the transport is
    /// currently connected.
    pub async fn send(&self, event: ClientEvent) -> Result<()> {
        let active = self.active.as_ref().ok_or(NetError::NotConnected)?;
        if !active.status.borrow().is_connected() {
            return Err(NetError::NotConnected);
        }
        active
            .commands
            .send(SocketCommand::Send(event))
            .await
            .map_err(|_| NetError::TaskGone)
    }

    /// Reset the attempt budget and resume connecting after the socket task
    /// gave up.
    pub async fn reconnect(&self) -> Result<()> {
        let active = self.active.as_ref().ok_or(NetError::NotConnected)?;
        active
            .commands
            .send(SocketCommand::Reconnect)
            .await
            .map_err(|_| NetError::TaskGone)
    }

    /// Tear down the live connection, if any.
    pub async fn disconnect(&mut self) {
        self.teardown().await;
    }

    async fn teardown(&mut self) {
        if let Some(active) = self.active.take() {
            let _ = active.commands.send(SocketCommand::Shutdown).await;
            let _ = active.task.await;
            info!(room = %active.target, "Connection torn down");
        }
    }
}
