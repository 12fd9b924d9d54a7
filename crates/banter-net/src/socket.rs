//! Event socket task with automatic reconnection.
//!
//! The WebSocket runs in a dedicated tokio task.  External code talks to it
//! through a typed command channel and receives decoded server events plus
//! status transitions back, keeping the transport fully asynchronous and
//! decoupled from session state.

use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use banter_shared::constants::{EVENT_CHANNEL_CAPACITY, KEEPALIVE_INTERVAL_SECS};
use banter_shared::protocol::{ClientEvent, ServerEvent};
use banter_shared::types::ConnectionStatus;

use crate::config::ConnectConfig;
use crate::error::{NetError, Result};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ---------------------------------------------------------------------------
// Commands / handles
// ---------------------------------------------------------------------------

/// Commands sent *into* the connection task.
#[derive(Debug)]
pub enum SocketCommand {
    /// Serialize and send an event over the socket.
    Send(ClientEvent),
    /// Reset the attempt budget and resume connecting.
    Reconnect,
    /// Gracefully close the socket and stop the task.
    Shutdown,
}

/// Channel handles returned by [`spawn_socket`].
pub struct SocketHandles {
    /// Commands into the task.
    pub commands: mpsc::Sender<SocketCommand>,
    /// Decoded server events out of the task.
    pub events: mpsc::Receiver<ServerEvent>,
    /// Live transport status.
    pub status: watch::Receiver<ConnectionStatus>,
    /// The task itself, joined on teardown.
    pub task: JoinHandle<()>,
}

/// Spawn the event socket in a background tokio task.
///
/// The task connects immediately and keeps reconnecting with capped
/// exponential backoff.  Once the consecutive-attempt budget is exhausted it
/// reports [`ConnectionStatus::Error`] and parks until a
/// [`SocketCommand::Reconnect`] arrives.
pub fn spawn_socket(config: ConnectConfig) -> Result<SocketHandles> {
    let ws_url = config.ws_url()?;

    let (cmd_tx, cmd_rx) = mpsc::channel::<SocketCommand>(EVENT_CHANNEL_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel::<ServerEvent>(EVENT_CHANNEL_CAPACITY);
    let (status_tx, status_rx) = watch::channel(ConnectionStatus::Connecting);

    let task = tokio::spawn(async move {
        connection_task(config, ws_url, cmd_rx, event_tx, status_tx).await;
    });

    Ok(SocketHandles {
        commands: cmd_tx,
        events: event_rx,
        status: status_rx,
        task,
    })
}

// ---------------------------------------------------------------------------
// Background connection task
// ---------------------------------------------------------------------------

/// The main background task owning the WebSocket.
///
/// Lifecycle:
/// 1. Connect with the configured timeout and bearer credential
/// 2. Enter the event loop: read frames + process commands + keepalive
/// 3. On loss: retry with exponential backoff, counting consecutive failures
/// 4. After the budget is exhausted: park until `Reconnect` or `Shutdown`
async fn connection_task(
    config: ConnectConfig,
    ws_url: String,
    mut cmd_rx: mpsc::Receiver<SocketCommand>,
    event_tx: mpsc::Sender<ServerEvent>,
    status_tx: watch::Sender<ConnectionStatus>,
) {
    let keepalive_period = Duration::from_secs(KEEPALIVE_INTERVAL_SECS);
    let mut keepalive =
        tokio::time::interval_at(Instant::now() + keepalive_period, keepalive_period);
    let mut socket: Option<Socket> = None;
    let mut failed_attempts: u32 = 0;
    let mut shutdown = false;

    loop {
        if shutdown {
            if let Some(mut ws) = socket.take() {
                let _ = ws.close(None).await;
            }
            let _ = status_tx.send(ConnectionStatus::Disconnected);
            info!("Socket task terminated");
            return;
        }

        if let Some(ref mut ws) = socket {
            tokio::select! {
                // --- Incoming commands ---
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(SocketCommand::Send(event)) => {
                            match event.to_json() {
                                Ok(payload) => {
                                    if let Err(e) = ws.send(Message::Text(payload.into())).await {
                                        warn!(error = %e, "Send failed, dropping connection");
                                        let _ = status_tx.send(ConnectionStatus::Disconnected);
                                        socket = None;
                                    }
                                }
                                Err(e) => {
                                    warn!(error = %e, "Failed to serialize outbound event");
                                }
                            }
                        }
                        Some(SocketCommand::Reconnect) => {
                            debug!("Reconnect requested while connected, ignoring");
                        }
                        Some(SocketCommand::Shutdown) => {
                            shutdown = true;
                        }
                        None => {
                            // All senders dropped
                            info!("Command channel closed, shutting down socket");
                            shutdown = true;
                        }
                    }
                }

                // --- Keepalive ping ---
                _ = keepalive.tick() => {
                    if let Err(e) = ws.send(Message::Ping(Bytes::new())).await {
                        warn!(error = %e, "Keepalive ping failed, dropping connection");
                        let _ = status_tx.send(ConnectionStatus::Disconnected);
                        socket = None;
                    }
                }

                // --- Socket frames ---
                frame = ws.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            match ServerEvent::from_json(text.as_str()) {
                                Ok(event) => {
                                    if event_tx.send(event).await.is_err() {
                                        debug!("Event receiver dropped");
                                    }
                                }
                                Err(e) => {
                                    warn!(error = %e, "Failed to parse server event");
                                }
                            }
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            let _ = ws.send(Message::Pong(payload)).await;
                        }
                        Some(Ok(Message::Pong(_)))
                        | Some(Ok(Message::Binary(_)))
                        | Some(Ok(Message::Frame(_))) => {}
                        Some(Ok(Message::Close(_))) => {
                            info!("Server closed the connection");
                            let _ = status_tx.send(ConnectionStatus::Disconnected);
                            socket = None;
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "Socket error");
                            let _ = status_tx.send(ConnectionStatus::Disconnected);
                            socket = None;
                        }
                        None => {
                            info!("Socket stream ended");
                            let _ = status_tx.send(ConnectionStatus::Disconnected);
                            socket = None;
                        }
                    }
                }
            }
        } else {
            // Not connected: retry, back off, or park.
            if failed_attempts >= config.max_attempts {
                let reason = NetError::RetriesExhausted(config.max_attempts);
                warn!(
                    attempts = config.max_attempts,
                    "Connection attempts exhausted, waiting for explicit reconnect"
                );
                let _ = status_tx.send(ConnectionStatus::Error(reason.to_string()));

                loop {
                    match cmd_rx.recv().await {
                        Some(SocketCommand::Reconnect) => {
                            info!("Reconnect requested, resetting attempt budget");
                            failed_attempts = 0;
                            break;
                        }
                        Some(SocketCommand::Send(_)) => {
                            warn!("Dropping outbound event while disconnected");
                        }
                        Some(SocketCommand::Shutdown) | None => {
                            shutdown = true;
                            break;
                        }
                    }
                }
                continue;
            }

            if failed_attempts > 0 {
                let delay = backoff_delay(&config, failed_attempts);
                debug!(
                    delay_ms = delay.as_millis() as u64,
                    attempt = failed_attempts + 1,
                    "Backing off before reconnect attempt"
                );

                // Honor shutdown and manual reconnect during the wait.
                let sleep = tokio::time::sleep(delay);
                tokio::pin!(sleep);
                loop {
                    tokio::select! {
                        _ = &mut sleep => break,
                        cmd = cmd_rx.recv() => {
                            match cmd {
                                Some(SocketCommand::Reconnect) => {
                                    failed_attempts = 0;
                                    break;
                                }
                                Some(SocketCommand::Send(_)) => {
                                    warn!("Dropping outbound event while disconnected");
                                }
                                Some(SocketCommand::Shutdown) | None => {
                                    shutdown = true;
                                    break;
                                }
                            }
                        }
                    }
                }
                if shutdown {
                    continue;
                }
            }

            let _ = status_tx.send(ConnectionStatus::Connecting);
            match establish_socket(&config, &ws_url).await {
                Ok(ws) => {
                    info!(url = %ws_url, "Socket connected");
                    failed_attempts = 0;
                    keepalive.reset();
                    let _ = status_tx.send(ConnectionStatus::Connected);
                    socket = Some(ws);
                }
                Err(e) => {
                    failed_attempts += 1;
                    warn!(
                        attempt = failed_attempts,
                        max = config.max_attempts,
                        error = %e,
                        "Connect attempt failed"
                    );
                    let _ = status_tx.send(ConnectionStatus::Disconnected);
                }
            }
        }
    }
}

/// Open the WebSocket within the configured timeout, attaching the bearer
/// credential to the handshake.
async fn establish_socket(config: &ConnectConfig, ws_url: &str) -> Result<Socket> {
    let mut request = ws_url
        .into_client_request()
        .map_err(|e| NetError::InvalidUrl(e.to_string()))?;

    if let Some(ref token) = config.access_token {
        let value = HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
            .map_err(|e| NetError::Handshake(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }

    match tokio::time::timeout(config.connect_timeout, connect_async(request)).await {
        Ok(Ok((socket, _response))) => Ok(socket),
        Ok(Err(e)) => Err(NetError::Handshake(e.to_string())),
        Err(_) => Err(NetError::Timeout(config.connect_timeout)),
    }
}

/// Backoff delay after `failed` consecutive failures, doubled per failure
/// and capped at the configured maximum.
fn backoff_delay(config: &ConnectConfig, failed: u32) -> Duration {
    let exponent = failed.saturating_sub(1).min(16);
    let delay = config
        .reconnect_delay
        .saturating_mul(2u32.saturating_pow(exponent));
    delay.min(config.max_reconnect_delay)
}
