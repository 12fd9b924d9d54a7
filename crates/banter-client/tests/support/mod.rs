//! In-process server double for session and upload tests.
//!
//! Serves the WebSocket endpoint at `/` and the multipart upload endpoint
//! at `/api/files`.  Each accepted socket is handed to the test as a
//! [`TestConn`] for scripting both directions.  Two magic file names steer
//! the upload handler: `reject.bin` fails with a 500, and `orphan.bin`
//! kills every socket mid-upload while still storing the file.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use uuid::Uuid;

use banter_net::ConnectConfig;
use banter_shared::model::{Attachment, Message};
use banter_shared::protocol::{ChannelRef, ClientEvent, HistoryPayload, ServerEvent};
use banter_shared::types::{AccessToken, AttachmentId, ChannelId, MessageId, TeamId, UserId};

pub struct TestServer {
    pub addr: SocketAddr,
    conns: mpsc::Receiver<TestConn>,
    state: Arc<ServerState>,
}

/// One accepted WebSocket connection, scripted from the test.
pub struct TestConn {
    to_client: mpsc::Sender<ServerEvent>,
    from_client: mpsc::Receiver<ClientEvent>,
}

struct ServerState {
    conns_tx: mpsc::Sender<TestConn>,
    close_all: broadcast::Sender<()>,
    reject_ws: AtomicBool,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let (conns_tx, conns_rx) = mpsc::channel(8);
        let (close_all, _) = broadcast::channel(8);
        let state = Arc::new(ServerState {
            conns_tx,
            close_all,
            reject_ws: AtomicBool::new(false),
        });

        let app = Router::new()
            .route("/", get(ws_handler))
            .route("/api/files", post(upload_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            conns: conns_rx,
            state,
        }
    }

    pub fn http_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointing at this server, tuned for fast tests.
    pub fn config(&self) -> ConnectConfig {
        ConnectConfig {
            server_url: self.http_url(),
            access_token: Some(AccessToken::new("test-token")),
            connect_timeout: Duration::from_secs(2),
            max_attempts: 5,
            reconnect_delay: Duration::from_millis(20),
            max_reconnect_delay: Duration::from_millis(100),
        }
    }

    /// Wait for the next WebSocket connection from a client.
    pub async fn accept(&mut self) -> TestConn {
        timeout(Duration::from_secs(5), self.conns.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("server task gone")
    }

    /// Drop every open socket, as if the server restarted.
    pub fn drop_connections(&self) {
        let _ = self.state.close_all.send(());
    }

    /// Refuse (or accept again) new WebSocket upgrades.
    pub fn reject_connections(&self, reject: bool) {
        self.state.reject_ws.store(reject, Ordering::SeqCst);
    }
}

impl TestConn {
    /// Push an event to this client.
    pub async fn push(&self, event: ServerEvent) {
        self.to_client.send(event).await.expect("connection gone");
    }

    /// Next decoded event from this client.
    pub async fn recv(&mut self) -> ClientEvent {
        timeout(Duration::from_secs(5), self.from_client.recv())
            .await
            .expect("timed out waiting for a client event")
            .expect("connection gone")
    }
}

/// Answer the join handshake: consume `join-channel` and `focus-channel`,
/// then push `channel-joined` and the history snapshot.
pub async fn expect_join(conn: &mut TestConn, channel: &str, history: Vec<Message>) {
    match conn.recv().await {
        ClientEvent::JoinChannel(join) => assert_eq!(join.channel_id.as_str(), channel),
        other => panic!("Expected join-channel, got {other:?}"),
    }
    match conn.recv().await {
        ClientEvent::FocusChannel(focus) => assert_eq!(focus.channel_id.as_str(), channel),
        other => panic!("Expected focus-channel, got {other:?}"),
    }

    conn.push(ServerEvent::ChannelJoined(ChannelRef::new(ChannelId::from(
        channel,
    ))))
    .await;
    conn.push(ServerEvent::ChannelHistory(HistoryPayload {
        channel_id: ChannelId::from(channel),
        messages: history,
    }))
    .await;
}

/// A server-authored message for history snapshots and pushes.
pub fn message(id: &str, channel: &str, sender: &str, content: &str) -> Message {
    Message {
        id: MessageId::from(id),
        channel_id: ChannelId::from(channel),
        sender_id: UserId::from(sender),
        sender_name: sender.to_string(),
        content: content.to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        attachments: Vec::new(),
        reactions: Vec::new(),
        read: false,
        client_ref: None,
        pending: false,
    }
}

async fn ws_handler(
    State(state): State<Arc<ServerState>>,
    ws: WebSocketUpgrade,
) -> Response {
    if state.reject_ws.load(Ordering::SeqCst) {
        return StatusCode::FORBIDDEN.into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state))
        .into_response()
}

async fn handle_socket(mut socket: WebSocket, state: Arc<ServerState>) {
    let (to_client_tx, mut to_client_rx) = mpsc::channel::<ServerEvent>(32);
    let (from_client_tx, from_client_rx) = mpsc::channel::<ClientEvent>(32);
    let mut close_rx = state.close_all.subscribe();

    let conn = TestConn {
        to_client: to_client_tx,
        from_client: from_client_rx,
    };
    if state.conns_tx.send(conn).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            outbound = to_client_rx.recv() => {
                let event = match outbound {
                    Some(event) => event,
                    None => break,
                };
                let payload = event.to_json().expect("encode server event");
                if socket.send(WsMessage::Text(payload)).await.is_err() {
                    break;
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(WsMessage::Text(text))) => {
                        if let Ok(event) = ClientEvent::from_json(&text) {
                            let _ = from_client_tx.send(event).await;
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            // Simulated restart: vanish without a close frame.
            _ = close_rx.recv() => break,
        }
    }
}

async fn upload_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("Bearer "))
        .unwrap_or(false);
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "missing bearer token").into_response();
    }

    let mut file_name = String::new();
    let mut content_type = String::new();
    let mut size = 0u64;
    let mut team_id = String::new();
    let mut channel_id = String::new();

    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                file_name = field.file_name().unwrap_or_default().to_string();
                content_type = field.content_type().unwrap_or_default().to_string();
                size = field.bytes().await.expect("file bytes").len() as u64;
            }
            "teamId" => team_id = field.text().await.expect("teamId field"),
            "channelId" => channel_id = field.text().await.expect("channelId field"),
            _ => {}
        }
    }

    if file_name == "reject.bin" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "storage offline").into_response();
    }

    if file_name == "orphan.bin" {
        // Kill the sockets mid-upload and keep them dead, then store the
        // file anyway: the client ends up with an orphaned attachment.
        state.reject_ws.store(true, Ordering::SeqCst);
        let _ = state.close_all.send(());
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    let id = Uuid::new_v4().to_string();
    let attachment = Attachment {
        id: AttachmentId::from(id.as_str()),
        team_id: TeamId::from(team_id.as_str()),
        channel_id: ChannelId::from(channel_id.as_str()),
        uploader_id: UserId::from("u-upload"),
        file_name,
        content_type,
        size,
        storage_key: format!("uploads/{id}"),
        url: format!("/files/{id}"),
        uploaded_at: Utc::now(),
    };
    Json(attachment).into_response()
}
