//! The chat session: one live connection scoped to one channel.
//!
//! [`ChatSession`] ties the transport, the message log, reactions, typing
//! state, and uploads together behind a single async surface.  The embedding
//! UI drives it by awaiting [`ChatSession::next_update`] in a loop and calls
//! the imperative methods in between.

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use banter_net::{ConnectConfig, ConnectionManager};
use banter_shared::model::{Attachment, Message, ReactionKind};
use banter_shared::protocol::{
    ChannelRef, ClientEvent, ReactionIntent, ReactionRemoval, ServerEvent, TypingSignal,
    UploadNotice,
};
use banter_shared::types::{
    ChannelId, ChatTarget, ConnectionStatus, LocalUser, MessageId, ReactionId, TeamId,
};

use crate::error::{ClientError, Result};
use crate::messages::MessageLog;
use crate::typing::{TypingDebounce, TypingSet};
use crate::upload::{FileUpload, Uploader};

/// State changes surfaced to the embedding UI.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// Transport status changed.
    Status(ConnectionStatus),
    /// The server accepted the channel join.
    Joined(ChannelId),
    /// A history snapshot replaced the log.
    HistoryLoaded { channel_id: ChannelId, count: usize },
    /// A message was appended or reconciled; look it up by id.
    MessageReceived(MessageId),
    /// The reactions on a message changed.
    ReactionsChanged(MessageId),
    /// The remote typing set changed.
    TypingChanged,
    /// A user entered or left the channel.
    PresenceChanged { user_name: String, joined: bool },
    /// The server reported an application error.
    ServerError(String),
}

/// A live session on one channel or private chat.
pub struct ChatSession {
    user: LocalUser,
    team: TeamId,
    target: ChatTarget,
    manager: ConnectionManager,
    events: mpsc::Receiver<ServerEvent>,
    status: watch::Receiver<ConnectionStatus>,
    last_status: ConnectionStatus,
    log: MessageLog,
    typing_local: TypingDebounce,
    typing_remote: TypingSet,
    members: BTreeSet<String>,
    uploader: Uploader,
    focused: bool,
    joined: bool,
}

impl ChatSession {
    /// Connect and enter `target`.  The channel starts focused.
    ///
    /// The join itself goes out once the transport reports connected, from
    /// inside [`next_update`](Self::next_update).
    pub async fn open(
        config: ConnectConfig,
        user: LocalUser,
        team: TeamId,
        target: ChatTarget,
    ) -> Result<Self> {
        let uploader = Uploader::new(config.http_url()?, config.access_token.clone())?;

        let mut manager = ConnectionManager::new(config);
        let channels = match manager.connect(target.clone()).await? {
            Some(channels) => channels,
            None => return Err(ClientError::NotConnected),
        };

        Ok(Self {
            user,
            team,
            target,
            manager,
            events: channels.events,
            status: channels.status,
            // A fresh transport starts out connecting; the first observed
            // `Connected` transition triggers the join.
            last_status: ConnectionStatus::Connecting,
            log: MessageLog::new(),
            typing_local: TypingDebounce::default(),
            typing_remote: TypingSet::new(),
            members: BTreeSet::new(),
            uploader,
            focused: true,
            joined: false,
        })
    }

    /// Wait for the next session update.
    ///
    /// Drives the event socket, the status watcher, and the local typing
    /// window.  On every transition into `Connected` the join is re-sent,
    /// so a reconnect lands back in the channel with a fresh history
    /// snapshot.  Returns `None` once the connection task is gone for good.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        loop {
            let status = self.status.borrow_and_update().clone();
            if status != self.last_status {
                self.last_status = status.clone();
                match status {
                    ConnectionStatus::Connected => self.on_connected().await,
                    ConnectionStatus::Disconnected | ConnectionStatus::Error(_) => {
                        self.joined = false;
                        self.typing_remote.clear();
                    }
                    ConnectionStatus::Connecting => {}
                }
                return Some(SessionUpdate::Status(status));
            }

            let typing_deadline = self.typing_local.deadline();

            tokio::select! {
                event = self.events.recv() => {
                    match event {
                        Some(event) => {
                            if let Some(update) = self.handle_event(event) {
                                return Some(update);
                            }
                        }
                        None => return None,
                    }
                }

                changed = self.status.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                }

                _ = sleep_until(typing_deadline.unwrap_or_else(far_future)),
                    if typing_deadline.is_some() =>
                {
                    if let Some(active) = self.typing_local.poll(Instant::now()) {
                        self.send_typing(active).await;
                    }
                }
            }
        }
    }

    /// Post a text message to the active channel.
    ///
    /// The message is appended to the log optimistically before the send;
    /// the server echo later replaces it in place.  Whitespace-only input
    /// is ignored.  Returns the provisional message id.
    pub async fn send_message(&mut self, content: &str) -> Result<Option<MessageId>> {
        let content = content.trim();
        if content.is_empty() {
            return Ok(None);
        }
        let id = self.post_message(content.to_string(), Vec::new()).await?;
        Ok(Some(id))
    }

    /// Upload a file and announce it in the channel.
    ///
    /// The announcing message carries the stored attachment with `caption`
    /// as its text.  When the upload succeeds but the announcement cannot
    /// be sent, the orphaned metadata comes back in
    /// [`ClientError::AttachmentOrphaned`] so the caller can retry or clean
    /// up.
    pub async fn send_file(&mut self, file: FileUpload, caption: &str) -> Result<MessageId> {
        self.require_connected()?;

        let attachment = self
            .uploader
            .upload(file, &self.team, self.target.channel_id())
            .await?;

        match self
            .post_message(caption.trim().to_string(), vec![attachment.clone()])
            .await
        {
            Ok(id) => {
                let notice = UploadNotice {
                    channel_id: self.target.channel_id().clone(),
                    attachment,
                };
                if let Err(e) = self
                    .manager
                    .send(ClientEvent::FileUploadComplete(notice))
                    .await
                {
                    warn!(error = %e, "Failed to announce completed upload");
                }
                Ok(id)
            }
            Err(e) => Err(ClientError::AttachmentOrphaned {
                attachment: Box::new(attachment),
                reason: e.to_string(),
            }),
        }
    }

    /// Ask the server to place a reaction.  The local log only changes when
    /// the confirming `reaction-update` arrives.
    pub async fn add_reaction(&mut self, message_id: MessageId, kind: ReactionKind) -> Result<()> {
        self.require_connected()?;
        let intent = ReactionIntent {
            channel_id: self.target.channel_id().clone(),
            message_id,
            kind,
        };
        self.manager.send(ClientEvent::AddReaction(intent)).await?;
        Ok(())
    }

    /// Ask the server to withdraw a reaction by its server-assigned id.
    pub async fn remove_reaction(
        &mut self,
        message_id: MessageId,
        reaction_id: ReactionId,
    ) -> Result<()> {
        self.require_connected()?;
        let removal = ReactionRemoval {
            channel_id: self.target.channel_id().clone(),
            message_id,
            reaction_id,
        };
        self.manager
            .send(ClientEvent::RemoveReaction(removal))
            .await?;
        Ok(())
    }

    /// Feed the current input text into the typing debounce window.
    pub async fn keystroke(&mut self, text: &str) {
        if !self.manager.is_connected() {
            return;
        }
        if let Some(active) = self.typing_local.keystroke(text, Instant::now()) {
            self.send_typing(active).await;
        }
    }

    /// Mark the channel on or off screen.  Focusing marks everything read.
    pub async fn set_focused(&mut self, focused: bool) {
        if self.focused == focused {
            return;
        }
        self.focused = focused;

        let channel = ChannelRef::new(self.target.channel_id().clone());
        let event = if focused {
            self.log.mark_all_read();
            ClientEvent::FocusChannel(channel)
        } else {
            ClientEvent::UnfocusChannel(channel)
        };
        if let Err(e) = self.manager.send(event).await {
            debug!(error = %e, "Failed to send focus change");
        }
    }

    /// Leave the current channel and open `target` instead.
    ///
    /// All channel-scoped state (log, typing, members) resets; the join for
    /// the new target goes out once its transport connects.
    pub async fn switch(&mut self, target: ChatTarget) -> Result<()> {
        if target == self.target && self.manager.is_connected() {
            debug!(room = %target, "Already on this target");
            return Ok(());
        }

        self.leave_current().await;

        if let Some(channels) = self.manager.connect(target.clone()).await? {
            self.events = channels.events;
            self.status = channels.status;
            self.last_status = ConnectionStatus::Connecting;
        }
        self.target = target;
        self.log = MessageLog::new();
        self.typing_local = TypingDebounce::default();
        self.typing_remote.clear();
        self.members.clear();
        self.joined = false;
        Ok(())
    }

    /// Reset the retry budget and resume connecting after the socket gave
    /// up.
    pub async fn reconnect(&self) -> Result<()> {
        self.manager.reconnect().await?;
        Ok(())
    }

    /// Leave the channel and shut the connection down.
    pub async fn close(mut self) {
        self.leave_current().await;
        self.manager.disconnect().await;
    }

    pub fn messages(&self) -> &[Message] {
        self.log.messages()
    }

    /// Typing indicator line for remote users, `None` when nobody is
    /// typing.
    pub fn typing_line(&self) -> Option<String> {
        self.typing_remote.line()
    }

    /// Display names of users known to be in the channel.
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    pub fn target(&self) -> &ChatTarget {
        &self.target
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// True once the server has accepted the join for the current target.
    pub fn is_joined(&self) -> bool {
        self.joined
    }

    /// Runs on every transition into `Connected`, including reconnects, so
    /// the server puts us back in the room and sends a fresh snapshot.
    async fn on_connected(&mut self) {
        let join = ClientEvent::JoinChannel(ChannelRef::new(self.target.channel_id().clone()));
        if let Err(e) = self.manager.send(join).await {
            warn!(error = %e, "Failed to send join after connect");
            return;
        }
        if self.focused {
            let focus =
                ClientEvent::FocusChannel(ChannelRef::new(self.target.channel_id().clone()));
            if let Err(e) = self.manager.send(focus).await {
                debug!(error = %e, "Failed to send focus after join");
            }
        }
    }

    fn handle_event(&mut self, event: ServerEvent) -> Option<SessionUpdate> {
        match event {
            ServerEvent::ChannelJoined(joined) => {
                if !self.is_current(&joined.channel_id) {
                    return None;
                }
                self.joined = true;
                Some(SessionUpdate::Joined(joined.channel_id))
            }
            ServerEvent::ChannelHistory(history) => {
                if !self.is_current(&history.channel_id) {
                    return None;
                }
                let count = history.messages.len();
                self.log.replace_all(history.messages);
                if self.focused {
                    self.log.mark_all_read();
                }
                Some(SessionUpdate::HistoryLoaded {
                    channel_id: history.channel_id,
                    count,
                })
            }
            ServerEvent::Message(mut message) => {
                if !self.is_current(&message.channel_id) {
                    debug!(channel = %message.channel_id, "Dropping message for another channel");
                    return None;
                }
                message.read = self.focused || message.sender_id == self.user.id;
                let id = message.id.clone();
                if self.log.apply_incoming(message) {
                    Some(SessionUpdate::MessageReceived(id))
                } else {
                    None
                }
            }
            ServerEvent::ReactionUpdate(update) => {
                if !self.is_current(&update.reaction.channel_id) {
                    return None;
                }
                if self.log.apply_reaction(&update) {
                    Some(SessionUpdate::ReactionsChanged(update.message_id))
                } else {
                    None
                }
            }
            ServerEvent::UserJoined(presence) => {
                if !self.is_current(&presence.channel_id) {
                    return None;
                }
                self.members.insert(presence.user_name.clone());
                Some(SessionUpdate::PresenceChanged {
                    user_name: presence.user_name,
                    joined: true,
                })
            }
            ServerEvent::UserLeft(presence) => {
                if !self.is_current(&presence.channel_id) {
                    return None;
                }
                self.members.remove(&presence.user_name);
                self.typing_remote.remove(&presence.user_name);
                Some(SessionUpdate::PresenceChanged {
                    user_name: presence.user_name,
                    joined: false,
                })
            }
            ServerEvent::UserTyping(signal) => {
                if !self.is_current(&signal.channel_id) {
                    return None;
                }
                if signal.user_name == self.user.display_name {
                    return None;
                }
                if self.typing_remote.apply(&signal.user_name, signal.active) {
                    Some(SessionUpdate::TypingChanged)
                } else {
                    None
                }
            }
            ServerEvent::Error(err) => {
                warn!(message = %err.message, "Server reported an error");
                Some(SessionUpdate::ServerError(err.message))
            }
        }
    }

    async fn post_message(
        &mut self,
        content: String,
        attachments: Vec<Attachment>,
    ) -> Result<MessageId> {
        self.require_connected()?;

        let message = Message::outgoing(
            &self.user,
            self.target.channel_id().clone(),
            content,
            attachments,
        );
        let id = message.id.clone();

        self.log.push_pending(message.clone());
        if let Err(e) = self.manager.send(ClientEvent::NewMessage(message)).await {
            self.log.remove(&id);
            return Err(e.into());
        }

        if let Some(active) = self.typing_local.message_sent() {
            self.send_typing(active).await;
        }

        info!(id = %id, channel = %self.target.channel_id(), "Message sent");
        Ok(id)
    }

    async fn send_typing(&mut self, active: bool) {
        let signal = TypingSignal {
            channel_id: self.target.channel_id().clone(),
            user_name: self.user.display_name.clone(),
            active,
        };
        if let Err(e) = self.manager.send(ClientEvent::Typing(signal)).await {
            debug!(error = %e, "Failed to send typing signal");
        }
    }

    async fn leave_current(&mut self) {
        if !self.manager.is_connected() {
            return;
        }
        let leave = ClientEvent::LeaveChannel(ChannelRef::new(self.target.channel_id().clone()));
        if let Err(e) = self.manager.send(leave).await {
            debug!(error = %e, "Failed to send leave");
        }
    }

    fn require_connected(&self) -> Result<()> {
        if self.status.borrow().is_connected() {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }

    fn is_current(&self, channel_id: &ChannelId) -> bool {
        channel_id == self.target.channel_id()
    }
}

/// Stand-in deadline for the disabled typing branch of the select.
fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(60 * 60 * 24)
}
