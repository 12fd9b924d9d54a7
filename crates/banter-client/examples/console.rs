//! Minimal console chat: connect, join a channel, print updates, and send
//! whatever is typed on stdin.
//!
//! ```sh
//! BANTER_SERVER_URL=http://127.0.0.1:8080 \
//! BANTER_ACCESS_TOKEN=dev-token \
//! cargo run -p banter-client --example console -- general
//! ```

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use banter_client::{ChatSession, SessionUpdate};
use banter_net::ConnectConfig;
use banter_shared::types::{ChannelId, ChatTarget, LocalUser, TeamId};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let channel = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "general".to_string());

    let config = ConnectConfig::from_env();
    let user = LocalUser::new("console", "Console");
    let mut session = ChatSession::open(
        config,
        user,
        TeamId::from("default"),
        ChatTarget::Channel(ChannelId::from(channel.as_str())),
    )
    .await?;

    println!("Connected to {channel}. Type to chat, Ctrl-D to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            update = session.next_update() => {
                let update = match update {
                    Some(update) => update,
                    None => break,
                };
                match update {
                    SessionUpdate::Status(status) => println!("* status: {status:?}"),
                    SessionUpdate::Joined(channel) => println!("* joined {channel}"),
                    SessionUpdate::HistoryLoaded { count, .. } => {
                        println!("* {count} messages of history");
                        for message in session.messages() {
                            println!("{}: {}", message.sender_name, message.content);
                        }
                    }
                    SessionUpdate::MessageReceived(id) => {
                        if let Some(message) = session.messages().iter().find(|m| m.id == id) {
                            println!("{}: {}", message.sender_name, message.content);
                        }
                    }
                    SessionUpdate::ReactionsChanged(id) => {
                        if let Some(message) = session.messages().iter().find(|m| m.id == id) {
                            let emojis: Vec<&str> =
                                message.reactions.iter().map(|r| r.kind.emoji()).collect();
                            println!("* reactions on \"{}\": {}", message.content, emojis.join(" "));
                        }
                    }
                    SessionUpdate::TypingChanged => {
                        if let Some(line) = session.typing_line() {
                            println!("* {line}");
                        }
                    }
                    SessionUpdate::PresenceChanged { user_name, joined } => {
                        println!("* {user_name} {}", if joined { "joined" } else { "left" });
                    }
                    SessionUpdate::ServerError(message) => eprintln!("! server error: {message}"),
                }
            }
            line = lines.next_line() => {
                match line? {
                    Some(text) => {
                        session.keystroke(&text).await;
                        if let Err(e) = session.send_message(&text).await {
                            eprintln!("! send failed: {e}");
                        }
                    }
                    None => break,
                }
            }
        }
    }

    session.close().await;
    Ok(())
}
