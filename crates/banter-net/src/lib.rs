// WebSocket transport layer for the chat client.

pub mod config;
pub mod manager;
pub mod socket;

mod error;

pub use config::ConnectConfig;
pub use error::{NetError, Result};
pub use manager::{ConnectionManager, SessionChannels};
pub use socket::{spawn_socket, SocketCommand, SocketHandles};
