//! # banter-client
//!
//! Headless core of a team-chat client: one live connection scoped to a
//! channel or private chat, an optimistically reconciled message log,
//! server-confirmed reactions, typing indicators, and multipart file
//! uploads.  Rendering and input belong to the embedding application.

pub mod messages;
pub mod session;
pub mod typing;
pub mod upload;

mod error;

pub use error::{ClientError, Result, UploadError};
pub use messages::MessageLog;
pub use session::{ChatSession, SessionUpdate};
pub use typing::{TypingDebounce, TypingSet};
pub use upload::{FileUpload, UploadProgress, Uploader};
