use banter_net::NetError;
use banter_shared::model::Attachment;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by session operations.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Not connected to the chat server")]
    NotConnected,

    #[error(transparent)]
    Net(#[from] NetError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    /// The file reached storage but the message announcing it never did.
    /// The carried metadata lets the caller retry the announcement or clean
    /// the orphan up server-side.
    #[error("Attachment {id} was uploaded but the announcing message failed: {reason}", id = .attachment.id)]
    AttachmentOrphaned {
        attachment: Box<Attachment>,
        reason: String,
    },
}

/// Errors from the multipart upload endpoint.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No access token configured")]
    MissingCredential,

    #[error("File is {size} bytes, above the {max} byte limit")]
    TooLarge { size: u64, max: u64 },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("Upload rejected with status {status}: {detail}")]
    Rejected { status: u16, detail: String },
}
