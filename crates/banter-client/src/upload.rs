//! Multipart file uploads to the server's HTTP endpoint.
//!
//! Uploads run outside the event socket.  The caller gets the stored
//! [`Attachment`] back and is responsible for announcing it in a message;
//! coarse progress milestones can be observed through a channel.

use reqwest::multipart::{Form, Part};
use tokio::sync::mpsc;
use tracing::{info, warn};

use banter_shared::constants::{MAX_UPLOAD_SIZE, UPLOAD_ROUTE};
use banter_shared::model::Attachment;
use banter_shared::types::{AccessToken, ChannelId, TeamId};

use crate::error::UploadError;

/// An in-memory file handed to the uploader.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Coarse progress milestones reported during an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadProgress {
    /// Accepted locally, about to start.
    Started,
    /// The request is on the wire.
    InFlight,
    /// The server stored the file.
    Complete,
    /// The upload failed.
    Failed,
}

impl UploadProgress {
    /// Percentage-style milestone for display layers: 0, 10, 100, or -1 on
    /// failure.
    pub fn milestone(&self) -> i8 {
        match self {
            Self::Started => 0,
            Self::InFlight => 10,
            Self::Complete => 100,
            Self::Failed => -1,
        }
    }
}

/// Uploads files to the server's multipart endpoint.
pub struct Uploader {
    client: reqwest::Client,
    base_url: String,
    token: Option<AccessToken>,
    progress: Option<mpsc::Sender<UploadProgress>>,
}

impl Uploader {
    pub fn new(base_url: String, token: Option<AccessToken>) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base_url,
            token,
            progress: None,
        })
    }

    /// Report progress milestones to `tx` in addition to the return value.
    pub fn with_progress(mut self, tx: mpsc::Sender<UploadProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Upload a file scoped to a team and channel, returning the stored
    /// attachment metadata.
    ///
    /// Every failure path reports [`UploadProgress::Failed`] before the
    /// error is returned.
    pub async fn upload(
        &self,
        file: FileUpload,
        team_id: &TeamId,
        channel_id: &ChannelId,
    ) -> Result<Attachment, UploadError> {
        let file_name = file.file_name.clone();
        match self.try_upload(file, team_id, channel_id).await {
            Ok(attachment) => {
                info!(file = %file_name, id = %attachment.id, "Upload complete");
                self.report(UploadProgress::Complete).await;
                Ok(attachment)
            }
            Err(e) => {
                warn!(file = %file_name, error = %e, "Upload failed");
                self.report(UploadProgress::Failed).await;
                Err(e)
            }
        }
    }

    async fn try_upload(
        &self,
        file: FileUpload,
        team_id: &TeamId,
        channel_id: &ChannelId,
    ) -> Result<Attachment, UploadError> {
        let token = self.token.as_ref().ok_or(UploadError::MissingCredential)?;

        let size = file.bytes.len() as u64;
        if size > MAX_UPLOAD_SIZE {
            return Err(UploadError::TooLarge {
                size,
                max: MAX_UPLOAD_SIZE,
            });
        }

        self.report(UploadProgress::Started).await;

        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)?;
        let form = Form::new()
            .part("file", part)
            .text("teamId", team_id.as_str().to_string())
            .text("channelId", channel_id.as_str().to_string());

        self.report(UploadProgress::InFlight).await;

        let response = self
            .client
            .post(format!("{}{}", self.base_url, UPLOAD_ROUTE))
            .bearer_auth(token.as_str())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(response.json::<Attachment>().await?)
    }

    async fn report(&self, progress: UploadProgress) {
        if let Some(ref tx) = self.progress {
            let _ = tx.send(progress).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_milestones() {
        assert_eq!(UploadProgress::Started.milestone(), 0);
        assert_eq!(UploadProgress::InFlight.milestone(), 10);
        assert_eq!(UploadProgress::Complete.milestone(), 100);
        assert_eq!(UploadProgress::Failed.milestone(), -1);
    }
}
