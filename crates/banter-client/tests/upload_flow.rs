//! Uploader tests against the in-process server double.

mod support;

use anyhow::Result;
use tokio::sync::mpsc;

use banter_client::{FileUpload, UploadError, UploadProgress, Uploader};
use banter_shared::constants::MAX_UPLOAD_SIZE;
use banter_shared::types::{AccessToken, ChannelId, TeamId};

use support::TestServer;

fn pdf(name: &str) -> FileUpload {
    FileUpload {
        file_name: name.to_string(),
        content_type: "application/pdf".to_string(),
        bytes: b"%PDF-1.4 fake".to_vec(),
    }
}

fn milestones(rx: &mut mpsc::Receiver<UploadProgress>) -> Vec<i8> {
    let mut seen = Vec::new();
    while let Ok(progress) = rx.try_recv() {
        seen.push(progress.milestone());
    }
    seen
}

#[tokio::test]
async fn test_upload_stores_the_file_and_reports_milestones() -> Result<()> {
    let server = TestServer::spawn().await;
    let (tx, mut rx) = mpsc::channel(8);
    let uploader = Uploader::new(server.http_url(), Some(AccessToken::new("test-token")))?
        .with_progress(tx);

    let attachment = uploader
        .upload(pdf("report.pdf"), &TeamId::from("t1"), &ChannelId::from("general"))
        .await?;

    assert_eq!(attachment.file_name, "report.pdf");
    assert_eq!(attachment.content_type, "application/pdf");
    assert_eq!(attachment.size, 13);
    assert_eq!(attachment.team_id.as_str(), "t1");
    assert_eq!(attachment.channel_id.as_str(), "general");
    assert!(!attachment.url.is_empty());

    assert_eq!(milestones(&mut rx), vec![0, 10, 100]);
    Ok(())
}

#[tokio::test]
async fn test_rejected_upload_reports_the_failure_milestone() -> Result<()> {
    let server = TestServer::spawn().await;
    let (tx, mut rx) = mpsc::channel(8);
    let uploader = Uploader::new(server.http_url(), Some(AccessToken::new("test-token")))?
        .with_progress(tx);

    let result = uploader
        .upload(
            FileUpload {
                file_name: "reject.bin".to_string(),
                content_type: "application/octet-stream".to_string(),
                bytes: vec![0u8; 16],
            },
            &TeamId::from("t1"),
            &ChannelId::from("general"),
        )
        .await;

    assert!(matches!(
        result,
        Err(UploadError::Rejected { status: 500, .. })
    ));
    assert_eq!(milestones(&mut rx), vec![0, 10, -1]);
    Ok(())
}

#[tokio::test]
async fn test_upload_requires_a_credential() -> Result<()> {
    let server = TestServer::spawn().await;
    let uploader = Uploader::new(server.http_url(), None)?;

    let result = uploader
        .upload(pdf("report.pdf"), &TeamId::from("t1"), &ChannelId::from("general"))
        .await;

    assert!(matches!(result, Err(UploadError::MissingCredential)));
    Ok(())
}

#[tokio::test]
async fn test_oversize_upload_is_rejected_before_the_wire() -> Result<()> {
    let server = TestServer::spawn().await;
    let (tx, mut rx) = mpsc::channel(8);
    let uploader = Uploader::new(server.http_url(), Some(AccessToken::new("test-token")))?
        .with_progress(tx);

    let result = uploader
        .upload(
            FileUpload {
                file_name: "huge.bin".to_string(),
                content_type: "application/octet-stream".to_string(),
                bytes: vec![0u8; (MAX_UPLOAD_SIZE + 1) as usize],
            },
            &TeamId::from("t1"),
            &ChannelId::from("general"),
        )
        .await;

    assert!(matches!(result, Err(UploadError::TooLarge { .. })));
    // Rejected before it ever started.
    assert_eq!(milestones(&mut rx), vec![-1]);
    Ok(())
}
