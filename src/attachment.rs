use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeInfo {
    pub size: u64,
    pub size_mb: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub oversized: bool,
}

/// Result of checking the attachment on disk. A missing file is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentStatus {
    pub exists: bool,
    pub path: String,
    pub size_info: Option<SizeInfo>,
}

#[tracing::instrument(name = "Verifying the attachment")]
pub async fn verify_attachment(path: &Path, advisory_bytes: u64) -> AttachmentStatus {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => metadata,
        _ => {
            tracing::warn!(path = %path.display(), "Attachment not found");
            return AttachmentStatus {
                exists: false,
                path: path.display().to_string(),
                size_info: None,
            };
        }
    };

    let size = metadata.len();
    let size_mb = format!("{:.2}", size as f64 / (1024.0 * 1024.0));
    let oversized = size > advisory_bytes;
    if oversized {
        tracing::warn!(
            size_mb = %size_mb,
            "The attachment is large, some providers may refuse to deliver it"
        );
    } else {
        tracing::info!(size_mb = %size_mb, "Attachment found");
    }

    AttachmentStatus {
        exists: true,
        path: path.display().to_string(),
        size_info: Some(SizeInfo {
            size,
            size_mb,
            last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            oversized,
        }),
    }
}

/// The attachment bytes, read once and shared by every send of a run.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: &'static str,
    pub content: Vec<u8>,
}

impl Attachment {
    pub async fn load(path: &Path, filename: &str) -> std::io::Result<Self> {
        let content = tokio::fs::read(path).await?;
        Ok(Self {
            filename: filename.to_owned(),
            content_type: PDF_CONTENT_TYPE,
            content,
        })
    }
}
