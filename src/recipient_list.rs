use std::path::{Path, PathBuf};

use crate::domain::RecipientAddress;

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("could not read or parse the recipient file {path}: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },
    #[error("the recipient file {path} contains no valid addresses ({rejected} rejected)")]
    NoValidRecipients { path: PathBuf, rejected: usize },
}

/// Validated recipients in file order, plus how many entries were dropped.
#[derive(Debug, Clone)]
pub struct RecipientList {
    addresses: Vec<RecipientAddress>,
    rejected: usize,
}

impl RecipientList {
    pub fn addresses(&self) -> &[RecipientAddress] {
        &self.addresses
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn rejected(&self) -> usize {
        self.rejected
    }
}

#[tracing::instrument(name = "Loading the recipient list")]
pub async fn load_recipients(path: &Path) -> Result<RecipientList, LoadError> {
    let unavailable = |reason: String| LoadError::SourceUnavailable {
        path: path.to_owned(),
        reason,
    };

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| unavailable(e.to_string()))?;
    let entries: Vec<String> =
        serde_json::from_str(&content).map_err(|e| unavailable(e.to_string()))?;

    let total = entries.len();
    let addresses: Vec<RecipientAddress> = entries
        .into_iter()
        .filter_map(|entry| RecipientAddress::parse(entry).ok())
        .collect();
    let rejected = total - addresses.len();

    if rejected > 0 {
        tracing::warn!(rejected, "Dropped invalid entries from the recipient list");
    }
    if addresses.is_empty() {
        return Err(LoadError::NoValidRecipients {
            path: path.to_owned(),
            rejected,
        });
    }
    tracing::info!(valid = addresses.len(), "Recipient list loaded");

    Ok(RecipientList {
        addresses,
        rejected,
    })
}
