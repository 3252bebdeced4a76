use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    attachment::{AttachmentStatus, verify_attachment},
    configuration::Settings,
    recipient_list::{LoadError, load_recipients},
    startup::AppState,
};

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RecipientsReport {
    pub total: usize,
    pub list: Vec<String>,
    pub rejected: usize,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ConfigReport {
    pub credentials_present: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub recipients: RecipientsReport,
    pub attachment: AttachmentStatus,
    pub config: ConfigReport,
}

/// Checks every precondition of a dispatch without touching the mail server.
///
/// A list with no valid address is reported as empty, only an unreadable
/// source is an error.
pub async fn collect_status(settings: &Settings) -> Result<StatusReport, LoadError> {
    let recipients = match load_recipients(&settings.sources.recipients_path).await {
        Ok(list) => RecipientsReport {
            total: list.len(),
            list: list
                .addresses()
                .iter()
                .map(|a| a.as_ref().to_owned())
                .collect(),
            rejected: list.rejected(),
        },
        Err(LoadError::NoValidRecipients { rejected, .. }) => RecipientsReport {
            total: 0,
            list: Vec::new(),
            rejected,
        },
        Err(e) => return Err(e),
    };
    let attachment = verify_attachment(
        &settings.sources.attachment_path,
        settings.sources.attachment_advisory_bytes,
    )
    .await;

    Ok(StatusReport {
        status: "ready",
        timestamp: Utc::now(),
        recipients,
        attachment,
        config: ConfigReport {
            credentials_present: settings.smtp.credentials().is_some(),
            smtp_host: settings.smtp.host.clone(),
            smtp_port: settings.smtp.port,
            smtp_user: settings.smtp.masked_username(),
        },
    })
}

#[tracing::instrument(name = "Checking the service status", skip(app_state))]
pub async fn status(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<StatusReport>, StatusError> {
    Ok(Json(collect_status(&app_state.settings).await?))
}

#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct StatusError(#[from] LoadError);

impl IntoResponse for StatusError {
    fn into_response(self) -> Response {
        tracing::error!("{}", self);
        let body = serde_json::json!({
            "status": "error",
            "kind": "internal",
            "error": "Error checking the service status",
            "details": self.to_string(),
            "timestamp": Utc::now(),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
