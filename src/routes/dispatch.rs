use std::{sync::Arc, time::Duration};

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    attachment::{Attachment, verify_attachment},
    dispatcher::{Dispatcher, TokioClock},
    domain::{
        BatchConfig, BatchConfigData, DispatchRun, DispatchStats, EmailTemplate,
        EmailTemplateData, SendResult,
    },
    email_client::{self, TransportError},
    recipient_list::{LoadError, load_recipients},
    startup::AppState,
};

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DispatchRequest {
    pub template: Option<EmailTemplateData>,
    pub batch_config: Option<BatchConfigData>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
    pub success: bool,
    pub message: &'static str,
    pub timestamp: DateTime<Utc>,
    pub stats: DispatchStats,
    pub results: Vec<SendResult>,
}

/// An empty or unreadable body means "use the defaults".
fn parse_request(body: &[u8]) -> DispatchRequest {
    if body.is_empty() {
        return DispatchRequest::default();
    }
    serde_json::from_slice(body).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Could not parse the request body, using the defaults");
        DispatchRequest::default()
    })
}

#[tracing::instrument(name = "Sending the attachment to every recipient", skip_all)]
pub async fn dispatch(
    State(app_state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<DispatchResponse>, DispatchError> {
    let settings = &app_state.settings;
    if settings.smtp.credentials().is_none() {
        return Err(DispatchError::MissingCredentials);
    }

    let request = parse_request(&body);
    let template = EmailTemplate::parse(request.template.unwrap_or_default())
        .map_err(DispatchError::InvalidRequest)?;
    let config = BatchConfig::resolve(
        request.batch_config.unwrap_or_default(),
        &settings.dispatch.batch_defaults(),
    );

    // Each run lives in its own task so a panic fails this request only.
    let run_span = tracing::info_span!("Dispatch run", run_id = %Uuid::new_v4());
    let run = tokio::spawn(execute_run(app_state.clone(), template, config).instrument(run_span))
        .await
        .map_err(|e| DispatchError::Internal(e.to_string()))??;

    let stats = run.stats();
    Ok(Json(DispatchResponse {
        success: true,
        message: "Dispatch completed",
        timestamp: Utc::now(),
        stats,
        results: run.into_results(),
    }))
}

async fn execute_run(
    app_state: Arc<AppState>,
    template: EmailTemplate,
    config: BatchConfig,
) -> Result<DispatchRun, DispatchError> {
    let sources = &app_state.settings.sources;

    let recipients = load_recipients(&sources.recipients_path).await?;

    let attachment_status =
        verify_attachment(&sources.attachment_path, sources.attachment_advisory_bytes).await;
    if !attachment_status.exists {
        return Err(DispatchError::AttachmentMissing(attachment_status.path));
    }
    let attachment = Attachment::load(&sources.attachment_path, &sources.attachment_filename)
        .await
        .map_err(DispatchError::AttachmentUnreadable)?;

    let transport = email_client::connect(&app_state.settings.smtp)
        .await
        .map_err(|e| match e {
            TransportError::MissingCredentials => DispatchError::MissingCredentials,
            e => DispatchError::TransportConnect(e),
        })?;

    let deadline = app_state.settings.dispatch.deadline();
    let dispatcher = Dispatcher::new(TokioClock);
    let mut run = DispatchRun::new();
    let outcome = tokio::time::timeout(
        deadline,
        dispatcher.dispatch(
            transport.as_ref(),
            recipients.addresses(),
            &attachment,
            &template,
            &config,
            &mut run,
        ),
    )
    .await;
    drop(transport);

    match outcome {
        Ok(()) => Ok(run),
        Err(_) => {
            run.interrupt("the dispatch deadline elapsed");
            tracing::warn!(
                attempted = run.results().len(),
                remaining = recipients.len().saturating_sub(run.results().len()),
                "Dispatch deadline reached"
            );
            Err(DispatchError::TimedOut {
                deadline,
                partial: run,
            })
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
    #[error("SMTP credentials are not configured, set GMAIL_USER and GMAIL_PASSWORD")]
    MissingCredentials,
    #[error("invalid request, {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Source(#[from] LoadError),
    #[error("the attachment {0} does not exist")]
    AttachmentMissing(String),
    #[error("could not read the attachment: {0}")]
    AttachmentUnreadable(#[source] std::io::Error),
    #[error("{0}")]
    TransportConnect(#[source] TransportError),
    #[error("the dispatch did not finish within {deadline:?}")]
    TimedOut {
        deadline: Duration,
        partial: DispatchRun,
    },
    #[error("the dispatch task failed: {0}")]
    Internal(String),
}

impl DispatchError {
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::MissingCredentials => "credentialsMissing",
            DispatchError::InvalidRequest(_) => "invalidRequest",
            DispatchError::TransportConnect(_) => "transportError",
            DispatchError::TimedOut { .. } => "timeout",
            DispatchError::Source(_)
            | DispatchError::AttachmentMissing(_)
            | DispatchError::AttachmentUnreadable(_)
            | DispatchError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::MissingCredentials => StatusCode::UNAUTHORIZED,
            DispatchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DispatchError::TransportConnect(_) => StatusCode::BAD_GATEWAY,
            DispatchError::TimedOut { .. } => StatusCode::REQUEST_TIMEOUT,
            DispatchError::Source(_)
            | DispatchError::AttachmentMissing(_)
            | DispatchError::AttachmentUnreadable(_)
            | DispatchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            DispatchError::MissingCredentials => "SMTP credentials are not configured",
            DispatchError::InvalidRequest(_) => "Invalid dispatch request",
            DispatchError::TransportConnect(_) => "SMTP connection error",
            DispatchError::TimedOut { .. } => "The dispatch timed out",
            _ => "Internal server error",
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    success: bool,
    kind: &'static str,
    error: &'static str,
    details: String,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<DispatchStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<Vec<SendResult>>,
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        tracing::error!(kind = self.kind(), "{}", self);
        let status = self.status_code();
        let mut body = ErrorBody {
            success: false,
            kind: self.kind(),
            error: self.summary(),
            details: self.to_string(),
            timestamp: Utc::now(),
            stats: None,
            results: None,
        };
        if let DispatchError::TimedOut { partial, .. } = self {
            body.stats = Some(partial.stats());
            body.results = Some(partial.into_results());
        }
        (status, Json(body)).into_response()
    }
}
