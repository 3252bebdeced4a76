use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use rinja_axum::Template;

use super::collect_status;
use crate::startup::AppState;

#[derive(Template)]
#[template(path = "index.html")]
struct DashboardTemplate<'a> {
    title: &'a str,
    recipients: Vec<String>,
    rejected: usize,
    attachment_path: String,
    attachment_size: Option<String>,
    attachment_oversized: bool,
    credentials_present: bool,
    smtp_target: String,
    error: Option<String>,
}

pub async fn index(State(app_state): State<Arc<AppState>>) -> Response {
    let settings = &app_state.settings;
    let smtp_target = format!("{}:{}", settings.smtp.host, settings.smtp.port);

    let template = match collect_status(settings).await {
        Ok(report) => {
            let size_info = report.attachment.size_info.as_ref();
            DashboardTemplate {
                title: "batch-mailer",
                recipients: report.recipients.list,
                rejected: report.recipients.rejected,
                attachment_path: report.attachment.path.clone(),
                attachment_size: size_info.map(|info| info.size_mb.clone()),
                attachment_oversized: size_info.is_some_and(|info| info.oversized),
                credentials_present: report.config.credentials_present,
                smtp_target,
                error: None,
            }
        }
        Err(e) => DashboardTemplate {
            title: "batch-mailer",
            recipients: Vec::new(),
            rejected: 0,
            attachment_path: settings.sources.attachment_path.display().to_string(),
            attachment_size: None,
            attachment_oversized: false,
            credentials_present: settings.smtp.credentials().is_some(),
            smtp_target,
            error: Some(e.to_string()),
        },
    };

    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("failed to render the dashboard: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
