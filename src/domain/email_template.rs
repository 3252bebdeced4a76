use chrono::{Datelike, Utc};
use rinja_axum::Template;
use serde::Deserialize;
use unicode_segmentation::UnicodeSegmentation;

pub const DEFAULT_SUBJECT: &str = "Soluciones Integrales en Madera para sus Proyectos";
pub const DEFAULT_GREETING: &str = "Hola,";
pub const DEFAULT_BODY: &str = "Esperamos que este mensaje te encuentre bien.\n\nTe adjuntamos un documento PDF importante que requiere tu atención inmediata.";
pub const DEFAULT_SIGNATURE: &str = "Saludos cordiales.";
pub const DEFAULT_COMPANY_NAME: &str = "Maderas Caballero";
/// Page title when the caller did not choose a subject.
pub const DEFAULT_TITLE: &str = "Documento Importante";

const MAX_SUBJECT_GRAPHEMES: usize = 256;

/// Template fields as they arrive on the wire. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailTemplateData {
    pub subject: Option<String>,
    pub greeting: Option<String>,
    pub body: Option<String>,
    pub signature: Option<String>,
    pub company_name: Option<String>,
}

/// A fully resolved template, immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailTemplate {
    title: String,
    subject: String,
    greeting: String,
    body: String,
    signature: String,
    company_name: String,
}

#[derive(thiserror::Error, Debug)]
#[error("failed to render the email body: {0}")]
pub struct RenderError(String);

#[derive(Template)]
#[template(path = "email.html")]
struct EmailHtml<'a> {
    title: &'a str,
    greeting: &'a str,
    body: &'a str,
    signature: &'a str,
    company_name: &'a str,
    year: i32,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn or_default(value: Option<String>, default: &str) -> String {
    non_blank(value).unwrap_or_else(|| default.to_string())
}

impl EmailTemplate {
    pub fn parse(data: EmailTemplateData) -> Result<EmailTemplate, String> {
        let custom_subject = non_blank(data.subject);
        let title = custom_subject.as_deref().unwrap_or(DEFAULT_TITLE).to_string();
        let subject = custom_subject.unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
        if subject.contains(['\r', '\n']) {
            return Err("the subject must fit on a single line.".to_string());
        }
        if subject.graphemes(true).count() > MAX_SUBJECT_GRAPHEMES {
            return Err(format!(
                "the subject is longer than {} characters.",
                MAX_SUBJECT_GRAPHEMES
            ));
        }

        Ok(Self {
            title,
            subject,
            greeting: or_default(data.greeting, DEFAULT_GREETING),
            body: or_default(data.body, DEFAULT_BODY),
            signature: or_default(data.signature, DEFAULT_SIGNATURE),
            company_name: or_default(data.company_name, DEFAULT_COMPANY_NAME),
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn render_html(&self) -> Result<String, RenderError> {
        EmailHtml {
            title: &self.title,
            greeting: &self.greeting,
            body: &self.body,
            signature: &self.signature,
            company_name: &self.company_name,
            year: Utc::now().year(),
        }
        .render()
        .map_err(|e| RenderError(e.to_string()))
    }
}

impl Default for EmailTemplate {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            subject: DEFAULT_SUBJECT.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
            body: DEFAULT_BODY.to_string(),
            signature: DEFAULT_SIGNATURE.to_string(),
            company_name: DEFAULT_COMPANY_NAME.to_string(),
        }
    }
}
