use std::{path::PathBuf, time::Duration};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::domain::{BatchConfig, DEFAULT_BATCH_SIZE};

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub smtp: SmtpSettings,
    pub sources: SourceSettings,
    pub dispatch: DispatchSettings,
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Smtp,
    /// Writes every message as an `.eml` file instead of talking to a server.
    File,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    None,
    StartTls,
    Tls,
}

#[derive(Deserialize, Clone)]
pub struct SmtpSettings {
    pub transport: TransportKind,
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub tls: TlsMode,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub sender_name: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
    pub file_output_dir: PathBuf,
}

impl SmtpSettings {
    /// Account identity and secret, present only when both are non-blank.
    pub fn credentials(&self) -> Option<(&str, &SecretString)> {
        let username = self.username.as_deref().filter(|u| !u.trim().is_empty())?;
        let password = self
            .password
            .as_ref()
            .filter(|p| !p.expose_secret().is_empty())?;
        Some((username, password))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }

    /// The account name with everything but its first three characters hidden.
    pub fn masked_username(&self) -> Option<String> {
        self.username
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .map(|u| format!("{}***", u.chars().take(3).collect::<String>()))
    }
}

#[derive(Deserialize, Clone)]
pub struct SourceSettings {
    pub recipients_path: PathBuf,
    pub attachment_path: PathBuf,
    pub attachment_filename: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub attachment_advisory_bytes: u64,
}

#[derive(Deserialize, Clone)]
pub struct DispatchSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub batch_size: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub pause_between_batches_seconds: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub pause_between_sends_milliseconds: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub deadline_seconds: u64,
}

impl DispatchSettings {
    pub fn batch_defaults(&self) -> BatchConfig {
        BatchConfig {
            batch_size: std::num::NonZeroUsize::new(self.batch_size).unwrap_or(DEFAULT_BATCH_SIZE),
            pause_between_batches: Duration::from_secs(self.pause_between_batches_seconds),
            pause_between_sends: Duration::from_millis(self.pause_between_sends_milliseconds),
        }
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_seconds)
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    dotenvy::dotenv().ok();

    let base_path = std::env::current_dir().map_err(|e| {
        config::ConfigError::Message(format!("Failed to determine the current directory: {}", e))
    })?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        // e.g. `APP_SMTP__SENDER_NAME=Acme` sets `Settings.smtp.sender_name`
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        // Variable names used by existing deployments.
        .set_override_option("smtp.username", std::env::var("GMAIL_USER").ok())?
        .set_override_option("smtp.password", std::env::var("GMAIL_PASSWORD").ok())?
        .set_override_option("smtp.host", std::env::var("SMTP_HOST").ok())?
        .set_override_option("smtp.port", std::env::var("SMTP_PORT").ok())?
        .build()?;

    settings.try_deserialize::<Settings>()
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}
