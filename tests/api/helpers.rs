use std::{
    net::TcpListener,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use batch_mailer::{
    configuration::{Settings, TlsMode, TransportKind, get_configuration},
    startup::Application,
    telemetry::{get_subscriber, init_subscriber},
};
use secrecy::SecretString;
use tempfile::TempDir;

// Ensure that the `tracing` stack is only initialised once
static TRACING: LazyLock<()> = LazyLock::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();
    // `TEST_LOG=true cargo test | bunyan` to see the logs
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    };
});

pub const RECIPIENTS: &str = r#"["a@x.com", "bad", "b@x.com", "c@x.com"]"#;

pub struct TestApp {
    pub address: String,
    // Holds the recipient file, the attachment and the outbox.
    pub workdir: TempDir,
    pub outbox: PathBuf,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub async fn get_status(&self) -> reqwest::Response {
        self.api_client
            .get(&format!("{}/status", &self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_dispatch(&self, body: serde_json::Value) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/dispatch", &self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Raw `.eml` contents written by the file transport.
    pub fn sent_emails(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.outbox) else {
            return Vec::new();
        };
        entries
            .map(|entry| std::fs::read_to_string(entry.unwrap().path()).unwrap())
            .collect()
    }
}

/// A port nothing listens on.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind a random port");
    listener.local_addr().unwrap().port()
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_, _| {}).await
}

/// Spawns the application against a throwaway working directory holding a
/// recipient file, a PDF and an outbox. `customise` runs last.
pub async fn spawn_app_with(customise: impl FnOnce(&mut Settings, &Path)) -> TestApp {
    LazyLock::force(&TRACING);

    let workdir = tempfile::tempdir().expect("Failed to create a working directory");
    let recipients_path = workdir.path().join("recipients.json");
    std::fs::write(&recipients_path, RECIPIENTS).expect("Failed to write the recipients");
    let attachment_path = workdir.path().join("document.pdf");
    std::fs::write(&attachment_path, b"%PDF-1.4 test").expect("Failed to write the attachment");
    let outbox = workdir.path().join("outbox");

    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        c.application.host = "127.0.0.1".into();
        // Use a random OS port
        c.application.port = 0;
        c.smtp.transport = TransportKind::File;
        c.smtp.tls = TlsMode::None;
        c.smtp.file_output_dir = outbox.clone();
        c.smtp.username = Some("ventas@example.com".into());
        c.smtp.password = Some(SecretString::from("app-password".to_string()));
        c.sources.recipients_path = recipients_path;
        c.sources.attachment_path = attachment_path;
        c.dispatch.pause_between_batches_seconds = 0;
        c.dispatch.pause_between_sends_milliseconds = 0;
        customise(&mut c, workdir.path());
        c
    };

    let application = Application::build(configuration)
        .await
        .expect("Failed to build application.");
    let port = application.port();
    tokio::spawn(application.run_until_stopped());

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        workdir,
        outbox,
        api_client: reqwest::Client::new(),
    }
}
