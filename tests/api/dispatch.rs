use crate::helpers::{closed_port, spawn_app, spawn_app_with};
use batch_mailer::configuration::{TlsMode, TransportKind};
use serde_json::json;

#[tokio::test]
async fn dispatch_sends_one_email_per_valid_recipient() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app.post_dispatch(json!({})).await;

    // Assert
    assert_eq!(200, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(
        body["stats"],
        json!({ "total": 3, "succeeded": 3, "failed": 0, "percentSucceeded": 100 })
    );
    let emails: Vec<&str> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["email"].as_str().unwrap())
        .collect();
    assert_eq!(emails, vec!["a@x.com", "b@x.com", "c@x.com"]);
    assert_eq!(app.sent_emails().len(), 3);
}

#[tokio::test]
async fn dispatch_without_a_body_uses_the_defaults() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .api_client
        .post(&format!("{}/dispatch", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    // Assert
    assert_eq!(200, response.status().as_u16());
    let sent = app.sent_emails();
    assert_eq!(sent.len(), 3);
    assert!(sent[0].contains("presentacion_maderas_caballero.pdf"));
}

#[tokio::test]
async fn dispatch_uses_the_requested_subject() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .post_dispatch(json!({
            "template": { "subject": "Catalogo Acme", "companyName": "Acme" },
            "batchConfig": { "batchSize": 2, "pauseBetweenSendsMs": 0, "pauseBetweenBatchesMs": 0 }
        }))
        .await;

    // Assert
    assert_eq!(200, response.status().as_u16());
    for email in app.sent_emails() {
        assert!(email.contains("Subject: Catalogo Acme"));
    }
}

#[tokio::test]
async fn a_non_positive_batch_size_is_coerced() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .post_dispatch(json!({ "batchConfig": { "batchSize": 0 } }))
        .await;

    // Assert
    assert_eq!(200, response.status().as_u16());
    assert_eq!(app.sent_emails().len(), 3);
}

#[tokio::test]
async fn dispatch_returns_a_401_without_credentials() {
    // Arrange
    let app = spawn_app_with(|c, _| {
        c.smtp.username = None;
    })
    .await;

    // Act
    let response = app.post_dispatch(json!({})).await;

    // Assert
    assert_eq!(401, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["kind"], "credentialsMissing");
    assert!(app.sent_emails().is_empty());
}

#[tokio::test]
async fn a_missing_attachment_aborts_before_connecting() {
    // Arrange
    // The SMTP target is unreachable: reaching it would turn into a 502.
    let app = spawn_app_with(|c, dir| {
        c.sources.attachment_path = dir.join("missing.pdf");
        c.smtp.transport = TransportKind::Smtp;
        c.smtp.tls = TlsMode::None;
        c.smtp.host = "127.0.0.1".into();
        c.smtp.port = closed_port();
    })
    .await;

    // Act
    let response = app.post_dispatch(json!({})).await;

    // Assert
    assert_eq!(500, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "internal");
    assert!(body["details"].as_str().unwrap().contains("missing.pdf"));
    assert!(body.get("results").is_none());
}

#[tokio::test]
async fn dispatch_returns_a_502_when_the_mail_server_is_unreachable() {
    // Arrange
    let app = spawn_app_with(|c, _| {
        c.smtp.transport = TransportKind::Smtp;
        c.smtp.tls = TlsMode::None;
        c.smtp.host = "127.0.0.1".into();
        c.smtp.port = closed_port();
        c.smtp.timeout_milliseconds = 2_000;
    })
    .await;

    // Act
    let response = app.post_dispatch(json!({})).await;

    // Assert
    assert_eq!(502, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "transportError");
}

#[tokio::test]
async fn dispatch_returns_a_500_when_no_recipient_is_valid() {
    // Arrange
    let app = spawn_app_with(|c, dir| {
        let path = dir.join("invalid.json");
        std::fs::write(&path, r#"["bad", "worse"]"#).unwrap();
        c.sources.recipients_path = path;
    })
    .await;

    // Act
    let response = app.post_dispatch(json!({})).await;

    // Assert
    assert_eq!(500, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "internal");
    assert!(app.sent_emails().is_empty());
}

#[tokio::test]
async fn dispatch_rejects_a_multi_line_subject() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .post_dispatch(json!({ "template": { "subject": "Hola\r\nBcc: x@y.com" } }))
        .await;

    // Assert
    assert_eq!(400, response.status().as_u16());
    assert!(app.sent_emails().is_empty());
}

#[tokio::test]
async fn a_timed_out_dispatch_returns_the_partial_results() {
    // Arrange
    let app = spawn_app_with(|c, _| {
        c.dispatch.deadline_seconds = 1;
    })
    .await;

    // Act
    let response = app
        .post_dispatch(json!({
            "batchConfig": { "batchSize": 1, "pauseBetweenBatchesMs": 10000 }
        }))
        .await;

    // Assert
    assert_eq!(408, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "timeout");
    assert_eq!(body["stats"]["total"], 1);
    assert_eq!(body["results"][0]["email"], "a@x.com");
    assert_eq!(app.sent_emails().len(), 1);
}
