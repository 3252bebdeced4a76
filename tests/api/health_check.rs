use crate::helpers::{spawn_app, spawn_app_with};

#[tokio::test]
async fn health_check_works() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .api_client
        .get(&format!("{}/health_check", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    // Assert
    assert!(response.status().is_success());
    assert_eq!(Some(0), response.content_length());
}

#[tokio::test]
async fn the_dashboard_lists_the_recipients() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .api_client
        .get(&app.address)
        .send()
        .await
        .expect("Failed to execute request.");

    // Assert
    assert_eq!(200, response.status().as_u16());
    let html = response.text().await.unwrap();
    assert!(html.contains("a@x.com"));
    assert!(html.contains("c@x.com"));
}

#[tokio::test]
async fn the_dashboard_shows_the_dropped_entries_when_no_recipient_is_valid() {
    // Arrange
    let app = spawn_app_with(|c, dir| {
        let path = dir.join("only_invalid.json");
        std::fs::write(&path, r#"["bad", "worse"]"#).unwrap();
        c.sources.recipients_path = path;
    })
    .await;

    // Act
    let response = app
        .api_client
        .get(&app.address)
        .send()
        .await
        .expect("Failed to execute request.");

    // Assert
    assert_eq!(200, response.status().as_u16());
    let html = response.text().await.unwrap();
    assert!(html.contains("2 entradas inválidas fueron descartadas."));
    assert!(!html.contains("contains no valid addresses"));
}
