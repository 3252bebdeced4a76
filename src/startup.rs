use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    extract::Request,
    response::Response,
    routing::{get, post},
    serve::Serve,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Span, info, info_span};
use uuid::Uuid;

use crate::{
    configuration::Settings,
    routes::{dispatch, health_check, index, status},
};

pub struct AppState {
    pub settings: Settings,
}

pub fn run(listener: TcpListener, settings: Settings) -> Serve<TcpListener, Router, Router> {
    // Shared across handlers and moved into each dispatch task.
    let app_state = Arc::new(AppState { settings });
    let app = Router::new()
        .route("/", get(index))
        .route("/health_check", get(health_check))
        .route("/status", get(status))
        .route("/dispatch", post(dispatch))
        .with_state(app_state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let request_id = Uuid::new_v4();
                    info_span!(
                        "http_request",
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        request_id = ?request_id,
                    )
                })
                .on_response(|response: &Response, latency: Duration, span: &Span| {
                    let status = response.status();
                    info!(parent: span, ?status, ?latency, "Response sent");
                }),
        );

    axum::serve(listener, app)
}

pub struct Application {
    port: u16,
    server: Serve<TcpListener, Router, Router>,
}

impl Application {
    pub async fn build(configuration: Settings) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(format!(
            "{}:{}",
            configuration.application.host, configuration.application.port
        ))
        .await?;
        let port = listener.local_addr()?.port();
        info!(
            port,
            smtp_host = %configuration.smtp.host,
            credentials_present = configuration.smtp.credentials().is_some(),
            "Starting the mailer"
        );

        let server = run(listener, configuration);

        Ok(Self { server, port })
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        Ok(self.server.await?)
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}
