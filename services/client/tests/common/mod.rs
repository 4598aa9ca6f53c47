//! Common utilities for gateway integration tests

use axum::Router;
use client_lib::adapters::HttpBackendGateway;
use std::time::Duration;

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn spawn_backend(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub backend");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Stub backend stopped");
    });
    format!("http://{}", addr)
}

/// A base URL nothing listens on.
pub async fn closed_port() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    drop(listener);
    format!("http://{}", addr)
}

pub fn gateway(base_url: &str) -> HttpBackendGateway {
    HttpBackendGateway::new(base_url, Duration::from_secs(5)).expect("Failed to build client")
}
