//! In-process mock of the remote device registry, for integration tests
//! and local development against a backend that behaves like the real one.

use std::sync::Arc;

use crate::settings::Settings;

pub mod settings;
mod store;

pub use store::{MockStore, default_fleet};

pub async fn run(settings: &Arc<Settings>) {
    let store = MockStore::with_seed(store::default_fleet()).await;

    let addr = format!("{}:{}", settings.mock.host, settings.mock.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind mock store listener.");

    tracing::info!("mock device store listening on {addr}");

    axum::serve(listener, store.router())
        .await
        .expect("Mock store server failed.");
}
