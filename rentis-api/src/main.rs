use std::net::SocketAddr;
use std::sync::Arc;

use rentis_api::{app, AppState};
use rentis_order::OrderService;
use rentis_store::MemoryStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rentis_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = rentis_store::Config::load().expect("Failed to load config");
    tracing::info!("Starting Rentis API on port {}", config.server.port);

    let store = Arc::new(MemoryStore::new());
    if config.demo.seed {
        let order_id = store.seed_demo().await;
        tracing::info!("Demo order available at /v1/orders/{order_id}");
    }

    let service = Arc::new(OrderService::new(store.clone(), store));
    let app = app(AppState { service });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
