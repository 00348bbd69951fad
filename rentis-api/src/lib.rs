use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod orders;
pub mod state;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    Router::new()
        .route("/v1/orders/{id}", get(orders::get_order_view))
        .route("/v1/orders/{id}/start", post(orders::start_rental))
        .route("/v1/orders/{id}/returns", post(orders::process_return))
        .route("/v1/orders/{id}/cancel", post(orders::cancel_order))
        .route("/v1/orders/{id}/late-fee", post(orders::update_late_fee))
        .route(
            "/v1/orders/{id}/items/{item_id}/damage",
            post(orders::update_item_damage),
        )
        .route("/v1/orders/{id}/deposit/refund", post(orders::refund_deposit))
        .route(
            "/v1/orders/{id}/deposit/collect-outstanding",
            post(orders::collect_outstanding),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
