use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use rentis_order::{Order, OrderView, ReturnEdit};

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ProcessReturnRequest {
    pub items: Vec<ReturnEdit>,
    pub acting_user: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct DamageRequest {
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub cost: Option<Decimal>,
    pub description: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /v1/orders/{id}
/// The full order view: snapshot, category, return stats, settlement
/// figures and the reconstructed timeline.
pub async fn get_order_view(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderView>, AppError> {
    let view = state.service.order_view(order_id, Utc::now()).await?;
    Ok(Json(view))
}

/// POST /v1/orders/{id}/start
pub async fn start_rental(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state.service.start_rental(order_id).await?;
    Ok(Json(order))
}

/// POST /v1/orders/{id}/returns
/// Submit a batch of return / damage edits.
pub async fn process_return(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<ProcessReturnRequest>,
) -> Result<Json<Order>, AppError> {
    let acting_user = req.acting_user.unwrap_or_else(|| "counter".to_string());
    let order = state
        .service
        .process_return(order_id, req.items, &acting_user, Utc::now())
        .await?;
    Ok(Json(order))
}

/// POST /v1/orders/{id}/cancel
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state.service.cancel(order_id).await?;
    Ok(Json(order))
}

/// POST /v1/orders/{id}/late-fee
pub async fn update_late_fee(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .service
        .update_late_fee(order_id, req.amount, Utc::now())
        .await?;
    Ok(Json(order))
}

/// POST /v1/orders/{id}/items/{item_id}/damage
pub async fn update_item_damage(
    State(state): State<AppState>,
    Path((order_id, item_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<DamageRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .service
        .update_item_damage(order_id, item_id, req.cost, req.description)
        .await?;
    Ok(Json(order))
}

/// POST /v1/orders/{id}/deposit/refund
pub async fn refund_deposit(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .service
        .refund_deposit(order_id, req.amount, Utc::now())
        .await?;
    Ok(Json(order))
}

/// POST /v1/orders/{id}/deposit/collect-outstanding
pub async fn collect_outstanding(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .service
        .collect_outstanding(order_id, req.amount, Utc::now())
        .await?;
    Ok(Json(order))
}
