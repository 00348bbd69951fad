use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use rentis_api::{app, AppState};
use rentis_order::OrderService;
use rentis_store::MemoryStore;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn test_app() -> (axum::Router, Arc<MemoryStore>, uuid::Uuid) {
    let store = Arc::new(MemoryStore::new());
    let order_id = store.seed_demo().await;
    let service = Arc::new(OrderService::new(store.clone(), store.clone()));
    (app(AppState { service }), store, order_id)
}

async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn post_json(app: &axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn full_return_and_refund_flow() {
    let (app, _store, order_id) = test_app().await;

    // 1. The seeded order is mid-rental.
    let (status, view) = get_json(&app, &format!("/v1/orders/{order_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["category"], "ONGOING");
    assert_eq!(view["return_stats"]["state"], "PENDING");
    assert_eq!(view["settlement"]["refund_eligible"], Value::Bool(false));

    // 2. Return everything, one item with damage.
    let items = view["order"]["items"].as_array().unwrap().clone();
    let edits: Vec<Value> = items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let mut edit = json!({
                "item_id": item["id"],
                "returned_quantity": item["quantity"],
            });
            if idx == 0 {
                edit["damage_cost"] = json!(150.0);
                edit["damage_description"] = json!("two broken legs");
            }
            edit
        })
        .collect();
    let (status, updated) = post_json(
        &app,
        &format!("/v1/orders/{order_id}/returns"),
        json!({ "items": edits, "acting_user": "arun" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "COMPLETED_WITH_ISSUES");

    // 3. The view now shows a settled order with an eligible refund and
    //    an authoritative (non-synthesized) return milestone.
    let (status, view) = get_json(&app, &format!("/v1/orders/{order_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["category"], "RETURNED");
    assert_eq!(view["return_stats"]["state"], "RETURNED");
    assert_eq!(view["settlement"]["refund_eligible"], Value::Bool(true));
    assert_eq!(view["settlement"]["damage_fee_total"], json!(150.0));
    let timeline = view["timeline"].as_array().unwrap();
    assert!(timeline
        .iter()
        .any(|e| e["kind"] == "RETURNED" && e["synthesized"] == Value::Bool(false)));

    // 4. Refund the full deposit.
    let (status, _) = post_json(
        &app,
        &format!("/v1/orders/{order_id}/deposit/refund"),
        json!({ "amount": 2000.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, view) = get_json(&app, &format!("/v1/orders/{order_id}")).await;
    assert_eq!(view["order"]["security_deposit_refunded"], Value::Bool(true));
    assert_eq!(view["settlement"]["deposit_balance"], json!(0.0));

    // 5. A second refund is rejected before reaching the store.
    let (status, body) = post_json(
        &app,
        &format!("/v1/orders/{order_id}/deposit/refund"),
        json!({ "amount": 1.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("refund"));
}

#[tokio::test]
async fn over_quantity_return_is_a_bad_request() {
    let (app, _store, order_id) = test_app().await;
    let (_, view) = get_json(&app, &format!("/v1/orders/{order_id}")).await;
    let item = &view["order"]["items"][0];
    let too_many = item["quantity"].as_u64().unwrap() + 1;

    let (status, body) = post_json(
        &app,
        &format!("/v1/orders/{order_id}/returns"),
        json!({ "items": [{ "item_id": item["id"], "returned_quantity": too_many }] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("pending"));
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let (app, _store, _) = test_app().await;
    let ghost = uuid::Uuid::new_v4();
    let (status, _) = get_json(&app, &format!("/v1/orders/{ghost}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_then_cancel_again_conflicts_with_nothing_but_state() {
    let (app, _store, order_id) = test_app().await;

    let (status, cancelled) =
        post_json(&app, &format!("/v1/orders/{order_id}/cancel"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "CANCELLED");

    // Cancelling a terminal order is a validation error, not a crash.
    let (status, _) = post_json(&app, &format!("/v1/orders/{order_id}/cancel"), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
