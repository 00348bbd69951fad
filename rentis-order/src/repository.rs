use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AuditEvent, Order, OrderStatus};

pub type RepoError = Box<dyn std::error::Error + Send + Sync>;

/// One item's share of a `process-return` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemReturnRequest {
    pub item_id: Uuid,
    pub returned_quantity: u32,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub damage_cost: Option<Decimal>,
    pub damage_description: Option<String>,
}

/// Contract the remote order store must satisfy. Calls either return
/// the updated order or fail with a descriptive error; none are
/// idempotent at the transport level — the caller's in-flight guard is
/// the only duplicate-submission protection.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn fetch(&self, id: Uuid) -> Result<Option<Order>, RepoError>;

    async fn update_status(
        &self,
        id: Uuid,
        new_status: OrderStatus,
        late_fee: Option<Decimal>,
    ) -> Result<Order, RepoError>;

    async fn start_rental(&self, id: Uuid) -> Result<Order, RepoError>;

    async fn update_late_fee(&self, id: Uuid, amount: Decimal) -> Result<Order, RepoError>;

    async fn update_item_damage(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        cost: Option<Decimal>,
        description: Option<String>,
    ) -> Result<Order, RepoError>;

    async fn process_return(
        &self,
        id: Uuid,
        items: Vec<ItemReturnRequest>,
        acting_user: &str,
    ) -> Result<Order, RepoError>;

    async fn refund_security_deposit(&self, id: Uuid, amount: Decimal)
        -> Result<Order, RepoError>;

    async fn collect_outstanding(&self, id: Uuid, amount: Decimal) -> Result<Order, RepoError>;
}

/// Read side of the external audit log. May fail or return nothing;
/// the timeline degrades to synthesized entries either way.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn fetch_timeline(&self, order_id: Uuid) -> Result<Vec<AuditEvent>, RepoError>;
}
