//! Orchestrates the mutating order operations against the repository
//! contracts, with every validation performed locally before a remote
//! call goes out.
//!
//! Mutations are at-most-one-in-flight per order; a second concurrent
//! call is rejected. After a successful mutation the snapshot is fully
//! replaced by the repository's response, never patched.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rentis_core::money;

use crate::classifier::{self, OrderCategory};
use crate::ledger::{aggregate, LedgerError, ReturnLedger, ReturnStats};
use crate::models::{Order, OrderStatus};
use crate::repository::{AuditLogRepository, OrderRepository};
use crate::settlement::{damage_fee_total, Settlement, SettlementError};
use crate::timeline::{self, TimelineEntry};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Another operation is already in flight for order {0}")]
    OperationInFlight(Uuid),

    #[error("Invalid state transition from {from:?} to {to:?}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Late fee is not editable for this order")]
    LateFeeLocked,

    #[error("Nothing staged to return")]
    EmptyReturn,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error("Remote call failed: {0}")]
    Remote(String),
}

/// Everything the order screen needs, computed in one pass from one
/// snapshot. Recomputation over the same snapshot is idempotent.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub order: Order,
    pub category: OrderCategory,
    pub return_stats: ReturnStats,
    pub settlement: Settlement,
    pub timeline: Vec<TimelineEntry>,
}

/// One item's worth of a return submission.
#[derive(Debug, Clone, Deserialize)]
pub struct ReturnEdit {
    pub item_id: Uuid,
    pub returned_quantity: Option<u32>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub damage_cost: Option<Decimal>,
    pub damage_description: Option<String>,
}

pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    audit: Arc<dyn AuditLogRepository>,
    in_flight: Mutex<HashSet<Uuid>>,
}

/// Releases the per-order mutation slot on drop, error paths included.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<Uuid>>,
    id: Uuid,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.id);
        }
    }
}

impl OrderService {
    pub fn new(orders: Arc<dyn OrderRepository>, audit: Arc<dyn AuditLogRepository>) -> Self {
        Self {
            orders,
            audit,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    fn begin(&self, id: Uuid) -> Result<InFlightGuard<'_>, ServiceError> {
        let mut set = self
            .in_flight
            .lock()
            .map_err(|_| ServiceError::OperationInFlight(id))?;
        if !set.insert(id) {
            return Err(ServiceError::OperationInFlight(id));
        }
        Ok(InFlightGuard {
            set: &self.in_flight,
            id,
        })
    }

    async fn fetch(&self, id: Uuid) -> Result<Order, ServiceError> {
        self.orders
            .fetch(id)
            .await
            .map_err(|e| ServiceError::Remote(e.to_string()))?
            .ok_or(ServiceError::NotFound(id))
    }

    /// Assemble the full order view. The audit read is an independent
    /// fetch; its failure degrades the timeline, never the view.
    pub async fn order_view(&self, id: Uuid, now: DateTime<Utc>) -> Result<OrderView, ServiceError> {
        let order = self.fetch(id).await?;
        let return_stats = aggregate(&order.items);
        let category = classifier::classify(&order, now);
        let settlement = Settlement::compute(&order, category, &return_stats);
        if settlement.damage_total_mismatch {
            tracing::warn!(
                order_id = %id,
                "supplied damage fee total disagrees with item-level sum"
            );
        }

        let timeline = match self.audit.fetch_timeline(id).await {
            Ok(events) => timeline::reconstruct(&order, &return_stats, Some(&events)),
            Err(e) => {
                tracing::warn!(order_id = %id, error = %e, "audit log fetch failed; timeline synthesized");
                timeline::reconstruct(&order, &return_stats, None)
            }
        };

        Ok(OrderView {
            order,
            category,
            return_stats,
            settlement,
            timeline,
        })
    }

    /// Scheduled → Active.
    pub async fn start_rental(&self, id: Uuid) -> Result<Order, ServiceError> {
        let _guard = self.begin(id)?;
        let order = self.fetch(id).await?;
        if order.status != OrderStatus::Scheduled {
            return Err(ServiceError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Active,
            });
        }
        let updated = self
            .orders
            .start_rental(id)
            .await
            .map_err(|e| ServiceError::Remote(e.to_string()))?;
        tracing::info!(order_id = %id, "rental started");
        Ok(updated)
    }

    /// Cancel from any non-terminal status.
    pub async fn cancel(&self, id: Uuid) -> Result<Order, ServiceError> {
        let _guard = self.begin(id)?;
        let order = self.fetch(id).await?;
        if order.status.is_terminal() {
            return Err(ServiceError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Cancelled,
            });
        }
        let updated = self
            .orders
            .update_status(id, OrderStatus::Cancelled, order.late_fee)
            .await
            .map_err(|e| ServiceError::Remote(e.to_string()))?;
        tracing::info!(order_id = %id, "order cancelled");
        Ok(updated)
    }

    /// Validate and commit a batch of return edits. All staging must
    /// pass before anything is sent; the resulting order status is
    /// derived from the projected aggregates.
    pub async fn process_return(
        &self,
        id: Uuid,
        edits: Vec<ReturnEdit>,
        acting_user: &str,
        now: DateTime<Utc>,
    ) -> Result<Order, ServiceError> {
        let _guard = self.begin(id)?;
        let order = self.fetch(id).await?;
        if !matches!(
            order.status,
            OrderStatus::Active | OrderStatus::PartiallyReturned
        ) {
            return Err(ServiceError::InvalidTransition {
                from: order.status,
                to: OrderStatus::PartiallyReturned,
            });
        }

        let mut ledger = ReturnLedger::new(&order);
        for edit in &edits {
            match edit.returned_quantity {
                Some(quantity) => ledger.stage_return(
                    edit.item_id,
                    quantity,
                    edit.damage_cost,
                    edit.damage_description.clone(),
                    now,
                )?,
                None => {
                    ledger.stage_damage(edit.item_id, edit.damage_cost, edit.damage_description.clone())?
                }
            }
        }

        let requests = ledger.committable();
        let damage_only = ledger.damage_updates();
        if requests.is_empty() && damage_only.is_empty() {
            return Err(ServiceError::EmptyReturn);
        }

        for (item_id, cost, description) in damage_only {
            self.orders
                .update_item_damage(id, item_id, cost, description)
                .await
                .map_err(|e| ServiceError::Remote(e.to_string()))?;
        }

        if requests.is_empty() {
            return self.fetch(id).await;
        }

        let projected = ledger.stats();
        let new_status = if projected.pending_quantity == 0 && projected.returned_quantity > 0 {
            if damage_fee_total(&ledger.edited_items()) > Decimal::ZERO {
                OrderStatus::CompletedWithIssues
            } else {
                OrderStatus::Completed
            }
        } else {
            OrderStatus::PartiallyReturned
        };

        self.orders
            .process_return(id, requests, acting_user)
            .await
            .map_err(|e| ServiceError::Remote(e.to_string()))?;
        let updated = self
            .orders
            .update_status(id, new_status, order.late_fee)
            .await
            .map_err(|e| ServiceError::Remote(e.to_string()))?;
        tracing::info!(order_id = %id, status = ?new_status, "return processed");
        Ok(updated)
    }

    /// Record or clear damage on a single item, outside a return flow.
    pub async fn update_item_damage(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        cost: Option<Decimal>,
        description: Option<String>,
    ) -> Result<Order, ServiceError> {
        let _guard = self.begin(order_id)?;
        let order = self.fetch(order_id).await?;
        let mut ledger = ReturnLedger::new(&order);
        ledger.stage_damage(item_id, cost, description.clone())?;
        let updated = self
            .orders
            .update_item_damage(order_id, item_id, cost.map(money::round2), description)
            .await
            .map_err(|e| ServiceError::Remote(e.to_string()))?;
        Ok(updated)
    }

    /// Late fee is only editable while the order classifies as late or
    /// already carries a positive fee.
    pub async fn update_late_fee(
        &self,
        id: Uuid,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Order, ServiceError> {
        let _guard = self.begin(id)?;
        let order = self.fetch(id).await?;
        let stats = aggregate(&order.items);
        let category = classifier::classify(&order, now);
        let settlement = Settlement::compute(&order, category, &stats);
        if !settlement.late_fee_editable {
            return Err(ServiceError::LateFeeLocked);
        }
        if amount < Decimal::ZERO {
            return Err(ServiceError::Settlement(SettlementError::NonPositiveAmount));
        }
        let updated = self
            .orders
            .update_late_fee(id, money::round2(amount))
            .await
            .map_err(|e| ServiceError::Remote(e.to_string()))?;
        tracing::info!(order_id = %id, "late fee updated");
        Ok(updated)
    }

    /// Refund part or all of the remaining deposit balance.
    pub async fn refund_deposit(
        &self,
        id: Uuid,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Order, ServiceError> {
        let _guard = self.begin(id)?;
        let order = self.fetch(id).await?;
        let stats = aggregate(&order.items);
        let category = classifier::classify(&order, now);
        let settlement = Settlement::compute(&order, category, &stats);
        let amount = settlement.validate_refund(amount)?;
        let updated = self
            .orders
            .refund_security_deposit(id, amount)
            .await
            .map_err(|e| ServiceError::Remote(e.to_string()))?;
        tracing::info!(order_id = %id, %amount, "deposit refunded");
        Ok(updated)
    }

    /// Collect some or all of the outstanding amount.
    pub async fn collect_outstanding(
        &self,
        id: Uuid,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Order, ServiceError> {
        let _guard = self.begin(id)?;
        let order = self.fetch(id).await?;
        let stats = aggregate(&order.items);
        let category = classifier::classify(&order, now);
        let settlement = Settlement::compute(&order, category, &stats);
        let amount = settlement.validate_collection(amount)?;
        let updated = self
            .orders
            .collect_outstanding(id, amount)
            .await
            .map_err(|e| ServiceError::Remote(e.to_string()))?;
        tracing::info!(order_id = %id, %amount, "outstanding amount collected");
        Ok(updated)
    }
}
