//! In-memory implementation of the order and audit-log contracts.
//!
//! The production persistence layer lives in another system; this store
//! backs the API host and the integration tests. Every mutation appends
//! an audit row so the timeline has authoritative entries to prefer.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use rentis_core::money;
use rentis_order::models::{actions, AuditEvent, ItemReturnStatus, Order, OrderItem, OrderStatus};
use rentis_order::repository::{
    AuditLogRepository, ItemReturnRequest, OrderRepository, RepoError,
};

#[derive(Default)]
pub struct MemoryStore {
    orders: RwLock<HashMap<Uuid, Order>>,
    audit: RwLock<HashMap<Uuid, Vec<AuditEvent>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an order snapshot, recording its creation in the audit log.
    pub async fn insert(&self, order: Order) {
        let id = order.id;
        self.orders.write().await.insert(id, order);
        self.append(id, actions::ORDER_CREATED, "system", None, None)
            .await;
    }

    /// Seed a representative mid-rental order and return its id.
    pub async fn seed_demo(&self) -> Uuid {
        let now = Utc::now();
        let chairs = OrderItem::new("Banquet chair".into(), 40, Decimal::from(15), 3);
        let tables = OrderItem::new("Round table".into(), 8, Decimal::from(90), 3);

        let subtotal = chairs.line_total + tables.line_total;
        let gst = subtotal * Decimal::new(5, 2);
        let order = Order {
            id: Uuid::new_v4(),
            customer_name: "Lakshmi Events".into(),
            customer_phone: Some("+91 98400 12345".into()),
            status: OrderStatus::Active,
            start_date: Some(now.date_naive().to_string()),
            end_date: Some((now.date_naive() + chrono::Days::new(3)).to_string()),
            start_datetime: None,
            end_datetime: None,
            booking_date: Some(now.date_naive().to_string()),
            subtotal,
            gst_amount: money::round2(gst),
            late_fee: None,
            damage_fee_total: None,
            security_deposit_amount: Some(Decimal::from(2000)),
            security_deposit_refunded_amount: None,
            additional_amount_collected: None,
            security_deposit_collected: true,
            security_deposit_refunded: false,
            total_amount: money::round2(subtotal + gst),
            items: vec![chairs, tables],
            created_at: now,
            updated_at: now,
        };
        let id = order.id;
        self.insert(order).await;
        tracing::info!(order_id = %id, "seeded demo order");
        id
    }

    async fn append(
        &self,
        order_id: Uuid,
        action: &str,
        user: &str,
        new_status: Option<OrderStatus>,
        notes: Option<String>,
    ) {
        self.audit
            .write()
            .await
            .entry(order_id)
            .or_default()
            .push(AuditEvent {
                action: action.to_string(),
                created_at: Utc::now().to_rfc3339(),
                user_name: user.to_string(),
                new_status,
                notes,
            });
    }

    async fn with_order<F>(&self, id: Uuid, mutate: F) -> Result<Order, RepoError>
    where
        F: FnOnce(&mut Order) -> Result<(), RepoError>,
    {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&id)
            .ok_or_else(|| format!("order not found: {id}"))?;
        mutate(order)?;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn fetch(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: Uuid,
        new_status: OrderStatus,
        late_fee: Option<Decimal>,
    ) -> Result<Order, RepoError> {
        let updated = self
            .with_order(id, |order| {
                order.status = new_status;
                order.late_fee = late_fee;
                Ok(())
            })
            .await?;
        self.append(id, actions::STATUS_CHANGED, "system", Some(new_status), None)
            .await;
        Ok(updated)
    }

    async fn start_rental(&self, id: Uuid) -> Result<Order, RepoError> {
        let updated = self
            .with_order(id, |order| {
                if order.status != OrderStatus::Scheduled {
                    return Err(format!("order {id} is not scheduled").into());
                }
                order.status = OrderStatus::Active;
                Ok(())
            })
            .await?;
        self.append(
            id,
            actions::RENTAL_STARTED,
            "system",
            Some(OrderStatus::Active),
            None,
        )
        .await;
        Ok(updated)
    }

    async fn update_late_fee(&self, id: Uuid, amount: Decimal) -> Result<Order, RepoError> {
        let updated = self
            .with_order(id, |order| {
                order.late_fee = Some(amount);
                Ok(())
            })
            .await?;
        self.append(id, actions::LATE_FEE_UPDATED, "system", None, None)
            .await;
        Ok(updated)
    }

    async fn update_item_damage(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        cost: Option<Decimal>,
        description: Option<String>,
    ) -> Result<Order, RepoError> {
        let updated = self
            .with_order(order_id, |order| {
                let item = order
                    .items
                    .iter_mut()
                    .find(|i| i.id == item_id)
                    .ok_or_else(|| format!("item not found: {item_id}"))?;
                item.damage_cost = cost;
                item.damage_description = description;
                Ok(())
            })
            .await?;
        self.append(order_id, actions::DAMAGE_RECORDED, "system", None, None)
            .await;
        Ok(updated)
    }

    async fn process_return(
        &self,
        id: Uuid,
        items: Vec<ItemReturnRequest>,
        acting_user: &str,
    ) -> Result<Order, RepoError> {
        let now = Utc::now();
        let updated = self
            .with_order(id, |order| {
                for request in &items {
                    let item = order
                        .items
                        .iter_mut()
                        .find(|i| i.id == request.item_id)
                        .ok_or_else(|| format!("item not found: {}", request.item_id))?;
                    item.return_status = ItemReturnStatus::Returned;
                    item.returned_quantity = Some(request.returned_quantity);
                    item.actual_return_date = Some(now);
                    if request.damage_cost.is_some() {
                        item.damage_cost = request.damage_cost;
                        item.damage_description = request.damage_description.clone();
                    }
                }
                Ok(())
            })
            .await?;
        self.append(id, actions::RETURN_PROCESSED, acting_user, None, None)
            .await;
        Ok(updated)
    }

    async fn refund_security_deposit(
        &self,
        id: Uuid,
        amount: Decimal,
    ) -> Result<Order, RepoError> {
        let updated = self
            .with_order(id, |order| {
                let deposit = money::or_zero(order.security_deposit_amount);
                let already = money::or_zero(order.security_deposit_refunded_amount);
                let refunded = already + amount;
                order.security_deposit_refunded_amount = Some(refunded);
                if money::within_tolerance(refunded, deposit) || refunded >= deposit {
                    order.security_deposit_refunded = true;
                }
                Ok(())
            })
            .await?;
        self.append(id, actions::DEPOSIT_REFUNDED, "system", None, None)
            .await;
        Ok(updated)
    }

    async fn collect_outstanding(&self, id: Uuid, amount: Decimal) -> Result<Order, RepoError> {
        let updated = self
            .with_order(id, |order| {
                let already = money::or_zero(order.additional_amount_collected);
                order.additional_amount_collected = Some(already + amount);
                Ok(())
            })
            .await?;
        self.append(id, actions::OUTSTANDING_COLLECTED, "system", None, None)
            .await;
        Ok(updated)
    }
}

#[async_trait]
impl AuditLogRepository for MemoryStore {
    async fn fetch_timeline(&self, order_id: Uuid) -> Result<Vec<AuditEvent>, RepoError> {
        Ok(self
            .audit
            .read()
            .await
            .get(&order_id)
            .cloned()
            .unwrap_or_default())
    }
}
