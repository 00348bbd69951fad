use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted order status in the rental lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Scheduled,
    Active,
    PartiallyReturned,
    Completed,
    CompletedWithIssues,
    Cancelled,
    Flagged,
}

impl OrderStatus {
    /// Terminal statuses cannot be cancelled.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::CompletedWithIssues | OrderStatus::Cancelled
        )
    }
}

/// Per-item return flag as persisted. `Returned` with an absent
/// `returned_quantity` is the full-return shorthand, not missing data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemReturnStatus {
    NotYetReturned,
    Returned,
}

/// The single source of truth for a rental booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub status: OrderStatus,
    /// Date-only rental period bounds (`YYYY-MM-DD`), kept as received.
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Full timestamps; take precedence over the date-only fields.
    pub start_datetime: Option<String>,
    pub end_datetime: Option<String>,
    pub booking_date: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub gst_amount: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub late_fee: Option<Decimal>,
    /// Externally supplied aggregate; must reconcile with the item-level sum.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub damage_fee_total: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub security_deposit_amount: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub security_deposit_refunded_amount: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub additional_amount_collected: Option<Decimal>,
    pub security_deposit_collected: bool,
    pub security_deposit_refunded: bool,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    /// Insertion order is display order, nothing more.
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An individual rented item within an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub name: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_per_day: Decimal,
    pub days: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub line_total: Decimal,
    pub return_status: ItemReturnStatus,
    pub returned_quantity: Option<u32>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub damage_cost: Option<Decimal>,
    pub damage_description: Option<String>,
    pub missing_note: Option<String>,
    pub actual_return_date: Option<DateTime<Utc>>,
    /// Set by an external process, never derived here.
    pub late_return: bool,
}

impl OrderItem {
    pub fn new(name: String, quantity: u32, price_per_day: Decimal, days: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            quantity,
            price_per_day,
            days,
            line_total: price_per_day * Decimal::from(quantity) * Decimal::from(days),
            return_status: ItemReturnStatus::NotYetReturned,
            returned_quantity: None,
            damage_cost: None,
            damage_description: None,
            missing_note: None,
            actual_return_date: None,
            late_return: false,
        }
    }
}

/// Audit-log action kinds the timeline knows how to match.
pub mod actions {
    pub const ORDER_CREATED: &str = "ORDER_CREATED";
    pub const RENTAL_STARTED: &str = "RENTAL_STARTED";
    pub const STATUS_CHANGED: &str = "STATUS_CHANGED";
    pub const RETURN_PROCESSED: &str = "RETURN_PROCESSED";
    pub const DAMAGE_RECORDED: &str = "DAMAGE_RECORDED";
    pub const ORDER_FLAGGED: &str = "ORDER_FLAGGED";
    pub const DEPOSIT_REFUNDED: &str = "DEPOSIT_REFUNDED";
    pub const OUTSTANDING_COLLECTED: &str = "OUTSTANDING_COLLECTED";
    pub const LATE_FEE_UPDATED: &str = "LATE_FEE_UPDATED";
}

/// A row from the external audit log. The timestamp stays a string
/// because upstream rows are occasionally unparseable; the timeline
/// falls back to synthesized entries in that case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub action: String,
    pub created_at: String,
    pub user_name: String,
    pub new_status: Option<OrderStatus>,
    pub notes: Option<String>,
}
