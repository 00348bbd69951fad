//! Shared fixtures for the unit tests in this crate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{ItemReturnStatus, Order, OrderItem, OrderStatus};

fn fixed(s: &str) -> DateTime<Utc> {
    rentis_core::dates::parse_datetime(s).unwrap()
}

pub fn plain_item(quantity: u32) -> OrderItem {
    OrderItem {
        id: Uuid::new_v4(),
        name: "Folding chair".to_string(),
        quantity,
        price_per_day: Decimal::from(100),
        days: 3,
        line_total: Decimal::from(100 * quantity * 3),
        return_status: ItemReturnStatus::NotYetReturned,
        returned_quantity: None,
        damage_cost: None,
        damage_description: None,
        missing_note: None,
        actual_return_date: None,
        late_return: false,
    }
}

pub fn order_with_items(items: Vec<OrderItem>) -> Order {
    Order {
        id: Uuid::new_v4(),
        customer_name: "Asha Traders".to_string(),
        customer_phone: None,
        status: OrderStatus::Active,
        start_date: None,
        end_date: None,
        start_datetime: None,
        end_datetime: None,
        booking_date: None,
        subtotal: Decimal::ZERO,
        gst_amount: Decimal::ZERO,
        late_fee: None,
        damage_fee_total: None,
        security_deposit_amount: None,
        security_deposit_refunded_amount: None,
        additional_amount_collected: None,
        security_deposit_collected: false,
        security_deposit_refunded: false,
        total_amount: Decimal::ZERO,
        items,
        created_at: fixed("2026-02-01T08:00:00Z"),
        updated_at: fixed("2026-02-01T08:00:00Z"),
    }
}
