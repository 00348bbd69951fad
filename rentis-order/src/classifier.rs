//! Derives the single authoritative display category for an order.
//!
//! One ordered guard chain, first match wins. The persisted status
//! dominates; item-level state and the clock only matter once the
//! status alone is inconclusive.

use chrono::{DateTime, Utc};
use rentis_core::dates;
use serde::{Deserialize, Serialize};

use crate::ledger;
use crate::models::{Order, OrderStatus};

/// The one category shown for an order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderCategory {
    Scheduled,
    Ongoing,
    Late,
    Returned,
    PartiallyReturned,
    Cancelled,
    Flagged,
}

/// Classify an order against the current time. Pure and infallible:
/// a bad end-date string means "not late", never an error.
pub fn classify(order: &Order, now: DateTime<Utc>) -> OrderCategory {
    match order.status {
        OrderStatus::Cancelled => return OrderCategory::Cancelled,
        OrderStatus::Flagged => return OrderCategory::Flagged,
        OrderStatus::PartiallyReturned => return OrderCategory::PartiallyReturned,
        OrderStatus::Completed | OrderStatus::CompletedWithIssues => {
            return OrderCategory::Returned
        }
        // A scheduled order stays scheduled no matter how far past its
        // end date the clock is. Business rule, not an oversight.
        OrderStatus::Scheduled => return OrderCategory::Scheduled,
        OrderStatus::Active => {}
    }

    // The order status may not have caught up with a mixed item state.
    let any_returned = order
        .items
        .iter()
        .any(|item| ledger::effective_returned(item) > 0);
    let any_pending = order
        .items
        .iter()
        .any(|item| ledger::pending_quantity(item) > 0);
    if any_returned && any_pending {
        return OrderCategory::PartiallyReturned;
    }

    if let Some(end) = dates::resolve_end(order.end_datetime.as_deref(), order.end_date.as_deref())
    {
        if now > end {
            return OrderCategory::Late;
        }
    }

    OrderCategory::Ongoing
}
