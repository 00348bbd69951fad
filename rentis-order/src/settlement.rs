//! Settlement figures for an order: fees, totals, deposit balance and
//! the validation gates for refund / collection calls.
//!
//! Everything here is a pure computation over the order snapshot and
//! the ledger aggregates; amounts stay at full precision and are only
//! rounded to two decimals at the validation boundary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::classifier::OrderCategory;
use crate::ledger::ReturnStats;
use crate::models::{Order, OrderItem, OrderStatus};
use rentis_core::money;

/// Sum of recorded damage over items, ignoring non-positive entries.
pub fn damage_fee_total(items: &[OrderItem]) -> Decimal {
    items
        .iter()
        .filter_map(|i| i.damage_cost)
        .filter(|c| *c > Decimal::ZERO)
        .sum()
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SettlementError {
    #[error("Deposit refund is not available for this order")]
    RefundNotEligible,

    #[error("Amount must be greater than zero")]
    NonPositiveAmount,

    #[error("Refund of {requested} exceeds the remaining deposit balance of {balance}")]
    ExceedsDepositBalance { requested: Decimal, balance: Decimal },

    #[error("No outstanding amount to collect")]
    NothingOutstanding,

    #[error("Collection of {requested} exceeds the outstanding amount of {outstanding}")]
    ExceedsOutstanding {
        requested: Decimal,
        outstanding: Decimal,
    },
}

/// The derived settlement figures for one order snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settlement {
    #[serde(with = "rust_decimal::serde::float")]
    pub damage_fee_total: Decimal,
    /// The externally supplied aggregate disagreed with the item-level
    /// sum beyond tolerance. Data-integrity warning, not an error.
    pub damage_total_mismatch: bool,
    #[serde(with = "rust_decimal::serde::float")]
    pub late_fee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_charges: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub deposit_balance: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub refundable_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub outstanding_amount: Decimal,
    pub late_fee_editable: bool,
    pub refund_eligible: bool,
}

impl Settlement {
    pub fn compute(order: &Order, category: OrderCategory, stats: &ReturnStats) -> Self {
        let item_damage = damage_fee_total(&order.items);
        let damage_total_mismatch = match order.damage_fee_total {
            Some(supplied) => !money::within_tolerance(supplied, item_damage),
            None => false,
        };

        let late_fee = money::or_zero(order.late_fee);
        let total_charges = order.subtotal + order.gst_amount + item_damage + late_fee;

        let deposit = money::or_zero(order.security_deposit_amount);
        let refunded = money::or_zero(order.security_deposit_refunded_amount);
        let deposit_balance = money::clamp_non_negative(deposit - refunded);

        // Policy: the refund is always the full remaining balance.
        // Damage is charged separately through outstanding collection.
        let refundable_amount = deposit_balance;

        let collected = money::or_zero(order.additional_amount_collected);
        let outstanding_amount =
            money::clamp_non_negative(total_charges - deposit - collected);

        let late_fee_editable = category == OrderCategory::Late || late_fee > Decimal::ZERO;

        let anything_back = stats.returned_quantity > 0
            || stats.full_returns > 0
            || stats.partial_returns > 0;
        let settled_status = matches!(
            order.status,
            OrderStatus::Completed | OrderStatus::CompletedWithIssues | OrderStatus::Cancelled
        );
        let refund_eligible = order.security_deposit_collected
            && !order.security_deposit_refunded
            && deposit_balance > money::tolerance()
            && (anything_back || settled_status);

        Self {
            damage_fee_total: item_damage,
            damage_total_mismatch,
            late_fee,
            total_charges,
            deposit_balance,
            refundable_amount,
            outstanding_amount,
            late_fee_editable,
            refund_eligible,
        }
    }

    /// Validate a requested deposit refund. Returns the 2-dp rounded
    /// amount that should go out on the wire.
    pub fn validate_refund(&self, amount: Decimal) -> Result<Decimal, SettlementError> {
        if !self.refund_eligible {
            return Err(SettlementError::RefundNotEligible);
        }
        let amount = money::round2(amount);
        if amount <= Decimal::ZERO {
            return Err(SettlementError::NonPositiveAmount);
        }
        if !money::lte_with_tolerance(amount, self.deposit_balance) {
            return Err(SettlementError::ExceedsDepositBalance {
                requested: amount,
                balance: money::round2(self.deposit_balance),
            });
        }
        Ok(amount)
    }

    /// Validate a requested outstanding-amount collection. Returns the
    /// 2-dp rounded amount that should go out on the wire.
    pub fn validate_collection(&self, amount: Decimal) -> Result<Decimal, SettlementError> {
        if self.outstanding_amount <= Decimal::ZERO {
            return Err(SettlementError::NothingOutstanding);
        }
        let amount = money::round2(amount);
        if amount <= Decimal::ZERO {
            return Err(SettlementError::NonPositiveAmount);
        }
        if !money::lte_with_tolerance(amount, self.outstanding_amount) {
            return Err(SettlementError::ExceedsOutstanding {
                requested: amount,
                outstanding: money::round2(self.outstanding_amount),
            });
        }
        Ok(amount)
    }
}
