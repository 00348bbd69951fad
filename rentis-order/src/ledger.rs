//! Return ledger: per-item return math, order-level aggregates, and the
//! validated draft edits that become a `process-return` call.
//!
//! The ledger owns one tagged edit state per item. The presentation
//! layer only ever reads a snapshot of it; nothing here talks to the
//! repository.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ItemReturnStatus, Order, OrderItem};
use crate::repository::ItemReturnRequest;

/// Resolved count of units returned for an item. `Returned` with no
/// explicit quantity is the full-return shorthand.
pub fn effective_returned(item: &OrderItem) -> u32 {
    match (item.return_status, item.returned_quantity) {
        (ItemReturnStatus::Returned, None) => item.quantity,
        (_, quantity) => quantity.unwrap_or(0),
    }
}

/// Units of an item still out with the customer.
pub fn pending_quantity(item: &OrderItem) -> u32 {
    match (item.return_status, item.returned_quantity) {
        (ItemReturnStatus::Returned, None) => 0,
        (_, quantity) => item.quantity.saturating_sub(quantity.unwrap_or(0)),
    }
}

/// Order-level return state derived from the aggregates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnState {
    Pending,
    Partial,
    Returned,
}

/// Order-level return statistics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReturnStats {
    pub total_items: usize,
    pub total_quantity: u32,
    pub returned_quantity: u32,
    pub pending_quantity: u32,
    pub full_returns: usize,
    pub partial_returns: usize,
    pub pending_count: usize,
    pub state: ReturnState,
}

/// Aggregate item return state into order-level statistics.
pub fn aggregate(items: &[OrderItem]) -> ReturnStats {
    let total_quantity: u32 = items.iter().map(|i| i.quantity).sum();
    let returned_quantity: u32 = items.iter().map(effective_returned).sum();
    let pending: u32 = items.iter().map(pending_quantity).sum();

    let full_returns = items
        .iter()
        .filter(|i| {
            i.return_status == ItemReturnStatus::Returned && effective_returned(i) >= i.quantity
        })
        .count();
    let partial_returns = items
        .iter()
        .filter(|i| {
            i.return_status == ItemReturnStatus::Returned
                && matches!(i.returned_quantity, Some(q) if q > 0 && q < i.quantity)
        })
        .count();
    let pending_count = items
        .iter()
        .filter(|i| i.return_status != ItemReturnStatus::Returned)
        .count();

    let every_item_full = items.iter().all(|i| effective_returned(i) >= i.quantity);
    let state = if returned_quantity > 0 && pending == 0 && every_item_full {
        ReturnState::Returned
    } else if returned_quantity > 0 && pending > 0 {
        ReturnState::Partial
    } else {
        ReturnState::Pending
    };

    ReturnStats {
        total_items: items.len(),
        total_quantity,
        returned_quantity,
        pending_quantity: pending,
        full_returns,
        partial_returns,
        pending_count,
        state,
    }
}

/// One local, not-yet-persisted edit for an item.
#[derive(Debug, Clone, PartialEq)]
enum ItemEdit {
    /// No local changes; the snapshot fields stand.
    Untouched,
    /// A return and/or damage staged locally.
    Staged {
        returned_quantity: Option<u32>,
        returned_at: Option<DateTime<Utc>>,
        damage_cost: Option<Decimal>,
        damage_description: Option<String>,
    },
    /// A committed return locally reverted; damage survives unless
    /// the caller asked for it to go too.
    Reverted { clear_damage: bool },
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LedgerError {
    #[error("Item not found on this order: {0}")]
    UnknownItem(Uuid),

    #[error("Returned quantity must be at least 1")]
    ZeroQuantity,

    #[error("Cannot return {requested} units; only {pending} still pending")]
    QuantityExceedsPending { requested: u32, pending: u32 },

    #[error("Damage cost cannot be negative")]
    NegativeDamageCost,
}

/// Draft return edits over an immutable order snapshot.
pub struct ReturnLedger {
    items: Vec<OrderItem>,
    edits: HashMap<Uuid, ItemEdit>,
}

impl ReturnLedger {
    pub fn new(order: &Order) -> Self {
        Self {
            items: order.items.clone(),
            edits: HashMap::new(),
        }
    }

    /// Stage a return for an item. Validates against the item's current
    /// pending quantity (snapshot plus local edits, never a stale copy).
    /// Restaging replaces the previous draft for the item.
    pub fn stage_return(
        &mut self,
        item_id: Uuid,
        quantity: u32,
        damage_cost: Option<Decimal>,
        damage_description: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        if quantity == 0 {
            return Err(LedgerError::ZeroQuantity);
        }
        if matches!(damage_cost, Some(c) if c < Decimal::ZERO) {
            return Err(LedgerError::NegativeDamageCost);
        }
        // Pending is computed against the snapshot item, with a local
        // revert restoring the full quantity. A restage does not stack
        // on top of its own previous draft.
        let snapshot = self.snapshot_item(item_id)?;
        let pending = match self.edits.get(&item_id) {
            Some(ItemEdit::Reverted { .. }) => snapshot.quantity,
            _ => pending_quantity(&snapshot),
        };
        if quantity > pending {
            return Err(LedgerError::QuantityExceedsPending {
                requested: quantity,
                pending,
            });
        }

        let (kept_cost, kept_description) = self.staged_damage(item_id);
        self.edits.insert(
            item_id,
            ItemEdit::Staged {
                returned_quantity: Some(quantity),
                returned_at: Some(now),
                damage_cost: damage_cost.or(kept_cost),
                damage_description: damage_description.or(kept_description),
            },
        );
        Ok(())
    }

    /// Record damage for an item, independent of its return state.
    pub fn stage_damage(
        &mut self,
        item_id: Uuid,
        cost: Option<Decimal>,
        description: Option<String>,
    ) -> Result<(), LedgerError> {
        if matches!(cost, Some(c) if c < Decimal::ZERO) {
            return Err(LedgerError::NegativeDamageCost);
        }
        self.snapshot_item(item_id)?;
        let new_edit = match self.edits.get(&item_id) {
            Some(ItemEdit::Staged {
                returned_quantity,
                returned_at,
                ..
            }) => ItemEdit::Staged {
                returned_quantity: *returned_quantity,
                returned_at: *returned_at,
                damage_cost: cost,
                damage_description: description,
            },
            _ => ItemEdit::Staged {
                returned_quantity: None,
                returned_at: None,
                damage_cost: cost,
                damage_description: description,
            },
        };
        self.edits.insert(item_id, new_edit);
        Ok(())
    }

    /// Undo a return for an item. A staged return is simply dropped; a
    /// committed return is marked reverted. Recorded damage is kept
    /// unless `clear_damage` is set — unchecking a return must not
    /// silently discard a damage entry.
    pub fn revert(&mut self, item_id: Uuid, clear_damage: bool) -> Result<(), LedgerError> {
        let snapshot = self.snapshot_item(item_id)?;
        match self.edits.get(&item_id) {
            Some(ItemEdit::Staged {
                damage_cost,
                damage_description,
                ..
            }) => {
                let (cost, description) = if clear_damage {
                    (None, None)
                } else {
                    (*damage_cost, damage_description.clone())
                };
                if snapshot.return_status == ItemReturnStatus::Returned {
                    self.edits.insert(item_id, ItemEdit::Reverted { clear_damage });
                } else if cost.is_some() || description.is_some() {
                    self.edits.insert(
                        item_id,
                        ItemEdit::Staged {
                            returned_quantity: None,
                            returned_at: None,
                            damage_cost: cost,
                            damage_description: description,
                        },
                    );
                } else {
                    self.edits.remove(&item_id);
                }
            }
            _ => {
                // Covers committed returns and the rq-without-status case;
                // on an untouched pending item this is a no-op view-wise.
                self.edits.insert(item_id, ItemEdit::Reverted { clear_damage });
            }
        }
        Ok(())
    }

    /// The items as they would look with every local edit applied.
    pub fn edited_items(&self) -> Vec<OrderItem> {
        self.items.iter().map(|item| self.apply_edit(item)).collect()
    }

    /// Aggregates as if the staged edits were already persisted.
    pub fn stats(&self) -> ReturnStats {
        aggregate(&self.edited_items())
    }

    /// The staged returns, in item display order, ready for the
    /// `process-return` repository call.
    pub fn committable(&self) -> Vec<ItemReturnRequest> {
        self.items
            .iter()
            .filter_map(|item| match self.edits.get(&item.id) {
                Some(ItemEdit::Staged {
                    returned_quantity: Some(quantity),
                    damage_cost,
                    damage_description,
                    ..
                }) => Some(ItemReturnRequest {
                    item_id: item.id,
                    returned_quantity: *quantity,
                    damage_cost: *damage_cost,
                    damage_description: damage_description.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Damage-only edits (no return staged), in item display order.
    pub fn damage_updates(&self) -> Vec<(Uuid, Option<Decimal>, Option<String>)> {
        self.items
            .iter()
            .filter_map(|item| match self.edits.get(&item.id) {
                Some(ItemEdit::Staged {
                    returned_quantity: None,
                    damage_cost,
                    damage_description,
                    ..
                }) if damage_cost.is_some() || damage_description.is_some() => {
                    Some((item.id, *damage_cost, damage_description.clone()))
                }
                _ => None,
            })
            .collect()
    }

    fn snapshot_item(&self, item_id: Uuid) -> Result<OrderItem, LedgerError> {
        self.items
            .iter()
            .find(|i| i.id == item_id)
            .cloned()
            .ok_or(LedgerError::UnknownItem(item_id))
    }

    fn staged_damage(&self, item_id: Uuid) -> (Option<Decimal>, Option<String>) {
        match self.edits.get(&item_id) {
            Some(ItemEdit::Staged {
                damage_cost,
                damage_description,
                ..
            }) => (*damage_cost, damage_description.clone()),
            _ => (None, None),
        }
    }

    fn apply_edit(&self, item: &OrderItem) -> OrderItem {
        let mut out = item.clone();
        match self.edits.get(&item.id) {
            None | Some(ItemEdit::Untouched) => {}
            Some(ItemEdit::Staged {
                returned_quantity,
                returned_at,
                damage_cost,
                damage_description,
            }) => {
                if let Some(quantity) = returned_quantity {
                    out.return_status = ItemReturnStatus::Returned;
                    out.returned_quantity = Some(*quantity);
                    out.actual_return_date = *returned_at;
                }
                if damage_cost.is_some() {
                    out.damage_cost = *damage_cost;
                }
                if damage_description.is_some() {
                    out.damage_description = damage_description.clone();
                }
            }
            Some(ItemEdit::Reverted { clear_damage }) => {
                out.return_status = ItemReturnStatus::NotYetReturned;
                out.returned_quantity = None;
                out.actual_return_date = None;
                out.missing_note = None;
                if *clear_damage {
                    out.damage_cost = None;
                    out.damage_description = None;
                }
            }
        }
        out
    }
}
