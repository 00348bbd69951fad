//! Reconstructs a causally ordered timeline for an order from the audit
//! log, synthesizing entries from order fields where the log is silent,
//! missing, or unparseable.
//!
//! Two composed pure functions: `required_milestones` decides which
//! milestones the order has reached, `resolve` finds each one a
//! timestamp and an actor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rentis_core::dates;

use crate::ledger::{ReturnState, ReturnStats};
use crate::models::{actions, AuditEvent, Order, OrderStatus};
use crate::settlement::damage_fee_total;
use rust_decimal::Decimal;

/// Milestone kinds in declared precedence order; the `Ord` derive is
/// the tie-break for entries landing on the same timestamp.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneKind {
    Created,
    Scheduled,
    Started,
    Returned,
    PartiallyReturned,
    Flagged,
    Refunded,
    Completed,
}

impl MilestoneKind {
    pub fn label(&self) -> &'static str {
        match self {
            MilestoneKind::Created => "Order Created",
            MilestoneKind::Scheduled => "Scheduled",
            MilestoneKind::Started => "Rental Started",
            MilestoneKind::Returned => "Returned",
            MilestoneKind::PartiallyReturned => "Partially Returned",
            MilestoneKind::Flagged => "Flagged / Damage Recorded",
            MilestoneKind::Refunded => "Deposit Refunded",
            MilestoneKind::Completed => "Completed",
        }
    }
}

/// One entry on the rendered timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineEntry {
    pub kind: MilestoneKind,
    pub label: String,
    pub occurred_at: DateTime<Utc>,
    pub actor: String,
    /// True when no usable audit row existed and the timestamp was
    /// inferred from order fields.
    pub synthesized: bool,
}

/// The milestones this order has actually reached, in precedence order.
pub fn required_milestones(order: &Order, stats: &ReturnStats) -> Vec<MilestoneKind> {
    let mut kinds = vec![MilestoneKind::Created];

    if order.booking_date.is_some() || order.status == OrderStatus::Scheduled {
        kinds.push(MilestoneKind::Scheduled);
    }
    if matches!(
        order.status,
        OrderStatus::Active
            | OrderStatus::PartiallyReturned
            | OrderStatus::Completed
            | OrderStatus::CompletedWithIssues
    ) {
        kinds.push(MilestoneKind::Started);
    }
    if matches!(
        order.status,
        OrderStatus::Completed | OrderStatus::CompletedWithIssues
    ) || stats.state == ReturnState::Returned
    {
        kinds.push(MilestoneKind::Returned);
    }
    if order.status == OrderStatus::PartiallyReturned || stats.state == ReturnState::Partial {
        kinds.push(MilestoneKind::PartiallyReturned);
    }
    if order.status == OrderStatus::Flagged || damage_fee_total(&order.items) > Decimal::ZERO {
        kinds.push(MilestoneKind::Flagged);
    }
    let refunded_amount = order
        .security_deposit_refunded_amount
        .unwrap_or(Decimal::ZERO);
    if order.security_deposit_refunded || refunded_amount > Decimal::ZERO {
        kinds.push(MilestoneKind::Refunded);
    }
    if matches!(
        order.status,
        OrderStatus::Completed | OrderStatus::CompletedWithIssues
    ) {
        kinds.push(MilestoneKind::Completed);
    }

    kinds
}

fn matches_event(kind: MilestoneKind, event: &AuditEvent) -> bool {
    let status_change_to = |wanted: &[OrderStatus]| {
        event.action == actions::STATUS_CHANGED
            && matches!(event.new_status, Some(s) if wanted.contains(&s))
    };
    match kind {
        MilestoneKind::Created => event.action == actions::ORDER_CREATED,
        MilestoneKind::Scheduled => status_change_to(&[OrderStatus::Scheduled]),
        MilestoneKind::Started => {
            event.action == actions::RENTAL_STARTED || status_change_to(&[OrderStatus::Active])
        }
        MilestoneKind::Returned => {
            (event.action == actions::RETURN_PROCESSED
                && matches!(
                    event.new_status,
                    Some(OrderStatus::Completed) | Some(OrderStatus::CompletedWithIssues)
                ))
                || status_change_to(&[OrderStatus::Completed, OrderStatus::CompletedWithIssues])
        }
        MilestoneKind::PartiallyReturned => {
            (event.action == actions::RETURN_PROCESSED
                && matches!(event.new_status, Some(OrderStatus::PartiallyReturned)))
                || status_change_to(&[OrderStatus::PartiallyReturned])
        }
        MilestoneKind::Flagged => {
            event.action == actions::ORDER_FLAGGED
                || event.action == actions::DAMAGE_RECORDED
                || status_change_to(&[OrderStatus::Flagged])
        }
        MilestoneKind::Refunded => event.action == actions::DEPOSIT_REFUNDED,
        MilestoneKind::Completed => {
            status_change_to(&[OrderStatus::Completed, OrderStatus::CompletedWithIssues])
        }
    }
}

fn fallback_timestamp(kind: MilestoneKind, order: &Order) -> DateTime<Utc> {
    let last_return = order
        .items
        .iter()
        .filter_map(|i| i.actual_return_date)
        .max();
    match kind {
        MilestoneKind::Created => order.created_at,
        MilestoneKind::Scheduled => order
            .booking_date
            .as_deref()
            .and_then(dates::parse_datetime)
            .unwrap_or(order.created_at),
        MilestoneKind::Started => dates::resolve_start(
            order.start_datetime.as_deref(),
            order.start_date.as_deref(),
        )
        .unwrap_or(order.created_at),
        MilestoneKind::Returned | MilestoneKind::PartiallyReturned | MilestoneKind::Completed => {
            last_return
                .or_else(|| {
                    dates::resolve_end(order.end_datetime.as_deref(), order.end_date.as_deref())
                })
                .unwrap_or(order.updated_at)
        }
        MilestoneKind::Flagged | MilestoneKind::Refunded => order.updated_at,
    }
}

/// Resolve one milestone against the audit log: a matching row with a
/// parseable timestamp wins; otherwise the entry is synthesized from
/// order fields with the actor "Unknown".
pub fn resolve(kind: MilestoneKind, events: &[AuditEvent], order: &Order) -> TimelineEntry {
    let matched = events
        .iter()
        .filter(|e| matches_event(kind, e))
        .find_map(|e| dates::parse_datetime(&e.created_at).map(|ts| (ts, e.user_name.clone())));

    match matched {
        Some((occurred_at, actor)) => TimelineEntry {
            kind,
            label: kind.label().to_string(),
            occurred_at,
            actor,
            synthesized: false,
        },
        None => TimelineEntry {
            kind,
            label: kind.label().to_string(),
            occurred_at: fallback_timestamp(kind, order),
            actor: "Unknown".to_string(),
            synthesized: true,
        },
    }
}

/// Build the full timeline. `audit` is `None` when the audit-log read
/// failed; the result is then synthesized-only rather than an error.
pub fn reconstruct(
    order: &Order,
    stats: &ReturnStats,
    audit: Option<&[AuditEvent]>,
) -> Vec<TimelineEntry> {
    let events = audit.unwrap_or(&[]);
    let mut entries: Vec<TimelineEntry> = required_milestones(order, stats)
        .into_iter()
        .map(|kind| resolve(kind, events, order))
        .collect();
    entries.sort_by(|a, b| {
        a.occurred_at
            .cmp(&b.occurred_at)
            .then(a.kind.cmp(&b.kind))
    });
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::aggregate;
    use crate::models::ItemReturnStatus;
    use crate::testutil::{order_with_items, plain_item};
    use std::str::FromStr;

    fn event(action: &str, at: &str, user: &str, new_status: Option<OrderStatus>) -> AuditEvent {
        AuditEvent {
            action: action.to_string(),
            created_at: at.to_string(),
            user_name: user.to_string(),
            new_status,
            notes: None,
        }
    }

    fn stats_for(order: &Order) -> ReturnStats {
        aggregate(&order.items)
    }

    #[test]
    fn failed_audit_fetch_degrades_to_synthesized_only() {
        // Scenario: audit log unavailable; everything synthesized.
        let order = order_with_items(vec![plain_item(1)]);
        let stats = stats_for(&order);
        let entries = reconstruct(&order, &stats, None);

        assert!(!entries.is_empty());
        assert!(entries.iter().all(|e| e.synthesized));
        assert!(entries.iter().all(|e| e.actor == "Unknown"));
        assert!(entries.iter().any(|e| e.kind == MilestoneKind::Created));
    }

    #[test]
    fn audit_rows_are_preferred_over_synthesis() {
        let mut order = order_with_items(vec![plain_item(1)]);
        order.status = OrderStatus::Active;
        let stats = stats_for(&order);
        let events = vec![
            event(
                actions::ORDER_CREATED,
                "2026-02-01T09:00:00Z",
                "priya",
                None,
            ),
            event(
                actions::RENTAL_STARTED,
                "2026-02-02T10:00:00Z",
                "arun",
                Some(OrderStatus::Active),
            ),
        ];
        let entries = reconstruct(&order, &stats, Some(&events));

        let created = entries
            .iter()
            .find(|e| e.kind == MilestoneKind::Created)
            .unwrap();
        assert!(!created.synthesized);
        assert_eq!(created.actor, "priya");

        let started = entries
            .iter()
            .find(|e| e.kind == MilestoneKind::Started)
            .unwrap();
        assert_eq!(started.actor, "arun");
    }

    #[test]
    fn unparseable_audit_timestamp_falls_back_per_milestone() {
        let mut order = order_with_items(vec![plain_item(1)]);
        order.status = OrderStatus::Active;
        order.start_date = Some("2026-02-02".into());
        let stats = stats_for(&order);
        let events = vec![event(actions::RENTAL_STARTED, "not-a-date", "arun", None)];
        let entries = reconstruct(&order, &stats, Some(&events));

        let started = entries
            .iter()
            .find(|e| e.kind == MilestoneKind::Started)
            .unwrap();
        assert!(started.synthesized);
        assert_eq!(started.actor, "Unknown");
    }

    #[test]
    fn scheduled_is_skipped_when_never_scheduled() {
        let mut order = order_with_items(vec![plain_item(1)]);
        order.status = OrderStatus::Active;
        order.booking_date = None;
        let stats = stats_for(&order);
        let kinds = required_milestones(&order, &stats);
        assert!(!kinds.contains(&MilestoneKind::Scheduled));
        assert!(kinds.contains(&MilestoneKind::Started));
    }

    #[test]
    fn flagged_fires_on_damage_without_flag_status() {
        let mut item = plain_item(1);
        item.damage_cost = Some(Decimal::from_str("120").unwrap());
        let mut order = order_with_items(vec![item]);
        order.status = OrderStatus::Active;
        let stats = stats_for(&order);
        assert!(required_milestones(&order, &stats).contains(&MilestoneKind::Flagged));
    }

    #[test]
    fn refunded_fires_on_amount_without_flag() {
        let mut order = order_with_items(vec![plain_item(1)]);
        order.security_deposit_refunded_amount = Some(Decimal::from_str("250").unwrap());
        let stats = stats_for(&order);
        assert!(required_milestones(&order, &stats).contains(&MilestoneKind::Refunded));
    }

    #[test]
    fn completed_order_reaches_full_chain() {
        let mut item = plain_item(2);
        item.return_status = ItemReturnStatus::Returned;
        let mut order = order_with_items(vec![item]);
        order.status = OrderStatus::Completed;
        let stats = stats_for(&order);
        let kinds = required_milestones(&order, &stats);
        assert!(kinds.contains(&MilestoneKind::Started));
        assert!(kinds.contains(&MilestoneKind::Returned));
        assert!(kinds.contains(&MilestoneKind::Completed));
    }

    #[test]
    fn equal_timestamps_break_ties_by_declared_precedence() {
        let mut item = plain_item(2);
        item.return_status = ItemReturnStatus::Returned;
        let mut order = order_with_items(vec![item]);
        order.status = OrderStatus::Completed;
        let stats = stats_for(&order);

        let at = "2026-02-10T12:00:00Z";
        let events = vec![
            event(
                actions::STATUS_CHANGED,
                at,
                "arun",
                Some(OrderStatus::Completed),
            ),
            event(actions::RENTAL_STARTED, at, "arun", None),
        ];
        let entries = reconstruct(&order, &stats, Some(&events));
        let started_pos = entries
            .iter()
            .position(|e| e.kind == MilestoneKind::Started)
            .unwrap();
        let returned_pos = entries
            .iter()
            .position(|e| e.kind == MilestoneKind::Returned)
            .unwrap();
        let completed_pos = entries
            .iter()
            .position(|e| e.kind == MilestoneKind::Completed)
            .unwrap();
        assert!(started_pos < returned_pos);
        assert!(returned_pos < completed_pos);
    }

    #[test]
    fn timeline_is_ascending() {
        let mut order = order_with_items(vec![plain_item(1)]);
        order.status = OrderStatus::Active;
        order.start_date = Some("2026-02-02".into());
        let stats = stats_for(&order);
        let entries = reconstruct(&order, &stats, Some(&[]));
        for pair in entries.windows(2) {
            assert!(pair[0].occurred_at <= pair[1].occurred_at);
        }
    }
}
