pub mod classifier;
pub mod ledger;
pub mod models;
pub mod repository;
pub mod service;
pub mod settlement;
pub mod timeline;

#[cfg(test)]
pub(crate) mod testutil;

pub use classifier::{classify, OrderCategory};
pub use ledger::{aggregate, ReturnLedger, ReturnState, ReturnStats};
pub use models::{AuditEvent, ItemReturnStatus, Order, OrderItem, OrderStatus};
pub use repository::{AuditLogRepository, ItemReturnRequest, OrderRepository};
pub use service::{OrderService, OrderView, ReturnEdit, ServiceError};
pub use settlement::Settlement;
pub use timeline::{MilestoneKind, TimelineEntry};
