use std::sync::Arc;

use rentis_order::OrderService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<OrderService>,
}
