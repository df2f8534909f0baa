use std::sync::Arc;

use domains::Authenticator;
use services::{AccountService, TicketService};

use crate::metrics::HttpMetrics;

/// Shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub tickets: TicketService,
    pub accounts: AccountService,
    pub auth: Arc<dyn Authenticator>,
    pub metrics: Arc<HttpMetrics>,
}

impl AppState {
    pub fn new(tickets: TicketService, accounts: AccountService, auth: Arc<dyn Authenticator>) -> Self {
        Self {
            tickets,
            accounts,
            auth,
            metrics: Arc::new(HttpMetrics::new()),
        }
    }
}
