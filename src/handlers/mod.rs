pub mod auth;
pub mod counts;
pub mod inventory;
pub mod master_data;
pub mod reports;
pub mod transactions;

use crate::auth::AuthService;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    counts::CountService, inventory::InventoryService, master_data::MasterDataService,
    reports::ReportService, sessions::SessionTracker, transactions::TransactionService,
};
use std::sync::Arc;
use std::time::Duration;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub inventory: InventoryService,
    pub transactions: Arc<TransactionService>,
    pub counts: Arc<CountService>,
    pub master_data: Arc<MasterDataService>,
    pub reports: Arc<ReportService>,
    pub sessions: Arc<SessionTracker>,
    pub auth: Arc<AuthService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: EventSender,
        auth: Arc<AuthService>,
        session_debounce: Duration,
    ) -> Self {
        let inventory = InventoryService::new(db.clone());
        let transactions = Arc::new(TransactionService::new(db.clone(), event_sender.clone()));
        let counts = Arc::new(CountService::new(
            db.clone(),
            inventory.clone(),
            transactions.clone(),
            event_sender.clone(),
        ));
        let master_data = Arc::new(MasterDataService::new(db.clone()));
        let reports = Arc::new(ReportService::new(db.clone()));
        let sessions = Arc::new(SessionTracker::new(db, session_debounce));

        Self {
            inventory,
            transactions,
            counts,
            master_data,
            reports,
            sessions,
            auth,
        }
    }
}
