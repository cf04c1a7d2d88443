// Core services
pub mod inventory;
pub mod transactions;

// Count reconciliation workflow
pub mod counts;

// Master data registry
pub mod master_data;

// Analytics and Reporting
pub mod reports;

// Session and action audit
pub mod sessions;
