//! Dentiplan installment payment-plan service
//!
//! Owns the accounts-receivable core of a dental-clinic practice-management
//! system: plan creation with deterministic amortization, transactional
//! payment registration, the overdue sweep, and receivables reporting.

pub mod config;
pub mod core;
pub mod modules;

// Re-export commonly used types
pub use modules::payment_plans;
pub use modules::sales;
