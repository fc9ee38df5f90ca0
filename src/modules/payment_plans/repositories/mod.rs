pub mod plan_repository;
pub mod receivables_repository;

pub use plan_repository::{PlanFilters, PlanRepository};
pub use receivables_repository::ReceivablesRepository;
