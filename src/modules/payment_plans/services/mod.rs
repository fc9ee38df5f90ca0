pub mod amortization;
pub mod plan_service;
pub mod receivables;

pub use amortization::Amortization;
pub use plan_service::PlanService;
pub use receivables::ReceivablesService;
