pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use controllers::configure;
pub use models::{
    Frequency, InstallmentStatus, NewPaymentPlan, PaymentInstallment, PaymentPlan, PlanStatus,
    ReceivablesKpis,
};
pub use repositories::{PlanFilters, PlanRepository, ReceivablesRepository};
pub use services::{Amortization, PlanService, ReceivablesService};
