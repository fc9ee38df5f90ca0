pub mod installment;
pub mod kpis;
pub mod payment_plan;

pub use installment::{InstallmentStatus, PaymentInstallment};
pub use kpis::ReceivablesKpis;
pub use payment_plan::{Frequency, NewPaymentPlan, PaymentPlan, PlanStatus};
