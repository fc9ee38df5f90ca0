use rust_decimal::Decimal;
use serde::Serialize;

/// Accounts-receivable summary across all plans.
///
/// Overdue figures read the stored installment status, so callers run the
/// overdue sweep first to avoid stale counts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivablesKpis {
    /// Sum of remaining amounts over active plans
    pub total_receivable: Decimal,
    pub overdue_count: i64,
    pub overdue_amount: Decimal,
    pub due_this_week_count: i64,
    pub due_this_week_amount: Decimal,
    pub active_plan_count: i64,
}
