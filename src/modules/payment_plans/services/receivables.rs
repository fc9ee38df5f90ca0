// Read-side receivables reporting plus the one time-driven mutation:
// the overdue sweep. Overdue is a stored status, not a live-derived
// property, so KPI reads run the sweep first.

use chrono::{Days, NaiveDate};
use sqlx::MySqlPool;
use tracing::info;

use crate::core::{AppError, Result};
use crate::modules::payment_plans::{
    models::ReceivablesKpis, repositories::ReceivablesRepository,
    repositories::PlanRepository,
};

/// Service for accounts-receivable reporting
pub struct ReceivablesService {
    repository: ReceivablesRepository,
    plans: PlanRepository,
}

impl ReceivablesService {
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            repository: ReceivablesRepository::new(pool.clone()),
            plans: PlanRepository::new(pool),
        }
    }

    /// Flip pending installments past their due date to overdue.
    ///
    /// Idempotent; running it twice on the same day changes nothing
    /// further. Returns the number of rows updated.
    pub async fn sweep_overdue(&self, today: NaiveDate) -> Result<u64> {
        let updated = self.plans.sweep_overdue(today).await?;

        if updated > 0 {
            info!(updated, %today, "Marked installments as overdue");
        }

        Ok(updated)
    }

    /// Compute the accounts-receivable KPIs.
    ///
    /// Callers wanting fresh overdue figures run `sweep_overdue` first;
    /// the stored status is otherwise as stale as the last sweep.
    pub async fn kpis(&self, today: NaiveDate, window_days: u32) -> Result<ReceivablesKpis> {
        let week_end = today
            .checked_add_days(Days::new(window_days as u64))
            .ok_or_else(|| AppError::internal("KPI window end date out of range"))?;

        let total_receivable = self.repository.total_receivable().await?;
        let (overdue_count, overdue_amount) = self.repository.overdue_totals().await?;
        let (due_this_week_count, due_this_week_amount) =
            self.repository.due_between_totals(today, week_end).await?;
        let active_plan_count = self.repository.active_plan_count().await?;

        Ok(ReceivablesKpis {
            total_receivable,
            overdue_count,
            overdue_amount,
            due_this_week_count,
            due_this_week_amount,
            active_plan_count,
        })
    }
}
