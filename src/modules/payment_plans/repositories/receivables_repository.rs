// Read-side aggregation queries for the accounts-receivable KPIs.
// These never mutate state; overdue figures read the stored status,
// so the sweep must run first for fresh numbers.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::MySqlPool;

use crate::core::{AppError, Result};

/// Repository for receivables aggregation queries
pub struct ReceivablesRepository {
    pool: MySqlPool,
}

impl ReceivablesRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Sum of remaining amounts over active plans
    pub async fn total_receivable(&self) -> Result<Decimal> {
        sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(remaining_amount), 0)
            FROM payment_plans
            WHERE status = 'active'
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to compute total receivable: {}", e)))
    }

    /// Count of active plans
    pub async fn active_plan_count(&self) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM payment_plans
            WHERE status = 'active'
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to count active plans: {}", e)))
    }

    /// Count and sum over installments with stored status overdue
    pub async fn overdue_totals(&self) -> Result<(i64, Decimal)> {
        sqlx::query_as::<_, (i64, Decimal)>(
            r#"
            SELECT COUNT(*), COALESCE(SUM(amount), 0)
            FROM payment_installments
            WHERE status = 'overdue'
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to compute overdue totals: {}", e)))
    }

    /// Count and sum over pending installments due within [from, to]
    pub async fn due_between_totals(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<(i64, Decimal)> {
        sqlx::query_as::<_, (i64, Decimal)>(
            r#"
            SELECT COUNT(*), COALESCE(SUM(amount), 0)
            FROM payment_installments
            WHERE status = 'pending' AND due_date >= ? AND due_date <= ?
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to compute due-soon totals: {}", e)))
    }
}
