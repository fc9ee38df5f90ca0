// MySQL persistence for payment plans and their installments.
//
// Plan creation inserts the plan row and every installment row in one
// transaction; a plan must never exist with a partial installment set.
// Payment registration runs against caller-owned transactions with
// row locks, so two concurrent payments on the same installment cannot
// both succeed.

use chrono::NaiveDate;
use sqlx::{MySql, MySqlPool, QueryBuilder, Transaction};

use crate::core::{AppError, Result};
use crate::modules::payment_plans::models::{
    PaymentInstallment, PaymentPlan, PlanStatus,
};

/// Listing filters for payment plans
#[derive(Debug, Clone, Default)]
pub struct PlanFilters {
    pub status: Option<PlanStatus>,
    pub patient_id: Option<String>,
    /// Only plans with at least one overdue installment
    pub overdue_only: bool,
}

/// Repository for payment plan database operations
pub struct PlanRepository {
    pool: MySqlPool,
}

impl PlanRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Create a plan together with its full installment schedule.
    ///
    /// Single atomic unit: if any installment insert fails, the whole
    /// operation rolls back.
    pub async fn create(
        &self,
        plan: &PaymentPlan,
        installments: &[PaymentInstallment],
    ) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to start transaction: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO payment_plans (
                id, patient_id, treatment, sale_id, total_amount, down_payment,
                installment_count, installment_amount, frequency, status,
                start_date, next_due_date, paid_amount, remaining_amount,
                created_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&plan.id)
        .bind(&plan.patient_id)
        .bind(&plan.treatment)
        .bind(&plan.sale_id)
        .bind(plan.total_amount)
        .bind(plan.down_payment)
        .bind(plan.installment_count)
        .bind(plan.installment_amount)
        .bind(plan.frequency.as_str())
        .bind(plan.status.as_str())
        .bind(plan.start_date)
        .bind(plan.next_due_date)
        .bind(plan.paid_amount)
        .bind(plan.remaining_amount)
        .bind(&plan.created_by)
        .bind(plan.created_at)
        .bind(plan.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create payment plan: {}", e)))?;

        for installment in installments {
            self.insert_installment_with_tx(&mut tx, installment).await?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }

    async fn insert_installment_with_tx(
        &self,
        tx: &mut Transaction<'_, MySql>,
        installment: &PaymentInstallment,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payment_installments (
                id, payment_plan_id, installment_number, amount, due_date,
                status, paid_date, paid_amount, payment_method, notes,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&installment.id)
        .bind(&installment.payment_plan_id)
        .bind(installment.installment_number)
        .bind(installment.amount)
        .bind(installment.due_date)
        .bind(installment.status.as_str())
        .bind(installment.paid_date)
        .bind(installment.paid_amount)
        .bind(&installment.payment_method)
        .bind(&installment.notes)
        .bind(installment.created_at)
        .bind(installment.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create installment: {}", e)))?;

        Ok(())
    }

    /// Find a plan by id
    pub async fn find_by_id(&self, id: &str) -> Result<Option<PaymentPlan>> {
        let row = sqlx::query_as::<_, PaymentPlanRow>(
            r#"
            SELECT
                id, patient_id, treatment, sale_id, total_amount, down_payment,
                installment_count, installment_amount, frequency, status,
                start_date, next_due_date, paid_amount, remaining_amount,
                created_by, created_at, updated_at
            FROM payment_plans
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch payment plan: {}", e)))?;

        match row {
            Some(r) => Ok(Some(r.try_into()?)),
            None => Ok(None),
        }
    }

    /// List plans, newest first
    pub async fn list(&self, filters: &PlanFilters) -> Result<Vec<PaymentPlan>> {
        let mut query = QueryBuilder::<MySql>::new(
            r#"
            SELECT
                id, patient_id, treatment, sale_id, total_amount, down_payment,
                installment_count, installment_amount, frequency, status,
                start_date, next_due_date, paid_amount, remaining_amount,
                created_by, created_at, updated_at
            FROM payment_plans
            WHERE 1 = 1
            "#,
        );

        if let Some(status) = filters.status {
            query.push(" AND status = ");
            query.push_bind(status.as_str());
        }

        if let Some(ref patient_id) = filters.patient_id {
            query.push(" AND patient_id = ");
            query.push_bind(patient_id.clone());
        }

        if filters.overdue_only {
            query.push(
                " AND EXISTS (
                    SELECT 1 FROM payment_installments i
                    WHERE i.payment_plan_id = payment_plans.id
                      AND i.status = 'overdue'
                )",
            );
        }

        query.push(" ORDER BY created_at DESC");

        let rows = query
            .build_query_as::<PaymentPlanRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to list payment plans: {}", e)))?;

        rows.into_iter().map(|row| row.try_into()).collect()
    }

    /// All installments of a plan, ordered by installment number
    pub async fn find_installments(&self, plan_id: &str) -> Result<Vec<PaymentInstallment>> {
        let rows = sqlx::query_as::<_, InstallmentRow>(
            r#"
            SELECT
                id, payment_plan_id, installment_number, amount, due_date,
                status, paid_date, paid_amount, payment_method, notes,
                created_at, updated_at
            FROM payment_installments
            WHERE payment_plan_id = ?
            ORDER BY installment_number ASC
            "#,
        )
        .bind(plan_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch installments: {}", e)))?;

        rows.into_iter().map(|row| row.try_into()).collect()
    }

    /// Open (pending or overdue) installments of a plan, soonest due first
    pub async fn find_open_installments(&self, plan_id: &str) -> Result<Vec<PaymentInstallment>> {
        let rows = sqlx::query_as::<_, InstallmentRow>(
            r#"
            SELECT
                id, payment_plan_id, installment_number, amount, due_date,
                status, paid_date, paid_amount, payment_method, notes,
                created_at, updated_at
            FROM payment_installments
            WHERE payment_plan_id = ? AND status IN ('pending', 'overdue')
            ORDER BY due_date ASC
            "#,
        )
        .bind(plan_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch open installments: {}", e)))?;

        rows.into_iter().map(|row| row.try_into()).collect()
    }

    /// Load an installment under a row lock for payment registration
    pub async fn find_installment_for_update(
        &self,
        tx: &mut Transaction<'_, MySql>,
        id: &str,
    ) -> Result<Option<PaymentInstallment>> {
        let row = sqlx::query_as::<_, InstallmentRow>(
            r#"
            SELECT
                id, payment_plan_id, installment_number, amount, due_date,
                status, paid_date, paid_amount, payment_method, notes,
                created_at, updated_at
            FROM payment_installments
            WHERE id = ?
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch installment: {}", e)))?;

        match row {
            Some(r) => Ok(Some(r.try_into()?)),
            None => Ok(None),
        }
    }

    /// Load a plan under a row lock for aggregate updates
    pub async fn find_plan_for_update(
        &self,
        tx: &mut Transaction<'_, MySql>,
        id: &str,
    ) -> Result<Option<PaymentPlan>> {
        let row = sqlx::query_as::<_, PaymentPlanRow>(
            r#"
            SELECT
                id, patient_id, treatment, sale_id, total_amount, down_payment,
                installment_count, installment_amount, frequency, status,
                start_date, next_due_date, paid_amount, remaining_amount,
                created_by, created_at, updated_at
            FROM payment_plans
            WHERE id = ?
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch payment plan: {}", e)))?;

        match row {
            Some(r) => Ok(Some(r.try_into()?)),
            None => Ok(None),
        }
    }

    /// Persist installment payment fields within a transaction
    pub async fn update_installment_with_tx(
        &self,
        tx: &mut Transaction<'_, MySql>,
        installment: &PaymentInstallment,
    ) -> Result<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE payment_installments
            SET
                status = ?,
                paid_date = ?,
                paid_amount = ?,
                payment_method = ?,
                notes = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(installment.status.as_str())
        .bind(installment.paid_date)
        .bind(installment.paid_amount)
        .bind(&installment.payment_method)
        .bind(&installment.notes)
        .bind(installment.updated_at)
        .bind(&installment.id)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to update installment: {}", e)))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::not_found("Installment not found"));
        }

        Ok(())
    }

    /// Persist plan aggregates and status within a transaction
    pub async fn update_plan_with_tx(
        &self,
        tx: &mut Transaction<'_, MySql>,
        plan: &PaymentPlan,
    ) -> Result<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE payment_plans
            SET
                paid_amount = ?,
                remaining_amount = ?,
                status = ?,
                next_due_date = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(plan.paid_amount)
        .bind(plan.remaining_amount)
        .bind(plan.status.as_str())
        .bind(plan.next_due_date)
        .bind(plan.updated_at)
        .bind(&plan.id)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to update payment plan: {}", e)))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::not_found("Payment plan not found"));
        }

        Ok(())
    }

    /// Next open installment of a plan within the transaction, if any
    pub async fn next_open_installment_with_tx(
        &self,
        tx: &mut Transaction<'_, MySql>,
        plan_id: &str,
    ) -> Result<Option<PaymentInstallment>> {
        let row = sqlx::query_as::<_, InstallmentRow>(
            r#"
            SELECT
                id, payment_plan_id, installment_number, amount, due_date,
                status, paid_date, paid_amount, payment_method, notes,
                created_at, updated_at
            FROM payment_installments
            WHERE payment_plan_id = ? AND status IN ('pending', 'overdue')
            ORDER BY due_date ASC
            LIMIT 1
            "#,
        )
        .bind(plan_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch next installment: {}", e)))?;

        match row {
            Some(r) => Ok(Some(r.try_into()?)),
            None => Ok(None),
        }
    }

    /// Flip pending installments past their due date to overdue.
    ///
    /// Date-truncated comparison and a single statement, so the sweep is
    /// idempotent and skips paid rows by construction.
    pub async fn sweep_overdue(&self, today: NaiveDate) -> Result<u64> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE payment_installments
            SET status = 'overdue', updated_at = ?
            WHERE status = 'pending' AND due_date < ?
            "#,
        )
        .bind(chrono::Utc::now().naive_utc())
        .bind(today)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to sweep overdue installments: {}", e)))?
        .rows_affected();

        Ok(rows_affected)
    }

    /// Begin a transaction for multi-row mutations
    pub async fn begin(&self) -> Result<Transaction<'static, MySql>> {
        self.pool
            .begin()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to start transaction: {}", e)))
    }
}

/// Database row for the payment_plans table
#[derive(sqlx::FromRow)]
struct PaymentPlanRow {
    id: String,
    patient_id: String,
    treatment: String,
    sale_id: Option<String>,
    total_amount: rust_decimal::Decimal,
    down_payment: rust_decimal::Decimal,
    installment_count: i32,
    installment_amount: rust_decimal::Decimal,
    frequency: String,
    status: String,
    start_date: NaiveDate,
    next_due_date: NaiveDate,
    paid_amount: rust_decimal::Decimal,
    remaining_amount: rust_decimal::Decimal,
    created_by: Option<String>,
    created_at: chrono::NaiveDateTime,
    updated_at: chrono::NaiveDateTime,
}

impl TryFrom<PaymentPlanRow> for PaymentPlan {
    type Error = AppError;

    fn try_from(row: PaymentPlanRow) -> Result<Self> {
        let frequency = row
            .frequency
            .parse()
            .map_err(|e: String| AppError::Internal(e))?;
        let status = row
            .status
            .parse()
            .map_err(|e: String| AppError::Internal(e))?;

        Ok(PaymentPlan {
            id: row.id,
            patient_id: row.patient_id,
            treatment: row.treatment,
            sale_id: row.sale_id,
            total_amount: row.total_amount,
            down_payment: row.down_payment,
            installment_count: row.installment_count,
            installment_amount: row.installment_amount,
            frequency,
            status,
            start_date: row.start_date,
            next_due_date: row.next_due_date,
            paid_amount: row.paid_amount,
            remaining_amount: row.remaining_amount,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database row for the payment_installments table
#[derive(sqlx::FromRow)]
struct InstallmentRow {
    id: String,
    payment_plan_id: String,
    installment_number: i32,
    amount: rust_decimal::Decimal,
    due_date: NaiveDate,
    status: String,
    paid_date: Option<chrono::NaiveDateTime>,
    paid_amount: Option<rust_decimal::Decimal>,
    payment_method: Option<String>,
    notes: Option<String>,
    created_at: chrono::NaiveDateTime,
    updated_at: chrono::NaiveDateTime,
}

impl TryFrom<InstallmentRow> for PaymentInstallment {
    type Error = AppError;

    fn try_from(row: InstallmentRow) -> Result<Self> {
        let status = row
            .status
            .parse()
            .map_err(|e: String| AppError::Internal(e))?;

        Ok(PaymentInstallment {
            id: row.id,
            payment_plan_id: row.payment_plan_id,
            installment_number: row.installment_number,
            amount: row.amount,
            due_date: row.due_date,
            status,
            paid_date: row.paid_date,
            paid_amount: row.paid_amount,
            payment_method: row.payment_method,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
