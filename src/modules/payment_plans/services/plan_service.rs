// Business logic for payment plans: validated creation with an atomic
// plan+schedule insert, and payment registration as a single
// multi-row transaction.

use sqlx::MySqlPool;
use tracing::info;

use crate::core::{AppError, Result};
use crate::modules::payment_plans::{
    models::{NewPaymentPlan, PaymentInstallment, PaymentPlan},
    repositories::{PlanFilters, PlanRepository},
    services::Amortization,
};
use crate::modules::sales::SaleRepository;

/// Service for payment plan operations
pub struct PlanService {
    repository: PlanRepository,
    sales: SaleRepository,
}

impl PlanService {
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            repository: PlanRepository::new(pool),
            sales: SaleRepository::new(),
        }
    }

    /// Derive a plan and its full pending schedule from validated
    /// parameters. Pure; persistence happens in `create_plan`.
    pub fn assemble(params: &NewPaymentPlan) -> Result<(PaymentPlan, Vec<PaymentInstallment>)> {
        params.validate()?;

        let installment_amount = Amortization::installment_amount(
            params.total_amount,
            params.down_payment,
            params.installment_count,
        )?;
        let first_due = Amortization::due_date(params.start_date, 1, params.frequency)?;

        let plan = PaymentPlan::new(params, installment_amount, first_due);
        let schedule = Amortization::build_schedule(
            &plan.id,
            installment_amount,
            params.installment_count,
            params.frequency,
            params.start_date,
        )?;

        Ok((plan, schedule))
    }

    /// Create a plan with its installment schedule.
    ///
    /// Validation fails before any persistence; the plan and all N
    /// installments are persisted as one atomic unit.
    pub async fn create_plan(
        &self,
        params: NewPaymentPlan,
    ) -> Result<(PaymentPlan, Vec<PaymentInstallment>)> {
        let (plan, schedule) = Self::assemble(&params)?;

        self.repository.create(&plan, &schedule).await?;

        info!(
            plan_id = plan.id.as_str(),
            patient_id = plan.patient_id.as_str(),
            installment_count = plan.installment_count,
            total_amount = %plan.total_amount,
            "Payment plan created"
        );

        Ok((plan, schedule))
    }

    /// Get a plan with its ordered installments
    pub async fn get_plan(&self, id: &str) -> Result<(PaymentPlan, Vec<PaymentInstallment>)> {
        let plan = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Payment plan {} not found", id)))?;

        let installments = self.repository.find_installments(id).await?;

        Ok((plan, installments))
    }

    /// List plans with their installments, newest plan first
    pub async fn list_plans(
        &self,
        filters: &PlanFilters,
    ) -> Result<Vec<(PaymentPlan, Vec<PaymentInstallment>)>> {
        let plans = self.repository.list(filters).await?;

        let mut result = Vec::with_capacity(plans.len());
        for plan in plans {
            let installments = self.repository.find_installments(&plan.id).await?;
            result.push((plan, installments));
        }

        Ok(result)
    }

    /// Open installments of a plan, soonest due first
    pub async fn pending_installments(&self, plan_id: &str) -> Result<Vec<PaymentInstallment>> {
        // 404 for unknown plans rather than an empty list
        self.repository
            .find_by_id(plan_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Payment plan {} not found", plan_id)))?;

        self.repository.find_open_installments(plan_id).await
    }

    /// Register a payment against one installment.
    ///
    /// One transaction with row locks covering the installment update, the
    /// plan aggregate update, and (when the plan finances a sale and this
    /// was the last open installment) the sale status flip. A crash between
    /// steps never leaves paid/remaining inconsistent with installment
    /// statuses, and a concurrent second attempt observes the paid row and
    /// fails with a conflict.
    pub async fn register_payment(
        &self,
        installment_id: &str,
        payment_method: String,
        notes: Option<String>,
    ) -> Result<PaymentInstallment> {
        let mut tx = self.repository.begin().await?;

        let mut installment = self
            .repository
            .find_installment_for_update(&mut tx, installment_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Installment {} not found", installment_id))
            })?;

        let mut plan = self
            .repository
            .find_plan_for_update(&mut tx, &installment.payment_plan_id)
            .await?
            .ok_or_else(|| {
                AppError::internal(format!(
                    "Installment {} references missing plan {}",
                    installment_id, installment.payment_plan_id
                ))
            })?;

        // Conflict on already-paid rows; the transaction rolls back on drop
        installment.mark_paid(payment_method, notes)?;
        plan.apply_payment(installment.amount);

        self.repository
            .update_installment_with_tx(&mut tx, &installment)
            .await?;

        match self
            .repository
            .next_open_installment_with_tx(&mut tx, &plan.id)
            .await?
        {
            Some(next) => plan.advance_next_due(next.due_date),
            None => {
                // Every installment is paid: complete the plan and cascade
                // to the originating sale within the same transaction.
                plan.complete(chrono::Utc::now().date_naive());

                if let Some(sale_id) = plan.sale_id.clone() {
                    self.sales.mark_completed_with_tx(&mut tx, &sale_id).await?;
                    info!(
                        plan_id = plan.id.as_str(),
                        sale_id = sale_id.as_str(),
                        "Sale completed by finishing payment plan"
                    );
                }
            }
        }

        self.repository.update_plan_with_tx(&mut tx, &plan).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to commit transaction: {}", e)))?;

        info!(
            installment_id = installment.id.as_str(),
            plan_id = plan.id.as_str(),
            installment_number = installment.installment_number,
            amount = %installment.amount,
            plan_status = %plan.status,
            "Installment payment registered"
        );

        Ok(installment)
    }
}
