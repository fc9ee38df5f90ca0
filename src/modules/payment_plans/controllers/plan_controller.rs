// HTTP handlers for the payment-plan endpoints.
//
// Endpoints:
// - POST /payment-plans                      create plan + schedule
// - GET  /payment-plans                      list plans, or KPIs with ?kpis=true
// - GET  /payment-plans/{id}                 plan with ordered installments
// - GET  /payment-plans/{id}/pending-installments
// - POST /payment-plans/installments/pay     register an installment payment

use actix_web::{web, HttpResponse};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;

use crate::config::Config;
use crate::core::Result;
use crate::modules::payment_plans::{
    models::{Frequency, NewPaymentPlan, PaymentInstallment, PaymentPlan},
    repositories::PlanFilters,
    services::{PlanService, ReceivablesService},
};

/// Request body for POST /payment-plans
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlanRequest {
    pub patient_id: String,
    pub treatment: String,
    #[serde(default)]
    pub sale_id: Option<String>,
    pub total_amount: Decimal,
    #[serde(default)]
    pub down_payment: Option<Decimal>,
    pub installments: i32,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Request body for POST /payment-plans/installments/pay
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPaymentRequest {
    pub installment_id: String,
    pub payment_method: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Query parameters for GET /payment-plans
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPlansQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub overdue: Option<bool>,
    #[serde(default)]
    pub kpis: Option<bool>,
}

/// Response for a single installment
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentResponse {
    pub id: String,
    pub payment_plan_id: String,
    pub installment_number: i32,
    pub amount: String,
    pub due_date: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<PaymentInstallment> for InstallmentResponse {
    fn from(installment: PaymentInstallment) -> Self {
        Self {
            id: installment.id,
            payment_plan_id: installment.payment_plan_id,
            installment_number: installment.installment_number,
            amount: installment.amount.to_string(),
            due_date: installment.due_date.to_string(),
            status: installment.status.to_string(),
            paid_date: installment.paid_date.map(|dt| dt.to_string()),
            paid_amount: installment.paid_amount.map(|a| a.to_string()),
            payment_method: installment.payment_method,
            notes: installment.notes,
        }
    }
}

/// Response for a plan with its ordered installments
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub id: String,
    pub patient_id: String,
    pub treatment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_id: Option<String>,
    pub total_amount: String,
    pub down_payment: String,
    pub installment_count: i32,
    pub installment_amount: String,
    pub frequency: String,
    pub status: String,
    pub start_date: String,
    pub next_due_date: String,
    pub paid_amount: String,
    pub remaining_amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: String,
    pub installments: Vec<InstallmentResponse>,
}

impl PlanResponse {
    fn from_parts(plan: PaymentPlan, installments: Vec<PaymentInstallment>) -> Self {
        Self {
            id: plan.id,
            patient_id: plan.patient_id,
            treatment: plan.treatment,
            sale_id: plan.sale_id,
            total_amount: plan.total_amount.to_string(),
            down_payment: plan.down_payment.to_string(),
            installment_count: plan.installment_count,
            installment_amount: plan.installment_amount.to_string(),
            frequency: plan.frequency.to_string(),
            status: plan.status.to_string(),
            start_date: plan.start_date.to_string(),
            next_due_date: plan.next_due_date.to_string(),
            paid_amount: plan.paid_amount.to_string(),
            remaining_amount: plan.remaining_amount.to_string(),
            created_by: plan.created_by,
            created_at: plan.created_at.to_string(),
            installments: installments
                .into_iter()
                .map(InstallmentResponse::from)
                .collect(),
        }
    }
}

/// POST /payment-plans
///
/// Creates a plan with its full installment schedule.
/// Returns 201 with the created plan, 400 on validation failure.
pub async fn create_plan(
    request: web::Json<CreatePlanRequest>,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse> {
    let service = PlanService::new(pool.get_ref().clone());
    let body = request.into_inner();

    let params = NewPaymentPlan {
        patient_id: body.patient_id,
        treatment: body.treatment,
        sale_id: body.sale_id,
        total_amount: body.total_amount,
        down_payment: body.down_payment.unwrap_or(Decimal::ZERO),
        installment_count: body.installments,
        frequency: body.frequency.unwrap_or_default(),
        start_date: body.start_date.unwrap_or_else(|| Utc::now().date_naive()),
        created_by: body.created_by,
    };

    let (plan, installments) = service.create_plan(params).await?;

    Ok(HttpResponse::Created().json(PlanResponse::from_parts(plan, installments)))
}

/// GET /payment-plans
///
/// Lists plans (optionally filtered by status, patient, overdue) or, with
/// `?kpis=true`, returns the receivables KPI object. Reads that depend on
/// the stored overdue status run the sweep first so they never serve
/// stale figures.
pub async fn list_plans(
    query: web::Query<ListPlansQuery>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse> {
    let receivables = ReceivablesService::new(pool.get_ref().clone());
    let today = Utc::now().date_naive();

    if query.kpis.unwrap_or(false) {
        receivables.sweep_overdue(today).await?;
        let kpis = receivables
            .kpis(today, config.app.due_soon_window_days)
            .await?;
        return Ok(HttpResponse::Ok().json(kpis));
    }

    let overdue_only = query.overdue.unwrap_or(false);
    if overdue_only {
        receivables.sweep_overdue(today).await?;
    }

    let status = match query.status.as_deref() {
        Some(s) => Some(
            s.parse()
                .map_err(crate::core::AppError::Validation)?,
        ),
        None => None,
    };

    let filters = PlanFilters {
        status,
        patient_id: query.patient_id.clone(),
        overdue_only,
    };

    let service = PlanService::new(pool.get_ref().clone());
    let plans = service.list_plans(&filters).await?;

    let response: Vec<PlanResponse> = plans
        .into_iter()
        .map(|(plan, installments)| PlanResponse::from_parts(plan, installments))
        .collect();

    Ok(HttpResponse::Ok().json(response))
}

/// GET /payment-plans/{plan_id}
///
/// Returns the plan with its installments ordered by number; 404 if absent.
pub async fn get_plan(
    plan_id: web::Path<String>,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse> {
    let service = PlanService::new(pool.get_ref().clone());

    let (plan, installments) = service.get_plan(&plan_id).await?;

    Ok(HttpResponse::Ok().json(PlanResponse::from_parts(plan, installments)))
}

/// GET /payment-plans/{plan_id}/pending-installments
///
/// Open (pending or overdue) installments of a plan, soonest due first.
pub async fn pending_installments(
    plan_id: web::Path<String>,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse> {
    let service = PlanService::new(pool.get_ref().clone());

    let installments = service.pending_installments(&plan_id).await?;

    let response: Vec<InstallmentResponse> = installments
        .into_iter()
        .map(InstallmentResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(response))
}

/// POST /payment-plans/installments/pay
///
/// Registers a payment against one installment.
/// Returns 200 with the updated installment, 404 for an unknown id,
/// 409 when the installment was already paid.
pub async fn pay_installment(
    request: web::Json<RegisterPaymentRequest>,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse> {
    let service = PlanService::new(pool.get_ref().clone());
    let body = request.into_inner();

    let installment = service
        .register_payment(&body.installment_id, body.payment_method, body.notes)
        .await?;

    Ok(HttpResponse::Ok().json(InstallmentResponse::from(installment)))
}

/// Configure payment plan routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payment-plans")
            .route("", web::post().to(create_plan))
            .route("", web::get().to(list_plans))
            .route("/installments/pay", web::post().to(pay_installment))
            .route("/{plan_id}", web::get().to(get_plan))
            .route(
                "/{plan_id}/pending-installments",
                web::get().to(pending_installments),
            ),
    );
}
