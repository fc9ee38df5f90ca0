use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{AppError, Result};

/// A financing agreement splitting a treatment total into a down payment
/// plus N equal installments.
///
/// Aggregate invariant: `paid_amount + remaining_amount == total_amount`
/// at all times, and the plan is completed iff every installment is paid.
/// Plans are a financial record and are never deleted in normal operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentPlan {
    pub id: String,
    pub patient_id: String,
    /// Free-text treatment label
    pub treatment: String,
    /// Originating sale, when the plan finances a specific sale
    pub sale_id: Option<String>,
    pub total_amount: Decimal,
    pub down_payment: Decimal,
    pub installment_count: i32,
    /// Fixed per-installment amount, derived at creation
    pub installment_amount: Decimal,
    pub frequency: Frequency,
    pub status: PlanStatus,
    pub start_date: NaiveDate,
    pub next_due_date: NaiveDate,
    pub paid_amount: Decimal,
    pub remaining_amount: Decimal,
    pub created_by: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Period between installments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// 7-day interval
    Weekly,
    /// 15-day interval
    Biweekly,
    /// Calendar-month interval
    #[default]
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(Self::Weekly),
            "biweekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(format!("Invalid frequency: {}", s)),
        }
    }
}

impl TryFrom<String> for Frequency {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// Plan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Active,
    Completed,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PlanStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("Invalid plan status: {}", s)),
        }
    }
}

impl TryFrom<String> for PlanStatus {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// Parameters for creating a payment plan
#[derive(Debug, Clone)]
pub struct NewPaymentPlan {
    pub patient_id: String,
    pub treatment: String,
    pub sale_id: Option<String>,
    pub total_amount: Decimal,
    pub down_payment: Decimal,
    pub installment_count: i32,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub created_by: Option<String>,
}

impl NewPaymentPlan {
    /// Validate plan parameters before any persistence happens
    pub fn validate(&self) -> Result<()> {
        if self.patient_id.trim().is_empty() {
            return Err(AppError::validation("Patient id is required"));
        }

        if self.total_amount <= Decimal::ZERO {
            return Err(AppError::validation("Total amount must be positive"));
        }

        if self.down_payment < Decimal::ZERO {
            return Err(AppError::validation("Down payment cannot be negative"));
        }

        if self.down_payment >= self.total_amount {
            return Err(AppError::validation(
                "Down payment must be less than the total amount",
            ));
        }

        if self.installment_count < 1 {
            return Err(AppError::validation(format!(
                "Installment count must be at least 1, got {}",
                self.installment_count
            )));
        }

        // Amounts are whole currency units
        if !self.total_amount.fract().is_zero() || !self.down_payment.fract().is_zero() {
            return Err(AppError::validation(
                "Amounts must be whole currency units",
            ));
        }

        Ok(())
    }
}

impl PaymentPlan {
    /// Create a new active plan from validated parameters.
    ///
    /// The down payment counts as already paid; the remainder is what the
    /// installment schedule finances.
    pub fn new(params: &NewPaymentPlan, installment_amount: Decimal, first_due: NaiveDate) -> Self {
        let now = chrono::Utc::now().naive_utc();

        Self {
            id: Uuid::new_v4().to_string(),
            patient_id: params.patient_id.clone(),
            treatment: params.treatment.clone(),
            sale_id: params.sale_id.clone(),
            total_amount: params.total_amount,
            down_payment: params.down_payment,
            installment_count: params.installment_count,
            installment_amount,
            frequency: params.frequency,
            status: PlanStatus::Active,
            start_date: params.start_date,
            next_due_date: first_due,
            paid_amount: params.down_payment,
            remaining_amount: params.total_amount - params.down_payment,
            created_by: params.created_by.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PlanStatus::Active
    }

    /// Apply a registered installment payment to the plan aggregates.
    ///
    /// The schedule sum may differ from the financed amount by a few
    /// units (the rounding policy never redistributes the remainder), so
    /// the applied amount clamps at the outstanding remainder. This keeps
    /// `paid + remaining == total` and the remainder non-negative.
    pub fn apply_payment(&mut self, amount: Decimal) {
        let applied = amount.min(self.remaining_amount);
        self.paid_amount += applied;
        self.remaining_amount -= applied;
        self.updated_at = chrono::Utc::now().naive_utc();
    }

    /// Point the plan at the next open installment's due date
    pub fn advance_next_due(&mut self, due_date: NaiveDate) {
        self.next_due_date = due_date;
        self.updated_at = chrono::Utc::now().naive_utc();
    }

    /// Mark the plan completed once every installment is paid.
    /// With no open installment left, `next_due_date` holds today's date.
    pub fn complete(&mut self, today: NaiveDate) {
        self.status = PlanStatus::Completed;
        self.next_due_date = today;
        self.updated_at = chrono::Utc::now().naive_utc();
    }

    /// Aggregate consistency check used by tests and debug assertions
    pub fn totals_consistent(&self) -> bool {
        self.paid_amount + self.remaining_amount == self.total_amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn params() -> NewPaymentPlan {
        NewPaymentPlan {
            patient_id: "patient-1".to_string(),
            treatment: "Orthodontics".to_string(),
            sale_id: None,
            total_amount: dec!(1000000),
            down_payment: dec!(100000),
            installment_count: 3,
            frequency: Frequency::Monthly,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            created_by: None,
        }
    }

    #[test]
    fn test_validate_accepts_good_params() {
        assert!(params().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_positive_total() {
        let mut p = params();
        p.total_amount = dec!(0);
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_down_payment_at_or_above_total() {
        let mut p = params();
        p.down_payment = p.total_amount;
        assert!(p.validate().is_err());

        p.down_payment = dec!(1500000);
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_down_payment() {
        let mut p = params();
        p.down_payment = dec!(-1);
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_installments() {
        let mut p = params();
        p.installment_count = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_fractional_amounts() {
        let mut p = params();
        p.total_amount = dec!(1000000.50);
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_new_plan_aggregates() {
        let p = params();
        let plan = PaymentPlan::new(
            &p,
            dec!(300000),
            NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
        );

        assert_eq!(plan.status, PlanStatus::Active);
        assert_eq!(plan.paid_amount, dec!(100000));
        assert_eq!(plan.remaining_amount, dec!(900000));
        assert_eq!(
            plan.next_due_date,
            NaiveDate::from_ymd_opt(2024, 2, 15).unwrap()
        );
        assert!(plan.totals_consistent());
    }

    #[test]
    fn test_apply_payment_keeps_invariant() {
        let p = params();
        let mut plan = PaymentPlan::new(
            &p,
            dec!(300000),
            NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
        );

        plan.apply_payment(dec!(300000));
        assert_eq!(plan.paid_amount, dec!(400000));
        assert_eq!(plan.remaining_amount, dec!(600000));
        assert!(plan.totals_consistent());
    }

    #[test]
    fn test_apply_payment_clamps_at_remainder() {
        // Rounded-up installments can overshoot the financed amount by a
        // few units; the aggregate never goes negative.
        let p = params();
        let mut plan = PaymentPlan::new(
            &p,
            dec!(300000),
            NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
        );

        plan.apply_payment(dec!(900001));
        assert_eq!(plan.remaining_amount, dec!(0));
        assert_eq!(plan.paid_amount, dec!(1000000));
        assert!(plan.totals_consistent());
    }

    #[test]
    fn test_complete_sets_status_and_due_date() {
        let p = params();
        let mut plan = PaymentPlan::new(
            &p,
            dec!(300000),
            NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
        );

        let today = NaiveDate::from_ymd_opt(2024, 4, 20).unwrap();
        plan.complete(today);
        assert_eq!(plan.status, PlanStatus::Completed);
        assert_eq!(plan.next_due_date, today);
    }

    #[test]
    fn test_frequency_parsing() {
        assert_eq!("weekly".parse::<Frequency>().unwrap(), Frequency::Weekly);
        assert_eq!(
            "biweekly".parse::<Frequency>().unwrap(),
            Frequency::Biweekly
        );
        assert_eq!("monthly".parse::<Frequency>().unwrap(), Frequency::Monthly);
        assert!("daily".parse::<Frequency>().is_err());
        assert_eq!(Frequency::default(), Frequency::Monthly);
    }
}
