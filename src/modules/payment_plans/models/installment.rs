use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{AppError, Result};

/// One scheduled partial payment within a payment plan.
///
/// Installments are created together with their plan and never renumbered.
/// The amount is fixed at creation; payment details are written exactly once,
/// atomically with the paid transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInstallment {
    pub id: String,
    pub payment_plan_id: String,
    /// Sequential number (1-based), unique within the plan
    pub installment_number: i32,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
    pub paid_date: Option<NaiveDateTime>,
    /// Set equal to `amount` when the installment is paid
    pub paid_amount: Option<Decimal>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Installment status
///
/// Transitions: pending -> overdue (time-based sweep) and
/// pending/overdue -> paid (payment event). Paid is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallmentStatus {
    /// Not yet due or not yet paid
    Pending,
    /// Due date passed without payment
    Overdue,
    /// Payment received
    Paid,
}

impl InstallmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Overdue => "overdue",
            Self::Paid => "paid",
        }
    }
}

impl std::fmt::Display for InstallmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for InstallmentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "overdue" => Ok(Self::Overdue),
            "paid" => Ok(Self::Paid),
            _ => Err(format!("Invalid installment status: {}", s)),
        }
    }
}

impl TryFrom<String> for InstallmentStatus {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl PaymentInstallment {
    /// Create a new pending installment
    pub fn new(
        payment_plan_id: String,
        installment_number: i32,
        amount: Decimal,
        due_date: NaiveDate,
    ) -> Result<Self> {
        if installment_number < 1 {
            return Err(AppError::validation(format!(
                "Installment number must be positive, got {}",
                installment_number
            )));
        }

        if amount <= Decimal::ZERO {
            return Err(AppError::validation("Installment amount must be positive"));
        }

        let now = chrono::Utc::now().naive_utc();

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            payment_plan_id,
            installment_number,
            amount,
            due_date,
            status: InstallmentStatus::Pending,
            paid_date: None,
            paid_amount: None,
            payment_method: None,
            notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether this installment still awaits payment (pending or overdue)
    pub fn is_open(&self) -> bool {
        matches!(
            self.status,
            InstallmentStatus::Pending | InstallmentStatus::Overdue
        )
    }

    /// Whether the due date has passed without payment.
    /// Date-truncated comparison; time of day is ignored.
    pub fn is_past_due(&self, today: NaiveDate) -> bool {
        self.is_open() && self.due_date < today
    }

    /// Mark installment as paid, recording the payment details.
    ///
    /// Fails with a conflict error when the installment is already paid;
    /// a second payment attempt must never double-count.
    pub fn mark_paid(&mut self, payment_method: String, notes: Option<String>) -> Result<()> {
        if self.status == InstallmentStatus::Paid {
            return Err(AppError::conflict(format!(
                "Installment {} was already paid",
                self.installment_number
            )));
        }

        let now = chrono::Utc::now().naive_utc();
        self.status = InstallmentStatus::Paid;
        self.paid_date = Some(now);
        self.paid_amount = Some(self.amount);
        self.payment_method = Some(payment_method);
        self.notes = notes;
        self.updated_at = now;

        Ok(())
    }

    /// Mark installment as overdue. Paid is terminal.
    pub fn mark_overdue(&mut self) -> Result<()> {
        if self.status == InstallmentStatus::Paid {
            return Err(AppError::validation(
                "Cannot mark a paid installment as overdue",
            ));
        }

        self.status = InstallmentStatus::Overdue;
        self.updated_at = chrono::Utc::now().naive_utc();

        Ok(())
    }
}
