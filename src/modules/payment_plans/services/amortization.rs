use chrono::{Days, Months, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::core::{AppError, Result};
use crate::modules::payment_plans::models::{Frequency, PaymentInstallment};

/// Pure amortization math: per-installment amount and due dates.
/// No I/O, fully deterministic.
pub struct Amortization;

impl Amortization {
    /// Fixed amount of each installment.
    ///
    /// `round((total - down) / count)` with half-up rounding to whole
    /// currency units. Every installment gets the same rounded amount; the
    /// remainder is deliberately not redistributed to the last installment,
    /// so the schedule sum may differ from the financed amount by up to
    /// `count - 1` units. This matches how the clinic has always quoted
    /// plans and is treated as policy, not a defect.
    pub fn installment_amount(
        total_amount: Decimal,
        down_payment: Decimal,
        installment_count: i32,
    ) -> Result<Decimal> {
        if installment_count < 1 {
            return Err(AppError::validation(format!(
                "Installment count must be at least 1, got {}",
                installment_count
            )));
        }

        let amount_to_finance = total_amount - down_payment;
        if amount_to_finance <= Decimal::ZERO {
            return Err(AppError::validation(
                "Amount to finance must be positive",
            ));
        }

        let amount = (amount_to_finance / Decimal::from(installment_count))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

        Ok(amount)
    }

    /// Due date of installment `n` (1-based) counted from the start date.
    ///
    /// Weekly advances 7 days per installment, biweekly 15 days. Monthly
    /// uses calendar-month arithmetic: when the start day does not exist in
    /// the target month, chrono clamps to that month's last day
    /// (2024-01-31 + 1 month = 2024-02-29).
    pub fn due_date(
        start_date: NaiveDate,
        installment_number: i32,
        frequency: Frequency,
    ) -> Result<NaiveDate> {
        if installment_number < 1 {
            return Err(AppError::validation(format!(
                "Installment number must be positive, got {}",
                installment_number
            )));
        }

        let n = installment_number as u32;
        let due = match frequency {
            Frequency::Weekly => start_date.checked_add_days(Days::new(7 * n as u64)),
            Frequency::Biweekly => start_date.checked_add_days(Days::new(15 * n as u64)),
            Frequency::Monthly => start_date.checked_add_months(Months::new(n)),
        };

        due.ok_or_else(|| {
            AppError::validation(format!(
                "Due date out of range for installment {} from {}",
                installment_number, start_date
            ))
        })
    }

    /// Build the full pending schedule for a plan
    pub fn build_schedule(
        payment_plan_id: &str,
        installment_amount: Decimal,
        installment_count: i32,
        frequency: Frequency,
        start_date: NaiveDate,
    ) -> Result<Vec<PaymentInstallment>> {
        let mut schedule = Vec::with_capacity(installment_count as usize);

        for number in 1..=installment_count {
            let due_date = Self::due_date(start_date, number, frequency)?;
            schedule.push(PaymentInstallment::new(
                payment_plan_id.to_string(),
                number,
                installment_amount,
                due_date,
            )?);
        }

        Ok(schedule)
    }
}
