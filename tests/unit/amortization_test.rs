// Property-based and example tests for the amortization calculator:
// determinism, rounding policy, and per-frequency due-date arithmetic.

use chrono::NaiveDate;
use dentiplan::payment_plans::{Amortization, Frequency};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_reference_schedule() {
    // 1,000,000 total, 100,000 down, 3 monthly installments from 2024-01-15
    let amount = Amortization::installment_amount(dec!(1000000), dec!(100000), 3).unwrap();
    assert_eq!(amount, dec!(300000));

    let start = date(2024, 1, 15);
    assert_eq!(
        Amortization::due_date(start, 1, Frequency::Monthly).unwrap(),
        date(2024, 2, 15)
    );
    assert_eq!(
        Amortization::due_date(start, 2, Frequency::Monthly).unwrap(),
        date(2024, 3, 15)
    );
    assert_eq!(
        Amortization::due_date(start, 3, Frequency::Monthly).unwrap(),
        date(2024, 4, 15)
    );
}

#[test]
fn test_single_installment_finances_whole_remainder() {
    let amount = Amortization::installment_amount(dec!(1000000), dec!(100000), 1).unwrap();
    assert_eq!(amount, dec!(900000));

    // Due one period after the start date
    assert_eq!(
        Amortization::due_date(date(2024, 1, 15), 1, Frequency::Weekly).unwrap(),
        date(2024, 1, 22)
    );
    assert_eq!(
        Amortization::due_date(date(2024, 1, 15), 1, Frequency::Biweekly).unwrap(),
        date(2024, 1, 30)
    );
    assert_eq!(
        Amortization::due_date(date(2024, 1, 15), 1, Frequency::Monthly).unwrap(),
        date(2024, 2, 15)
    );
}

#[test]
fn test_half_up_rounding() {
    // 25 / 2 = 12.5 rounds away from zero
    assert_eq!(
        Amortization::installment_amount(dec!(25), dec!(0), 2).unwrap(),
        dec!(13)
    );
    // 1000 / 3 = 333.33.. rounds down
    assert_eq!(
        Amortization::installment_amount(dec!(1000), dec!(0), 3).unwrap(),
        dec!(333)
    );
}

#[test]
fn test_monthly_end_of_month_clamping() {
    // chrono clamps to the shorter month's last day instead of rolling
    // into the following month
    let start = date(2024, 1, 31);
    assert_eq!(
        Amortization::due_date(start, 1, Frequency::Monthly).unwrap(),
        date(2024, 2, 29)
    );
    assert_eq!(
        Amortization::due_date(start, 2, Frequency::Monthly).unwrap(),
        date(2024, 3, 31)
    );
    assert_eq!(
        Amortization::due_date(start, 3, Frequency::Monthly).unwrap(),
        date(2024, 4, 30)
    );

    // Non-leap February
    assert_eq!(
        Amortization::due_date(date(2023, 1, 31), 1, Frequency::Monthly).unwrap(),
        date(2023, 2, 28)
    );
}

#[test]
fn test_invalid_inputs_rejected() {
    assert!(Amortization::installment_amount(dec!(1000), dec!(0), 0).is_err());
    assert!(Amortization::installment_amount(dec!(1000), dec!(1000), 3).is_err());
    assert!(Amortization::installment_amount(dec!(1000), dec!(2000), 3).is_err());
    assert!(Amortization::due_date(date(2024, 1, 15), 0, Frequency::Weekly).is_err());
}

proptest! {
    /// Same inputs always produce the same installment amount
    #[test]
    fn prop_installment_amount_deterministic(
        total in 1i64..100_000_000,
        down_ratio in 0u32..100,
        count in 1i32..48,
    ) {
        let total = Decimal::from(total);
        let down = total * Decimal::from(down_ratio) / Decimal::from(100u32);
        let down = down.trunc();
        prop_assume!(down < total);

        let a = Amortization::installment_amount(total, down, count).unwrap();
        let b = Amortization::installment_amount(total, down, count).unwrap();
        prop_assert_eq!(a, b);
        prop_assert!(a >= Decimal::ZERO);
    }

    /// Schedule sum stays within count-1 units of the financed amount
    /// (the rounding remainder is never redistributed)
    #[test]
    fn prop_rounding_drift_is_bounded(
        to_finance in 1i64..100_000_000,
        count in 1i32..48,
    ) {
        let to_finance = Decimal::from(to_finance);
        let amount = Amortization::installment_amount(to_finance, Decimal::ZERO, count).unwrap();

        let schedule_sum = amount * Decimal::from(count);
        let drift = (schedule_sum - to_finance).abs();
        prop_assert!(drift <= Decimal::from(count));
    }

    /// Due dates are strictly increasing within a schedule
    #[test]
    fn prop_due_dates_increase(
        days_offset in 0u32..20_000,
        count in 2i32..48,
    ) {
        let start = date(2000, 1, 1) + chrono::Days::new(days_offset as u64);

        for frequency in [Frequency::Weekly, Frequency::Biweekly, Frequency::Monthly] {
            let mut previous = start;
            for n in 1..=count {
                let due = Amortization::due_date(start, n, frequency).unwrap();
                prop_assert!(due > previous);
                previous = due;
            }
        }
    }
}
