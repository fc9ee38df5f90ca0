// Installment state-machine tests: payment idempotency, the overdue
// transition, and date-truncated past-due detection.

use chrono::NaiveDate;
use dentiplan::core::AppError;
use dentiplan::payment_plans::{InstallmentStatus, PaymentInstallment};
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn pending_installment(due: NaiveDate) -> PaymentInstallment {
    PaymentInstallment::new("plan-1".to_string(), 1, dec!(300000), due).unwrap()
}

#[test]
fn test_payment_is_idempotent() {
    let mut installment = pending_installment(date(2024, 2, 15));

    installment
        .mark_paid("cash".to_string(), Some("paid at front desk".to_string()))
        .unwrap();
    let first_paid_date = installment.paid_date;

    // Second attempt fails with a conflict and changes nothing
    let second = installment.mark_paid("card".to_string(), None);
    match second {
        Err(AppError::Conflict(message)) => assert!(message.contains("already paid")),
        other => panic!("Expected conflict error, got {:?}", other),
    }

    assert_eq!(installment.paid_date, first_paid_date);
    assert_eq!(installment.paid_amount, Some(dec!(300000)));
    assert_eq!(installment.payment_method.as_deref(), Some("cash"));
}

#[test]
fn test_payment_fields_set_atomically_with_transition() {
    let mut installment = pending_installment(date(2024, 2, 15));
    assert!(installment.paid_date.is_none());
    assert!(installment.paid_amount.is_none());
    assert!(installment.payment_method.is_none());

    installment.mark_paid("transfer".to_string(), None).unwrap();

    assert_eq!(installment.status, InstallmentStatus::Paid);
    assert!(installment.paid_date.is_some());
    assert_eq!(installment.paid_amount, Some(installment.amount));
    assert_eq!(installment.payment_method.as_deref(), Some("transfer"));
}

#[test]
fn test_overdue_installment_can_still_be_paid() {
    let mut installment = pending_installment(date(2024, 2, 15));

    installment.mark_overdue().unwrap();
    assert_eq!(installment.status, InstallmentStatus::Overdue);

    installment.mark_paid("cash".to_string(), None).unwrap();
    assert_eq!(installment.status, InstallmentStatus::Paid);
}

#[test]
fn test_paid_is_terminal() {
    let mut installment = pending_installment(date(2024, 2, 15));
    installment.mark_paid("cash".to_string(), None).unwrap();

    assert!(installment.mark_overdue().is_err());
    assert!(installment.mark_paid("cash".to_string(), None).is_err());
    assert_eq!(installment.status, InstallmentStatus::Paid);
}

#[test]
fn test_past_due_detection_matches_sweep_window() {
    let due = date(2024, 2, 15);
    let installment = pending_installment(due);

    // Yesterday's installment is swept, tomorrow's is untouched
    assert!(installment.is_past_due(date(2024, 2, 16)));
    assert!(!installment.is_past_due(date(2024, 2, 15)));
    assert!(!installment.is_past_due(date(2024, 2, 14)));
}

#[test]
fn test_paid_installments_are_never_past_due() {
    let mut installment = pending_installment(date(2024, 2, 15));
    installment.mark_paid("cash".to_string(), None).unwrap();

    assert!(!installment.is_past_due(date(2024, 3, 1)));
}
