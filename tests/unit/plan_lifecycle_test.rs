// Plan creation and lifecycle tests: parameter validation, derived
// aggregates, and the reference schedule from plan parameters through
// full settlement.

use chrono::NaiveDate;
use dentiplan::payment_plans::{
    Frequency, InstallmentStatus, NewPaymentPlan, PlanService, PlanStatus,
};
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn reference_params() -> NewPaymentPlan {
    NewPaymentPlan {
        patient_id: "patient-1".to_string(),
        treatment: "Orthodontics".to_string(),
        sale_id: Some("sale-1".to_string()),
        total_amount: dec!(1000000),
        down_payment: dec!(100000),
        installment_count: 3,
        frequency: Frequency::Monthly,
        start_date: date(2024, 1, 15),
        created_by: Some("user-1".to_string()),
    }
}

#[test]
fn test_reference_plan_assembly() {
    let (plan, schedule) = PlanService::assemble(&reference_params()).unwrap();

    assert_eq!(plan.installment_amount, dec!(300000));
    assert_eq!(plan.paid_amount, dec!(100000));
    assert_eq!(plan.remaining_amount, dec!(900000));
    assert_eq!(plan.status, PlanStatus::Active);
    assert_eq!(plan.next_due_date, date(2024, 2, 15));
    assert!(plan.totals_consistent());

    assert_eq!(schedule.len(), 3);
    assert_eq!(schedule[0].due_date, date(2024, 2, 15));
    assert_eq!(schedule[1].due_date, date(2024, 3, 15));
    assert_eq!(schedule[2].due_date, date(2024, 4, 15));

    // Overdue is never assigned at creation
    for installment in &schedule {
        assert_eq!(installment.status, InstallmentStatus::Pending);
        assert_eq!(installment.amount, dec!(300000));
        assert_eq!(installment.payment_plan_id, plan.id);
    }
}

#[test]
fn test_invariant_holds_through_every_payment() {
    let (mut plan, mut schedule) = PlanService::assemble(&reference_params()).unwrap();

    for installment in schedule.iter_mut() {
        installment
            .mark_paid("transfer".to_string(), None)
            .unwrap();
        plan.apply_payment(installment.amount);
        assert!(plan.totals_consistent());
        assert!(plan.remaining_amount >= dec!(0));
    }

    assert_eq!(plan.paid_amount, dec!(1000000));
    assert_eq!(plan.remaining_amount, dec!(0));
    assert!(schedule.iter().all(|i| i.status == InstallmentStatus::Paid));

    // Completed iff all installments paid
    plan.complete(date(2024, 4, 20));
    assert_eq!(plan.status, PlanStatus::Completed);
    assert_eq!(plan.next_due_date, date(2024, 4, 20));
}

#[test]
fn test_single_installment_boundary() {
    let mut params = reference_params();
    params.installment_count = 1;

    let (plan, schedule) = PlanService::assemble(&params).unwrap();

    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule[0].amount, dec!(900000));
    assert_eq!(schedule[0].due_date, date(2024, 2, 15));
    assert_eq!(plan.next_due_date, date(2024, 2, 15));
}

#[test]
fn test_weekly_and_biweekly_schedules() {
    let mut params = reference_params();
    params.frequency = Frequency::Weekly;
    let (_, schedule) = PlanService::assemble(&params).unwrap();
    assert_eq!(schedule[0].due_date, date(2024, 1, 22));
    assert_eq!(schedule[2].due_date, date(2024, 2, 5));

    params.frequency = Frequency::Biweekly;
    let (_, schedule) = PlanService::assemble(&params).unwrap();
    assert_eq!(schedule[0].due_date, date(2024, 1, 30));
    assert_eq!(schedule[2].due_date, date(2024, 2, 29));
}

#[test]
fn test_validation_failures_produce_no_plan() {
    let mut params = reference_params();
    params.total_amount = dec!(0);
    assert!(PlanService::assemble(&params).is_err());

    let mut params = reference_params();
    params.down_payment = dec!(1000000);
    assert!(PlanService::assemble(&params).is_err());

    let mut params = reference_params();
    params.installment_count = 0;
    assert!(PlanService::assemble(&params).is_err());

    let mut params = reference_params();
    params.patient_id = "  ".to_string();
    assert!(PlanService::assemble(&params).is_err());
}

#[test]
fn test_rounding_remainder_stays_in_schedule() {
    // 100,000 financed across 3 installments rounds to 33,333 each;
    // the lost unit is accepted policy, not redistributed.
    let mut params = reference_params();
    params.total_amount = dec!(100000);
    params.down_payment = dec!(0);

    let (plan, schedule) = PlanService::assemble(&params).unwrap();
    assert_eq!(plan.installment_amount, dec!(33333));
    let schedule_sum: rust_decimal::Decimal = schedule.iter().map(|i| i.amount).sum();
    assert_eq!(schedule_sum, dec!(99999));
}
