pub mod health;
pub mod payment_plans;
pub mod sales;
