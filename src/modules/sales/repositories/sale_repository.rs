// Narrow collaborator interface over the sales table.
//
// The payment-plan core does not own sale lifecycle; the only thing it
// ever writes is the status flip to "completed" when a financing plan
// finishes, and that write happens inside the payment transaction.

use sqlx::{MySql, Transaction};

use crate::core::{AppError, Result};

/// Sale status values the payment-plan core touches
pub const SALE_STATUS_COMPLETED: &str = "completed";

/// Repository for sale status updates
#[derive(Debug, Clone, Default)]
pub struct SaleRepository;

impl SaleRepository {
    pub fn new() -> Self {
        Self
    }

    /// Flip a sale's status to completed within the caller's transaction.
    ///
    /// Fails when the sale id does not exist so the surrounding payment
    /// transaction rolls back instead of committing a dangling reference.
    pub async fn mark_completed_with_tx(
        &self,
        tx: &mut Transaction<'_, MySql>,
        sale_id: &str,
    ) -> Result<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE sales
            SET status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(SALE_STATUS_COMPLETED)
        .bind(chrono::Utc::now().naive_utc())
        .bind(sale_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to update sale status: {}", e)))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::not_found(format!("Sale {} not found", sale_id)));
        }

        Ok(())
    }
}
