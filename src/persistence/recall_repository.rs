//! Recall history snapshots.

use super::models::RecallHistoryRecord;
use super::{query_failed, DatabaseError, DbPool};
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct RecallHistoryRepository {
    pool: DbPool,
}

impl RecallHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Write a snapshot. `id` and `recalled_at` of the input are replaced.
    pub async fn create(&self, snapshot: &RecallHistoryRecord) -> Result<RecallHistoryRecord, DatabaseError> {
        let record = sqlx::query_as::<_, RecallHistoryRecord>(
            r#"
            INSERT INTO subdivision_recall_history (
                id, subdivision_id, user_id, buyer_id, recall_reason, sale_price, total_paid,
                hold_amount, hold_until_date, payment_plan_type, buyer_name, buyer_email,
                buyer_phone, recalled_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&snapshot.subdivision_id)
        .bind(&snapshot.user_id)
        .bind(&snapshot.buyer_id)
        .bind(&snapshot.recall_reason)
        .bind(snapshot.sale_price)
        .bind(snapshot.total_paid)
        .bind(snapshot.hold_amount)
        .bind(snapshot.hold_until_date)
        .bind(snapshot.payment_plan_type)
        .bind(&snapshot.buyer_name)
        .bind(&snapshot.buyer_email)
        .bind(&snapshot.buyer_phone)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(query_failed("write recall history"))?;

        debug!("Recorded recall of subdivision {}", record.subdivision_id);
        Ok(record)
    }

    /// Recalls of a lot, newest first
    pub async fn list_for_subdivision(
        &self,
        user_id: &str,
        subdivision_id: &str,
    ) -> Result<Vec<RecallHistoryRecord>, DatabaseError> {
        sqlx::query_as::<_, RecallHistoryRecord>(
            r#"
            SELECT * FROM subdivision_recall_history
            WHERE subdivision_id = ?1 AND user_id = ?2
            ORDER BY recalled_at DESC, rowid DESC
            "#,
        )
        .bind(subdivision_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed("list recall history"))
    }
}
