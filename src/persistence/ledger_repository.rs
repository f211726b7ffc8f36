//! Payments, receipts and receipt deliveries.

use super::models::*;
use super::{push_id_list, query_failed, DatabaseError, DbPool};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use tracing::debug;
use uuid::Uuid;

/// Payment repository
#[derive(Clone)]
pub struct PaymentRepository {
    pool: DbPool,
}

impl PaymentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a payment with its split as computed by the caller
    pub async fn create(&self, user_id: &str, payment: &NewPayment) -> Result<PaymentRecord, DatabaseError> {
        let (property_id, subdivision_id) = match &payment.target {
            PaymentTarget::Property(id) => (Some(id.as_str()), None),
            PaymentTarget::Subdivision(id) => (None, Some(id.as_str())),
        };

        let record = sqlx::query_as::<_, PaymentRecord>(
            r#"
            INSERT INTO payments (
                id, user_id, property_id, subdivision_id, buyer_id, amount, payment_date, notes,
                interest_amount, principal_amount, days_since_last_payment,
                interest_calculation_date, interest_rate_used, grace_period_days, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(property_id)
        .bind(subdivision_id)
        .bind(&payment.buyer_id)
        .bind(payment.amount)
        .bind(payment.payment_date)
        .bind(&payment.notes)
        .bind(payment.interest_amount)
        .bind(payment.principal_amount)
        .bind(payment.days_since_last_payment)
        .bind(payment.interest_calculation_date)
        .bind(payment.interest_rate_used)
        .bind(payment.grace_period_days)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(query_failed("create payment"))?;

        debug!(
            "Created payment: {} amount={} principal={:?} interest={:?}",
            record.id, record.amount, record.principal_amount, record.interest_amount
        );
        Ok(record)
    }

    pub async fn get(&self, user_id: &str, id: &str) -> Result<Option<PaymentRecord>, DatabaseError> {
        sqlx::query_as::<_, PaymentRecord>("SELECT * FROM payments WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_failed("get payment"))
    }

    /// Payments against a lot, newest first
    pub async fn list_for_subdivision(
        &self,
        user_id: &str,
        subdivision_id: &str,
    ) -> Result<Vec<PaymentRecord>, DatabaseError> {
        sqlx::query_as::<_, PaymentRecord>(
            r#"
            SELECT * FROM payments
            WHERE subdivision_id = ?1 AND user_id = ?2
            ORDER BY payment_date DESC, created_at DESC, rowid DESC
            "#,
        )
        .bind(subdivision_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed("list subdivision payments"))
    }

    /// Payments against a whole property, newest first
    pub async fn list_for_property(
        &self,
        user_id: &str,
        property_id: &str,
    ) -> Result<Vec<PaymentRecord>, DatabaseError> {
        sqlx::query_as::<_, PaymentRecord>(
            r#"
            SELECT * FROM payments
            WHERE property_id = ?1 AND subdivision_id IS NULL AND user_id = ?2
            ORDER BY payment_date DESC, created_at DESC, rowid DESC
            "#,
        )
        .bind(property_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed("list property payments"))
    }

    pub async fn ids_for_subdivision(
        &self,
        user_id: &str,
        subdivision_id: &str,
    ) -> Result<Vec<String>, DatabaseError> {
        sqlx::query_scalar::<_, String>(
            "SELECT id FROM payments WHERE subdivision_id = ?1 AND user_id = ?2",
        )
        .bind(subdivision_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed("collect subdivision payment ids"))
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> Result<bool, DatabaseError> {
        let rows_affected = sqlx::query("DELETE FROM payments WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(query_failed("delete payment"))?
            .rows_affected();

        debug!("Deleted payment: {} ({} rows)", id, rows_affected);
        Ok(rows_affected > 0)
    }

    pub async fn delete_by_ids(&self, ids: &[String]) -> Result<u64, DatabaseError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("DELETE FROM payments WHERE id IN ");
        push_id_list(&mut builder, ids);

        let rows_affected = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(query_failed("delete payments"))?
            .rows_affected();

        debug!("Deleted {} payments", rows_affected);
        Ok(rows_affected)
    }
}

/// Receipt repository
#[derive(Clone)]
pub struct ReceiptRepository {
    pool: DbPool,
}

impl ReceiptRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: &str,
        payment_id: &str,
        receipt_number: &str,
    ) -> Result<ReceiptRecord, DatabaseError> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, ReceiptRecord>(
            r#"
            INSERT INTO receipts (id, user_id, payment_id, receipt_number, generated_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(payment_id)
        .bind(receipt_number)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(query_failed("create receipt"))?;

        debug!("Created receipt {} for payment {}", record.receipt_number, payment_id);
        Ok(record)
    }

    pub async fn get(&self, user_id: &str, id: &str) -> Result<Option<ReceiptRecord>, DatabaseError> {
        sqlx::query_as::<_, ReceiptRecord>("SELECT * FROM receipts WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_failed("get receipt"))
    }

    pub async fn get_by_payment(
        &self,
        user_id: &str,
        payment_id: &str,
    ) -> Result<Option<ReceiptRecord>, DatabaseError> {
        sqlx::query_as::<_, ReceiptRecord>(
            "SELECT * FROM receipts WHERE payment_id = ?1 AND user_id = ?2",
        )
        .bind(payment_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed("get receipt by payment"))
    }

    pub async fn ids_for_payments(&self, payment_ids: &[String]) -> Result<Vec<String>, DatabaseError> {
        if payment_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id FROM receipts WHERE payment_id IN ");
        push_id_list(&mut builder, payment_ids);

        builder
            .build_query_scalar::<String>()
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed("collect receipt ids"))
    }

    pub async fn delete_by_ids(&self, ids: &[String]) -> Result<u64, DatabaseError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("DELETE FROM receipts WHERE id IN ");
        push_id_list(&mut builder, ids);

        let rows_affected = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(query_failed("delete receipts"))?
            .rows_affected();

        debug!("Deleted {} receipts", rows_affected);
        Ok(rows_affected)
    }

    /// Record that a receipt was sent to an address
    pub async fn record_email(
        &self,
        user_id: &str,
        receipt_id: &str,
        email_address: &str,
    ) -> Result<ReceiptEmailRecord, DatabaseError> {
        let record = sqlx::query_as::<_, ReceiptEmailRecord>(
            r#"
            INSERT INTO receipt_emails (id, user_id, receipt_id, email_address, sent_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(receipt_id)
        .bind(email_address)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(query_failed("record receipt email"))?;

        debug!("Recorded receipt email {} -> {}", receipt_id, email_address);
        Ok(record)
    }

    /// Delivery history of a receipt, newest first
    pub async fn list_emails(
        &self,
        user_id: &str,
        receipt_id: &str,
    ) -> Result<Vec<ReceiptEmailRecord>, DatabaseError> {
        sqlx::query_as::<_, ReceiptEmailRecord>(
            r#"
            SELECT * FROM receipt_emails
            WHERE receipt_id = ?1 AND user_id = ?2
            ORDER BY sent_at DESC, rowid DESC
            "#,
        )
        .bind(receipt_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed("list receipt emails"))
    }

    pub async fn delete_emails_for_receipts(&self, receipt_ids: &[String]) -> Result<u64, DatabaseError> {
        if receipt_ids.is_empty() {
            return Ok(0);
        }
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("DELETE FROM receipt_emails WHERE receipt_id IN ");
        push_id_list(&mut builder, receipt_ids);

        let rows_affected = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(query_failed("delete receipt emails"))?
            .rows_affected();

        debug!("Deleted {} receipt emails", rows_affected);
        Ok(rows_affected)
    }
}
