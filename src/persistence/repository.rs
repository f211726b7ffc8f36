//! Database Repository
//!
//! Data access for properties, their lots, buyers and the dashboard figures.
//! Every query is scoped to the owning user.

use super::models::*;
use super::{query_failed, DatabaseError, DbPool};
use crate::domain::entities::lot::LotStatus;
use crate::domain::entities::property::PropertyStatus;
use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite};
use tracing::debug;
use uuid::Uuid;

/// Property repository
#[derive(Clone)]
pub struct PropertyRepository {
    pool: DbPool,
}

impl PropertyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new property, available and unpriced
    pub async fn create(
        &self,
        user_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<PropertyRecord, DatabaseError> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, PropertyRecord>(
            r#"
            INSERT INTO properties (id, user_id, title, description, status, sale_price, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, 'available', 0.0, ?5, ?5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(query_failed("create property"))?;

        debug!("Created property: {} ({})", record.id, record.title);
        Ok(record)
    }

    pub async fn get(&self, user_id: &str, id: &str) -> Result<Option<PropertyRecord>, DatabaseError> {
        sqlx::query_as::<_, PropertyRecord>("SELECT * FROM properties WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_failed("get property"))
    }

    /// All properties of the user with lot count and summed lot prices, newest first
    pub async fn list(&self, user_id: &str) -> Result<Vec<PropertySummary>, DatabaseError> {
        sqlx::query_as::<_, PropertySummary>(
            r#"
            SELECT p.*,
                (SELECT COUNT(*) FROM subdivisions s WHERE s.property_id = p.id) AS subdivision_count,
                (SELECT TOTAL(s.sale_price) FROM subdivisions s WHERE s.property_id = p.id) AS total_value
            FROM properties p
            WHERE p.user_id = ?1
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed("list properties"))
    }

    pub async fn update(
        &self,
        user_id: &str,
        id: &str,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<PropertyRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, PropertyRecord>(
            r#"
            UPDATE properties
            SET title = COALESCE(?1, title), description = COALESCE(?2, description), updated_at = ?3
            WHERE id = ?4 AND user_id = ?5
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(description)
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed("update property"))?;

        debug!("Updated property: {}", id);
        Ok(record)
    }

    /// Mark the property as being sold to a buyer
    pub async fn record_sale(
        &self,
        user_id: &str,
        id: &str,
        buyer_id: &str,
        sale_price: f64,
    ) -> Result<Option<PropertyRecord>, DatabaseError> {
        sqlx::query_as::<_, PropertyRecord>(
            r#"
            UPDATE properties
            SET status = 'pending', buyer_id = ?1, sale_price = ?2, updated_at = ?3
            WHERE id = ?4 AND user_id = ?5
            RETURNING *
            "#,
        )
        .bind(buyer_id)
        .bind(sale_price)
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed("record property sale"))
    }

    pub async fn set_status(
        &self,
        user_id: &str,
        id: &str,
        status: PropertyStatus,
    ) -> Result<(), DatabaseError> {
        let rows_affected = sqlx::query(
            "UPDATE properties SET status = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
        )
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(query_failed("set property status"))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "property",
                id: id.to_string(),
            });
        }

        debug!("Property {} is now {}", id, status.as_str());
        Ok(())
    }

    /// Delete a property; lots, payments and documents go with it
    pub async fn delete(&self, user_id: &str, id: &str) -> Result<bool, DatabaseError> {
        let rows_affected = sqlx::query("DELETE FROM properties WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(query_failed("delete property"))?
            .rows_affected();

        debug!("Deleted property: {} ({} rows)", id, rows_affected);
        Ok(rows_affected > 0)
    }
}

/// Subdivision (lot) repository
#[derive(Clone)]
pub struct SubdivisionRepository {
    pool: DbPool,
}

impl SubdivisionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create an available lot under a property
    pub async fn create(
        &self,
        user_id: &str,
        property_id: &str,
        title: &str,
        details: &LotDetails,
    ) -> Result<SubdivisionRecord, DatabaseError> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, SubdivisionRecord>(
            r#"
            INSERT INTO subdivisions (
                id, property_id, user_id, title, description, status, sale_price, payment_type,
                lot_number, surveyor_plan_number, registration_number, mutation_number,
                acres, length, width, owner_first_name, owner_middle_name, owner_last_name,
                title_nes_number, submission_date, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, 'available', ?6, 'full',
                    ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?19)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(property_id)
        .bind(user_id)
        .bind(title)
        .bind(&details.description)
        .bind(details.sale_price.unwrap_or(0.0))
        .bind(&details.lot_number)
        .bind(&details.surveyor_plan_number)
        .bind(&details.registration_number)
        .bind(&details.mutation_number)
        .bind(details.acres)
        .bind(details.length)
        .bind(details.width)
        .bind(&details.owner_first_name)
        .bind(&details.owner_middle_name)
        .bind(&details.owner_last_name)
        .bind(&details.title_nes_number)
        .bind(details.submission_date)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(query_failed("create subdivision"))?;

        debug!("Created subdivision: {} under property {}", record.id, property_id);
        Ok(record)
    }

    pub async fn get(&self, user_id: &str, id: &str) -> Result<Option<SubdivisionRecord>, DatabaseError> {
        sqlx::query_as::<_, SubdivisionRecord>(
            "SELECT * FROM subdivisions WHERE id = ?1 AND user_id = ?2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed("get subdivision"))
    }

    /// Lots of a property with their payment count and principal paid, newest first
    pub async fn list_for_property(
        &self,
        user_id: &str,
        property_id: &str,
    ) -> Result<Vec<SubdivisionSummary>, DatabaseError> {
        sqlx::query_as::<_, SubdivisionSummary>(
            r#"
            SELECT s.*,
                (SELECT COUNT(*) FROM payments pay WHERE pay.subdivision_id = s.id) AS payment_count,
                (SELECT TOTAL(COALESCE(pay.principal_amount, pay.amount))
                    FROM payments pay WHERE pay.subdivision_id = s.id) AS principal_paid
            FROM subdivisions s
            WHERE s.property_id = ?1 AND s.user_id = ?2
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(property_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed("list subdivisions"))
    }

    /// Rewrite descriptive fields. Title and price keep their value when omitted.
    pub async fn update_details(
        &self,
        user_id: &str,
        id: &str,
        details: &LotDetails,
    ) -> Result<Option<SubdivisionRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, SubdivisionRecord>(
            r#"
            UPDATE subdivisions
            SET title = COALESCE(?1, title),
                description = ?2,
                sale_price = COALESCE(?3, sale_price),
                lot_number = ?4,
                surveyor_plan_number = ?5,
                registration_number = ?6,
                mutation_number = ?7,
                acres = ?8,
                length = ?9,
                width = ?10,
                owner_first_name = ?11,
                owner_middle_name = ?12,
                owner_last_name = ?13,
                title_nes_number = ?14,
                submission_date = ?15,
                updated_at = ?16
            WHERE id = ?17 AND user_id = ?18
            RETURNING *
            "#,
        )
        .bind(&details.title)
        .bind(&details.description)
        .bind(details.sale_price)
        .bind(&details.lot_number)
        .bind(&details.surveyor_plan_number)
        .bind(&details.registration_number)
        .bind(&details.mutation_number)
        .bind(details.acres)
        .bind(details.length)
        .bind(details.width)
        .bind(&details.owner_first_name)
        .bind(&details.owner_middle_name)
        .bind(&details.owner_last_name)
        .bind(&details.title_nes_number)
        .bind(details.submission_date)
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed("update subdivision"))?;

        debug!("Updated subdivision: {}", id);
        Ok(record)
    }

    /// Write a sale. Rate, grace period and hold terms only change when given.
    pub async fn apply_sale(
        &self,
        user_id: &str,
        id: &str,
        sale: &LotSaleUpdate,
    ) -> Result<Option<SubdivisionRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, SubdivisionRecord>(
            r#"
            UPDATE subdivisions
            SET buyer_id = ?1,
                sale_price = ?2,
                status = ?3,
                payment_type = ?4,
                payment_plan_type = ?5,
                daily_interest_rate = COALESCE(?6, daily_interest_rate),
                interest_grace_period_days = COALESCE(?7, interest_grace_period_days),
                hold_amount = COALESCE(?8, hold_amount),
                hold_until_date = COALESCE(?9, hold_until_date),
                updated_at = ?10
            WHERE id = ?11 AND user_id = ?12
            RETURNING *
            "#,
        )
        .bind(&sale.buyer_id)
        .bind(sale.sale_price)
        .bind(sale.status)
        .bind(sale.payment_type)
        .bind(sale.payment_plan_type)
        .bind(sale.daily_interest_rate)
        .bind(sale.interest_grace_period_days)
        .bind(sale.hold_amount)
        .bind(sale.hold_until_date)
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed("apply subdivision sale"))?;

        debug!("Subdivision {} sold to {} ({})", id, sale.buyer_id, sale.status.as_str());
        Ok(record)
    }

    /// Put a buyer's hold on the lot
    pub async fn place_hold(
        &self,
        user_id: &str,
        id: &str,
        buyer_id: &str,
        hold_amount: f64,
        hold_until_date: NaiveDate,
    ) -> Result<Option<SubdivisionRecord>, DatabaseError> {
        sqlx::query_as::<_, SubdivisionRecord>(
            r#"
            UPDATE subdivisions
            SET status = 'on_hold', buyer_id = ?1, hold_amount = ?2, hold_until_date = ?3, updated_at = ?4
            WHERE id = ?5 AND user_id = ?6
            RETURNING *
            "#,
        )
        .bind(buyer_id)
        .bind(hold_amount)
        .bind(hold_until_date)
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed("place hold"))
    }

    pub async fn set_status(&self, user_id: &str, id: &str, status: LotStatus) -> Result<(), DatabaseError> {
        let rows_affected = sqlx::query(
            "UPDATE subdivisions SET status = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
        )
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(query_failed("set subdivision status"))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "subdivision",
                id: id.to_string(),
            });
        }

        debug!("Subdivision {} is now {}", id, status.as_str());
        Ok(())
    }

    /// Move the interest anchor to `payment_date` and add the interest charged
    pub async fn record_payment(
        &self,
        user_id: &str,
        id: &str,
        payment_date: NaiveDate,
        interest_charged: f64,
    ) -> Result<(), DatabaseError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE subdivisions
            SET last_payment_date = ?1,
                total_interest_charged = CASE
                    WHEN ?2 > 0 THEN COALESCE(total_interest_charged, 0.0) + ?2
                    ELSE total_interest_charged
                END,
                updated_at = ?3
            WHERE id = ?4 AND user_id = ?5
            "#,
        )
        .bind(payment_date)
        .bind(interest_charged)
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(query_failed("record subdivision payment"))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "subdivision",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Clear every sale, hold, interest and recall field and make the lot available
    pub async fn reset_after_recall(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Option<SubdivisionRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, SubdivisionRecord>(
            r#"
            UPDATE subdivisions
            SET status = 'available',
                buyer_id = NULL,
                sale_price = 0.0,
                hold_amount = NULL,
                hold_until_date = NULL,
                payment_type = 'full',
                payment_plan_type = NULL,
                daily_interest_rate = NULL,
                interest_grace_period_days = NULL,
                last_payment_date = NULL,
                total_interest_charged = NULL,
                recall_date = NULL,
                recall_reason = NULL,
                updated_at = ?1
            WHERE id = ?2 AND user_id = ?3
            RETURNING *
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed("reset recalled subdivision"))?;

        debug!("Reset subdivision {} after recall", id);
        Ok(record)
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> Result<bool, DatabaseError> {
        let rows_affected = sqlx::query("DELETE FROM subdivisions WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(query_failed("delete subdivision"))?
            .rows_affected();

        debug!("Deleted subdivision: {} ({} rows)", id, rows_affected);
        Ok(rows_affected > 0)
    }

    /// Lots matching every given filter, with the owning property title, newest first
    pub async fn search(
        &self,
        user_id: &str,
        filters: &SubdivisionSearch,
    ) -> Result<Vec<SearchResultRecord>, DatabaseError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT s.*, p.title AS property_title \
             FROM subdivisions s JOIN properties p ON p.id = s.property_id \
             WHERE s.user_id = ",
        );
        builder.push_bind(user_id);

        if let Some(price) = filters.sale_price {
            builder.push(" AND s.sale_price = ").push_bind(price);
        }
        if let Some(acres) = filters.acres {
            builder.push(" AND s.acres = ").push_bind(acres);
        }
        if let Some(date) = filters.submission_date {
            builder.push(" AND s.submission_date = ").push_bind(date);
        }
        for (column, value) in filters.text_filters() {
            builder
                .push(format!(" AND s.{} LIKE ", column))
                .push_bind(like_pattern(value))
                .push(" ESCAPE '\\'");
        }
        builder.push(" ORDER BY s.created_at DESC");

        builder
            .build_query_as::<SearchResultRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed("search subdivisions"))
    }
}

/// `%value%` with LIKE wildcards in the value escaped.
fn like_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Buyer repository
#[derive(Clone)]
pub struct BuyerRepository {
    pool: DbPool,
}

impl BuyerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: &str, buyer: &BuyerDetails) -> Result<BuyerRecord, DatabaseError> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, BuyerRecord>(
            r#"
            INSERT INTO buyers (id, user_id, name, email, phone, address, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(&buyer.name)
        .bind(&buyer.email)
        .bind(&buyer.phone)
        .bind(&buyer.address)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(query_failed("create buyer"))?;

        debug!("Created buyer: {}", record.id);
        Ok(record)
    }

    pub async fn get(&self, user_id: &str, id: &str) -> Result<Option<BuyerRecord>, DatabaseError> {
        sqlx::query_as::<_, BuyerRecord>("SELECT * FROM buyers WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_failed("get buyer"))
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<BuyerRecord>, DatabaseError> {
        sqlx::query_as::<_, BuyerRecord>(
            "SELECT * FROM buyers WHERE user_id = ?1 ORDER BY name COLLATE NOCASE ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed("list buyers"))
    }

    pub async fn update(
        &self,
        user_id: &str,
        id: &str,
        buyer: &BuyerDetails,
    ) -> Result<Option<BuyerRecord>, DatabaseError> {
        sqlx::query_as::<_, BuyerRecord>(
            r#"
            UPDATE buyers
            SET name = ?1, email = ?2, phone = ?3, address = ?4, updated_at = ?5
            WHERE id = ?6 AND user_id = ?7
            RETURNING *
            "#,
        )
        .bind(&buyer.name)
        .bind(&buyer.email)
        .bind(&buyer.phone)
        .bind(&buyer.address)
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed("update buyer"))
    }
}

/// Aggregates shown on the dashboard
#[derive(Clone)]
pub struct DashboardRepository {
    pool: DbPool,
}

impl DashboardRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn stats(&self, user_id: &str) -> Result<DashboardStats, DatabaseError> {
        sqlx::query_as::<_, DashboardStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM properties WHERE user_id = ?1) AS property_count,
                (SELECT COUNT(*) FROM documents WHERE user_id = ?1) AS document_count,
                (SELECT COUNT(*) FROM buyers WHERE user_id = ?1) AS buyer_count,
                (SELECT TOTAL(sale_price) FROM subdivisions WHERE user_id = ?1) AS portfolio_value
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(query_failed("load dashboard stats"))
    }
}
