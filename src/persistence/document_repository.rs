//! Document rows. The bytes themselves live in the blob store under `file_path`.

use super::models::*;
use super::{push_id_list, query_failed, DatabaseError, DbPool};
use crate::domain::entities::document_owner::DocumentOwner;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct DocumentRepository {
    pool: DbPool,
}

impl DocumentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: &str,
        owner: &DocumentOwner,
        file: &StoredFile,
    ) -> Result<DocumentRecord, DatabaseError> {
        let (property_id, subdivision_id, payment_id) = match owner {
            DocumentOwner::Property(id) => (Some(id.as_str()), None, None),
            DocumentOwner::Subdivision(id) => (None, Some(id.as_str()), None),
            DocumentOwner::Payment(id) => (None, None, Some(id.as_str())),
        };

        let now = Utc::now();
        let record = sqlx::query_as::<_, DocumentRecord>(
            r#"
            INSERT INTO documents (
                id, user_id, property_id, subdivision_id, payment_id,
                name, file_path, file_size, file_type, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(property_id)
        .bind(subdivision_id)
        .bind(payment_id)
        .bind(&file.name)
        .bind(&file.file_path)
        .bind(file.file_size)
        .bind(&file.file_type)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(query_failed("create document"))?;

        debug!("Created document: {} at {}", record.id, record.file_path);
        Ok(record)
    }

    pub async fn get(&self, user_id: &str, id: &str) -> Result<Option<DocumentRecord>, DatabaseError> {
        sqlx::query_as::<_, DocumentRecord>("SELECT * FROM documents WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_failed("get document"))
    }

    /// Documents attached to one owner, newest first
    pub async fn list_by_owner(
        &self,
        user_id: &str,
        owner: &DocumentOwner,
    ) -> Result<Vec<DocumentRecord>, DatabaseError> {
        let sql = format!(
            "SELECT * FROM documents WHERE {} = ?1 AND user_id = ?2 ORDER BY created_at DESC, rowid DESC",
            owner.column()
        );
        sqlx::query_as::<_, DocumentRecord>(&sql)
            .bind(owner.id())
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed("list documents"))
    }

    pub async fn count_by_owner(&self, user_id: &str, owner: &DocumentOwner) -> Result<i64, DatabaseError> {
        let sql = format!(
            "SELECT COUNT(*) FROM documents WHERE {} = ?1 AND user_id = ?2",
            owner.column()
        );
        sqlx::query_scalar::<_, i64>(&sql)
            .bind(owner.id())
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(query_failed("count documents"))
    }

    /// Every document of the user, newest first
    pub async fn list_all(&self, user_id: &str) -> Result<Vec<DocumentRecord>, DatabaseError> {
        sqlx::query_as::<_, DocumentRecord>(
            "SELECT * FROM documents WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed("list all documents"))
    }

    /// Point the row at a newly uploaded object
    pub async fn replace_file(
        &self,
        user_id: &str,
        id: &str,
        file: &StoredFile,
    ) -> Result<Option<DocumentRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, DocumentRecord>(
            r#"
            UPDATE documents
            SET name = ?1, file_path = ?2, file_size = ?3, file_type = ?4, updated_at = ?5
            WHERE id = ?6 AND user_id = ?7
            RETURNING *
            "#,
        )
        .bind(&file.name)
        .bind(&file.file_path)
        .bind(file.file_size)
        .bind(&file.file_type)
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed("replace document"))?;

        debug!("Replaced document file: {}", id);
        Ok(record)
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> Result<bool, DatabaseError> {
        let rows_affected = sqlx::query("DELETE FROM documents WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(query_failed("delete document"))?
            .rows_affected();

        debug!("Deleted document: {} ({} rows)", id, rows_affected);
        Ok(rows_affected > 0)
    }

    /// Documents attached to a lot directly or to any of the given payments
    pub async fn list_for_subdivision_and_payments(
        &self,
        user_id: &str,
        subdivision_id: &str,
        payment_ids: &[String],
    ) -> Result<Vec<DocumentRecord>, DatabaseError> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM documents WHERE user_id = ");
        builder.push_bind(user_id);
        builder.push(" AND (subdivision_id = ").push_bind(subdivision_id);
        if !payment_ids.is_empty() {
            builder.push(" OR payment_id IN ");
            push_id_list(&mut builder, payment_ids);
        }
        builder.push(")");

        builder
            .build_query_as::<DocumentRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed("collect recall documents"))
    }

    pub async fn delete_by_ids(&self, ids: &[String]) -> Result<u64, DatabaseError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("DELETE FROM documents WHERE id IN ");
        push_id_list(&mut builder, ids);

        let rows_affected = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(query_failed("delete documents"))?
            .rows_affected();

        debug!("Deleted {} documents", rows_affected);
        Ok(rows_affected)
    }
}
