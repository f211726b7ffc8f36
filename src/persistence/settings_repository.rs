//! Per-user key/value settings.

use super::{query_failed, DatabaseError, DbPool};
use chrono::Utc;
use tracing::{debug, warn};

pub const GLOBAL_DAILY_INTEREST_RATE: &str = "global_daily_interest_rate";

#[derive(Clone)]
pub struct SettingsRepository {
    pool: DbPool,
}

impl SettingsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, user_id: &str, key: &str) -> Result<Option<String>, DatabaseError> {
        sqlx::query_scalar::<_, String>(
            "SELECT setting_value FROM system_settings WHERE user_id = ?1 AND setting_key = ?2",
        )
        .bind(user_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed("read setting"))
    }

    pub async fn set(&self, user_id: &str, key: &str, value: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO system_settings (user_id, setting_key, setting_value, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id, setting_key)
            DO UPDATE SET setting_value = excluded.setting_value, updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(query_failed("write setting"))?;

        debug!("Setting {} updated for {}", key, user_id);
        Ok(())
    }

    /// The user's global daily interest rate, if one is stored and parses.
    pub async fn global_daily_rate(&self, user_id: &str) -> Result<Option<f64>, DatabaseError> {
        let raw = self.get(user_id, GLOBAL_DAILY_INTEREST_RATE).await?;
        Ok(raw.and_then(|value| match value.parse::<f64>() {
            Ok(rate) => Some(rate),
            Err(_) => {
                warn!("Ignoring unparsable {} for {}: {}", GLOBAL_DAILY_INTEREST_RATE, user_id, value);
                None
            }
        }))
    }

    pub async fn set_global_daily_rate(&self, user_id: &str, rate: f64) -> Result<(), DatabaseError> {
        self.set(user_id, GLOBAL_DAILY_INTEREST_RATE, &rate.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;

    #[tokio::test]
    async fn test_global_rate_upsert() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let repo = SettingsRepository::new(pool);

        assert_eq!(repo.global_daily_rate("user-1").await.unwrap(), None);

        repo.set_global_daily_rate("user-1", 0.0005).await.unwrap();
        repo.set_global_daily_rate("user-1", 0.0007).await.unwrap();
        assert_eq!(repo.global_daily_rate("user-1").await.unwrap(), Some(0.0007));
        assert_eq!(repo.global_daily_rate("user-2").await.unwrap(), None);

        repo.set("user-1", GLOBAL_DAILY_INTEREST_RATE, "lots").await.unwrap();
        assert_eq!(repo.global_daily_rate("user-1").await.unwrap(), None);
    }
}
