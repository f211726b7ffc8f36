//! Persistence Layer
//!
//! SQLite storage for the land ledger, accessed asynchronously through sqlx.
//!
//! # Database Schema
//!
//! ## properties
//! - id, user_id, title, description
//! - status: "available" | "pending" | "sold"
//! - sale_price, buyer_id
//!
//! ## subdivisions
//! - id, property_id (cascade), user_id, title, description
//! - status: "on_hold" | "available" | "mortgage" | "sold" | "paid_in_full" | "recalled"
//! - sale_price, buyer_id, payment_type, payment_plan_type
//! - interest: daily_interest_rate, interest_grace_period_days, last_payment_date,
//!   total_interest_charged
//! - hold: hold_amount, hold_until_date
//! - recall: recall_date, recall_reason
//! - survey/legal descriptors (lot_number, acres, owner names, ...)
//!
//! ## buyers
//! - id, user_id, name, email, phone, address
//!
//! ## payments
//! - id, user_id, property_id | subdivision_id, buyer_id, amount, payment_date, notes
//! - split computed at insert: principal_amount, interest_amount,
//!   days_since_last_payment, interest_rate_used, grace_period_days
//!
//! ## documents, receipts, receipt_emails
//! - documents point at one property, subdivision or payment; bytes live in the blob store
//! - one receipt per payment; receipt_emails record simulated sends
//!
//! ## subdivision_recall_history
//! - snapshot of a lot's sale taken before a recall clears it
//!
//! ## system_settings
//! - per-user key/value pairs (global_daily_interest_rate)

pub mod document_repository;
pub mod ledger_repository;
pub mod models;
pub mod recall_repository;
pub mod repository;
pub mod settings_repository;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{ConnectOptions, QueryBuilder, Sqlite};
use std::path::Path;
use std::str::FromStr;
use tracing::{error, info};

/// Database connection pool
pub type DbPool = SqlitePool;

/// Database error
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
}

/// Log a failed statement and wrap it, the way every repository reports store errors.
pub(crate) fn query_failed(context: &'static str) -> impl Fn(sqlx::Error) -> DatabaseError {
    move |e| {
        error!("Failed to {}: {}", context, e);
        DatabaseError::QueryError(format!("Failed to {}: {}", context, e))
    }
}

/// Append `(?, ?, ...)` binding every id, for `IN` filters.
pub(crate) fn push_id_list<'a>(builder: &mut QueryBuilder<'a, Sqlite>, ids: &'a [String]) {
    builder.push("(");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(id.as_str());
    }
    separated.push_unseparated(")");
}

/// Initialize the database connection pool with default settings
pub async fn init_database(database_url: &str) -> Result<DbPool, DatabaseError> {
    init_database_with(&DatabaseConfig {
        url: database_url.to_string(),
        ..DatabaseConfig::default()
    })
    .await
}

/// Initialize the database connection pool
///
/// In-memory databases are held on a single connection that never expires,
/// since every SQLite connection to `:memory:` sees its own empty database.
///
/// # Errors
/// Returns error if database connection fails or migrations fail
pub async fn init_database_with(config: &DatabaseConfig) -> Result<DbPool, DatabaseError> {
    info!("Initializing database: {}", config.url);

    let in_memory = config.url.contains(":memory:");

    if !in_memory {
        if let Some(db_path) = config.url.strip_prefix("sqlite://") {
            if let Some(parent) = Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        DatabaseError::ConnectionError(sqlx::Error::Configuration(Box::new(e)))
                    })?;
                }
            }
        }
    }

    let level = if config.log_queries {
        tracing::log::LevelFilter::Debug
    } else {
        tracing::log::LevelFilter::Trace
    };
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .log_statements(level);

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(config.max_connections)
    };

    let pool = pool_options.connect_with(options).await?;

    run_migrations(&pool).await?;

    info!("✓ Database initialized successfully");

    Ok(pool)
}

const SCHEMA: &[(&str, &str)] = &[
    (
        "buyers",
        r#"
        CREATE TABLE IF NOT EXISTS buyers (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            address TEXT,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL
        )
        "#,
    ),
    (
        "properties",
        r#"
        CREATE TABLE IF NOT EXISTS properties (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'available'
                CHECK(status IN ('available', 'pending', 'sold')),
            sale_price REAL NOT NULL DEFAULT 0.0,
            buyer_id TEXT REFERENCES buyers(id) ON DELETE SET NULL,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL
        )
        "#,
    ),
    (
        "subdivisions",
        r#"
        CREATE TABLE IF NOT EXISTS subdivisions (
            id TEXT PRIMARY KEY,
            property_id TEXT NOT NULL REFERENCES properties(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'available'
                CHECK(status IN ('on_hold', 'available', 'mortgage', 'sold', 'paid_in_full', 'recalled')),
            sale_price REAL NOT NULL DEFAULT 0.0,
            buyer_id TEXT REFERENCES buyers(id) ON DELETE SET NULL,
            lot_number TEXT,
            surveyor_plan_number TEXT,
            registration_number TEXT,
            mutation_number TEXT,
            acres REAL,
            length REAL,
            width REAL,
            owner_first_name TEXT,
            owner_middle_name TEXT,
            owner_last_name TEXT,
            title_nes_number TEXT,
            submission_date TEXT,
            hold_until_date TEXT,
            hold_amount REAL,
            payment_type TEXT NOT NULL DEFAULT 'full'
                CHECK(payment_type IN ('full', 'mortgage', 'installment')),
            payment_plan_type TEXT
                CHECK(payment_plan_type IS NULL OR payment_plan_type IN ('full', 'mortgage', 'hold')),
            daily_interest_rate REAL,
            interest_grace_period_days INTEGER,
            last_payment_date TEXT,
            total_interest_charged REAL,
            recall_date TEXT,
            recall_reason TEXT,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL
        )
        "#,
    ),
    (
        "payments",
        r#"
        CREATE TABLE IF NOT EXISTS payments (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            property_id TEXT REFERENCES properties(id) ON DELETE CASCADE,
            subdivision_id TEXT REFERENCES subdivisions(id) ON DELETE CASCADE,
            buyer_id TEXT REFERENCES buyers(id) ON DELETE SET NULL,
            amount REAL NOT NULL CHECK(amount > 0),
            payment_date TEXT NOT NULL,
            notes TEXT,
            interest_amount REAL,
            principal_amount REAL,
            days_since_last_payment INTEGER,
            interest_calculation_date TEXT,
            interest_rate_used REAL,
            grace_period_days INTEGER,
            created_at DATETIME NOT NULL
        )
        "#,
    ),
    (
        "documents",
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            property_id TEXT REFERENCES properties(id) ON DELETE CASCADE,
            subdivision_id TEXT REFERENCES subdivisions(id) ON DELETE CASCADE,
            payment_id TEXT REFERENCES payments(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            file_path TEXT NOT NULL,
            file_size INTEGER,
            file_type TEXT,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL
        )
        "#,
    ),
    (
        "receipts",
        r#"
        CREATE TABLE IF NOT EXISTS receipts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            payment_id TEXT NOT NULL UNIQUE REFERENCES payments(id) ON DELETE CASCADE,
            receipt_number TEXT NOT NULL UNIQUE,
            generated_at DATETIME NOT NULL,
            created_at DATETIME NOT NULL
        )
        "#,
    ),
    (
        "receipt_emails",
        r#"
        CREATE TABLE IF NOT EXISTS receipt_emails (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            receipt_id TEXT NOT NULL REFERENCES receipts(id) ON DELETE CASCADE,
            email_address TEXT NOT NULL,
            sent_at DATETIME NOT NULL
        )
        "#,
    ),
    (
        "subdivision_recall_history",
        r#"
        CREATE TABLE IF NOT EXISTS subdivision_recall_history (
            id TEXT PRIMARY KEY,
            subdivision_id TEXT NOT NULL REFERENCES subdivisions(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL,
            buyer_id TEXT,
            recall_reason TEXT NOT NULL,
            sale_price REAL,
            total_paid REAL NOT NULL DEFAULT 0.0,
            hold_amount REAL,
            hold_until_date TEXT,
            payment_plan_type TEXT,
            buyer_name TEXT,
            buyer_email TEXT,
            buyer_phone TEXT,
            recalled_at DATETIME NOT NULL
        )
        "#,
    ),
    (
        "system_settings",
        r#"
        CREATE TABLE IF NOT EXISTS system_settings (
            user_id TEXT NOT NULL,
            setting_key TEXT NOT NULL,
            setting_value TEXT NOT NULL,
            updated_at DATETIME NOT NULL,
            PRIMARY KEY (user_id, setting_key)
        )
        "#,
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_properties_user ON properties(user_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_subdivisions_property ON subdivisions(property_id)",
    "CREATE INDEX IF NOT EXISTS idx_subdivisions_user ON subdivisions(user_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_payments_subdivision ON payments(subdivision_id, payment_date)",
    "CREATE INDEX IF NOT EXISTS idx_payments_property ON payments(property_id, payment_date)",
    "CREATE INDEX IF NOT EXISTS idx_documents_subdivision ON documents(subdivision_id)",
    "CREATE INDEX IF NOT EXISTS idx_documents_property ON documents(property_id)",
    "CREATE INDEX IF NOT EXISTS idx_documents_payment ON documents(payment_id)",
    "CREATE INDEX IF NOT EXISTS idx_receipt_emails_receipt ON receipt_emails(receipt_id)",
    "CREATE INDEX IF NOT EXISTS idx_recall_history_subdivision ON subdivision_recall_history(subdivision_id)",
];

/// Run database migrations
async fn run_migrations(pool: &DbPool) -> Result<(), DatabaseError> {
    info!("Running database migrations...");

    for (table, ddl) in SCHEMA {
        sqlx::query(ddl).execute(pool).await.map_err(|e| {
            DatabaseError::MigrationError(format!("Failed to create {} table: {}", table, e))
        })?;
    }

    for ddl in INDEXES {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .map_err(|e| DatabaseError::MigrationError(format!("Failed to create index: {}", e)))?;
    }

    info!("✓ Database migrations completed successfully");

    Ok(())
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "sqlite://data/landbook.db")
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Enable query logging
    pub log_queries: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/landbook.db".to_string(),
            max_connections: 5,
            log_queries: cfg!(debug_assertions),
        }
    }
}

impl DatabaseConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://data/landbook.db".to_string());

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(5);

        let log_queries = std::env::var("DATABASE_LOG_QUERIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(cfg!(debug_assertions));

        Self {
            url,
            max_connections,
            log_queries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_init() {
        let pool = init_database("sqlite::memory:").await;
        assert!(pool.is_ok());
    }

    #[tokio::test]
    async fn test_migrations() {
        let pool = init_database("sqlite::memory:").await.unwrap();

        let result: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN \
             ('properties', 'subdivisions', 'buyers', 'payments', 'documents', 'receipts', \
              'receipt_emails', 'subdivision_recall_history', 'system_settings')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        assert_eq!(result.0, 9);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        assert!(run_migrations(&pool).await.is_ok());
    }

    #[test]
    fn test_database_config_default() {
        let config = DatabaseConfig::default();
        assert_eq!(config.url, "sqlite://data/landbook.db");
        assert_eq!(config.max_connections, 5);
    }
}
