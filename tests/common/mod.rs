#![allow(dead_code)]

use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;

use landbook::application::state::AppState;
use landbook::auth::ApiKeys;
use landbook::config::AppConfig;
use landbook::domain::services::calendar::FixedCalendar;
use landbook::infrastructure::local_blob_store::LocalBlobStore;
use landbook::persistence::init_database;

pub const USER: &str = "user-1";
pub const API_KEY: &str = "test-key-0123456789abcdef0123456789abcdef";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub struct TestApp {
    pub state: AppState,
    pub blobs: Arc<LocalBlobStore>,
    pub storage_root: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.storage_root);
    }
}

/// In-memory database, scratch storage directory, calendar pinned to `today`.
pub async fn test_app(today: NaiveDate) -> TestApp {
    let pool = init_database("sqlite::memory:").await.unwrap();
    let storage_root = std::env::temp_dir().join(format!("landbook-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&storage_root).unwrap();

    let config = AppConfig {
        storage_root: storage_root.clone(),
        ..AppConfig::default()
    };
    let blobs = Arc::new(LocalBlobStore::new(
        storage_root.clone(),
        config.public_base_url.clone(),
        config.storage_signing_key.clone(),
    ));
    let api_keys = ApiKeys::parse(&format!("{}:{}", USER, API_KEY)).unwrap();

    let state = AppState::new(
        pool,
        config,
        blobs.clone(),
        Arc::new(FixedCalendar::new(today)),
        api_keys,
    );

    TestApp {
        state,
        blobs,
        storage_root,
    }
}
