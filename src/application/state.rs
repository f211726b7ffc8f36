use std::sync::Arc;

use crate::application::services::catalog::CatalogService;
use crate::application::services::documents::DocumentService;
use crate::application::services::payments::{InterestDefaults, PaymentService};
use crate::application::services::recall::RecallService;
use crate::application::services::receipts::ReceiptService;
use crate::application::services::sales::SalesService;
use crate::auth::ApiKeys;
use crate::config::AppConfig;
use crate::domain::repositories::blob_store::BlobStore;
use crate::domain::services::calendar::Calendar;
use crate::persistence::document_repository::DocumentRepository;
use crate::persistence::ledger_repository::{PaymentRepository, ReceiptRepository};
use crate::persistence::recall_repository::RecallHistoryRepository;
use crate::persistence::repository::*;
use crate::persistence::settings_repository::SettingsRepository;
use crate::persistence::DbPool;
use crate::rate_limit::{create_rate_limiter, RateLimiterConfig, UserRateLimiter};

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub sales: SalesService,
    pub payments: PaymentService,
    pub receipts: ReceiptService,
    pub recall: RecallService,
    pub documents: DocumentService,
    pub api_keys: ApiKeys,
    pub rate_limiter: UserRateLimiter,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        pool: DbPool,
        config: AppConfig,
        blobs: Arc<dyn BlobStore>,
        calendar: Arc<dyn Calendar>,
        api_keys: ApiKeys,
    ) -> Self {
        let properties = PropertyRepository::new(pool.clone());
        let subdivisions = SubdivisionRepository::new(pool.clone());
        let buyers = BuyerRepository::new(pool.clone());
        let payments = PaymentRepository::new(pool.clone());
        let receipts = ReceiptRepository::new(pool.clone());
        let documents = DocumentRepository::new(pool.clone());
        let settings = SettingsRepository::new(pool.clone());

        let receipt_service = ReceiptService::new(
            properties.clone(),
            subdivisions.clone(),
            buyers.clone(),
            payments.clone(),
            receipts.clone(),
            calendar.clone(),
        );

        let catalog = CatalogService::new(
            properties.clone(),
            subdivisions.clone(),
            buyers.clone(),
            DashboardRepository::new(pool.clone()),
            settings.clone(),
            config.default_daily_interest_rate,
        );

        let sales = SalesService::new(
            properties.clone(),
            subdivisions.clone(),
            buyers.clone(),
            payments.clone(),
            calendar.clone(),
            config.default_hold_days,
        );

        let payment_service = PaymentService::new(
            properties.clone(),
            subdivisions.clone(),
            payments.clone(),
            settings,
            receipt_service.clone(),
            calendar.clone(),
            InterestDefaults {
                daily_rate: config.default_daily_interest_rate,
                grace_period_days: config.default_grace_period_days,
            },
        );

        let recall = RecallService::new(
            subdivisions.clone(),
            buyers,
            payments.clone(),
            receipts,
            documents.clone(),
            RecallHistoryRepository::new(pool),
            blobs.clone(),
        );

        let document_service = DocumentService::new(
            documents,
            properties,
            subdivisions,
            payments,
            blobs,
            calendar,
            config.signed_url_ttl,
        );

        let rate_limiter = create_rate_limiter(RateLimiterConfig {
            requests_per_minute: config.rate_limit_per_minute,
        });

        Self {
            catalog,
            sales,
            payments: payment_service,
            receipts: receipt_service,
            recall,
            documents: document_service,
            api_keys,
            rate_limiter,
            config: Arc::new(config),
        }
    }
}
