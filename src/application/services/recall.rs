//! Recall: take a lot back from its buyer.
//!
//! The steps run in a fixed order without a transaction. A failing step is
//! logged and recorded in the report, and the cascade carries on; only the
//! final reset of the lot can fail the recall.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::required_text;
use crate::application::errors::{ServiceError, ServiceResult};
use crate::domain::repositories::blob_store::BlobStore;
use crate::domain::services::ledger::LedgerSummary;
use crate::persistence::document_repository::DocumentRepository;
use crate::persistence::ledger_repository::{PaymentRepository, ReceiptRepository};
use crate::persistence::models::*;
use crate::persistence::recall_repository::RecallHistoryRepository;
use crate::persistence::repository::{BuyerRepository, SubdivisionRepository};
use crate::persistence::DatabaseError;

#[derive(Debug, Clone, Serialize)]
pub struct RecallReport {
    pub subdivision: SubdivisionRecord,
    pub history: Option<RecallHistoryRecord>,
    pub payments_removed: u64,
    pub receipts_removed: u64,
    pub receipt_emails_removed: u64,
    pub documents_removed: u64,
    /// Steps that failed and were skipped
    pub failed_steps: Vec<&'static str>,
}

/// Keep going after a failed step, remembering that it failed.
fn soft<T>(step: &'static str, result: Result<T, DatabaseError>, failed: &mut Vec<&'static str>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            error!("Recall step '{}' failed: {}", step, e);
            failed.push(step);
            None
        }
    }
}

#[derive(Clone)]
pub struct RecallService {
    subdivisions: SubdivisionRepository,
    buyers: BuyerRepository,
    payments: PaymentRepository,
    receipts: ReceiptRepository,
    documents: DocumentRepository,
    history: RecallHistoryRepository,
    blobs: Arc<dyn BlobStore>,
}

impl RecallService {
    pub fn new(
        subdivisions: SubdivisionRepository,
        buyers: BuyerRepository,
        payments: PaymentRepository,
        receipts: ReceiptRepository,
        documents: DocumentRepository,
        history: RecallHistoryRepository,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            subdivisions,
            buyers,
            payments,
            receipts,
            documents,
            history,
            blobs,
        }
    }

    pub async fn recall(&self, user_id: &str, subdivision_id: &str, reason: Option<&str>) -> ServiceResult<RecallReport> {
        let reason = required_text(reason, "reason")?;
        let lot = self
            .subdivisions
            .get(user_id, subdivision_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("subdivision", subdivision_id))?;

        info!("Recalling subdivision {}: {}", subdivision_id, reason);
        let mut failed = Vec::new();

        let payments = soft(
            "collect payments",
            self.payments.list_for_subdivision(user_id, subdivision_id).await,
            &mut failed,
        )
        .unwrap_or_default();
        let payment_ids: Vec<String> = payments.iter().map(|p| p.id.clone()).collect();

        let receipt_ids = soft(
            "collect receipts",
            self.receipts.ids_for_payments(&payment_ids).await,
            &mut failed,
        )
        .unwrap_or_default();

        let documents = soft(
            "collect documents",
            self.documents
                .list_for_subdivision_and_payments(user_id, subdivision_id, &payment_ids)
                .await,
            &mut failed,
        )
        .unwrap_or_default();

        let buyer = match &lot.buyer_id {
            Some(buyer_id) => soft("load buyer", self.buyers.get(user_id, buyer_id).await, &mut failed).flatten(),
            None => None,
        };

        let snapshot = RecallHistoryRecord {
            id: String::new(),
            subdivision_id: lot.id.clone(),
            user_id: user_id.to_string(),
            buyer_id: lot.buyer_id.clone(),
            recall_reason: reason.clone(),
            sale_price: (lot.sale_price > 0.0).then_some(lot.sale_price),
            total_paid: LedgerSummary::from_entries(lot.sale_price, &payments).total_paid,
            hold_amount: lot.hold_amount,
            hold_until_date: lot.hold_until_date,
            payment_plan_type: lot.payment_plan_type,
            buyer_name: buyer.as_ref().map(|b| b.name.clone()),
            buyer_email: buyer.as_ref().and_then(|b| b.email.clone()),
            buyer_phone: buyer.as_ref().and_then(|b| b.phone.clone()),
            recalled_at: Utc::now(),
        };
        let history = soft("write history", self.history.create(&snapshot).await, &mut failed);

        let receipt_emails_removed = soft(
            "delete receipt emails",
            self.receipts.delete_emails_for_receipts(&receipt_ids).await,
            &mut failed,
        )
        .unwrap_or(0);

        let receipts_removed = soft(
            "delete receipts",
            self.receipts.delete_by_ids(&receipt_ids).await,
            &mut failed,
        )
        .unwrap_or(0);

        let document_ids: Vec<String> = documents.iter().map(|d| d.id.clone()).collect();
        let documents_removed = soft(
            "delete documents",
            self.documents.delete_by_ids(&document_ids).await,
            &mut failed,
        )
        .unwrap_or(0);

        let paths: Vec<String> = documents.into_iter().map(|d| d.file_path).collect();
        if !paths.is_empty() {
            if let Err(e) = self.blobs.remove(&paths).await {
                warn!("Recall of {} left {} stored files behind: {}", subdivision_id, paths.len(), e);
                failed.push("remove stored files");
            }
        }

        let payments_removed = soft(
            "delete payments",
            self.payments.delete_by_ids(&payment_ids).await,
            &mut failed,
        )
        .unwrap_or(0);

        let subdivision = self
            .subdivisions
            .reset_after_recall(user_id, subdivision_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("subdivision", subdivision_id))?;

        if failed.is_empty() {
            info!(
                "Subdivision {} recalled: {} payments, {} receipts, {} documents removed",
                subdivision_id, payments_removed, receipts_removed, documents_removed
            );
        } else {
            warn!("Subdivision {} recalled with failed steps: {:?}", subdivision_id, failed);
        }

        Ok(RecallReport {
            subdivision,
            history,
            payments_removed,
            receipts_removed,
            receipt_emails_removed,
            documents_removed,
            failed_steps: failed,
        })
    }

    /// Past recalls of a lot, newest first
    pub async fn history(&self, user_id: &str, subdivision_id: &str) -> ServiceResult<Vec<RecallHistoryRecord>> {
        self.subdivisions
            .get(user_id, subdivision_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("subdivision", subdivision_id))?;
        Ok(self.history.list_for_subdivision(user_id, subdivision_id).await?)
    }
}
