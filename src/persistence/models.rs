//! Database models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::domain::entities::lot::{LotStatus, PaymentPlan, PaymentType};
use crate::domain::entities::property::PropertyStatus;
use crate::domain::services::interest::PaymentAllocation;
use crate::domain::services::ledger::LedgerEntry;

/// Property record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: PropertyStatus,
    pub sale_price: f64,
    pub buyer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Property with figures aggregated over its lots
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PropertySummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub property: PropertyRecord,
    pub subdivision_count: i64,
    pub total_value: f64,
}

/// Subdivision (lot) record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SubdivisionRecord {
    pub id: String,
    pub property_id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: LotStatus,
    pub sale_price: f64,
    pub buyer_id: Option<String>,
    pub lot_number: Option<String>,
    pub surveyor_plan_number: Option<String>,
    pub registration_number: Option<String>,
    pub mutation_number: Option<String>,
    pub acres: Option<f64>,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub owner_first_name: Option<String>,
    pub owner_middle_name: Option<String>,
    pub owner_last_name: Option<String>,
    pub title_nes_number: Option<String>,
    pub submission_date: Option<NaiveDate>,
    pub hold_until_date: Option<NaiveDate>,
    pub hold_amount: Option<f64>,
    pub payment_type: PaymentType,
    pub payment_plan_type: Option<PaymentPlan>,
    pub daily_interest_rate: Option<f64>,
    pub interest_grace_period_days: Option<i64>,
    pub last_payment_date: Option<NaiveDate>,
    pub total_interest_charged: Option<f64>,
    pub recall_date: Option<NaiveDate>,
    pub recall_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lot with its payment figures, as listed under a property
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubdivisionSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub subdivision: SubdivisionRecord,
    pub payment_count: i64,
    pub principal_paid: f64,
}

/// Lot search hit, carrying the title of the property it belongs to
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SearchResultRecord {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub subdivision: SubdivisionRecord,
    pub property_title: String,
}

/// Fields a caller may set when creating or editing a lot
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LotDetails {
    pub title: Option<String>,
    pub description: Option<String>,
    pub sale_price: Option<f64>,
    pub lot_number: Option<String>,
    pub surveyor_plan_number: Option<String>,
    pub registration_number: Option<String>,
    pub mutation_number: Option<String>,
    pub acres: Option<f64>,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub owner_first_name: Option<String>,
    pub owner_middle_name: Option<String>,
    pub owner_last_name: Option<String>,
    pub title_nes_number: Option<String>,
    pub submission_date: Option<NaiveDate>,
}

/// Lot columns written by a sale
#[derive(Debug, Clone)]
pub struct LotSaleUpdate {
    pub buyer_id: String,
    pub sale_price: f64,
    pub status: LotStatus,
    pub payment_type: PaymentType,
    pub payment_plan_type: PaymentPlan,
    pub daily_interest_rate: Option<f64>,
    pub interest_grace_period_days: Option<i64>,
    pub hold_amount: Option<f64>,
    pub hold_until_date: Option<NaiveDate>,
}

/// Lot search filters; text filters match case-insensitive substrings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubdivisionSearch {
    pub sale_price: Option<f64>,
    pub acres: Option<f64>,
    pub submission_date: Option<NaiveDate>,
    pub lot_number: Option<String>,
    pub surveyor_plan_number: Option<String>,
    pub registration_number: Option<String>,
    pub mutation_number: Option<String>,
    pub owner_first_name: Option<String>,
    pub owner_middle_name: Option<String>,
    pub owner_last_name: Option<String>,
    pub title_nes_number: Option<String>,
}

impl SubdivisionSearch {
    /// Non-blank text filters paired with the column they apply to.
    pub fn text_filters(&self) -> Vec<(&'static str, &str)> {
        [
            ("lot_number", &self.lot_number),
            ("surveyor_plan_number", &self.surveyor_plan_number),
            ("registration_number", &self.registration_number),
            ("mutation_number", &self.mutation_number),
            ("owner_first_name", &self.owner_first_name),
            ("owner_middle_name", &self.owner_middle_name),
            ("owner_last_name", &self.owner_last_name),
            ("title_nes_number", &self.title_nes_number),
        ]
        .into_iter()
        .filter_map(|(column, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (column, v))
        })
        .collect()
    }
}

/// Buyer record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BuyerRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Buyer contact details
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuyerDetails {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Payment record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub user_id: String,
    pub property_id: Option<String>,
    pub subdivision_id: Option<String>,
    pub buyer_id: Option<String>,
    pub amount: f64,
    pub payment_date: NaiveDate,
    pub notes: Option<String>,
    pub interest_amount: Option<f64>,
    pub principal_amount: Option<f64>,
    pub days_since_last_payment: Option<i64>,
    pub interest_calculation_date: Option<NaiveDate>,
    pub interest_rate_used: Option<f64>,
    pub grace_period_days: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry for PaymentRecord {
    fn amount(&self) -> f64 {
        self.amount
    }

    fn principal_amount(&self) -> Option<f64> {
        self.principal_amount
    }

    fn interest_amount(&self) -> Option<f64> {
        self.interest_amount
    }
}

/// Where a payment is booked
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentTarget {
    Property(String),
    Subdivision(String),
}

/// New payment row
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub target: PaymentTarget,
    pub buyer_id: Option<String>,
    pub amount: f64,
    pub payment_date: NaiveDate,
    pub notes: Option<String>,
    pub principal_amount: Option<f64>,
    pub interest_amount: Option<f64>,
    pub days_since_last_payment: Option<i64>,
    pub interest_calculation_date: Option<NaiveDate>,
    pub interest_rate_used: Option<f64>,
    pub grace_period_days: Option<i64>,
}

impl NewPayment {
    /// Row for an allocated payment. Interest columns are only written when
    /// the allocation actually charged interest at some rate.
    pub fn from_allocation(
        target: PaymentTarget,
        buyer_id: Option<String>,
        payment_date: NaiveDate,
        notes: Option<String>,
        allocation: &PaymentAllocation,
    ) -> Self {
        let charged = allocation.rate_used.is_some();
        NewPayment {
            target,
            buyer_id,
            amount: allocation.amount,
            payment_date,
            notes,
            principal_amount: Some(allocation.principal),
            interest_amount: charged.then_some(allocation.interest),
            days_since_last_payment: allocation.days_since_last_payment,
            interest_calculation_date: charged.then_some(payment_date),
            interest_rate_used: allocation.rate_used,
            grace_period_days: allocation.grace_period_days,
        }
    }

    /// Leave principal unset so the ledger credits the whole amount.
    pub fn without_split(mut self) -> Self {
        self.principal_amount = None;
        self.interest_amount = None;
        self
    }
}

/// Receipt record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReceiptRecord {
    pub id: String,
    pub user_id: String,
    pub payment_id: String,
    pub receipt_number: String,
    pub generated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Simulated receipt delivery
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReceiptEmailRecord {
    pub id: String,
    pub user_id: String,
    pub receipt_id: String,
    pub email_address: String,
    pub sent_at: DateTime<Utc>,
}

/// Document record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub user_id: String,
    pub property_id: Option<String>,
    pub subdivision_id: Option<String>,
    pub payment_id: Option<String>,
    pub name: String,
    pub file_path: String,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored object backing a document
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub name: String,
    pub file_path: String,
    pub file_size: i64,
    pub file_type: Option<String>,
}

/// Snapshot written before a recall clears a lot
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RecallHistoryRecord {
    pub id: String,
    pub subdivision_id: String,
    pub user_id: String,
    pub buyer_id: Option<String>,
    pub recall_reason: String,
    pub sale_price: Option<f64>,
    pub total_paid: f64,
    pub hold_amount: Option<f64>,
    pub hold_until_date: Option<NaiveDate>,
    pub payment_plan_type: Option<PaymentPlan>,
    pub buyer_name: Option<String>,
    pub buyer_email: Option<String>,
    pub buyer_phone: Option<String>,
    pub recalled_at: DateTime<Utc>,
}

/// Dashboard figures
#[derive(Debug, Clone, Copy, PartialEq, FromRow, Serialize)]
pub struct DashboardStats {
    pub property_count: i64,
    pub document_count: i64,
    pub buyer_count: i64,
    pub portfolio_value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_text_filters_skip_blank_values() {
        let search = SubdivisionSearch {
            lot_number: Some(" 12 ".to_string()),
            owner_last_name: Some("   ".to_string()),
            title_nes_number: Some("NES".to_string()),
            ..SubdivisionSearch::default()
        };
        assert_eq!(
            search.text_filters(),
            vec![("lot_number", "12"), ("title_nes_number", "NES")]
        );
    }
}
