//! Recording payments against lots and properties.
//!
//! Lot payments on a mortgage plan are split into interest and principal at
//! insert time; every other payment is principal only. The split is never
//! recomputed afterwards.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::optional_text;
use super::receipts::{is_plausible_email, ReceiptService};
use crate::application::errors::{ServiceError, ServiceResult};
use crate::domain::entities::lot::{LotStatus, PaymentPlan};
use crate::domain::entities::property::PropertyStatus;
use crate::domain::services::calendar::Calendar;
use crate::domain::services::interest::{self, AllocationRequest, InterestQuote, PaymentAllocation};
use crate::domain::services::ledger::LedgerSummary;
use crate::domain::value_objects::daily_rate::DailyRate;
use crate::domain::value_objects::money::Money;
use crate::persistence::ledger_repository::PaymentRepository;
use crate::persistence::models::*;
use crate::persistence::repository::{PropertyRepository, SubdivisionRepository};
use crate::persistence::settings_repository::SettingsRepository;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentInput {
    /// Rounded to whole cents before it is stored
    pub amount: f64,
    /// Defaults to today
    pub payment_date: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Create the receipt right away and log a send to this address
    pub send_receipt_to: Option<String>,
}

impl PaymentInput {
    /// Amount and receipt address, checked before anything is written.
    /// The amount is rounded to whole cents.
    fn validate(&self) -> ServiceResult<(Money, Option<String>)> {
        let amount = Money::positive(self.amount)?;
        let address = optional_text(self.send_receipt_to.as_deref());
        if let Some(address) = &address {
            if !is_plausible_email(address) {
                return Err(ServiceError::InvalidInput(format!(
                    "not an email address: {}",
                    address
                )));
            }
        }
        Ok((amount, address))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordedPayment {
    pub payment: PaymentRecord,
    pub allocation: PaymentAllocation,
    pub remaining_balance: f64,
    pub paid_in_full: bool,
    pub receipt: Option<ReceiptRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentLedger {
    pub payments: Vec<PaymentRecord>,
    pub summary: LedgerSummary,
}

/// Defaults applied when a lot carries no interest terms of its own.
#[derive(Debug, Clone, Copy)]
pub struct InterestDefaults {
    pub daily_rate: DailyRate,
    pub grace_period_days: i64,
}

#[derive(Clone)]
pub struct PaymentService {
    properties: PropertyRepository,
    subdivisions: SubdivisionRepository,
    payments: PaymentRepository,
    settings: SettingsRepository,
    receipts: ReceiptService,
    calendar: Arc<dyn Calendar>,
    defaults: InterestDefaults,
}

impl PaymentService {
    pub fn new(
        properties: PropertyRepository,
        subdivisions: SubdivisionRepository,
        payments: PaymentRepository,
        settings: SettingsRepository,
        receipts: ReceiptService,
        calendar: Arc<dyn Calendar>,
        defaults: InterestDefaults,
    ) -> Self {
        Self {
            properties,
            subdivisions,
            payments,
            settings,
            receipts,
            calendar,
            defaults,
        }
    }

    /// Lot override, else the user's global rate, else the configured default.
    pub async fn resolve_rate(&self, user_id: &str, lot_rate: Option<f64>) -> ServiceResult<DailyRate> {
        let global = match lot_rate {
            Some(_) => None,
            None => self.settings.global_daily_rate(user_id).await?,
        };
        Ok(DailyRate::resolve(lot_rate, global, self.defaults.daily_rate))
    }

    async fn lot(&self, user_id: &str, id: &str) -> ServiceResult<SubdivisionRecord> {
        self.subdivisions
            .get(user_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("subdivision", id))
    }

    async fn property(&self, user_id: &str, id: &str) -> ServiceResult<PropertyRecord> {
        self.properties
            .get(user_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("property", id))
    }

    /// Record a payment against a lot
    pub async fn record_lot_payment(
        &self,
        user_id: &str,
        subdivision_id: &str,
        input: PaymentInput,
    ) -> ServiceResult<RecordedPayment> {
        let (amount, receipt_to) = input.validate()?;
        let lot = self.lot(user_id, subdivision_id).await?;
        let payment_date = input.payment_date.unwrap_or_else(|| self.calendar.today());

        let history = self.payments.list_for_subdivision(user_id, subdivision_id).await?;
        let before = LedgerSummary::from_entries(lot.sale_price, &history);

        let allocation = if lot.payment_plan_type == Some(PaymentPlan::Mortgage) {
            let daily_rate = self.resolve_rate(user_id, lot.daily_interest_rate).await?;
            interest::allocate(&AllocationRequest {
                remaining_balance: before.remaining_balance,
                daily_rate,
                grace_period_days: lot
                    .interest_grace_period_days
                    .unwrap_or(self.defaults.grace_period_days),
                last_payment_date: lot.last_payment_date,
                amount,
                payment_date,
            })
        } else {
            PaymentAllocation::principal_only(amount)
        };

        let payment = self
            .payments
            .create(
                user_id,
                &NewPayment::from_allocation(
                    PaymentTarget::Subdivision(lot.id.clone()),
                    lot.buyer_id.clone(),
                    payment_date,
                    optional_text(input.notes.as_deref()),
                    &allocation,
                ),
            )
            .await?;

        self.subdivisions
            .record_payment(user_id, &lot.id, payment_date, allocation.interest)
            .await?;

        let history = self.payments.list_for_subdivision(user_id, subdivision_id).await?;
        let after = LedgerSummary::from_entries(lot.sale_price, &history);
        let paid_in_full = lot.status.has_open_sale() && after.is_paid_in_full();
        if paid_in_full {
            self.subdivisions
                .set_status(user_id, &lot.id, LotStatus::PaidInFull)
                .await?;
            info!("Subdivision {} paid in full", lot.id);
        }

        info!(
            "Payment {} on subdivision {}: amount={} interest={} principal={}",
            payment.id, lot.id, allocation.amount, allocation.interest, allocation.principal
        );

        let receipt = self.send_receipt_if_requested(user_id, &payment, receipt_to).await;

        Ok(RecordedPayment {
            payment,
            allocation,
            remaining_balance: after.remaining_balance,
            paid_in_full,
            receipt,
        })
    }

    /// Record a payment against a whole property. Property payments carry no interest.
    pub async fn record_property_payment(
        &self,
        user_id: &str,
        property_id: &str,
        input: PaymentInput,
    ) -> ServiceResult<RecordedPayment> {
        let (amount, receipt_to) = input.validate()?;
        let property = self.property(user_id, property_id).await?;
        let payment_date = input.payment_date.unwrap_or_else(|| self.calendar.today());
        let allocation = PaymentAllocation::principal_only(amount);

        let payment = self
            .payments
            .create(
                user_id,
                &NewPayment::from_allocation(
                    PaymentTarget::Property(property.id.clone()),
                    property.buyer_id.clone(),
                    payment_date,
                    optional_text(input.notes.as_deref()),
                    &allocation,
                ),
            )
            .await?;

        let history = self.payments.list_for_property(user_id, property_id).await?;
        let summary = LedgerSummary::from_entries(property.sale_price, &history);

        let paid_in_full = property.status == PropertyStatus::Pending && summary.is_paid_in_full();
        if paid_in_full {
            self.properties
                .set_status(user_id, property_id, PropertyStatus::Sold)
                .await?;
            info!("Property {} sold, payments cover the price", property_id);
        }

        let receipt = self.send_receipt_if_requested(user_id, &payment, receipt_to).await;

        Ok(RecordedPayment {
            payment,
            allocation,
            remaining_balance: summary.remaining_balance,
            paid_in_full,
            receipt,
        })
    }

    /// The payment is already committed here, so a failure is logged and the
    /// receipt can be created again from the payment later.
    async fn send_receipt_if_requested(
        &self,
        user_id: &str,
        payment: &PaymentRecord,
        send_to: Option<String>,
    ) -> Option<ReceiptRecord> {
        let address = send_to?;
        let result = async {
            let receipt = self.receipts.ensure_receipt(user_id, payment).await?;
            self.receipts.send(user_id, &receipt.id, &address).await?;
            Ok::<_, ServiceError>(receipt)
        }
        .await;

        match result {
            Ok(receipt) => Some(receipt),
            Err(e) => {
                error!("Receipt for payment {} not sent: {}", payment.id, e);
                None
            }
        }
    }

    pub async fn lot_ledger(&self, user_id: &str, subdivision_id: &str) -> ServiceResult<PaymentLedger> {
        let lot = self.lot(user_id, subdivision_id).await?;
        let payments = self.payments.list_for_subdivision(user_id, subdivision_id).await?;
        let summary = LedgerSummary::from_entries(lot.sale_price, &payments);
        Ok(PaymentLedger { payments, summary })
    }

    pub async fn property_ledger(&self, user_id: &str, property_id: &str) -> ServiceResult<PaymentLedger> {
        let property = self.property(user_id, property_id).await?;
        let payments = self.payments.list_for_property(user_id, property_id).await?;
        let summary = LedgerSummary::from_entries(property.sale_price, &payments);
        Ok(PaymentLedger { payments, summary })
    }

    /// Delete one payment. Lot status and interest anchor are left as they are.
    pub async fn delete_payment(&self, user_id: &str, id: &str) -> ServiceResult<()> {
        if !self.payments.delete(user_id, id).await? {
            return Err(ServiceError::not_found("payment", id));
        }
        warn!("Payment {} deleted; lot totals recompute from remaining payments", id);
        Ok(())
    }

    /// What the lot would owe on `as_of` (default today) without recording anything
    pub async fn interest_quote(
        &self,
        user_id: &str,
        subdivision_id: &str,
        as_of: Option<NaiveDate>,
    ) -> ServiceResult<InterestQuote> {
        let lot = self.lot(user_id, subdivision_id).await?;
        let payments = self.payments.list_for_subdivision(user_id, subdivision_id).await?;
        let summary = LedgerSummary::from_entries(lot.sale_price, &payments);
        let daily_rate = self.resolve_rate(user_id, lot.daily_interest_rate).await?;
        let today = self.calendar.today();

        Ok(interest::quote(
            summary.remaining_balance,
            daily_rate,
            lot.interest_grace_period_days
                .unwrap_or(self.defaults.grace_period_days),
            lot.last_payment_date,
            today,
            as_of.unwrap_or(today),
        ))
    }
}
