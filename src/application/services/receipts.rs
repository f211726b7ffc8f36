//! Receipts: one per payment, rendered with the running balance at the time of payment.

use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::errors::{ServiceError, ServiceResult};
use crate::domain::services::calendar::Calendar;
use crate::domain::services::ledger::paid_before;
use crate::domain::services::receipt_number::receipt_number;
use crate::domain::value_objects::money::round_cents;
use crate::persistence::ledger_repository::{PaymentRepository, ReceiptRepository};
use crate::persistence::models::*;
use crate::persistence::repository::{BuyerRepository, PropertyRepository, SubdivisionRepository};

/// Everything printed on a receipt
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptView {
    pub receipt: ReceiptRecord,
    pub payment: PaymentRecord,
    pub property_title: Option<String>,
    pub subdivision_title: Option<String>,
    pub buyer: Option<BuyerRecord>,
    pub sale_price: f64,
    /// Sum of the owner's payments made before this one
    pub paid_before: f64,
    pub balance_after: f64,
}

#[derive(Clone)]
pub struct ReceiptService {
    properties: PropertyRepository,
    subdivisions: SubdivisionRepository,
    buyers: BuyerRepository,
    payments: PaymentRepository,
    receipts: ReceiptRepository,
    calendar: Arc<dyn Calendar>,
}

impl ReceiptService {
    pub fn new(
        properties: PropertyRepository,
        subdivisions: SubdivisionRepository,
        buyers: BuyerRepository,
        payments: PaymentRepository,
        receipts: ReceiptRepository,
        calendar: Arc<dyn Calendar>,
    ) -> Self {
        Self {
            properties,
            subdivisions,
            buyers,
            payments,
            receipts,
            calendar,
        }
    }

    /// The payment's receipt, created with a fresh number on first request
    pub async fn ensure_receipt(&self, user_id: &str, payment: &PaymentRecord) -> ServiceResult<ReceiptRecord> {
        if let Some(existing) = self.receipts.get_by_payment(user_id, &payment.id).await? {
            return Ok(existing);
        }

        let number = {
            let millis = self.calendar.now().timestamp_millis().max(0) as u64;
            receipt_number(millis, &mut rand::thread_rng())
        };

        match self.receipts.create(user_id, &payment.id, &number).await {
            Ok(receipt) => {
                info!("Receipt {} generated for payment {}", receipt.receipt_number, payment.id);
                Ok(receipt)
            }
            // A concurrent request may have created it first.
            Err(e) => match self.receipts.get_by_payment(user_id, &payment.id).await? {
                Some(existing) => Ok(existing),
                None => Err(e.into()),
            },
        }
    }

    /// Fetch-or-create the receipt of a payment and assemble its view
    pub async fn receipt_for_payment(&self, user_id: &str, payment_id: &str) -> ServiceResult<ReceiptView> {
        let payment = self
            .payments
            .get(user_id, payment_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("payment", payment_id))?;
        let receipt = self.ensure_receipt(user_id, &payment).await?;
        self.view(user_id, receipt, payment).await
    }

    async fn receipt(&self, user_id: &str, receipt_id: &str) -> ServiceResult<ReceiptRecord> {
        self.receipts
            .get(user_id, receipt_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("receipt", receipt_id))
    }

    async fn view(
        &self,
        user_id: &str,
        receipt: ReceiptRecord,
        payment: PaymentRecord,
    ) -> ServiceResult<ReceiptView> {
        let (property_title, subdivision_title, sale_price, owner_buyer, siblings) =
            if let Some(lot_id) = &payment.subdivision_id {
                let lot = self.subdivisions.get(user_id, lot_id).await?;
                let property_title = match &lot {
                    Some(lot) => self
                        .properties
                        .get(user_id, &lot.property_id)
                        .await?
                        .map(|p| p.title),
                    None => None,
                };
                let siblings = self.payments.list_for_subdivision(user_id, lot_id).await?;
                (
                    property_title,
                    lot.as_ref().map(|l| l.title.clone()),
                    lot.as_ref().map(|l| l.sale_price).unwrap_or(0.0),
                    lot.and_then(|l| l.buyer_id),
                    siblings,
                )
            } else if let Some(property_id) = &payment.property_id {
                let property = self.properties.get(user_id, property_id).await?;
                let siblings = self.payments.list_for_property(user_id, property_id).await?;
                (
                    property.as_ref().map(|p| p.title.clone()),
                    None,
                    property.as_ref().map(|p| p.sale_price).unwrap_or(0.0),
                    property.and_then(|p| p.buyer_id),
                    siblings,
                )
            } else {
                (None, None, 0.0, None, Vec::new())
            };

        let paid_before = match siblings.iter().position(|p| p.id == payment.id) {
            Some(index) => paid_before(&siblings, index),
            None => {
                warn!("Payment {} missing from its owner's ledger", payment.id);
                0.0
            }
        };

        let buyer = match payment.buyer_id.as_ref().or(owner_buyer.as_ref()) {
            Some(buyer_id) => self.buyers.get(user_id, buyer_id).await?,
            None => None,
        };

        Ok(ReceiptView {
            balance_after: round_cents(sale_price - (paid_before + payment.amount)),
            receipt,
            payment,
            property_title,
            subdivision_title,
            buyer,
            sale_price,
            paid_before,
        })
    }

    /// Plain-text rendering for printing
    pub async fn print(&self, user_id: &str, receipt_id: &str) -> ServiceResult<String> {
        let receipt = self.receipt(user_id, receipt_id).await?;
        let payment = self
            .payments
            .get(user_id, &receipt.payment_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("payment", receipt.payment_id.clone()))?;
        let view = self.view(user_id, receipt, payment).await?;
        Ok(render_text(&view))
    }

    /// Log a receipt send. Nothing is delivered.
    pub async fn send(&self, user_id: &str, receipt_id: &str, email: &str) -> ServiceResult<ReceiptEmailRecord> {
        let email = email.trim();
        if !is_plausible_email(email) {
            return Err(ServiceError::InvalidInput(format!("not an email address: {}", email)));
        }
        self.receipt(user_id, receipt_id).await?;
        let record = self.receipts.record_email(user_id, receipt_id, email).await?;
        info!("Receipt {} queued to {}", receipt_id, email);
        Ok(record)
    }

    pub async fn email_history(&self, user_id: &str, receipt_id: &str) -> ServiceResult<Vec<ReceiptEmailRecord>> {
        self.receipt(user_id, receipt_id).await?;
        Ok(self.receipts.list_emails(user_id, receipt_id).await?)
    }
}

pub(crate) fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

pub fn render_text(view: &ReceiptView) -> String {
    let mut out = String::new();
    let rule = "-".repeat(40);

    let _ = writeln!(out, "PAYMENT RECEIPT");
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Receipt No:   {}", view.receipt.receipt_number);
    let _ = writeln!(out, "Issued:       {}", view.receipt.generated_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out, "Payment date: {}", view.payment.payment_date);
    if let Some(title) = &view.property_title {
        let _ = writeln!(out, "Property:     {}", title);
    }
    if let Some(title) = &view.subdivision_title {
        let _ = writeln!(out, "Lot:          {}", title);
    }
    if let Some(buyer) = &view.buyer {
        let _ = writeln!(out, "Received from: {}", buyer.name);
    }
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Amount paid:  ${:.2}", view.payment.amount);
    if let (Some(interest), Some(principal)) = (view.payment.interest_amount, view.payment.principal_amount) {
        let _ = writeln!(out, "  Interest:   ${:.2}", interest);
        let _ = writeln!(out, "  Principal:  ${:.2}", principal);
    }
    let _ = writeln!(out, "Sale price:   ${:.2}", view.sale_price);
    let _ = writeln!(out, "Paid before:  ${:.2}", view.paid_before);
    let _ = writeln!(out, "Balance:      ${:.2}", view.balance_after);
    if let Some(notes) = &view.payment.notes {
        let _ = writeln!(out, "Notes:        {}", notes);
    }
    out
}
