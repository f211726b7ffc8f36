//! Selling lots and properties, and placing holds.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::optional_text;
use crate::application::errors::{ServiceError, ServiceResult};
use crate::domain::entities::lot::PaymentPlan;
use crate::domain::services::calendar::Calendar;
use crate::domain::services::interest::PaymentAllocation;
use crate::domain::services::sale_plan::{hold_deposit_note, plan_sale, SaleTerms};
use crate::domain::value_objects::daily_rate::DailyRate;
use crate::domain::value_objects::money::Money;
use crate::persistence::ledger_repository::PaymentRepository;
use crate::persistence::models::*;
use crate::persistence::repository::{BuyerRepository, PropertyRepository, SubdivisionRepository};

#[derive(Debug, Clone, Deserialize)]
pub struct LotSaleInput {
    pub buyer_id: String,
    pub sale_price: f64,
    pub plan: PaymentPlan,
    pub daily_interest_rate: Option<f64>,
    pub grace_period_days: Option<i64>,
    pub hold_amount: Option<f64>,
    pub hold_until_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HoldInput {
    pub buyer_id: String,
    pub hold_amount: f64,
    /// Defaults to today plus the configured hold length
    pub hold_until_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertySaleInput {
    pub buyer_id: String,
    pub sale_price: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaleOutcome {
    pub subdivision: SubdivisionRecord,
    /// Payment booked as part of the sale (full price or hold deposit)
    pub payment: Option<PaymentRecord>,
}

#[derive(Clone)]
pub struct SalesService {
    properties: PropertyRepository,
    subdivisions: SubdivisionRepository,
    buyers: BuyerRepository,
    payments: PaymentRepository,
    calendar: Arc<dyn Calendar>,
    default_hold_days: i64,
}

impl SalesService {
    pub fn new(
        properties: PropertyRepository,
        subdivisions: SubdivisionRepository,
        buyers: BuyerRepository,
        payments: PaymentRepository,
        calendar: Arc<dyn Calendar>,
        default_hold_days: i64,
    ) -> Self {
        Self {
            properties,
            subdivisions,
            buyers,
            payments,
            calendar,
            default_hold_days,
        }
    }

    async fn require_buyer(&self, user_id: &str, buyer_id: &str) -> ServiceResult<BuyerRecord> {
        self.buyers
            .get(user_id, buyer_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("buyer", buyer_id))
    }

    async fn require_lot(&self, user_id: &str, id: &str) -> ServiceResult<SubdivisionRecord> {
        self.subdivisions
            .get(user_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("subdivision", id))
    }

    /// Book a payment made as part of a sale. It is principal only and does not move the interest anchor.
    async fn book_sale_payment(
        &self,
        user_id: &str,
        lot: &SubdivisionRecord,
        buyer_id: &str,
        amount: Money,
        note: String,
        split: bool,
    ) -> ServiceResult<PaymentRecord> {
        let payment = NewPayment::from_allocation(
            PaymentTarget::Subdivision(lot.id.clone()),
            Some(buyer_id.to_string()),
            self.calendar.today(),
            Some(note),
            &PaymentAllocation::principal_only(amount),
        );
        let payment = if split { payment } else { payment.without_split() };
        Ok(self.payments.create(user_id, &payment).await?)
    }

    /// Sell a lot to a buyer under a payment plan
    pub async fn sell_lot(
        &self,
        user_id: &str,
        subdivision_id: &str,
        input: LotSaleInput,
    ) -> ServiceResult<SaleOutcome> {
        let terms = SaleTerms {
            plan: input.plan,
            sale_price: Money::new(input.sale_price)?,
            daily_interest_rate: input.daily_interest_rate.map(DailyRate::new).transpose()?,
            grace_period_days: match input.grace_period_days {
                Some(days) if days < 0 => {
                    return Err(ServiceError::InvalidInput(
                        "grace period must be zero or more days".to_string(),
                    ))
                }
                other => other,
            },
            hold_amount: input.hold_amount.map(Money::new).transpose()?,
            hold_until_date: input.hold_until_date,
        };

        self.require_lot(user_id, subdivision_id).await?;
        self.require_buyer(user_id, &input.buyer_id).await?;

        let effect = plan_sale(&terms);
        let mut lot = self
            .subdivisions
            .apply_sale(
                user_id,
                subdivision_id,
                &LotSaleUpdate {
                    buyer_id: input.buyer_id.clone(),
                    sale_price: terms.sale_price.value(),
                    status: effect.status,
                    payment_type: effect.payment_type,
                    payment_plan_type: input.plan,
                    daily_interest_rate: effect.daily_interest_rate,
                    interest_grace_period_days: effect.grace_period_days,
                    hold_amount: effect.hold_amount,
                    hold_until_date: effect.hold_until_date,
                },
            )
            .await?
            .ok_or_else(|| ServiceError::not_found("subdivision", subdivision_id))?;

        let payment = match effect.initial_payment {
            Some(initial) => Some(
                self.book_sale_payment(user_id, &lot, &input.buyer_id, initial.amount, initial.note, true)
                    .await?,
            ),
            None => None,
        };

        if effect.settled_status != effect.status {
            self.subdivisions
                .set_status(user_id, subdivision_id, effect.settled_status)
                .await?;
            lot.status = effect.settled_status;
        }

        info!(
            "Subdivision {} sold to {} for {} ({} plan, now {})",
            subdivision_id,
            input.buyer_id,
            terms.sale_price,
            input.plan.as_str(),
            lot.status.as_str()
        );

        Ok(SaleOutcome {
            subdivision: lot,
            payment,
        })
    }

    /// Hold a lot for a buyer against a deposit
    pub async fn place_hold(
        &self,
        user_id: &str,
        subdivision_id: &str,
        input: HoldInput,
    ) -> ServiceResult<SaleOutcome> {
        let deposit = Money::positive(input.hold_amount)?;
        let hold_until = input
            .hold_until_date
            .unwrap_or_else(|| self.calendar.today() + Duration::days(self.default_hold_days));

        self.require_lot(user_id, subdivision_id).await?;
        self.require_buyer(user_id, &input.buyer_id).await?;

        let lot = self
            .subdivisions
            .place_hold(user_id, subdivision_id, &input.buyer_id, deposit.value(), hold_until)
            .await?
            .ok_or_else(|| ServiceError::not_found("subdivision", subdivision_id))?;

        let note = optional_text(input.notes.as_deref())
            .unwrap_or_else(|| hold_deposit_note(Some(hold_until)));
        let payment = self
            .book_sale_payment(user_id, &lot, &input.buyer_id, deposit, note, false)
            .await?;

        info!(
            "Subdivision {} on hold for {} until {} ({} deposit)",
            subdivision_id, input.buyer_id, hold_until, deposit
        );

        Ok(SaleOutcome {
            subdivision: lot,
            payment: Some(payment),
        })
    }

    /// Sell a whole property; it stays pending until payments cover the price
    pub async fn sell_property(
        &self,
        user_id: &str,
        property_id: &str,
        input: PropertySaleInput,
    ) -> ServiceResult<PropertyRecord> {
        let price = Money::new(input.sale_price)?;
        self.require_buyer(user_id, &input.buyer_id).await?;

        let property = self
            .properties
            .record_sale(user_id, property_id, &input.buyer_id, price.value())
            .await?
            .ok_or_else(|| ServiceError::not_found("property", property_id))?;

        info!("Property {} pending sale to {} for {}", property_id, input.buyer_id, price);
        Ok(property)
    }
}
