//! What each sale plan does to a lot.

use chrono::NaiveDate;

use crate::domain::entities::lot::{LotStatus, PaymentPlan, PaymentType};
use crate::domain::value_objects::daily_rate::DailyRate;
use crate::domain::value_objects::money::Money;

#[derive(Debug, Clone)]
pub struct SaleTerms {
    pub plan: PaymentPlan,
    pub sale_price: Money,
    pub daily_interest_rate: Option<DailyRate>,
    pub grace_period_days: Option<i64>,
    pub hold_amount: Option<Money>,
    pub hold_until_date: Option<NaiveDate>,
}

/// Payment recorded as part of the sale itself.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialPayment {
    pub amount: Money,
    pub note: String,
}

/// Field changes and follow-up payment for a sale.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleEffect {
    pub status: LotStatus,
    pub payment_type: PaymentType,
    pub daily_interest_rate: Option<f64>,
    pub grace_period_days: Option<i64>,
    pub hold_amount: Option<f64>,
    pub hold_until_date: Option<NaiveDate>,
    pub initial_payment: Option<InitialPayment>,
    /// Status once the initial payment is on the books.
    pub settled_status: LotStatus,
}

pub fn hold_deposit_note(hold_until: Option<NaiveDate>) -> String {
    match hold_until {
        Some(date) => format!("Hold deposit - Hold until {}", date),
        None => "Hold deposit".to_string(),
    }
}

pub fn plan_sale(terms: &SaleTerms) -> SaleEffect {
    match terms.plan {
        PaymentPlan::Full => SaleEffect {
            status: LotStatus::Sold,
            payment_type: PaymentType::Full,
            daily_interest_rate: None,
            grace_period_days: terms.grace_period_days,
            hold_amount: None,
            hold_until_date: None,
            initial_payment: Some(InitialPayment {
                amount: terms.sale_price,
                note: "Full payment".to_string(),
            }),
            settled_status: LotStatus::PaidInFull,
        },
        PaymentPlan::Mortgage => SaleEffect {
            status: LotStatus::Mortgage,
            payment_type: PaymentType::Mortgage,
            daily_interest_rate: terms.daily_interest_rate.map(|r| r.value()),
            grace_period_days: terms.grace_period_days,
            hold_amount: None,
            hold_until_date: None,
            initial_payment: None,
            settled_status: LotStatus::Mortgage,
        },
        PaymentPlan::Hold => {
            let deposit = terms.hold_amount.filter(|m| m.value() > 0.0);
            SaleEffect {
                status: LotStatus::OnHold,
                payment_type: PaymentType::Installment,
                daily_interest_rate: None,
                grace_period_days: terms.grace_period_days,
                hold_amount: terms.hold_amount.map(|m| m.value()),
                hold_until_date: terms.hold_until_date,
                initial_payment: deposit.map(|amount| InitialPayment {
                    amount,
                    note: hold_deposit_note(terms.hold_until_date),
                }),
                settled_status: LotStatus::OnHold,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(plan: PaymentPlan) -> SaleTerms {
        SaleTerms {
            plan,
            sale_price: Money::new(25_000.0).unwrap(),
            daily_interest_rate: Some(DailyRate::new(0.0005).unwrap()),
            grace_period_days: Some(10),
            hold_amount: Some(Money::new(1_000.0).unwrap()),
            hold_until_date: NaiveDate::from_ymd_opt(2024, 7, 1),
        }
    }

    #[test]
    fn test_full_plan_settles_paid_in_full() {
        let effect = plan_sale(&terms(PaymentPlan::Full));
        assert_eq!(effect.status, LotStatus::Sold);
        assert_eq!(effect.settled_status, LotStatus::PaidInFull);
        assert_eq!(effect.payment_type, PaymentType::Full);
        let payment = effect.initial_payment.unwrap();
        assert_eq!(payment.amount.value(), 25_000.0);
        assert_eq!(payment.note, "Full payment");
        assert_eq!(effect.daily_interest_rate, None);
        assert_eq!(effect.hold_amount, None);
    }

    #[test]
    fn test_mortgage_plan_keeps_rate_override() {
        let effect = plan_sale(&terms(PaymentPlan::Mortgage));
        assert_eq!(effect.status, LotStatus::Mortgage);
        assert_eq!(effect.daily_interest_rate, Some(0.0005));
        assert_eq!(effect.grace_period_days, Some(10));
        assert!(effect.initial_payment.is_none());
    }

    #[test]
    fn test_hold_plan_records_deposit() {
        let effect = plan_sale(&terms(PaymentPlan::Hold));
        assert_eq!(effect.status, LotStatus::OnHold);
        assert_eq!(effect.payment_type, PaymentType::Installment);
        assert_eq!(effect.hold_amount, Some(1_000.0));
        let deposit = effect.initial_payment.unwrap();
        assert_eq!(deposit.note, "Hold deposit - Hold until 2024-07-01");
    }

    #[test]
    fn test_hold_plan_without_deposit() {
        let mut t = terms(PaymentPlan::Hold);
        t.hold_amount = Some(Money::ZERO);
        assert!(plan_sale(&t).initial_payment.is_none());
    }
}
