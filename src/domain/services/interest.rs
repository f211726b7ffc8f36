//! Simple interest on a declining balance.
//!
//! Interest accrues per calendar day between the lot's last payment and the
//! new payment date, on the principal still owed. A payment first covers the
//! accrued interest; whatever is left reduces principal. There is no
//! compounding, no amortization schedule and no reconciliation of rounding
//! across the life of the loan.
//!
//! The grace period travels with every allocation so it can be stored on the
//! payment row, but it is never subtracted from the day count.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::value_objects::daily_rate::DailyRate;
use crate::domain::value_objects::money::{round_cents, Money};

/// Default grace period stored on lots that never had one configured.
pub const DEFAULT_GRACE_PERIOD_DAYS: i64 = 30;

/// Whole days from `since` to `until`, clamped at zero. No anchor means no accrual.
pub fn days_between(since: Option<NaiveDate>, until: NaiveDate) -> i64 {
    match since {
        Some(since) => (until - since).num_days().max(0),
        None => 0,
    }
}

/// `balance × rate × days`, rounded to cents.
pub fn accrued_interest(balance: f64, rate: DailyRate, days: i64) -> f64 {
    round_cents(balance.max(0.0) * rate.value() * days as f64)
}

/// Everything needed to split one payment.
#[derive(Debug, Clone)]
pub struct AllocationRequest {
    pub remaining_balance: f64,
    pub daily_rate: DailyRate,
    pub grace_period_days: i64,
    pub last_payment_date: Option<NaiveDate>,
    pub amount: Money,
    pub payment_date: NaiveDate,
}

/// How a payment was split between interest and principal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PaymentAllocation {
    pub amount: f64,
    pub interest: f64,
    pub principal: f64,
    /// `None` for payments that never went through interest allocation.
    pub days_since_last_payment: Option<i64>,
    pub rate_used: Option<f64>,
    pub grace_period_days: Option<i64>,
}

impl PaymentAllocation {
    /// A payment on a lot without a mortgage plan: all principal, no interest.
    pub fn principal_only(amount: Money) -> Self {
        PaymentAllocation {
            amount: amount.value(),
            interest: 0.0,
            principal: amount.value(),
            days_since_last_payment: None,
            rate_used: None,
            grace_period_days: None,
        }
    }

    pub fn balance_after(&self, balance_before: f64) -> f64 {
        round_cents(balance_before - self.principal)
    }
}

/// Split a mortgage payment into its interest and principal portions.
pub fn allocate(request: &AllocationRequest) -> PaymentAllocation {
    let days = days_between(request.last_payment_date, request.payment_date);
    let interest = accrued_interest(request.remaining_balance, request.daily_rate, days);
    let amount = request.amount.value();

    // A payment that does not exceed the interest is absorbed by it entirely.
    let principal = if amount > interest {
        round_cents(amount - interest)
    } else {
        0.0
    };

    PaymentAllocation {
        amount,
        interest,
        principal,
        days_since_last_payment: Some(days),
        rate_used: Some(request.daily_rate.value()),
        grace_period_days: Some(request.grace_period_days),
    }
}

/// Read-only projection of what is owed on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InterestQuote {
    pub as_of: NaiveDate,
    pub days: i64,
    pub remaining_balance: f64,
    pub daily_rate: f64,
    pub grace_period_days: i64,
    pub interest: f64,
    pub total_due: f64,
}

/// Interest owed on `as_of`, counting from the last payment or, without one, from `today`.
pub fn quote(
    remaining_balance: f64,
    daily_rate: DailyRate,
    grace_period_days: i64,
    last_payment_date: Option<NaiveDate>,
    today: NaiveDate,
    as_of: NaiveDate,
) -> InterestQuote {
    let days = days_between(Some(last_payment_date.unwrap_or(today)), as_of);
    let interest = accrued_interest(remaining_balance, daily_rate, days);
    InterestQuote {
        as_of,
        days,
        remaining_balance: round_cents(remaining_balance),
        daily_rate: daily_rate.value(),
        grace_period_days,
        interest,
        total_due: round_cents(remaining_balance + interest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn request(balance: f64, rate: f64, last: Option<NaiveDate>, amount: f64, on: NaiveDate) -> AllocationRequest {
        AllocationRequest {
            remaining_balance: balance,
            daily_rate: DailyRate::new(rate).unwrap(),
            grace_period_days: DEFAULT_GRACE_PERIOD_DAYS,
            last_payment_date: last,
            amount: Money::positive(amount).unwrap(),
            payment_date: on,
        }
    }

    #[test]
    fn test_days_between() {
        assert_eq!(days_between(None, date(2024, 3, 1)), 0);
        assert_eq!(days_between(Some(date(2024, 1, 31)), date(2024, 3, 1)), 30);
        assert_eq!(days_between(Some(date(2024, 3, 5)), date(2024, 3, 1)), 0);
    }

    #[test]
    fn test_first_payment_is_all_principal() {
        let allocation = allocate(&request(10_000.0, 0.001, None, 750.0, date(2024, 1, 1)));
        assert_eq!(allocation.days_since_last_payment, Some(0));
        assert_eq!(allocation.interest, 0.0);
        assert_eq!(allocation.principal, 750.0);
    }

    #[test]
    fn test_thirty_day_example() {
        let allocation = allocate(&request(
            10_000.0,
            0.001,
            Some(date(2024, 1, 1)),
            500.0,
            date(2024, 1, 31),
        ));
        assert_eq!(allocation.days_since_last_payment, Some(30));
        assert_eq!(allocation.interest, 300.0);
        assert_eq!(allocation.principal, 200.0);
        assert_eq!(allocation.balance_after(10_000.0), 9_800.0);
    }

    #[test]
    fn test_payment_absorbed_by_interest() {
        let allocation = allocate(&request(
            10_000.0,
            0.001,
            Some(date(2024, 1, 1)),
            300.0,
            date(2024, 1, 31),
        ));
        assert_eq!(allocation.interest, 300.0);
        assert_eq!(allocation.principal, 0.0);
        assert_eq!(allocation.balance_after(10_000.0), 10_000.0);

        let small = allocate(&request(
            10_000.0,
            0.001,
            Some(date(2024, 1, 1)),
            120.0,
            date(2024, 1, 31),
        ));
        assert_eq!(small.principal, 0.0);
        assert_eq!(small.interest, 300.0);
    }

    #[test]
    fn test_principal_rounded_to_cents() {
        // 1234.56 * 0.0007 * 17 = 14.6917...
        let allocation = allocate(&request(
            1_234.56,
            0.0007,
            Some(date(2024, 2, 1)),
            100.0,
            date(2024, 2, 18),
        ));
        assert_eq!(allocation.interest, 14.69);
        assert_eq!(allocation.principal, 85.31);
    }

    #[test]
    fn test_grace_period_not_subtracted() {
        let mut req = request(10_000.0, 0.001, Some(date(2024, 1, 1)), 500.0, date(2024, 1, 11));
        req.grace_period_days = 30;
        let allocation = allocate(&req);
        assert_eq!(allocation.days_since_last_payment, Some(10));
        assert_eq!(allocation.interest, 100.0);
        assert_eq!(allocation.grace_period_days, Some(30));
    }

    #[test]
    fn test_backdated_payment_accrues_nothing() {
        let allocation = allocate(&request(
            10_000.0,
            0.001,
            Some(date(2024, 5, 1)),
            500.0,
            date(2024, 4, 1),
        ));
        assert_eq!(allocation.days_since_last_payment, Some(0));
        assert_eq!(allocation.principal, 500.0);
    }

    #[test]
    fn test_principal_only() {
        let allocation = PaymentAllocation::principal_only(Money::positive(42.5).unwrap());
        assert_eq!(allocation.principal, 42.5);
        assert_eq!(allocation.interest, 0.0);
        assert_eq!(allocation.days_since_last_payment, None);
    }

    #[test]
    fn test_quote_without_last_payment_counts_from_today() {
        let rate = DailyRate::new(0.001).unwrap();
        let q = quote(5_000.0, rate, 30, None, date(2024, 6, 1), date(2024, 6, 11));
        assert_eq!(q.days, 10);
        assert_eq!(q.interest, 50.0);
        assert_eq!(q.total_due, 5_050.0);

        let past = quote(5_000.0, rate, 30, None, date(2024, 6, 1), date(2024, 5, 1));
        assert_eq!(past.days, 0);
        assert_eq!(past.total_due, 5_000.0);
    }

    #[test]
    fn test_quote_from_last_payment() {
        let rate = DailyRate::new(0.002).unwrap();
        let q = quote(
            1_000.0,
            rate,
            15,
            Some(date(2024, 1, 1)),
            date(2024, 6, 1),
            date(2024, 1, 6),
        );
        assert_eq!(q.days, 5);
        assert_eq!(q.interest, 10.0);
        assert_eq!(q.grace_period_days, 15);
    }
}
