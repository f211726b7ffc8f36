//! Running totals over a lot's or property's payments.

use serde::Serialize;

use crate::domain::value_objects::money::round_cents;

/// A recorded payment as the ledger sees it.
pub trait LedgerEntry {
    fn amount(&self) -> f64;
    /// Stored principal portion, if the payment carried a split.
    fn principal_amount(&self) -> Option<f64>;
    fn interest_amount(&self) -> Option<f64>;

    /// Principal credited against the sale price. Payments without a split count in full.
    fn principal_credit(&self) -> f64 {
        self.principal_amount().unwrap_or_else(|| self.amount())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub sale_price: f64,
    pub payment_count: usize,
    pub total_paid: f64,
    pub principal_paid: f64,
    pub interest_paid: f64,
    pub remaining_balance: f64,
}

impl LedgerSummary {
    pub fn from_entries<E: LedgerEntry>(sale_price: f64, entries: &[E]) -> Self {
        let total_paid: f64 = entries.iter().map(|e| e.amount()).sum();
        let principal_paid: f64 = entries.iter().map(|e| e.principal_credit()).sum();
        let interest_paid: f64 = entries
            .iter()
            .map(|e| e.interest_amount().unwrap_or(0.0))
            .sum();

        LedgerSummary {
            sale_price,
            payment_count: entries.len(),
            total_paid: round_cents(total_paid),
            principal_paid: round_cents(principal_paid),
            interest_paid: round_cents(interest_paid),
            remaining_balance: round_cents(sale_price - principal_paid),
        }
    }

    pub fn is_paid_in_full(&self) -> bool {
        self.principal_paid >= self.sale_price
    }
}

/// Sum of amounts paid before the entry at `index`, for a list ordered newest first.
pub fn paid_before<E: LedgerEntry>(newest_first: &[E], index: usize) -> f64 {
    round_cents(
        newest_first
            .iter()
            .skip(index + 1)
            .map(|e| e.amount())
            .sum(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Entry(f64, Option<f64>, Option<f64>);

    impl LedgerEntry for Entry {
        fn amount(&self) -> f64 {
            self.0
        }
        fn principal_amount(&self) -> Option<f64> {
            self.1
        }
        fn interest_amount(&self) -> Option<f64> {
            self.2
        }
    }

    #[test]
    fn test_summary_mixes_split_and_plain_payments() {
        let entries = vec![
            Entry(500.0, Some(200.0), Some(300.0)),
            Entry(1_000.0, None, None),
            Entry(100.0, Some(0.0), Some(100.0)),
        ];
        let summary = LedgerSummary::from_entries(10_000.0, &entries);
        assert_eq!(summary.total_paid, 1_600.0);
        assert_eq!(summary.principal_paid, 1_200.0);
        assert_eq!(summary.interest_paid, 400.0);
        assert_eq!(summary.remaining_balance, 8_800.0);
        assert!(!summary.is_paid_in_full());
    }

    #[test]
    fn test_paid_in_full_on_principal_only() {
        let entries = vec![Entry(6_000.0, Some(5_000.0), Some(1_000.0))];
        let summary = LedgerSummary::from_entries(5_000.0, &entries);
        assert!(summary.is_paid_in_full());
        assert_eq!(summary.remaining_balance, 0.0);

        let short = vec![Entry(6_000.0, Some(4_999.99), Some(1_000.01))];
        assert!(!LedgerSummary::from_entries(5_000.0, &short).is_paid_in_full());
    }

    #[test]
    fn test_paid_before_counts_older_payments() {
        let newest_first = vec![Entry(30.0, None, None), Entry(20.0, None, None), Entry(10.0, None, None)];
        assert_eq!(paid_before(&newest_first, 0), 30.0);
        assert_eq!(paid_before(&newest_first, 1), 10.0);
        assert_eq!(paid_before(&newest_first, 2), 0.0);
    }
}
