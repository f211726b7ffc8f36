use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::errors::ValidationError;

/// Sale state of a subdivision (lot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum LotStatus {
    OnHold,
    Available,
    Mortgage,
    Sold,
    PaidInFull,
    Recalled,
}

impl LotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LotStatus::OnHold => "on_hold",
            LotStatus::Available => "available",
            LotStatus::Mortgage => "mortgage",
            LotStatus::Sold => "sold",
            LotStatus::PaidInFull => "paid_in_full",
            LotStatus::Recalled => "recalled",
        }
    }

    /// A buyer holds or owes on the lot, so payments count towards paying it off.
    pub fn has_open_sale(&self) -> bool {
        matches!(self, LotStatus::OnHold | LotStatus::Mortgage | LotStatus::Sold)
    }
}

impl FromStr for LotStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on_hold" => Ok(LotStatus::OnHold),
            "available" => Ok(LotStatus::Available),
            "mortgage" => Ok(LotStatus::Mortgage),
            "sold" => Ok(LotStatus::Sold),
            "paid_in_full" => Ok(LotStatus::PaidInFull),
            "recalled" => Ok(LotStatus::Recalled),
            other => Err(ValidationError::UnknownVariant {
                kind: "lot status",
                value: other.to_string(),
            }),
        }
    }
}

/// How the buyer agreed to pay for the lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaymentPlan {
    Full,
    Mortgage,
    Hold,
}

impl PaymentPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentPlan::Full => "full",
            PaymentPlan::Mortgage => "mortgage",
            PaymentPlan::Hold => "hold",
        }
    }
}

impl FromStr for PaymentPlan {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(PaymentPlan::Full),
            "mortgage" => Ok(PaymentPlan::Mortgage),
            "hold" => Ok(PaymentPlan::Hold),
            other => Err(ValidationError::UnknownVariant {
                kind: "payment plan",
                value: other.to_string(),
            }),
        }
    }
}

/// Legacy payment classification still stored next to the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaymentType {
    Full,
    Mortgage,
    Installment,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Full => "full",
            PaymentType::Mortgage => "mortgage",
            PaymentType::Installment => "installment",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lot_status_round_trips_through_str() {
        for status in [
            LotStatus::OnHold,
            LotStatus::Available,
            LotStatus::Mortgage,
            LotStatus::Sold,
            LotStatus::PaidInFull,
            LotStatus::Recalled,
        ] {
            assert_eq!(status.as_str().parse::<LotStatus>().unwrap(), status);
        }
        assert!("gone".parse::<LotStatus>().is_err());
    }

    #[test]
    fn test_open_sale_statuses() {
        assert!(LotStatus::Mortgage.has_open_sale());
        assert!(LotStatus::OnHold.has_open_sale());
        assert!(!LotStatus::Available.has_open_sale());
        assert!(!LotStatus::PaidInFull.has_open_sale());
    }

    #[test]
    fn test_plan_serde_uses_snake_case() {
        let json = serde_json::to_string(&PaymentPlan::Mortgage).unwrap();
        assert_eq!(json, "\"mortgage\"");
        let status: LotStatus = serde_json::from_str("\"paid_in_full\"").unwrap();
        assert_eq!(status, LotStatus::PaidInFull);
    }
}
