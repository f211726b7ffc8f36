use crate::domain::errors::ValidationError;

/// Round a currency amount to whole cents.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Non-negative currency amount, always held at cent precision.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Money(f64);

impl Money {
    pub const ZERO: Money = Money(0.0);

    /// Rounds to whole cents, so `10.999` becomes `11.00`.
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::MustBeFinite);
        }
        if value < 0.0 {
            return Err(ValidationError::MustBeNonNegative);
        }
        Ok(Money(round_cents(value)))
    }

    /// Strictly positive amount, as required for a recorded payment.
    pub fn positive(value: f64) -> Result<Self, ValidationError> {
        let money = Money::new(value)
            .map_err(|e| ValidationError::InvalidAmount(format!("{}: {}", value, e)))?;
        if money.0 <= 0.0 {
            return Err(ValidationError::InvalidAmount(
                "amount must be greater than zero".to_string(),
            ));
        }
        Ok(money)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(300.00000000000006), 300.0);
        assert_eq!(round_cents(12.345), 12.35);
        assert_eq!(round_cents(-0.004), -0.0);
    }

    #[test]
    fn test_money_new_rejects_negative_and_nan() {
        assert_eq!(Money::new(-1.0), Err(ValidationError::MustBeNonNegative));
        assert_eq!(Money::new(f64::NAN), Err(ValidationError::MustBeFinite));
        assert_eq!(Money::new(10.999).unwrap().value(), 11.0);
    }

    #[test]
    fn test_money_positive() {
        assert!(Money::positive(0.0).is_err());
        assert!(Money::positive(0.001).is_err());
        assert_eq!(Money::positive(0.01).unwrap().value(), 0.01);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::new(100.1).unwrap().to_string(), "$100.10");
    }
}
