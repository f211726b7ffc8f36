use crate::domain::errors::ValidationError;

/// Simple daily interest rate, e.g. `0.001` for 0.1% per day.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct DailyRate(f64);

impl DailyRate {
    pub const DEFAULT: DailyRate = DailyRate(0.001);

    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::InvalidRate("rate must be finite".to_string()));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(ValidationError::InvalidRate(format!(
                "{} is outside 0.0..=1.0",
                value
            )));
        }
        Ok(DailyRate(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Lot override first, then the user's global setting, then the service default.
    pub fn resolve(lot: Option<f64>, global: Option<f64>, fallback: DailyRate) -> DailyRate {
        lot.or(global)
            .and_then(|v| DailyRate::new(v).ok())
            .unwrap_or(fallback)
    }
}

impl Default for DailyRate {
    fn default() -> Self {
        DailyRate::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_bounds() {
        assert!(DailyRate::new(0.0).is_ok());
        assert!(DailyRate::new(-0.01).is_err());
        assert!(DailyRate::new(1.5).is_err());
        assert!(DailyRate::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_resolve_prefers_lot_then_global() {
        let fallback = DailyRate::DEFAULT;
        assert_eq!(DailyRate::resolve(Some(0.002), Some(0.003), fallback).value(), 0.002);
        assert_eq!(DailyRate::resolve(None, Some(0.003), fallback).value(), 0.003);
        assert_eq!(DailyRate::resolve(None, None, fallback).value(), 0.001);
    }
}
