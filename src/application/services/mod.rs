pub mod catalog;
pub mod documents;
pub mod payments;
pub mod recall;
pub mod receipts;
pub mod sales;

use crate::application::errors::ServiceResult;
use crate::domain::errors::ValidationError;

/// Trimmed value of a required text field.
pub(crate) fn required_text(value: Option<&str>, field: &'static str) -> ServiceResult<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ValidationError::MissingField(field).into())
}

/// Blank strings count as absent.
pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
