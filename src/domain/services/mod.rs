pub mod calendar;
pub mod interest;
pub mod ledger;
pub mod receipt_number;
pub mod sale_plan;
