pub mod document_owner;
pub mod lot;
pub mod property;
