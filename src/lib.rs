//! Landbook: land sales ledger
//!
//! Properties are split into lots that are sold, held or recalled. Payments
//! against them are split into interest and principal, receipted, and
//! backed by stored documents.

pub mod application;
pub mod auth;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod persistence;
pub mod rate_limit;
