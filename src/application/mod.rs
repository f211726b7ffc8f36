pub mod errors;
pub mod handlers;
pub mod services;
pub mod state;
