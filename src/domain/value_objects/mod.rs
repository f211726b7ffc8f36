pub mod daily_rate;
pub mod money;
