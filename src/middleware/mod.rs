pub mod auth;
pub mod rate_limit;
pub mod rider_rate_limit;
