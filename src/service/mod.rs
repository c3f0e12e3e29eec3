pub mod auth;
pub mod broadcaster;
pub mod login_limiter;
pub mod seed;
pub mod stats;
