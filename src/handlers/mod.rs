pub mod alerts;
pub mod auth;
pub mod cameras;
pub mod health;
pub mod ws;
