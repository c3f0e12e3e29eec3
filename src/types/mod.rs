pub mod alert;
pub mod auth;
pub mod camera;
pub mod ws;
