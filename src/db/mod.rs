//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows plus insert/patch inputs
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: owner-scoped queries over the pool

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{
    AlertPage, CameraPatch, DbAlert, DbCamera, DbCameraWithCount, DbUser, NewAlert, NewCamera,
    SystemCounts,
};
pub use schema::SQLITE_INIT;
pub use sqlite::{SqlitePool, Storage};
