//! Database layer
//!
//! Database abstraction for the BirdScope backend:
//! - SQLite (default, single-binary deployment)
//! - MySQL (larger deployments)
//!
//! The driver is selected from configuration; a trait-based `DatabasePool`
//! lets repositories work against either backend.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
