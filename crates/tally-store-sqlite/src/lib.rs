//! SQLite backend for the Tally referral ledger.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. All mutual exclusion lives in
//! SQLite itself: conditional inserts, unique constraints, and single-statement
//! compare-and-flip updates.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
