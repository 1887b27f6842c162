//! Core types and trait definitions for the Tally referral ledger.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod balance;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod membership;
pub mod referral;
pub mod reward;
pub mod store;

pub use error::{Error, Result};
pub use ledger::Ledger;

/// A stable, caller-supplied user identifier. Assigned by the upstream
/// messaging platform; never generated here.
pub type UserId = i64;
