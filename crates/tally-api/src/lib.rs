//! JSON REST API for the Tally referral ledger.
//!
//! Exposes an axum [`Router`] backed by any [`tally_core::store::LedgerStore`]
//! via the [`Ledger`] facade. Auth, TLS, and transport concerns are the
//! caller's responsibility; the admin-gated reporting routes live in
//! `tally-server`.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", tally_api::api_router(ledger.clone()))
//! ```

pub mod balances;
pub mod contacts;
pub mod error;
pub mod redemptions;
pub mod resolve;
pub mod verifications;

use axum::{
  Router,
  routing::{get, post},
};
use tally_core::{Ledger, store::LedgerStore};

pub use error::ApiError;

/// Build a fully-materialised API router for `ledger`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(ledger: Ledger<S>) -> Router<()>
where
  S: LedgerStore + 'static,
{
  Router::new()
    // Inbound events
    .route("/contacts", post(contacts::create::<S>))
    .route("/verifications", post(verifications::create::<S>))
    .route("/redemptions", post(redemptions::create::<S>))
    // Reads
    .route("/rewards", get(redemptions::list_rewards::<S>))
    .route("/balances/{user_id}", get(balances::get_one::<S>))
    .route("/leaderboard", get(balances::leaderboard::<S>))
    .route("/resolve", get(resolve::handler::<S>))
    .with_state(ledger)
}

// ─── Integration tests ────────────────────────────────────────────────────────
