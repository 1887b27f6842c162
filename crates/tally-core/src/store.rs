//! The `LedgerStore` trait — the storage abstraction behind every operation.
//!
//! The trait is implemented by storage backends (e.g. `tally-store-sqlite`).
//! Higher layers (`tally-api`, `tally-server`) depend on this abstraction,
//! not on any concrete backend.
//!
//! The durable store is the only shared mutable resource. Callers hold no
//! in-memory locks across these operations; all mutual exclusion is pushed
//! into the backend's own atomic primitives (conditional inserts, unique
//! constraints, atomic compare-and-flip). Every operation is safe to retry
//! after an ambiguous failure.

use std::future::Future;

use crate::{
  UserId,
  balance::{AccountPage, AccountRow, Balance, LeaderboardEntry, LedgerStats},
  identity::{ResolvedUser, UserRef},
  referral::{CreditedReferral, ReferralEdge},
  reward::RewardEntry,
};

// ─── Redemption attempt ──────────────────────────────────────────────────────

/// Storage-level result of a redemption attempt. The payload is attached by
/// [`Ledger::redeem`](crate::ledger::Ledger::redeem), which owns the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemAttempt {
  /// The record was inserted; the spend is committed.
  Granted,
  /// Non-repeatable reward already redeemed by this user — either seen by
  /// the pre-check or reported as a uniqueness-constraint conflict on
  /// insert. Both paths collapse to this value.
  AlreadyRedeemed,
  /// The user's available balance at the attempt's snapshot.
  InsufficientBalance { available: u64 },
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Tally ledger backend.
///
/// Writes are append-only or single-flip: user rows are upserted, referral
/// edges are inserted once and flipped once, redemption records are inserted
/// and never touched again. Reads are pure derivations over durable state.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait LedgerStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Identity ──────────────────────────────────────────────────────────

  /// Idempotent upsert: create the user row if absent (capturing
  /// `first_seen`), otherwise overwrite `handle` with the latest observed
  /// value (last-write-wins).
  fn record_contact(
    &self,
    user_id: UserId,
    handle: Option<String>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Resolve an operator reference (`@handle` or numeric id) against the
  /// identity store. Handle lookup is case-insensitive. Only known users
  /// resolve; a numeric id with no user row returns `None`.
  fn resolve(
    &self,
    reference: UserRef,
  ) -> impl Future<Output = Result<Option<ResolvedUser>, Self::Error>> + Send + '_;

  // ── Referral ledger ───────────────────────────────────────────────────

  /// Insert a pending edge **only if the referee has no edge yet** — the
  /// first-touch referrer wins for life. A self-referral
  /// (`referrer_id == referee_id`) is silently dropped. Idempotent.
  fn record_pending_referral(
    &self,
    referrer_id: UserId,
    referee_id: UserId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Atomically flip the referee's edge from pending to credited and
  /// return the referrer id. Returns `None` when no edge exists or it is
  /// already credited. The read-check-flip is indivisible: of N concurrent
  /// calls for the same referee, exactly one observes `Some`.
  fn credit_referee(
    &self,
    referee_id: UserId,
  ) -> impl Future<Output = Result<Option<UserId>, Self::Error>> + Send + '_;

  /// Look up the referee's edge, if any.
  fn referral_of(
    &self,
    referee_id: UserId,
  ) -> impl Future<Output = Result<Option<ReferralEdge>, Self::Error>> + Send + '_;

  // ── Balance engine ────────────────────────────────────────────────────

  /// Compute `(earned, spent, available)` from a single consistent
  /// snapshot of the referral ledger and the redemption log.
  fn balance(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<Balance, Self::Error>> + Send + '_;

  /// Top referrers by credited-edge count; ties broken by `user_id ASC`.
  fn top_referrers(
    &self,
    limit: u32,
  ) -> impl Future<Output = Result<Vec<LeaderboardEntry>, Self::Error>> + Send + '_;

  // ── Redemption engine ─────────────────────────────────────────────────

  /// Attempt to record a spend of `reward.cost` points against
  /// `reward.code`, all in one atomic storage transaction: the
  /// prior-redemption check (non-repeatable only), the balance gate, and
  /// the insert. A uniqueness conflict at insert time is translated to
  /// [`RedeemAttempt::AlreadyRedeemed`], never surfaced as an error.
  fn try_redeem(
    &self,
    user_id: UserId,
    reward: RewardEntry,
  ) -> impl Future<Output = Result<RedeemAttempt, Self::Error>> + Send + '_;

  // ── Reporting views ───────────────────────────────────────────────────

  /// Aggregate counts for the dashboard.
  fn stats(
    &self,
  ) -> impl Future<Output = Result<LedgerStats, Self::Error>> + Send + '_;

  /// Most recently credited edges, newest first.
  fn recent_credited(
    &self,
    limit: u32,
  ) -> impl Future<Output = Result<Vec<CreditedReferral>, Self::Error>> + Send + '_;

  /// One page of the account table, ordered by
  /// `available DESC, earned DESC, user_id ASC`. `page` is 1-based.
  fn account_page(
    &self,
    page: u32,
    size: u32,
  ) -> impl Future<Output = Result<AccountPage, Self::Error>> + Send + '_;

  /// Every account row, unpaginated, in the same order as
  /// [`account_page`](Self::account_page).
  fn export_accounts(
    &self,
  ) -> impl Future<Output = Result<Vec<AccountRow>, Self::Error>> + Send + '_;
}
