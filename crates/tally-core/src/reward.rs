//! Reward catalog and redemption types.
//!
//! The catalog is read-only configuration loaded once at startup and
//! injected into the [`Ledger`](crate::ledger::Ledger) as an immutable
//! value. Redemption records are strictly append-only; the redemption log
//! *is* the debit ledger, mirroring the append/flip-only referral ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, UserId};

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// A single redeemable reward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardEntry {
  pub code:          String,
  pub display_label: String,
  pub cost:          u32,
  /// Opaque string delivered verbatim to the user on success.
  pub payload:       String,
  /// If `true`, the same user may redeem this reward any number of times.
  #[serde(default)]
  pub repeatable:    bool,
}

/// The full reward catalog. Immutable after construction; codes are unique.
#[derive(Debug, Clone, Default)]
pub struct RewardCatalog {
  entries: Vec<RewardEntry>,
}

impl RewardCatalog {
  /// Build a catalog, rejecting empty or duplicate codes.
  pub fn new(entries: Vec<RewardEntry>) -> Result<Self> {
    for (i, entry) in entries.iter().enumerate() {
      if entry.code.is_empty() {
        return Err(Error::EmptyRewardCode);
      }
      if entries[..i].iter().any(|e| e.code == entry.code) {
        return Err(Error::DuplicateRewardCode(entry.code.clone()));
      }
    }
    Ok(Self { entries })
  }

  pub fn get(&self, code: &str) -> Option<&RewardEntry> {
    self.entries.iter().find(|e| e.code == code)
  }

  pub fn iter(&self) -> impl Iterator<Item = &RewardEntry> {
    self.entries.iter()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

// ─── Redemption ──────────────────────────────────────────────────────────────

/// A recorded spend of points. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionRecord {
  pub user_id:     UserId,
  pub reward_code: String,
  pub cost:        u32,
  pub created_at:  DateTime<Utc>,
}

/// The result of a redemption attempt.
///
/// The non-`Granted` variants are validation outcomes, not faults: they are
/// reported to the caller as ordinary values and never logged as errors or
/// retried automatically. Storage faults travel on the error channel of
/// [`Ledger::redeem`](crate::ledger::Ledger::redeem) instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RedemptionOutcome {
  /// The spend was recorded; deliver `payload` to the user.
  Granted { payload: String },
  /// `code` does not exist in the catalog.
  UnknownReward,
  /// Non-repeatable reward already redeemed by this user.
  AlreadyRedeemed,
  /// `available < cost` at the time of the attempt.
  InsufficientBalance { needed: u32, available: u64 },
}
