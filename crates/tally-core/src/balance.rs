//! Derived balance and reporting types.
//!
//! Nothing here is ever stored. Earned and spent totals are recomputed from
//! the referral ledger and the redemption log on every query; there is no
//! cached running balance to drift.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// A user's point totals at a single consistent snapshot of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
  /// Count of credited referral edges where this user is the referrer.
  pub earned:    u64,
  /// Sum of cost over this user's redemption records.
  pub spent:     u64,
  /// `max(0, earned - spent)`.
  pub available: u64,
}

impl Balance {
  pub fn from_totals(earned: u64, spent: u64) -> Self {
    Self {
      earned,
      spent,
      available: earned.saturating_sub(spent),
    }
  }
}

/// One row of the top-referrers leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
  pub user_id: UserId,
  pub handle:  Option<String>,
  pub earned:  u64,
}

/// One row of the full account table / export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRow {
  pub user_id:   UserId,
  pub handle:    Option<String>,
  pub earned:    u64,
  pub spent:     u64,
  pub available: u64,
}

/// A page of [`AccountRow`]s ordered by `available DESC, earned DESC,
/// user_id ASC`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountPage {
  pub rows:        Vec<AccountRow>,
  pub page:        u32,
  pub pages:       u32,
  pub total_users: u64,
}

/// Aggregate counts for the admin dashboard.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LedgerStats {
  pub total_users:         u64,
  pub credited_referrals:  u64,
  pub pending_referrals:   u64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn available_floors_at_zero() {
    let b = Balance::from_totals(1, 3);
    assert_eq!(b.available, 0);
    let b = Balance::from_totals(3, 1);
    assert_eq!(b.available, 2);
  }
}
