//! Membership oracle vocabulary.
//!
//! The core never queries the oracle itself — the surrounding layer consults
//! it before calling
//! [`Ledger::on_verification_succeeded`](crate::ledger::Ledger::on_verification_succeeded).
//! Only the status vocabulary lives here so every layer speaks the same one.

use serde::{Deserialize, Serialize};

/// What the external membership oracle reports for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
  Member,
  Admin,
  Owner,
  NotMember,
  /// The oracle could not determine membership. Must be surfaced as
  /// "cannot verify right now, retry" — never treated as `NotMember`.
  Unknown,
}

impl MembershipStatus {
  /// True for every status that counts as having joined.
  pub fn is_member(self) -> bool {
    matches!(self, Self::Member | Self::Admin | Self::Owner)
  }

  /// True for statuses that grant access to the reporting views.
  pub fn is_admin(self) -> bool {
    matches!(self, Self::Admin | Self::Owner)
  }
}
