//! Referral edge types.
//!
//! An edge records that a referee's first contact carried a referrer
//! reference. Edges are immutable except for the single `credited` flip,
//! which happens at most once when the referee passes membership
//! verification. A referee has at most one edge, ever — the first-touch
//! referrer wins for life.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// A referrer → referee edge and its credit state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralEdge {
  pub referrer_id: UserId,
  /// Unique across all edges.
  pub referee_id:  UserId,
  /// `false → true` exactly once; never back.
  pub credited:    bool,
  pub created_at:  DateTime<Utc>,
}

/// A credited edge as shown in the recent-activity view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditedReferral {
  pub referrer_id: UserId,
  pub referee_id:  UserId,
  pub created_at:  DateTime<Utc>,
}
