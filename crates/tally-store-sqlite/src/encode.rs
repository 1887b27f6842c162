//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings.

use chrono::{DateTime, Utc};
use tally_core::referral::{CreditedReferral, ReferralEdge};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339()
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `referrals` row.
pub struct RawEdge {
  pub referrer_id: i64,
  pub referee_id:  i64,
  pub credited:    i64,
  pub created_at:  String,
}

impl RawEdge {
  pub fn into_edge(self) -> Result<ReferralEdge> {
    Ok(ReferralEdge {
      referrer_id: self.referrer_id,
      referee_id:  self.referee_id,
      credited:    self.credited != 0,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values from a credited `referrals` row in the recent-activity query.
pub struct RawCredited {
  pub referrer_id: i64,
  pub referee_id:  i64,
  pub created_at:  String,
}

impl RawCredited {
  pub fn into_credited(self) -> Result<CreditedReferral> {
    Ok(CreditedReferral {
      referrer_id: self.referrer_id,
      referee_id:  self.referee_id,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}
