//! Identity types — the durable user-id to handle mapping.
//!
//! Users are created on first contact and never deleted. The handle is a
//! display-only value updated last-write-wins on every contact; it is never
//! used as a primary key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// A known user: a stable id plus the most recently observed handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:    UserId,
  /// Most recently observed handle; `None` if the user has never had one.
  pub handle:     Option<String>,
  /// Set once when the user first contacts the system; never updated.
  pub first_seen: DateTime<Utc>,
}

/// A reference to a user as typed by an operator: `@handle` or a numeric id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
  /// Looked up case-insensitively.
  Handle(String),
  Id(UserId),
}

impl UserRef {
  /// Parse an operator-supplied reference. Returns `None` for anything that
  /// is neither `@handle` nor a plain integer.
  pub fn parse(input: &str) -> Option<Self> {
    let input = input.trim();
    if let Some(handle) = input.strip_prefix('@') {
      if handle.is_empty() {
        return None;
      }
      return Some(Self::Handle(handle.to_string()));
    }
    input.parse::<UserId>().ok().map(Self::Id)
  }
}

/// The outcome of resolving a [`UserRef`] against the identity store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedUser {
  pub user_id:       UserId,
  /// `"@handle"` when a non-empty handle is known, else `"User <id>"`.
  pub display_label: String,
}

/// Build the display label for a user from their stored handle.
pub fn display_label(user_id: UserId, handle: Option<&str>) -> String {
  match handle {
    Some(h) if !h.is_empty() => format!("@{h}"),
    _ => format!("User {user_id}"),
  }
}
