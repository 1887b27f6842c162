//! The membership oracle — the one external collaborator.
//!
//! The surrounding layer consults the oracle before converting a
//! verification into a referral credit; the ledger core never talks to it.

use std::future::Future;

use serde::Deserialize;
use tally_core::{UserId, membership::MembershipStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
  #[error("membership oracle request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("membership oracle returned an unexpected response: {0}")]
  Malformed(String),
}

/// Black-box membership lookup.
pub trait MembershipOracle: Send + Sync {
  fn check_membership(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<MembershipStatus, OracleError>> + Send + '_;
}

// ─── HTTP implementation ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MembershipResponse {
  status: MembershipStatus,
}

/// Queries a membership service over HTTP:
/// `GET {base_url}/members/{user_id}` returning `{"status": "..."}`.
/// A 404 means the service has never seen the user, i.e. not a member.
#[derive(Clone)]
pub struct HttpMembershipOracle {
  base_url: String,
  client:   reqwest::Client,
}

impl HttpMembershipOracle {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      base_url: base_url.into(),
      client:   reqwest::Client::new(),
    }
  }
}

impl MembershipOracle for HttpMembershipOracle {
  async fn check_membership(
    &self,
    user_id: UserId,
  ) -> Result<MembershipStatus, OracleError> {
    let url = format!(
      "{}/members/{user_id}",
      self.base_url.trim_end_matches('/')
    );
    let resp = self.client.get(&url).send().await?;

    if resp.status() == reqwest::StatusCode::NOT_FOUND {
      return Ok(MembershipStatus::NotMember);
    }
    if !resp.status().is_success() {
      return Err(OracleError::Malformed(format!(
        "status {} from {url}",
        resp.status()
      )));
    }

    let body: MembershipResponse = resp.json().await?;
    Ok(body.status)
  }
}
