//! Handler for `/contacts` — inbound contact events.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tally_core::{Ledger, UserId, store::LedgerStore};

use crate::error::ApiError;

/// JSON body accepted by `POST /contacts`.
///
/// `referrer` is the raw invite-link payload as received from the transport;
/// anything that does not parse as a user id is ignored, matching the
/// lenient handling of hand-crafted links.
#[derive(Debug, Deserialize)]
pub struct ContactBody {
  pub user_id:  UserId,
  pub handle:   Option<String>,
  pub referrer: Option<String>,
}

/// `POST /contacts` — upserts the identity and records a pending referral
/// when a valid referrer id accompanies the first contact. Returns 204.
pub async fn create<S>(
  State(ledger): State<Ledger<S>>,
  Json(body): Json<ContactBody>,
) -> Result<StatusCode, ApiError>
where
  S: LedgerStore + 'static,
{
  let referrer_id: Option<UserId> =
    body.referrer.as_deref().and_then(|s| s.trim().parse().ok());

  ledger
    .on_contact(body.user_id, body.handle, referrer_id)
    .await
    .map_err(ApiError::store)?;

  Ok(StatusCode::NO_CONTENT)
}
