//! Handler for `/verifications` — membership-verification successes.
//!
//! The caller is responsible for having consulted the membership oracle
//! *before* posting here; this endpoint only converts a pending referral
//! into a permanent credit.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tally_core::{Ledger, UserId, store::LedgerStore};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct VerificationBody {
  pub user_id: UserId,
}

/// Response for `POST /verifications`.
#[derive(Debug, Serialize)]
pub struct VerificationResult {
  /// The referrer who just earned a point, if this verification credited a
  /// pending edge. `None` for duplicate verifications and unreferred users;
  /// the caller notifies the referrer out-of-band when set.
  pub credited_referrer: Option<UserId>,
}

/// `POST /verifications` — idempotent; of N concurrent posts for the same
/// user, exactly one response carries the referrer id.
pub async fn create<S>(
  State(ledger): State<Ledger<S>>,
  Json(body): Json<VerificationBody>,
) -> Result<Json<VerificationResult>, ApiError>
where
  S: LedgerStore + 'static,
{
  let credited_referrer = ledger
    .on_verification_succeeded(body.user_id)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(VerificationResult { credited_referrer }))
}
