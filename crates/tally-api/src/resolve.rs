//! Handler for `/resolve` — operator reference lookup.

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use tally_core::{Ledger, identity::{ResolvedUser, UserRef}, store::LedgerStore};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ResolveParams {
  /// `@handle` or a numeric user id.
  pub r: String,
}

/// `GET /resolve?r=<@handle|id>` — 404 when the reference matches no known
/// user (a normal outcome, reported as such), 400 when it is not a
/// reference at all.
pub async fn handler<S>(
  State(ledger): State<Ledger<S>>,
  Query(params): Query<ResolveParams>,
) -> Result<Json<ResolvedUser>, ApiError>
where
  S: LedgerStore + 'static,
{
  let reference = UserRef::parse(&params.r).ok_or_else(|| {
    ApiError::BadRequest(format!("not a user reference: {:?}", params.r))
  })?;

  let resolved = ledger
    .resolve(reference)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("no user matches {:?}", params.r)))?;

  Ok(Json(resolved))
}
