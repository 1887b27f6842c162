//! Handlers for `/balances` and `/leaderboard`.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use tally_core::{
  Ledger, UserId,
  balance::{Balance, LeaderboardEntry},
  store::LedgerStore,
};

use crate::error::ApiError;

/// `GET /balances/:user_id` — earned/spent/available from one consistent
/// snapshot. Unknown users report all zeroes rather than 404: a balance is
/// a pure derivation, and a user with no history simply has nothing yet.
pub async fn get_one<S>(
  State(ledger): State<Ledger<S>>,
  Path(user_id): Path<UserId>,
) -> Result<Json<Balance>, ApiError>
where
  S: LedgerStore + 'static,
{
  let balance = ledger.balance(user_id).await.map_err(ApiError::store)?;
  Ok(Json(balance))
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
  pub limit: Option<u32>,
}

/// `GET /leaderboard[?limit=N]` — top referrers by credited count, ties
/// broken by user id ascending. Defaults to the top 10.
pub async fn leaderboard<S>(
  State(ledger): State<Ledger<S>>,
  Query(params): Query<LeaderboardParams>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError>
where
  S: LedgerStore + 'static,
{
  let limit = params.limit.unwrap_or(10);
  let top = ledger
    .top_referrers(limit)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(top))
}
