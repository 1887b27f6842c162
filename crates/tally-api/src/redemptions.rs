//! Handlers for `/redemptions` and `/rewards`.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tally_core::{
  Ledger, UserId, reward::RedemptionOutcome, store::LedgerStore,
};

use crate::error::ApiError;

// ─── Redeem ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RedeemBody {
  pub user_id:     UserId,
  pub reward_code: String,
}

/// `POST /redemptions` — attempts a redemption and returns the outcome as a
/// tagged JSON value with status 200. `unknown_reward`, `already_redeemed`
/// and `insufficient_balance` are informational outcomes, not HTTP errors;
/// only storage faults produce a 5xx.
pub async fn create<S>(
  State(ledger): State<Ledger<S>>,
  Json(body): Json<RedeemBody>,
) -> Result<Json<RedemptionOutcome>, ApiError>
where
  S: LedgerStore + 'static,
{
  let outcome = ledger
    .redeem(body.user_id, &body.reward_code)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(outcome))
}

// ─── Catalog listing ─────────────────────────────────────────────────────────

/// A catalog entry as exposed to clients. The payload is deliberately
/// omitted — it is delivered only on a successful redemption.
#[derive(Debug, Serialize)]
pub struct RewardView {
  pub code:          String,
  pub display_label: String,
  pub cost:          u32,
  pub repeatable:    bool,
}

/// `GET /rewards` — the catalog, for building redemption menus.
pub async fn list_rewards<S>(
  State(ledger): State<Ledger<S>>,
) -> Json<Vec<RewardView>>
where
  S: LedgerStore + 'static,
{
  let rewards = ledger
    .catalog()
    .iter()
    .map(|e| RewardView {
      code:          e.code.clone(),
      display_label: e.display_label.clone(),
      cost:          e.cost,
      repeatable:    e.repeatable,
    })
    .collect();
  Json(rewards)
}
