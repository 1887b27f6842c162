//! HTTP service layer for Tally.
//!
//! Wires the ledger API router together with the membership-gated `/verify`
//! endpoint and the admin reporting routes, all backed by any
//! [`LedgerStore`] and any [`MembershipOracle`].

pub mod admin;
pub mod error;
pub mod oracle;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Json, Router,
  extract::State,
  routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tally_core::{
  UserId, ledger::Ledger, membership::MembershipStatus, reward::RewardEntry,
  store::LedgerStore,
};

use oracle::MembershipOracle;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:           String,
  pub port:           u16,
  pub store_path:     PathBuf,
  /// Base URL of the membership service consulted by `/verify` and the
  /// admin gate.
  pub membership_url: String,
  /// The reward catalog, fixed for the lifetime of the process.
  pub rewards:        Vec<RewardEntry>,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, O> {
  pub ledger: Ledger<S>,
  pub oracle: Arc<O>,
}

// Not derived: a derive would demand `S: Clone` and `O: Clone`.
impl<S, O> Clone for AppState<S, O> {
  fn clone(&self) -> Self {
    Self {
      ledger: self.ledger.clone(),
      oracle: Arc::clone(&self.oracle),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full axum [`Router`]: the ledger API under `/api`, membership
/// verification at `/verify`, and the admin reporting routes under `/admin`.
pub fn router<S, O>(state: AppState<S, O>) -> Router
where
  S: LedgerStore + 'static,
  O: MembershipOracle + 'static,
{
  Router::new()
    .route("/verify",                post(verify_handler::<S, O>))
    .route("/admin/dashboard",       get(admin::dashboard::<S, O>))
    .route("/admin/recent",          get(admin::recent::<S, O>))
    .route("/admin/whoinvited",      get(admin::who_invited::<S, O>))
    .route("/admin/accounts",        get(admin::accounts::<S, O>))
    .route("/admin/accounts/export", get(admin::export_csv::<S, O>))
    .with_state(state.clone())
    .nest("/api", tally_api::api_router(state.ledger))
}

// ─── Verification ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct VerifyBody {
  pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct VerifyResult {
  pub verified:          bool,
  /// Set when this verification flipped a pending referral to credited.
  pub credited_referrer: Option<UserId>,
}

/// `POST /verify` — consult the membership oracle, and on a confirmed
/// member, credit the pending referral (if one exists).
///
/// An unreachable or inconclusive oracle is a retryable 503; it is never
/// treated as "not a member", so no referral state changes on that path.
async fn verify_handler<S, O>(
  State(state): State<AppState<S, O>>,
  Json(body): Json<VerifyBody>,
) -> Result<Json<VerifyResult>, Error>
where
  S: LedgerStore + 'static,
  O: MembershipOracle + 'static,
{
  let status = match state.oracle.check_membership(body.user_id).await {
    Ok(MembershipStatus::Unknown) | Err(_) => {
      tracing::warn!(user_id = body.user_id, "membership oracle inconclusive");
      return Err(Error::Unavailable(
        "cannot verify membership right now, retry later".into(),
      ));
    }
    Ok(status) => status,
  };

  if !status.is_member() {
    return Ok(Json(VerifyResult {
      verified:          false,
      credited_referrer: None,
    }));
  }

  let credited = state
    .ledger
    .on_verification_succeeded(body.user_id)
    .await
    .map_err(Error::store)?;

  if let Some(referrer_id) = credited {
    tracing::info!(
      referee_id = body.user_id,
      referrer_id,
      "referral credited"
    );
  }

  Ok(Json(VerifyResult {
    verified:          true,
    credited_referrer: credited,
  }))
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use crate::oracle::OracleError;
  use serde_json::{Value, json};
  use tally_core::reward::RewardCatalog;
  use tally_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  /// Oracle that answers every lookup with the same status, except for a
  /// designated admin id.
  struct FixedOracle {
    status:   MembershipStatus,
    admin_id: Option<UserId>,
  }

  impl MembershipOracle for FixedOracle {
    async fn check_membership(
      &self,
      user_id: UserId,
    ) -> Result<MembershipStatus, OracleError> {
      if self.admin_id == Some(user_id) {
        return Ok(MembershipStatus::Admin);
      }
      Ok(self.status)
    }
  }

  /// Oracle that always fails, as if the membership service were down.
  struct DownOracle;

  impl MembershipOracle for DownOracle {
    async fn check_membership(
      &self,
      _user_id: UserId,
    ) -> Result<MembershipStatus, OracleError> {
      Err(OracleError::Malformed("connection refused".into()))
    }
  }

  async fn make_state<O: MembershipOracle>(
    oracle: O,
  ) -> AppState<SqliteStore, O> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let catalog = RewardCatalog::new(vec![RewardEntry {
      code:          "vip1".into(),
      display_label: "VIP for a month".into(),
      cost:          2,
      payload:       "https://example.com/vip".into(),
      repeatable:    false,
    }])
    .unwrap();
    AppState {
      ledger: Ledger::new(Arc::new(store), catalog),
      oracle: Arc::new(oracle),
    }
  }

  async fn send_json<S, O>(
    state: &AppState<S, O>,
    method: &str,
    uri: &str,
    body: Value,
  ) -> axum::response::Response
  where
    S: LedgerStore + 'static,
    O: MembershipOracle + 'static,
  {
    let req = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap();
    router(state.clone()).oneshot(req).await.unwrap()
  }

  async fn get_with_headers<S, O>(
    state: &AppState<S, O>,
    uri: &str,
    headers: Vec<(&str, &str)>,
  ) -> axum::response::Response
  where
    S: LedgerStore + 'static,
    O: MembershipOracle + 'static,
  {
    let mut builder = Request::builder().method("GET").uri(uri);
    for (k, v) in headers {
      builder = builder.header(k, v);
    }
    let req = builder.body(Body::empty()).unwrap();
    router(state.clone()).oneshot(req).await.unwrap()
  }

  async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  async fn seed_pending_referral<S, O>(state: &AppState<S, O>)
  where
    S: LedgerStore,
  {
    state
      .ledger
      .on_contact(1001, Some("alice".into()), None)
      .await
      .unwrap();
    state
      .ledger
      .on_contact(2002, Some("bob".into()), Some(1001))
      .await
      .unwrap();
  }

  // ── /verify ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn verify_member_credits_pending_referral_once() {
    let state = make_state(FixedOracle {
      status:   MembershipStatus::Member,
      admin_id: None,
    })
    .await;
    seed_pending_referral(&state).await;

    let resp =
      send_json(&state, "POST", "/verify", json!({ "user_id": 2002 })).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
      body_json(resp).await,
      json!({ "verified": true, "credited_referrer": 1001 })
    );

    // Verifying again is a no-op: the edge is already credited.
    let resp =
      send_json(&state, "POST", "/verify", json!({ "user_id": 2002 })).await;
    assert_eq!(
      body_json(resp).await,
      json!({ "verified": true, "credited_referrer": null })
    );
  }

  #[tokio::test]
  async fn verify_non_member_does_not_credit() {
    let state = make_state(FixedOracle {
      status:   MembershipStatus::NotMember,
      admin_id: None,
    })
    .await;
    seed_pending_referral(&state).await;

    let resp =
      send_json(&state, "POST", "/verify", json!({ "user_id": 2002 })).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
      body_json(resp).await,
      json!({ "verified": false, "credited_referrer": null })
    );

    // The referrer earned nothing.
    let balance = state.ledger.balance(1001).await.unwrap();
    assert_eq!(balance.earned, 0);
  }

  #[tokio::test]
  async fn verify_with_oracle_down_is_503_and_leaves_edge_pending() {
    let state = make_state(DownOracle).await;
    seed_pending_referral(&state).await;

    let resp =
      send_json(&state, "POST", "/verify", json!({ "user_id": 2002 })).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let edge = state.ledger.referral_of(2002).await.unwrap().unwrap();
    assert!(!edge.credited);
  }

  #[tokio::test]
  async fn verify_with_unknown_status_is_503() {
    let state = make_state(FixedOracle {
      status:   MembershipStatus::Unknown,
      admin_id: None,
    })
    .await;
    seed_pending_referral(&state).await;

    let resp =
      send_json(&state, "POST", "/verify", json!({ "user_id": 2002 })).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
  }

  // ── Admin gate ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn admin_routes_require_acting_user_header() {
    let state = make_state(FixedOracle {
      status:   MembershipStatus::Member,
      admin_id: Some(9),
    })
    .await;

    let resp = get_with_headers(&state, "/admin/dashboard", vec![]).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = get_with_headers(
      &state,
      "/admin/dashboard",
      vec![("x-acting-user", "not-a-number")],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn admin_routes_reject_plain_members() {
    let state = make_state(FixedOracle {
      status:   MembershipStatus::Member,
      admin_id: Some(9),
    })
    .await;

    let resp = get_with_headers(
      &state,
      "/admin/dashboard",
      vec![("x-acting-user", "42")],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn admin_routes_reject_when_oracle_is_down() {
    let state = make_state(DownOracle).await;

    let resp = get_with_headers(
      &state,
      "/admin/dashboard",
      vec![("x-acting-user", "9")],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn dashboard_reports_stats_and_leaderboard() {
    let state = make_state(FixedOracle {
      status:   MembershipStatus::Member,
      admin_id: Some(9),
    })
    .await;
    seed_pending_referral(&state).await;
    send_json(&state, "POST", "/verify", json!({ "user_id": 2002 })).await;

    let resp = get_with_headers(
      &state,
      "/admin/dashboard",
      vec![("x-acting-user", "9")],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["stats"]["credited_referrals"], json!(1));
    assert_eq!(body["top"][0]["user_id"], json!(1001));
  }

  #[tokio::test]
  async fn whoinvited_reports_the_referrer() {
    let state = make_state(FixedOracle {
      status:   MembershipStatus::Member,
      admin_id: Some(9),
    })
    .await;
    seed_pending_referral(&state).await;

    let resp = get_with_headers(
      &state,
      "/admin/whoinvited?r=%40bob",
      vec![("x-acting-user", "9")],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["referee"]["user_id"], json!(2002));
    assert_eq!(body["referrer"]["display_label"], json!("@alice"));
    assert_eq!(body["credited"], json!(false));
  }

  #[tokio::test]
  async fn whoinvited_unknown_user_is_404() {
    let state = make_state(FixedOracle {
      status:   MembershipStatus::Member,
      admin_id: Some(9),
    })
    .await;

    let resp = get_with_headers(
      &state,
      "/admin/whoinvited?r=%40ghost",
      vec![("x-acting-user", "9")],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn export_returns_csv_with_header_row() {
    let state = make_state(FixedOracle {
      status:   MembershipStatus::Member,
      admin_id: Some(9),
    })
    .await;
    seed_pending_referral(&state).await;
    send_json(&state, "POST", "/verify", json!({ "user_id": 2002 })).await;

    let resp = get_with_headers(
      &state,
      "/admin/accounts/export",
      vec![("x-acting-user", "9")],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let ct = resp
      .headers()
      .get(header::CONTENT_TYPE)
      .unwrap()
      .to_str()
      .unwrap();
    assert!(ct.starts_with("text/csv"), "Content-Type: {ct}");

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let csv = std::str::from_utf8(&bytes).unwrap();
    assert!(csv.starts_with("user_id,handle,earned,spent,available\n"));
    assert!(csv.contains("1001,alice,1,0,1"), "csv: {csv}");
  }

  // ── Nested ledger API ───────────────────────────────────────────────────────

  #[tokio::test]
  async fn ledger_api_is_nested_under_api() {
    let state = make_state(FixedOracle {
      status:   MembershipStatus::Member,
      admin_id: None,
    })
    .await;
    seed_pending_referral(&state).await;

    let resp = get_with_headers(&state, "/api/balances/1001", vec![]).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
      body_json(resp).await,
      json!({ "earned": 0, "spent": 0, "available": 0 })
    );
  }
}
