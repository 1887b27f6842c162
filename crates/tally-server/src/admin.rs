//! Admin reporting routes.
//!
//! Every handler here is gated on the membership oracle reporting the acting
//! user as an admin or owner of the gated resource — mirroring how the
//! original operator commands were restricted to channel admins. The acting
//! user is identified by the `x-acting-user` header.

use axum::{
  Json,
  extract::{Query, State},
  http::{HeaderMap, header},
  response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_core::{
  UserId,
  balance::{AccountPage, AccountRow, LeaderboardEntry, LedgerStats},
  identity::{ResolvedUser, UserRef, display_label},
  membership::MembershipStatus,
  referral::CreditedReferral,
  store::LedgerStore,
};

use crate::{AppState, error::Error, oracle::MembershipOracle};

// ─── Gate ────────────────────────────────────────────────────────────────────

/// Check that the `x-acting-user` header names an oracle-reported admin.
/// An unreachable oracle counts as not-admin here; reporting access fails
/// closed, unlike member verification which is surfaced as retryable.
async fn require_admin<S, O>(
  state: &AppState<S, O>,
  headers: &HeaderMap,
) -> Result<(), Error>
where
  S: LedgerStore + 'static,
  O: MembershipOracle,
{
  let acting = headers
    .get("x-acting-user")
    .and_then(|v| v.to_str().ok())
    .ok_or_else(|| Error::Unauthorized("missing x-acting-user header".into()))?;

  let user_id: UserId = acting
    .trim()
    .parse()
    .map_err(|_| Error::BadRequest(format!("invalid x-acting-user: {acting:?}")))?;

  let status = state
    .oracle
    .check_membership(user_id)
    .await
    .unwrap_or(MembershipStatus::Unknown);

  if status.is_admin() {
    Ok(())
  } else {
    Err(Error::Forbidden("admins only".into()))
  }
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Dashboard {
  pub stats: LedgerStats,
  pub top:   Vec<LeaderboardEntry>,
}

/// `GET /admin/dashboard` — aggregate counts plus the top-10 leaderboard.
pub async fn dashboard<S, O>(
  State(state): State<AppState<S, O>>,
  headers: HeaderMap,
) -> Result<Json<Dashboard>, Error>
where
  S: LedgerStore + 'static,
  O: MembershipOracle + 'static,
{
  require_admin(&state, &headers).await?;

  let stats = state.ledger.stats().await.map_err(Error::store)?;
  let top = state.ledger.top_referrers(10).await.map_err(Error::store)?;
  Ok(Json(Dashboard { stats, top }))
}

// ─── Recent credits ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RecentParams {
  pub limit: Option<u32>,
}

/// `GET /admin/recent[?limit=N]` — newest credited referrals first.
pub async fn recent<S, O>(
  State(state): State<AppState<S, O>>,
  headers: HeaderMap,
  Query(params): Query<RecentParams>,
) -> Result<Json<Vec<CreditedReferral>>, Error>
where
  S: LedgerStore + 'static,
  O: MembershipOracle + 'static,
{
  require_admin(&state, &headers).await?;

  let rows = state
    .ledger
    .recent_credited(params.limit.unwrap_or(30))
    .await
    .map_err(Error::store)?;
  Ok(Json(rows))
}

// ─── Who invited ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WhoInvitedParams {
  /// `@handle` or a numeric user id.
  pub r: String,
}

#[derive(Debug, Serialize)]
pub struct WhoInvited {
  pub referee:    ResolvedUser,
  pub referrer:   ResolvedUser,
  pub credited:   bool,
  pub created_at: DateTime<Utc>,
}

/// `GET /admin/whoinvited?r=<@handle|id>` — the referee's referral record.
pub async fn who_invited<S, O>(
  State(state): State<AppState<S, O>>,
  headers: HeaderMap,
  Query(params): Query<WhoInvitedParams>,
) -> Result<Json<WhoInvited>, Error>
where
  S: LedgerStore + 'static,
  O: MembershipOracle + 'static,
{
  require_admin(&state, &headers).await?;

  let reference = UserRef::parse(&params.r).ok_or_else(|| {
    Error::BadRequest(format!("not a user reference: {:?}", params.r))
  })?;

  let referee = state
    .ledger
    .resolve(reference)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound(format!("no user matches {:?}", params.r)))?;

  let edge = state
    .ledger
    .referral_of(referee.user_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| {
      Error::NotFound(format!("{} has no referral record", referee.display_label))
    })?;

  // The referrer may predate identity tracking; fall back to a placeholder.
  let referrer = state
    .ledger
    .resolve(UserRef::Id(edge.referrer_id))
    .await
    .map_err(Error::store)?
    .unwrap_or_else(|| ResolvedUser {
      user_id:       edge.referrer_id,
      display_label: display_label(edge.referrer_id, None),
    });

  Ok(Json(WhoInvited {
    referee,
    referrer,
    credited: edge.credited,
    created_at: edge.created_at,
  }))
}

// ─── Account table ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AccountsParams {
  pub page: Option<u32>,
  pub size: Option<u32>,
}

/// `GET /admin/accounts[?page=P][&size=N]` — the paginated account table,
/// ordered by `available DESC, earned DESC, user_id ASC`.
pub async fn accounts<S, O>(
  State(state): State<AppState<S, O>>,
  headers: HeaderMap,
  Query(params): Query<AccountsParams>,
) -> Result<Json<AccountPage>, Error>
where
  S: LedgerStore + 'static,
  O: MembershipOracle + 'static,
{
  require_admin(&state, &headers).await?;

  let page = state
    .ledger
    .account_page(params.page.unwrap_or(1), params.size.unwrap_or(20))
    .await
    .map_err(Error::store)?;
  Ok(Json(page))
}

// ─── CSV export ──────────────────────────────────────────────────────────────

fn csv_field(s: &str) -> String {
  if s.contains(',') || s.contains('"') || s.contains('\n') {
    format!("\"{}\"", s.replace('"', "\"\""))
  } else {
    s.to_string()
  }
}

fn accounts_csv(rows: &[AccountRow]) -> String {
  let mut out = String::from("user_id,handle,earned,spent,available\n");
  for r in rows {
    let handle = r.handle.as_deref().unwrap_or("");
    out.push_str(&format!(
      "{},{},{},{},{}\n",
      r.user_id,
      csv_field(handle),
      r.earned,
      r.spent,
      r.available
    ));
  }
  out
}

/// `GET /admin/accounts/export` — the full table as CSV, same order as the
/// paginated view.
pub async fn export_csv<S, O>(
  State(state): State<AppState<S, O>>,
  headers: HeaderMap,
) -> Result<Response, Error>
where
  S: LedgerStore + 'static,
  O: MembershipOracle + 'static,
{
  require_admin(&state, &headers).await?;

  let rows = state.ledger.export_accounts().await.map_err(Error::store)?;
  let body = accounts_csv(&rows);

  Ok(
    (
      [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
      body,
    )
      .into_response(),
  )
}
