//! [`SqliteStore`] — the SQLite implementation of [`LedgerStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use tally_core::{
  UserId,
  balance::{AccountPage, AccountRow, Balance, LeaderboardEntry, LedgerStats},
  identity::{ResolvedUser, UserRef, display_label},
  referral::{CreditedReferral, ReferralEdge},
  reward::RewardEntry,
  store::{LedgerStore, RedeemAttempt},
};

use crate::{
  Error, Result,
  encode::{RawCredited, RawEdge, encode_dt},
  schema::SCHEMA,
};

/// Upper bound on page size and list limits, mirroring the command layer's
/// historical clamp.
const MAX_PAGE_SIZE: u32 = 200;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tally ledger backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All
/// statements against one store run serialised on the connection's worker
/// thread, and the concurrency-critical operations are additionally written
/// as single indivisible statements or transactions so they stay safe even
/// against other connections to the same file.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Account-table query ─────────────────────────────────────────────────────

/// The derived per-user totals, one row per known user. `available` is
/// floored at zero in SQL so the sort order matches what callers see.
const ACCOUNT_ROWS_SQL: &str = "
  SELECT u.user_id,
         u.handle,
         COALESCE(t.earned, 0) AS earned,
         COALESCE(s.spent, 0)  AS spent,
         MAX(COALESCE(t.earned, 0) - COALESCE(s.spent, 0), 0) AS available
  FROM users u
  LEFT JOIN (
    SELECT referrer_id, COUNT(*) AS earned
    FROM referrals WHERE credited = 1 GROUP BY referrer_id
  ) t ON t.referrer_id = u.user_id
  LEFT JOIN (
    SELECT user_id, SUM(cost) AS spent
    FROM redemptions GROUP BY user_id
  ) s ON s.user_id = u.user_id
  ORDER BY available DESC, earned DESC, u.user_id ASC";

fn account_row_from(row: &rusqlite::Row<'_>) -> rusqlite::Result<AccountRow> {
  let earned: i64 = row.get(2)?;
  let spent: i64 = row.get(3)?;
  let available: i64 = row.get(4)?;
  Ok(AccountRow {
    user_id:   row.get(0)?,
    handle:    row.get(1)?,
    earned:    earned as u64,
    spent:     spent as u64,
    available: available as u64,
  })
}

// ─── LedgerStore impl ────────────────────────────────────────────────────────

impl LedgerStore for SqliteStore {
  type Error = Error;

  // ── Identity ──────────────────────────────────────────────────────────────

  async fn record_contact(
    &self,
    user_id: UserId,
    handle: Option<String>,
  ) -> Result<()> {
    let first_seen = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, handle, first_seen) VALUES (?1, ?2, ?3)
           ON CONFLICT(user_id) DO UPDATE SET handle = excluded.handle",
          rusqlite::params![user_id, handle, first_seen],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn resolve(&self, reference: UserRef) -> Result<Option<ResolvedUser>> {
    let row: Option<(i64, Option<String>)> = self
      .conn
      .call(move |conn| {
        let row = match reference {
          UserRef::Handle(handle) => conn
            .query_row(
              "SELECT user_id, handle FROM users
               WHERE handle IS NOT NULL AND lower(handle) = lower(?1)
               LIMIT 1",
              rusqlite::params![handle],
              |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?,
          UserRef::Id(id) => conn
            .query_row(
              "SELECT user_id, handle FROM users WHERE user_id = ?1",
              rusqlite::params![id],
              |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?,
        };
        Ok(row)
      })
      .await?;

    Ok(row.map(|(user_id, handle)| ResolvedUser {
      user_id,
      display_label: display_label(user_id, handle.as_deref()),
    }))
  }

  // ── Referral ledger ───────────────────────────────────────────────────────

  async fn record_pending_referral(
    &self,
    referrer_id: UserId,
    referee_id: UserId,
  ) -> Result<()> {
    // Self-referral edges are never created.
    if referrer_id == referee_id {
      return Ok(());
    }
    let created_at = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        // Conditional insert: a referee who already has any edge keeps it.
        conn.execute(
          "INSERT OR IGNORE INTO referrals
             (referrer_id, referee_id, credited, created_at)
           VALUES (?1, ?2, 0, ?3)",
          rusqlite::params![referrer_id, referee_id, created_at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn credit_referee(&self, referee_id: UserId) -> Result<Option<UserId>> {
    // Read-check-flip as one indivisible statement: of N concurrent calls
    // for the same referee, exactly one sees a row come back.
    let referrer: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "UPDATE referrals SET credited = 1
               WHERE referee_id = ?1 AND credited = 0
               RETURNING referrer_id",
              rusqlite::params![referee_id],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(referrer)
  }

  async fn referral_of(&self, referee_id: UserId) -> Result<Option<ReferralEdge>> {
    let raw: Option<RawEdge> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT referrer_id, referee_id, credited, created_at
               FROM referrals WHERE referee_id = ?1",
              rusqlite::params![referee_id],
              |row| {
                Ok(RawEdge {
                  referrer_id: row.get(0)?,
                  referee_id:  row.get(1)?,
                  credited:    row.get(2)?,
                  created_at:  row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEdge::into_edge).transpose()
  }

  // ── Balance engine ────────────────────────────────────────────────────────

  async fn balance(&self, user_id: UserId) -> Result<Balance> {
    // Both aggregates inside one transaction: a single consistent snapshot.
    let (earned, spent): (i64, i64) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let earned: i64 = tx.query_row(
          "SELECT COUNT(*) FROM referrals
           WHERE referrer_id = ?1 AND credited = 1",
          rusqlite::params![user_id],
          |r| r.get(0),
        )?;
        let spent: i64 = tx.query_row(
          "SELECT COALESCE(SUM(cost), 0) FROM redemptions WHERE user_id = ?1",
          rusqlite::params![user_id],
          |r| r.get(0),
        )?;
        tx.commit()?;
        Ok((earned, spent))
      })
      .await?;

    Ok(Balance::from_totals(earned as u64, spent as u64))
  }

  async fn top_referrers(&self, limit: u32) -> Result<Vec<LeaderboardEntry>> {
    let limit = limit.min(MAX_PAGE_SIZE) as i64;

    let entries: Vec<LeaderboardEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT r.referrer_id, u.handle, COUNT(*) AS earned
           FROM referrals r
           LEFT JOIN users u ON u.user_id = r.referrer_id
           WHERE r.credited = 1
           GROUP BY r.referrer_id
           ORDER BY earned DESC, r.referrer_id ASC
           LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit], |row| {
            let earned: i64 = row.get(2)?;
            Ok(LeaderboardEntry {
              user_id: row.get(0)?,
              handle:  row.get(1)?,
              earned:  earned as u64,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(entries)
  }

  // ── Redemption engine ─────────────────────────────────────────────────────

  async fn try_redeem(
    &self,
    user_id: UserId,
    reward: RewardEntry,
  ) -> Result<RedeemAttempt> {
    let created_at = encode_dt(Utc::now());

    let attempt: RedeemAttempt = self
      .conn
      .call(move |conn| {
        // IMMEDIATE: take the write lock up front so the check, the balance
        // gate, and the insert see one state.
        let tx =
          conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !reward.repeatable {
          let exists = tx
            .query_row(
              "SELECT 1 FROM redemptions
               WHERE user_id = ?1 AND reward_code = ?2 LIMIT 1",
              rusqlite::params![user_id, reward.code],
              |_| Ok(()),
            )
            .optional()?
            .is_some();
          if exists {
            return Ok(RedeemAttempt::AlreadyRedeemed);
          }
        }

        let earned: i64 = tx.query_row(
          "SELECT COUNT(*) FROM referrals
           WHERE referrer_id = ?1 AND credited = 1",
          rusqlite::params![user_id],
          |r| r.get(0),
        )?;
        let spent: i64 = tx.query_row(
          "SELECT COALESCE(SUM(cost), 0) FROM redemptions WHERE user_id = ?1",
          rusqlite::params![user_id],
          |r| r.get(0),
        )?;
        let available = (earned - spent).max(0) as u64;
        if available < u64::from(reward.cost) {
          return Ok(RedeemAttempt::InsufficientBalance { available });
        }

        // The partial unique index is the true guard against the
        // check-then-act race; a conflict here is the normal
        // already-redeemed path, not a fault.
        let inserted = tx.execute(
          "INSERT INTO redemptions
             (user_id, reward_code, cost, repeatable, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            user_id,
            reward.code,
            reward.cost,
            reward.repeatable,
            created_at,
          ],
        );
        match inserted {
          Ok(_) => {}
          Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
          {
            return Ok(RedeemAttempt::AlreadyRedeemed);
          }
          Err(e) => return Err(e.into()),
        }

        tx.commit()?;
        Ok(RedeemAttempt::Granted)
      })
      .await?;

    Ok(attempt)
  }

  // ── Reporting views ───────────────────────────────────────────────────────

  async fn stats(&self) -> Result<LedgerStats> {
    let (users, credited, pending): (i64, i64, i64) = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        let users: i64 =
          tx.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
        let credited: i64 = tx.query_row(
          "SELECT COUNT(*) FROM referrals WHERE credited = 1",
          [],
          |r| r.get(0),
        )?;
        let pending: i64 = tx.query_row(
          "SELECT COUNT(*) FROM referrals WHERE credited = 0",
          [],
          |r| r.get(0),
        )?;
        tx.commit()?;
        Ok((users, credited, pending))
      })
      .await?;

    Ok(LedgerStats {
      total_users:        users as u64,
      credited_referrals: credited as u64,
      pending_referrals:  pending as u64,
    })
  }

  async fn recent_credited(&self, limit: u32) -> Result<Vec<CreditedReferral>> {
    let limit = limit.min(MAX_PAGE_SIZE) as i64;

    let raws: Vec<RawCredited> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT referrer_id, referee_id, created_at
           FROM referrals
           WHERE credited = 1
           ORDER BY created_at DESC, id DESC
           LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit], |row| {
            Ok(RawCredited {
              referrer_id: row.get(0)?,
              referee_id:  row.get(1)?,
              created_at:  row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCredited::into_credited).collect()
  }

  async fn account_page(&self, page: u32, size: u32) -> Result<AccountPage> {
    let page = page.max(1);
    let size = size.clamp(1, MAX_PAGE_SIZE);
    let offset = i64::from(page - 1) * i64::from(size);
    let limit = i64::from(size);

    let (rows, total): (Vec<AccountRow>, i64) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let total: i64 =
          tx.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;

        let sql = format!("{ACCOUNT_ROWS_SQL} LIMIT ?1 OFFSET ?2");
        let mut stmt = tx.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![limit, offset], account_row_from)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);

        tx.commit()?;
        Ok((rows, total))
      })
      .await?;

    let total_users = total as u64;
    let pages = (total_users.div_ceil(u64::from(size)).max(1)) as u32;

    Ok(AccountPage {
      rows,
      page,
      pages,
      total_users,
    })
  }

  async fn export_accounts(&self) -> Result<Vec<AccountRow>> {
    let rows: Vec<AccountRow> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(ACCOUNT_ROWS_SQL)?;
        let rows = stmt
          .query_map([], account_row_from)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(rows)
  }
}
