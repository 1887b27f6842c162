//! The [`Ledger`] facade — the surface the dispatch layer calls into.
//!
//! Wraps any [`LedgerStore`] together with the immutable reward catalog.
//! Every method returns an explicit outcome; nothing panics across the
//! core/caller boundary, and storage faults propagate as the backend's
//! typed error.

use std::sync::Arc;

use crate::{
  UserId,
  balance::{AccountPage, AccountRow, Balance, LeaderboardEntry, LedgerStats},
  identity::{ResolvedUser, UserRef},
  referral::{CreditedReferral, ReferralEdge},
  reward::{RedemptionOutcome, RewardCatalog},
  store::{LedgerStore, RedeemAttempt},
};

/// The referral points ledger: identity store, referral ledger, balance
/// engine and redemption engine behind one handle.
///
/// Cloning is cheap; the store and catalog are shared.
pub struct Ledger<S> {
  store:   Arc<S>,
  catalog: RewardCatalog,
}

// Not derived: a derive would demand `S: Clone`, but only the `Arc` is cloned.
impl<S> Clone for Ledger<S> {
  fn clone(&self) -> Self {
    Self {
      store:   Arc::clone(&self.store),
      catalog: self.catalog.clone(),
    }
  }
}

impl<S: LedgerStore> Ledger<S> {
  pub fn new(store: Arc<S>, catalog: RewardCatalog) -> Self {
    Self { store, catalog }
  }

  pub fn catalog(&self) -> &RewardCatalog {
    &self.catalog
  }

  // ── Inbound events ────────────────────────────────────────────────────

  /// A user made contact: upsert their identity, then record a pending
  /// referral if a referrer id accompanied the contact.
  pub async fn on_contact(
    &self,
    user_id: UserId,
    handle: Option<String>,
    referrer_id: Option<UserId>,
  ) -> Result<(), S::Error> {
    self.store.record_contact(user_id, handle).await?;
    if let Some(referrer_id) = referrer_id {
      self
        .store
        .record_pending_referral(referrer_id, user_id)
        .await?;
    }
    Ok(())
  }

  /// The user passed membership verification. Returns the referrer to
  /// notify if this credited a pending edge; `None` on duplicate
  /// verification or when no referral exists.
  pub async fn on_verification_succeeded(
    &self,
    user_id: UserId,
  ) -> Result<Option<UserId>, S::Error> {
    self.store.credit_referee(user_id).await
  }

  /// Redeem `code` for `user_id`.
  ///
  /// The non-`Granted` variants of [`RedemptionOutcome`] are validation
  /// outcomes reported as ordinary values; only storage faults use the
  /// error channel.
  pub async fn redeem(
    &self,
    user_id: UserId,
    code: &str,
  ) -> Result<RedemptionOutcome, S::Error> {
    let Some(reward) = self.catalog.get(code) else {
      return Ok(RedemptionOutcome::UnknownReward);
    };

    let attempt = self.store.try_redeem(user_id, reward.clone()).await?;
    Ok(match attempt {
      RedeemAttempt::Granted => RedemptionOutcome::Granted {
        payload: reward.payload.clone(),
      },
      RedeemAttempt::AlreadyRedeemed => RedemptionOutcome::AlreadyRedeemed,
      RedeemAttempt::InsufficientBalance { available } => {
        RedemptionOutcome::InsufficientBalance {
          needed: reward.cost,
          available,
        }
      }
    })
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn balance(&self, user_id: UserId) -> Result<Balance, S::Error> {
    self.store.balance(user_id).await
  }

  pub async fn top_referrers(
    &self,
    limit: u32,
  ) -> Result<Vec<LeaderboardEntry>, S::Error> {
    self.store.top_referrers(limit).await
  }

  pub async fn resolve(
    &self,
    reference: UserRef,
  ) -> Result<Option<ResolvedUser>, S::Error> {
    self.store.resolve(reference).await
  }

  pub async fn referral_of(
    &self,
    referee_id: UserId,
  ) -> Result<Option<ReferralEdge>, S::Error> {
    self.store.referral_of(referee_id).await
  }

  pub async fn stats(&self) -> Result<LedgerStats, S::Error> {
    self.store.stats().await
  }

  pub async fn recent_credited(
    &self,
    limit: u32,
  ) -> Result<Vec<CreditedReferral>, S::Error> {
    self.store.recent_credited(limit).await
  }

  pub async fn account_page(
    &self,
    page: u32,
    size: u32,
  ) -> Result<AccountPage, S::Error> {
    self.store.account_page(page, size).await
  }

  pub async fn export_accounts(&self) -> Result<Vec<AccountRow>, S::Error> {
    self.store.export_accounts().await
  }
}
