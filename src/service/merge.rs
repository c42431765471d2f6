//! Login-time reconciliation of the anonymous cart into the account cart.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use super::VariantLocks;
use crate::domain::{
    AccountId, CartLine, Holder, SessionCart, SessionKey, SessionLine, VariantId,
};
use crate::error::Result;
use crate::store::{CartStore, CatalogStore, ReservationStore};

/// Typed login notification emitted by the identity service.
#[derive(Debug, Clone)]
pub struct LoginEvent {
    pub account: AccountId,
    pub session_key: SessionKey,
}

/// What the merge did, for logging and observability.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Variants whose quantities combined in full.
    pub merged: Vec<VariantId>,
    /// Variants clamped to the quantity that actually fit.
    pub clamped: Vec<(VariantId, u32)>,
    /// Variants skipped (gone from the catalog, or a per-line failure).
    pub skipped: Vec<VariantId>,
}

enum LineOutcome {
    Merged,
    Clamped(u32),
    Skipped,
}

/// The registered login handler: folds the session cart into the durable
/// account cart and re-keys reservations from the session to the account.
///
/// Quantities combine additively - a shopper may have items in an old account
/// cart and in the new anonymous session, and both survive. The merge is a
/// best-effort convenience, not a transactional guarantee: every failure is
/// logged and swallowed, because login must never be blocked by cart
/// reconciliation.
pub struct CartMerger<S> {
    store: Arc<S>,
    locks: Arc<VariantLocks>,
    hold: Duration,
}

impl<S> CartMerger<S>
where
    S: CatalogStore + ReservationStore + CartStore,
{
    /// Create a merger with the given reservation hold duration.
    pub fn new(store: Arc<S>, locks: Arc<VariantLocks>, hold: Duration) -> Self {
        Self { store, locks, hold }
    }

    /// Handle one login event. Never returns an error; per-line failures are
    /// logged and folded into the report.
    pub async fn handle_login(&self, event: &LoginEvent, session: &mut SessionCart) -> MergeReport {
        let mut report = MergeReport::default();
        if session.is_empty() {
            return report;
        }

        let account_holder = Holder::Account(event.account.clone());
        let session_holder = Holder::Session(event.session_key.clone());

        let entries: Vec<(VariantId, SessionLine)> = session
            .iter()
            .map(|(id, line)| (id.clone(), line.clone()))
            .collect();

        for (variant_id, line) in entries {
            match self
                .merge_line(&event.account, &account_holder, &session_holder, &variant_id, &line)
                .await
            {
                Ok(LineOutcome::Merged) => report.merged.push(variant_id),
                Ok(LineOutcome::Clamped(kept)) => {
                    info!(variant = %variant_id, kept, "merge clamped to available stock");
                    report.clamped.push((variant_id, kept));
                }
                Ok(LineOutcome::Skipped) => report.skipped.push(variant_id),
                Err(err) => {
                    // Never let a merge failure escape into the login flow.
                    warn!(variant = %variant_id, error = %err, "cart merge line failed");
                    report.skipped.push(variant_id);
                }
            }
        }

        // Rewrite the session to mirror the post-merge durable cart so the
        // same browser session sees consistent totals without a reload.
        match self.store.lines(&event.account).await {
            Ok(lines) => {
                session.clear();
                for line in lines {
                    let mirror = line.to_session_line();
                    session.upsert(line.variant_id.clone(), mirror);
                }
            }
            Err(err) => warn!(error = %err, "failed to mirror merged cart into session"),
        }

        report
    }

    async fn merge_line(
        &self,
        account: &AccountId,
        account_holder: &Holder,
        session_holder: &Holder,
        variant_id: &VariantId,
        line: &SessionLine,
    ) -> Result<LineOutcome> {
        let Some(variant) = self.store.variant(variant_id).await? else {
            return Ok(LineOutcome::Skipped);
        };

        let _guard = self.locks.acquire(variant_id).await;

        let existing = self
            .store
            .line(account, variant_id)
            .await?
            .map_or(0, |l| l.quantity);
        let wanted = existing + line.quantity;

        // Availability excluding both of the shopper's identities: the
        // session hold is about to transfer to the account.
        let now = Utc::now();
        let total = self.store.reserved_total(variant_id).await?;
        let own_account = self
            .store
            .reservation(variant_id, account_holder)
            .await?
            .filter(|r| r.is_active(now))
            .map_or(0, |r| r.quantity);
        let own_session = self
            .store
            .reservation(variant_id, session_holder)
            .await?
            .filter(|r| r.is_active(now))
            .map_or(0, |r| r.quantity);
        let others = total.saturating_sub(own_account).saturating_sub(own_session);
        let available = variant.stock.saturating_sub(others);

        // Best-effort union: clamp instead of failing the login.
        let granted = wanted.min(available);
        if granted == 0 {
            self.store.release(variant_id, session_holder).await?;
            self.store.release(variant_id, account_holder).await?;
            self.store.delete_line(account, variant_id).await?;
            return Ok(LineOutcome::Clamped(0));
        }

        let mut merged = CartLine::from_session(variant_id.clone(), line);
        merged.quantity = granted;
        merged.added_at = now;
        self.store.save_line(account, &merged).await?;
        self.store
            .re_key(variant_id, session_holder, account_holder, granted, self.hold)
            .await?;

        if granted == wanted {
            Ok(LineOutcome::Merged)
        } else {
            Ok(LineOutcome::Clamped(granted))
        }
    }
}
