//! Per-variant serialization of the availability check-and-write.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::VariantId;

/// Keyed async mutexes, one per variant.
///
/// The admission check ("available = stock − others' holds") and the write
/// that follows it must not interleave for the same variant, or two
/// concurrent requests can both observe stale availability and oversubscribe
/// stock. In this single-node deployment a per-variant mutex is the
/// serialization primitive; the guard must be held from the first read to the
/// last write of the critical section.
#[derive(Debug, Default)]
pub struct VariantLocks {
    locks: DashMap<VariantId, Arc<Mutex<()>>>,
}

impl VariantLocks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one variant.
    pub async fn acquire(&self, variant_id: &VariantId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(variant_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Acquire the locks for a set of variants, in sorted order so two
    /// multi-variant holders (e.g. concurrent checkouts) can never deadlock.
    pub async fn acquire_all(&self, variant_ids: &[VariantId]) -> Vec<OwnedMutexGuard<()>> {
        let mut ids = variant_ids.to_vec();
        ids.sort();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in &ids {
            guards.push(self.acquire(id).await);
        }
        guards
    }
}
