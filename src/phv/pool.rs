//! Bounded PHV allocator.
//!
//! The pool hands out PHVs for one layout and counts how many are in
//! flight. Each pooled PHV carries a lease; dropping the PHV returns the
//! slot. With no limit the pool only counts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{Phv, PhvError, PhvLayout};

/// Slot held by a pooled PHV. Released on drop.
pub(crate) struct PoolLease {
    live: Arc<AtomicUsize>,
}

impl Drop for PoolLease {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }
}

/// PHV allocator with an optional in-flight limit.
#[derive(Debug, Clone)]
pub struct PhvPool {
    layout: Arc<PhvLayout>,
    limit: Option<usize>,
    live: Arc<AtomicUsize>,
}

impl PhvPool {
    /// Create a pool for `layout`. `None` means unbounded.
    pub fn new(layout: Arc<PhvLayout>, limit: Option<usize>) -> Self {
        Self {
            layout,
            limit,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Allocate a zeroed PHV.
    pub fn allocate(&self) -> Result<Phv, PhvError> {
        let lease = self.acquire()?;
        Ok(Phv::with_lease(self.layout.clone(), lease))
    }

    /// Allocate a PHV holding a copy of `source`.
    pub fn allocate_copy(&self, source: &Phv) -> Result<Phv, PhvError> {
        let mut phv = self.allocate()?;
        phv.copy_fields_from(source)?;
        Ok(phv)
    }

    /// Number of pooled PHVs currently alive.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Configured limit.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Layout of every PHV this pool hands out.
    pub fn layout(&self) -> &Arc<PhvLayout> {
        &self.layout
    }

    fn acquire(&self) -> Result<PoolLease, PhvError> {
        let limit = self.limit;
        self.live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| match limit {
                Some(limit) if live >= limit => None,
                _ => Some(live + 1),
            })
            .map_err(|_| {
                let limit = limit.unwrap_or(usize::MAX);
                log::warn!("PHV pool exhausted at {} PHVs", limit);
                PhvError::PoolExhausted { limit }
            })?;
        Ok(PoolLease { live: self.live.clone() })
    }
}
