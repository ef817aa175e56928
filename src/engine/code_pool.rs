//! Allocation of pre-seeded codes.

use std::sync::Arc;

use rand::Rng;
use tokio::sync::Mutex;
use tracing::warn;

use crate::database::models::{Code, StockLevel};
use crate::store::{PoolKind, RowStore, StoreError};
use crate::utils::datetime::{format_timestamp, Clock};
use crate::utils::logging::log_database_error;

/// Sole writer of `Code.issued`.
///
/// Each pool has its own lock around the read-pick-flag sequence, and the
/// flag itself is flipped with a conditional write, so two allocations never
/// return the same code.
pub struct CodePool {
    store: Arc<dyn RowStore>,
    clock: Arc<dyn Clock>,
    discount_lock: Mutex<()>,
    drink_lock: Mutex<()>,
}

impl CodePool {
    pub fn new(store: Arc<dyn RowStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            discount_lock: Mutex::new(()),
            drink_lock: Mutex::new(()),
        }
    }

    fn lock_for(&self, pool: PoolKind) -> &Mutex<()> {
        match pool {
            PoolKind::Discount => &self.discount_lock,
            PoolKind::Drink => &self.drink_lock,
        }
    }

    /// Issues a uniformly random unissued code of `pool`.
    ///
    /// `Ok(None)` means the pool is exhausted; nothing was changed.
    pub async fn allocate(&self, pool: PoolKind) -> Result<Option<Code>, StoreError> {
        let _guard = self.lock_for(pool).lock().await;
        let mut candidates = self.store.unissued_codes(pool).await?;

        while !candidates.is_empty() {
            let index = rand::thread_rng().gen_range(0..candidates.len());
            let mut code = candidates.swap_remove(index);
            let issued_at = format_timestamp(&self.clock.now());

            if self.store.mark_issued(code.id, &issued_at).await? {
                code.issued = true;
                code.issued_at = Some(issued_at);
                return Ok(Some(code));
            }

            warn!("Code {} in pool {} was issued concurrently, retrying", code.id, pool);
        }

        Ok(None)
    }

    /// Returns a code to the pool. Only used to undo an allocation whose
    /// claim could not be recorded.
    pub async fn release(&self, code: &Code) -> Result<(), StoreError> {
        let pool = code.pool.parse::<PoolKind>().map_err(StoreError::Conflict)?;
        let _guard = self.lock_for(pool).lock().await;

        self.store.mark_unissued(code.id).await.map_err(|e| {
            log_database_error("RELEASE", "codes", &e.to_string(), Some(&code.value));
            e
        })
    }

    pub async fn stock(&self, pool: PoolKind) -> Result<StockLevel, StoreError> {
        self.store.stock(pool).await
    }
}
