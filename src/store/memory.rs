//! In-process [`RowStore`] used for tests and dry runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{MessagePool, PoolKind, RowStore, StoreError};
use crate::database::models::{Claim, Code, NewClaim, StockLevel};

#[derive(Debug, Default)]
struct State {
    codes: Vec<Code>,
    claims: Vec<Claim>,
    messages: Vec<(MessagePool, String)>,
}

#[derive(Debug, Default)]
pub struct InMemoryRowStore {
    state: Mutex<State>,
    fail_claim_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl InMemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn seed_codes<I, S>(&self, pool: PoolKind, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state();
        for value in values {
            let value = value.into();
            if state.codes.iter().any(|c| c.pool == pool.as_str() && c.value == value) {
                continue;
            }
            let id = state.codes.len() as i64 + 1;
            state.codes.push(Code {
                id,
                pool: pool.as_str().to_string(),
                value,
                issued: false,
                issued_at: None,
            });
        }
    }

    pub fn seed_messages<I, S>(&self, pool: MessagePool, texts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state();
        state.messages.retain(|(p, _)| *p != pool);
        state.messages.extend(texts.into_iter().map(|t| (pool, t.into())));
    }

    pub fn issued_values(&self, pool: PoolKind) -> Vec<String> {
        self.state()
            .codes
            .iter()
            .filter(|c| c.pool == pool.as_str() && c.issued)
            .map(|c| c.value.clone())
            .collect()
    }

    pub fn claims(&self) -> Vec<Claim> {
        self.state().claims.clone()
    }

    /// Makes claim inserts and drink-code updates fail, to exercise rollback paths.
    pub fn set_fail_claim_writes(&self, fail: bool) {
        self.fail_claim_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every read fail, as if the store were unreachable.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_claim_write(&self) -> Result<(), StoreError> {
        if self.fail_claim_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Query("claim writes are disabled".to_string()));
        }
        Ok(())
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Query("store is unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RowStore for InMemoryRowStore {
    async fn unissued_codes(&self, pool: PoolKind) -> Result<Vec<Code>, StoreError> {
        self.check_read()?;
        Ok(self
            .state()
            .codes
            .iter()
            .filter(|c| c.pool == pool.as_str() && !c.issued)
            .cloned()
            .collect())
    }

    async fn mark_issued(&self, code_id: i64, issued_at: &str) -> Result<bool, StoreError> {
        let mut state = self.state();
        match state.codes.iter_mut().find(|c| c.id == code_id) {
            Some(code) if !code.issued => {
                code.issued = true;
                code.issued_at = Some(issued_at.to_string());
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(StoreError::Conflict(format!("code {code_id} does not exist"))),
        }
    }

    async fn mark_unissued(&self, code_id: i64) -> Result<(), StoreError> {
        let mut state = self.state();
        let code = state
            .codes
            .iter_mut()
            .find(|c| c.id == code_id)
            .ok_or_else(|| StoreError::Conflict(format!("code {code_id} does not exist")))?;
        code.issued = false;
        code.issued_at = None;
        Ok(())
    }

    async fn stock(&self, pool: PoolKind) -> Result<StockLevel, StoreError> {
        self.check_read()?;
        let state = self.state();
        let mut level = StockLevel::default();
        for code in state.codes.iter().filter(|c| c.pool == pool.as_str()) {
            if code.issued {
                level.issued += 1;
            } else {
                level.available += 1;
            }
        }
        Ok(level)
    }

    async fn insert_claim(&self, claim: NewClaim) -> Result<Claim, StoreError> {
        self.check_claim_write()?;
        let mut state = self.state();
        let claim = claim.into_claim(state.claims.len() as i64 + 1);
        state.claims.push(claim.clone());
        Ok(claim)
    }

    async fn claims_between(
        &self,
        user_id: i64,
        from: &str,
        to: &str,
    ) -> Result<Vec<Claim>, StoreError> {
        self.check_read()?;
        Ok(self
            .state()
            .claims
            .iter()
            .filter(|c| {
                c.user_id == user_id && c.claimed_at.as_str() >= from && c.claimed_at.as_str() < to
            })
            .cloned()
            .collect())
    }

    async fn set_drink_code(&self, claim_id: i64, drink_code: &str) -> Result<bool, StoreError> {
        self.check_claim_write()?;
        let mut state = self.state();
        match state.claims.iter_mut().find(|c| c.id == claim_id) {
            Some(claim) if claim.drink_code.is_none() => {
                claim.drink_code = Some(drink_code.to_string());
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(StoreError::Conflict(format!("claim {claim_id} does not exist"))),
        }
    }

    async fn messages(&self, pool: MessagePool) -> Result<Vec<String>, StoreError> {
        self.check_read()?;
        Ok(self
            .state()
            .messages
            .iter()
            .filter(|(p, _)| *p == pool)
            .map(|(_, text)| text.clone())
            .collect())
    }
}
