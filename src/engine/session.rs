//! Per-(scope, day) counters backing message rotation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::store::{MessagePool, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterScope {
    User(i64),
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CounterKey {
    pub scope: CounterScope,
    pub pool: MessagePool,
    pub day: NaiveDate,
}

/// Storage for rotation counters.
///
/// Injected into the engine so the in-memory default can be replaced by a
/// persistent implementation.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the current value for `key` and increments it.
    async fn next_counter(&self, key: &CounterKey) -> Result<u64, StoreError>;
}

/// Process-local counters, lost on restart. Counters of past days are
/// dropped as soon as a later day is seen.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    counters: Mutex<HashMap<CounterKey, u64>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.counters.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn next_counter(&self, key: &CounterKey) -> Result<u64, StoreError> {
        let mut counters = self.counters.lock().unwrap_or_else(|p| p.into_inner());
        counters.retain(|k, _| k.day >= key.day);
        let counter = counters.entry(*key).or_insert(0);
        let current = *counter;
        *counter += 1;
        Ok(current)
    }
}
