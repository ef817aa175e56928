//! Deterministic-then-random selection of canned messages.

use std::sync::Arc;

use rand::Rng;

use super::session::{CounterKey, SessionStore};
use crate::store::{RowStore, StoreError};

pub struct MessageRotator {
    store: Arc<dyn RowStore>,
    sessions: Arc<dyn SessionStore>,
}

impl MessageRotator {
    pub fn new(store: Arc<dyn RowStore>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { store, sessions }
    }

    /// Next message of `key.pool` for the counter identified by `key`.
    ///
    /// The counter advances on every call, including when the pool is empty.
    /// Nothing advances if the messages cannot be read.
    pub async fn next(
        &self,
        key: &CounterKey,
        fixed_count: usize,
    ) -> Result<Option<String>, StoreError> {
        let messages = self.store.messages(key.pool).await?;
        let counter = self.sessions.next_counter(key).await?;
        Ok(pick(&messages, counter, fixed_count).cloned())
    }
}

/// The first `fixed_count` counter values map to the messages at those
/// positions; later values pick uniformly among the rest. A pool with at most
/// `fixed_count` messages always yields its first message.
pub fn pick(messages: &[String], counter: u64, fixed_count: usize) -> Option<&String> {
    if messages.len() <= fixed_count {
        return messages.first();
    }

    match usize::try_from(counter) {
        Ok(index) if index < fixed_count => messages.get(index),
        _ => {
            let index = rand::thread_rng().gen_range(fixed_count..messages.len());
            messages.get(index)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::session::{CounterScope, InMemorySessionStore};
    use crate::store::memory::InMemoryRowStore;
    use crate::store::MessagePool;
    use chrono::NaiveDate;

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("m{i}")).collect()
    }

    #[test]
    fn fixed_prefix_is_served_in_order() {
        let messages = texts(5);
        assert_eq!(pick(&messages, 0, 3).unwrap(), "m0");
        assert_eq!(pick(&messages, 1, 3).unwrap(), "m1");
        assert_eq!(pick(&messages, 2, 3).unwrap(), "m2");
    }

    #[test]
    fn random_phase_only_uses_the_remainder() {
        let messages = texts(5);
        for counter in 3..200 {
            let picked = pick(&messages, counter, 3).unwrap();
            assert!(picked == "m3" || picked == "m4", "unexpected {picked}");
        }
    }

    #[test]
    fn small_pool_always_returns_first() {
        let messages = texts(2);
        for counter in 0..10 {
            assert_eq!(pick(&messages, counter, 3).unwrap(), "m0");
        }
        assert!(pick(&[], 0, 3).is_none());
    }

    #[tokio::test]
    async fn rotator_advances_the_counter() {
        let store = Arc::new(InMemoryRowStore::new());
        store.seed_messages(MessagePool::Filler, texts(4));
        let sessions = Arc::new(InMemorySessionStore::new());
        let rotator = MessageRotator::new(store, sessions);
        let key = CounterKey {
            scope: CounterScope::User(42),
            pool: MessagePool::Filler,
            day: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        };

        assert_eq!(rotator.next(&key, 2).await.unwrap().as_deref(), Some("m0"));
        assert_eq!(rotator.next(&key, 2).await.unwrap().as_deref(), Some("m1"));
        let third = rotator.next(&key, 2).await.unwrap().unwrap();
        assert!(third == "m2" || third == "m3");
    }

    #[tokio::test]
    async fn failed_read_leaves_counter_untouched() {
        let store = Arc::new(InMemoryRowStore::new());
        store.seed_messages(MessagePool::Filler, texts(4));
        let sessions = Arc::new(InMemorySessionStore::new());
        let rotator = MessageRotator::new(store.clone(), sessions.clone());
        let key = CounterKey {
            scope: CounterScope::Global,
            pool: MessagePool::Filler,
            day: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        };

        store.set_fail_reads(true);
        assert!(rotator.next(&key, 2).await.is_err());
        assert!(sessions.is_empty());

        store.set_fail_reads(false);
        assert_eq!(rotator.next(&key, 2).await.unwrap().as_deref(), Some("m0"));
    }
}
