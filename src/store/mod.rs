//! Row store port.
//!
//! [`RowStore`] is the narrow contract the claim engine needs from the tabular
//! datastore: read unissued codes, flip a code's issued flag with a
//! conditional write, append and read claims, and read canned messages.
//! [`crate::database::connection::DatabaseManager`] implements it over SQLite
//! and [`memory::InMemoryRowStore`] keeps everything in process memory.

pub mod memory;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::database::models::{Claim, Code, NewClaim, StockLevel};

/// Errors raised by row store adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Query or mutation failed while talking to the store.
    #[error("row store query failed: {0}")]
    Query(String),
    /// A conditional write found the row in an unexpected state.
    #[error("row store conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Query(err.to_string())
    }
}

/// A named set of pre-seeded code values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    Discount,
    Drink,
}

impl PoolKind {
    pub const ALL: [PoolKind; 2] = [PoolKind::Discount, PoolKind::Drink];

    pub fn as_str(&self) -> &'static str {
        match self {
            PoolKind::Discount => "discount",
            PoolKind::Drink => "drink",
        }
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "discount" => Ok(PoolKind::Discount),
            "drink" => Ok(PoolKind::Drink),
            other => Err(format!("Unknown code pool '{other}' (expected 'discount' or 'drink')")),
        }
    }
}

/// A named, ordered list of canned reply texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagePool {
    /// Fallback and "already claimed" chatter
    Filler,
    /// Follow-up sent after the first discount code of the day
    DrinkPrompt,
}

impl MessagePool {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessagePool::Filler => "filler",
            MessagePool::DrinkPrompt => "drink_prompt",
        }
    }
}

impl fmt::Display for MessagePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessagePool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "filler" => Ok(MessagePool::Filler),
            "drink_prompt" => Ok(MessagePool::DrinkPrompt),
            other => Err(format!(
                "Unknown message pool '{other}' (expected 'filler' or 'drink_prompt')"
            )),
        }
    }
}

/// Port over the tabular datastore.
///
/// Timestamps cross this boundary as RFC 3339 strings produced by
/// [`crate::utils::datetime::format_timestamp`], so lexical order is
/// chronological order.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// All codes of `pool` that have not been issued yet.
    async fn unissued_codes(&self, pool: PoolKind) -> Result<Vec<Code>, StoreError>;

    /// Marks a code issued if it is still unissued. Returns `false` when
    /// another caller got there first.
    async fn mark_issued(&self, code_id: i64, issued_at: &str) -> Result<bool, StoreError>;

    /// Reverts [`RowStore::mark_issued`].
    async fn mark_unissued(&self, code_id: i64) -> Result<(), StoreError>;

    async fn stock(&self, pool: PoolKind) -> Result<StockLevel, StoreError>;

    async fn insert_claim(&self, claim: NewClaim) -> Result<Claim, StoreError>;

    /// Claims of `user_id` with `from <= claimed_at < to`, in insertion order.
    async fn claims_between(
        &self,
        user_id: i64,
        from: &str,
        to: &str,
    ) -> Result<Vec<Claim>, StoreError>;

    /// Attaches a drink code to a claim that has none. Returns `false` if the
    /// claim already carries one.
    async fn set_drink_code(&self, claim_id: i64, drink_code: &str) -> Result<bool, StoreError>;

    /// Message texts of `pool`, in ascending position order.
    async fn messages(&self, pool: MessagePool) -> Result<Vec<String>, StoreError>;
}
