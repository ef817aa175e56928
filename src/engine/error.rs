use thiserror::Error;

use super::policy::TimeWindow;
use crate::store::{PoolKind, StoreError};

/// Why a claim request did not produce a code.
///
/// Everything except [`ClaimError::Store`] is an expected, user-visible
/// outcome. None of them leave a code issued without a ledger record.
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("no unissued {pool} codes left")]
    OutOfStock { pool: PoolKind },

    #[error("drink requested before any discount claim today")]
    NotYetEligible,

    #[error("daily {pool} allowance already used")]
    AlreadyExhausted { pool: PoolKind },

    #[error("claims are only accepted {window}")]
    OutsideTimeWindow { window: TimeWindow },

    #[error("transient store failure: {0}")]
    Store(#[from] StoreError),
}

impl ClaimError {
    /// Short tag used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            ClaimError::OutOfStock { .. } => "out_of_stock",
            ClaimError::NotYetEligible => "not_yet_eligible",
            ClaimError::AlreadyExhausted { .. } => "already_exhausted",
            ClaimError::OutsideTimeWindow { .. } => "outside_time_window",
            ClaimError::Store(_) => "transient_store_error",
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ClaimError::Store(_))
    }
}
