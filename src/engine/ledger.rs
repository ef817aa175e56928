use std::sync::Arc;

use chrono::FixedOffset;

use super::Claimant;
use crate::database::models::{Claim, NewClaim};
use crate::store::{RowStore, StoreError};
use crate::utils::datetime::{format_timestamp, Clock, ReferenceDay};

/// Sole writer of claims; answers "what did this user get today".
pub struct ClaimLedger {
    store: Arc<dyn RowStore>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl ClaimLedger {
    pub fn new(store: Arc<dyn RowStore>, clock: Arc<dyn Clock>, offset: FixedOffset) -> Self {
        Self { store, clock, offset }
    }

    pub fn today(&self) -> ReferenceDay {
        ReferenceDay::containing(self.clock.now(), self.offset)
    }

    pub async fn record(
        &self,
        claimant: &Claimant,
        discount_code: Option<&str>,
        drink_code: Option<&str>,
    ) -> Result<Claim, StoreError> {
        let new_claim = NewClaim {
            user_id: claimant.user_id,
            display_name: claimant.display_name.clone(),
            handle: claimant.handle.clone(),
            claimed_at: format_timestamp(&self.clock.now()),
            discount_code: discount_code.map(str::to_string),
            drink_code: drink_code.map(str::to_string),
        };
        self.store.insert_claim(new_claim).await
    }

    /// Today's claims of `user_id` in insertion order
    pub async fn claims_today(&self, user_id: i64) -> Result<Vec<Claim>, StoreError> {
        let day = self.today();
        self.store
            .claims_between(user_id, &day.start_timestamp(), &day.end_timestamp())
            .await
    }

    pub async fn attach_drink_code(&self, claim: &Claim, drink_code: &str) -> Result<Claim, StoreError> {
        if !self.store.set_drink_code(claim.id, drink_code).await? {
            return Err(StoreError::Conflict(format!(
                "claim {} already carries a drink code",
                claim.id
            )));
        }

        let mut updated = claim.clone();
        updated.drink_code = Some(drink_code.to_string());
        Ok(updated)
    }
}
