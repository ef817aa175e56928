//! Code allocation and claim limiting.
//!
//! [`ClaimPolicyEngine`] decides, for one incoming request, which codes to
//! issue and what to say. It owns no state of its own: codes and claims live
//! in the [`RowStore`], rotation counters in the [`SessionStore`].

pub mod code_pool;
pub mod error;
pub mod intent;
pub mod ledger;
pub mod policy;
pub mod replies;
pub mod rotator;
pub mod session;

use std::sync::Arc;

use tracing::{error, warn};

use crate::database::models::{Claim, Code};
use crate::store::{MessagePool, PoolKind, RowStore, StoreError};
use crate::utils::datetime::{local_hour, Clock};
use crate::utils::logging::{log_claim, log_claim_refused};

use self::code_pool::CodePool;
use self::error::ClaimError;
use self::intent::Intent;
use self::ledger::ClaimLedger;
use self::policy::{ClaimPolicy, RotationScope};
use self::rotator::MessageRotator;
use self::session::{CounterKey, CounterScope, SessionStore};

/// The person asking for a code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claimant {
    pub user_id: i64,
    pub display_name: String,
    pub handle: Option<String>,
}

/// Where a user stands today with respect to discount codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyState {
    None,
    FirstClaimed,
    ExtraClaimed,
    Exhausted,
}

/// Summary of a user's claims for the current reference day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserDay {
    pub state: DailyState,
    pub discount_claims: u32,
    pub drink_claimed: bool,
}

impl UserDay {
    fn from_claims(claims: &[Claim], cap: u32) -> Self {
        let discount_claims = claims.iter().filter(|c| c.discount_code.is_some()).count() as u32;
        let state = match discount_claims {
            0 => DailyState::None,
            n if n >= cap => DailyState::Exhausted,
            1 => DailyState::FirstClaimed,
            _ => DailyState::ExtraClaimed,
        };

        Self {
            state,
            discount_claims,
            drink_claimed: claims.iter().any(|c| c.drink_code.is_some()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscountGrant {
    pub code: String,
    /// 1 for the first code of the day, 2 for the first extra one, ...
    pub ordinal: u32,
    pub claim: Claim,
}

impl DiscountGrant {
    pub fn is_extra(&self) -> bool {
        self.ordinal > 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrinkGrant {
    pub code: String,
    pub claim: Claim,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Discount,
    Drink,
}

pub struct ClaimPolicyEngine {
    policy: ClaimPolicy,
    codes: CodePool,
    ledger: ClaimLedger,
    rotator: MessageRotator,
    clock: Arc<dyn Clock>,
}

impl ClaimPolicyEngine {
    pub fn new(
        store: Arc<dyn RowStore>,
        sessions: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        policy: ClaimPolicy,
    ) -> Self {
        Self {
            codes: CodePool::new(store.clone(), clock.clone()),
            ledger: ClaimLedger::new(store.clone(), clock.clone(), policy.reference_offset),
            rotator: MessageRotator::new(store, sessions),
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &ClaimPolicy {
        &self.policy
    }

    pub async fn user_day(&self, user_id: i64) -> Result<UserDay, StoreError> {
        let claims = self.ledger.claims_today(user_id).await?;
        Ok(UserDay::from_claims(&claims, self.policy.daily_discount_cap))
    }

    /// Issues the next discount code of the day, if the cap allows it.
    pub async fn claim_discount(&self, claimant: &Claimant) -> Result<DiscountGrant, ClaimError> {
        self.check_window(Flow::Discount)?;

        let day = self.user_day(claimant.user_id).await?;
        if day.state == DailyState::Exhausted {
            return Err(ClaimError::AlreadyExhausted { pool: PoolKind::Discount });
        }

        let code = self
            .codes
            .allocate(PoolKind::Discount)
            .await?
            .ok_or(ClaimError::OutOfStock { pool: PoolKind::Discount })?;

        let claim = match self.ledger.record(claimant, Some(&code.value), None).await {
            Ok(claim) => claim,
            Err(e) => {
                self.undo_allocation(&code).await;
                return Err(e.into());
            }
        };

        Ok(DiscountGrant {
            code: code.value,
            ordinal: day.discount_claims + 1,
            claim,
        })
    }

    /// Issues the drink code of the day, attached to the latest claim.
    pub async fn claim_drink(&self, claimant: &Claimant) -> Result<DrinkGrant, ClaimError> {
        self.check_window(Flow::Drink)?;

        let claims = self.ledger.claims_today(claimant.user_id).await?;
        let day = UserDay::from_claims(&claims, self.policy.daily_discount_cap);
        if day.discount_claims == 0 {
            return Err(ClaimError::NotYetEligible);
        }
        if day.drink_claimed {
            return Err(ClaimError::AlreadyExhausted { pool: PoolKind::Drink });
        }

        let target = claims
            .iter()
            .rev()
            .find(|c| c.discount_code.is_some() && c.drink_code.is_none())
            .ok_or(ClaimError::NotYetEligible)?;

        let code = self
            .codes
            .allocate(PoolKind::Drink)
            .await?
            .ok_or(ClaimError::OutOfStock { pool: PoolKind::Drink })?;

        let claim = match self.ledger.attach_drink_code(target, &code.value).await {
            Ok(claim) => claim,
            Err(e) => {
                self.undo_allocation(&code).await;
                return Err(e.into());
            }
        };

        Ok(DrinkGrant {
            code: code.value,
            claim,
        })
    }

    /// Runs one request end to end and returns the replies, in order.
    pub async fn handle(&self, claimant: &Claimant, intent: Intent) -> Vec<String> {
        match intent {
            Intent::Start => vec![replies::WELCOME.to_string()],
            Intent::ClaimDiscount => match self.claim_discount(claimant).await {
                Ok(grant) if grant.is_extra() => {
                    log_claim("extra_discount", claimant.user_id, Some(&grant.code));
                    vec![replies::extra_discount_code(&grant.code)]
                }
                Ok(grant) => {
                    log_claim("discount", claimant.user_id, Some(&grant.code));
                    let mut out = vec![replies::discount_code(&grant.code)];
                    if let Some(prompt) = self
                        .rotated_or_log(MessagePool::DrinkPrompt, claimant.user_id)
                        .await
                    {
                        out.push(prompt);
                    }
                    out
                }
                Err(e) => self.refusal(claimant, e).await,
            },
            Intent::ClaimDrink => match self.claim_drink(claimant).await {
                Ok(grant) => {
                    log_claim("drink", claimant.user_id, Some(&grant.code));
                    vec![replies::drink_code(&grant.code)]
                }
                Err(e) => self.refusal(claimant, e).await,
            },
            Intent::Other => self
                .rotated_or_log(MessagePool::Filler, claimant.user_id)
                .await
                .into_iter()
                .collect(),
        }
    }

    async fn refusal(&self, claimant: &Claimant, err: ClaimError) -> Vec<String> {
        if err.is_transient() {
            error!("Claim for user {} failed: {}", claimant.user_id, err);
        } else {
            log_claim_refused(err.kind(), claimant.user_id);
        }

        let reply = match err {
            ClaimError::OutOfStock { pool: PoolKind::Discount } => {
                replies::OUT_OF_DISCOUNT_CODES.to_string()
            }
            ClaimError::OutOfStock { pool: PoolKind::Drink } => {
                replies::OUT_OF_DRINK_CODES.to_string()
            }
            ClaimError::NotYetEligible => replies::NOT_YET_ELIGIBLE.to_string(),
            ClaimError::AlreadyExhausted { pool: PoolKind::Discount } => self
                .rotated_or_log(MessagePool::Filler, claimant.user_id)
                .await
                .unwrap_or_else(|| replies::DISCOUNT_EXHAUSTED.to_string()),
            ClaimError::AlreadyExhausted { pool: PoolKind::Drink } => {
                replies::DRINK_EXHAUSTED.to_string()
            }
            ClaimError::OutsideTimeWindow { window } => replies::outside_window(&window),
            ClaimError::Store(_) => replies::TRY_AGAIN_LATER.to_string(),
        };

        vec![reply]
    }

    /// Next rotated message for the user, or `None` when the pool is empty
    /// or unreadable.
    pub async fn rotated(&self, pool: MessagePool, user_id: i64) -> Result<Option<String>, StoreError> {
        let fixed_count = match pool {
            MessagePool::Filler => self.policy.filler_fixed_count,
            MessagePool::DrinkPrompt => self.policy.drink_prompt_fixed_count,
        };
        let key = CounterKey {
            scope: self.counter_scope(user_id),
            pool,
            day: self.ledger.today().date,
        };
        self.rotator.next(&key, fixed_count).await
    }

    async fn rotated_or_log(&self, pool: MessagePool, user_id: i64) -> Option<String> {
        match self.rotated(pool, user_id).await {
            Ok(message) => message,
            Err(e) => {
                warn!("Could not load {} messages: {}", pool, e);
                None
            }
        }
    }

    fn counter_scope(&self, user_id: i64) -> CounterScope {
        match self.policy.rotation_scope {
            RotationScope::PerUser => CounterScope::User(user_id),
            RotationScope::Global => CounterScope::Global,
        }
    }

    fn check_window(&self, flow: Flow) -> Result<(), ClaimError> {
        let Some(window) = self.policy.claim_window else {
            return Ok(());
        };
        if flow == Flow::Drink && !self.policy.gate_drink_claims {
            return Ok(());
        }

        let hour = local_hour(self.clock.now(), self.policy.reference_offset);
        if window.contains(hour) {
            Ok(())
        } else {
            Err(ClaimError::OutsideTimeWindow { window })
        }
    }

    async fn undo_allocation(&self, code: &Code) {
        if let Err(e) = self.codes.release(code).await {
            error!(
                "Code {} of pool {} is marked issued without a claim and could not be released: {}",
                code.value, code.pool, e
            );
        }
    }
}
