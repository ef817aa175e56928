use chrono::{DateTime, Duration, Utc};
use promo_code_bot::engine::error::ClaimError;
use promo_code_bot::engine::intent::Intent;
use promo_code_bot::engine::policy::{ClaimPolicy, RotationScope, TimeWindow};
use promo_code_bot::engine::replies;
use promo_code_bot::engine::session::InMemorySessionStore;
use promo_code_bot::engine::{ClaimPolicyEngine, Claimant, DailyState};
use promo_code_bot::store::memory::InMemoryRowStore;
use promo_code_bot::store::{MessagePool, PoolKind, RowStore};
use promo_code_bot::utils::datetime::FixedClock;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

const DRINK_PROMPT: &str = "Fancy a drink with that? Say 'yes'! 🥤";

struct Harness {
    engine: ClaimPolicyEngine,
    store: Arc<InMemoryRowStore>,
    clock: Arc<FixedClock>,
}

fn noon() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn harness(policy: ClaimPolicy) -> Harness {
    let store = Arc::new(InMemoryRowStore::new());
    store.seed_codes(PoolKind::Discount, (1..=10).map(|i| format!("PIZZA{i}")));
    store.seed_codes(PoolKind::Drink, (1..=5).map(|i| format!("DRINK{i}")));
    store.seed_messages(MessagePool::Filler, (0..5).map(|i| format!("filler {i}")));
    store.seed_messages(MessagePool::DrinkPrompt, [DRINK_PROMPT]);

    let clock = Arc::new(FixedClock::new(noon()));
    let engine = ClaimPolicyEngine::new(
        store.clone(),
        Arc::new(InMemorySessionStore::new()),
        clock.clone(),
        policy,
    );

    Harness { engine, store, clock }
}

fn user(user_id: i64) -> Claimant {
    Claimant {
        user_id,
        display_name: format!("User {user_id}"),
        handle: Some(format!("user{user_id}")),
    }
}

async fn issued(store: &InMemoryRowStore, pool: PoolKind) -> u64 {
    store.stock(pool).await.unwrap().issued
}

#[tokio::test]
async fn first_claim_gives_one_code_and_drink_prompt() {
    let h = harness(ClaimPolicy::default());

    let replies = h.engine.handle(&user(1), Intent::ClaimDiscount).await;

    assert_eq!(replies.len(), 2);
    assert!(replies[0].starts_with("Here is your discount code: PIZZA"));
    assert_eq!(replies[1], DRINK_PROMPT);
    assert_eq!(issued(&h.store, PoolKind::Discount).await, 1);

    let claims = h.store.claims();
    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0].user_id, 1);
    assert_eq!(claims[0].display_name, "User 1");
    assert_eq!(claims[0].handle.as_deref(), Some("user1"));
    assert!(replies[0].ends_with(claims[0].discount_code.as_deref().unwrap()));
    assert_eq!(h.engine.user_day(1).await.unwrap().state, DailyState::FirstClaimed);
}

#[tokio::test]
async fn second_claim_is_an_extra_code_and_third_is_filler() {
    let h = harness(ClaimPolicy::default());
    let alice = user(1);

    h.engine.handle(&alice, Intent::ClaimDiscount).await;
    let second = h.engine.handle(&alice, Intent::ClaimDiscount).await;

    assert_eq!(second.len(), 1);
    assert!(second[0].contains("Don’t tell the boss"));
    assert!(second[0].contains("Extra discount code: PIZZA"));
    assert_eq!(issued(&h.store, PoolKind::Discount).await, 2);
    assert_eq!(h.store.claims().len(), 2);

    // Beyond the cap only rotated filler comes back, lowest positions first
    let third = h.engine.handle(&alice, Intent::ClaimDiscount).await;
    let fourth = h.engine.handle(&alice, Intent::ClaimDiscount).await;
    assert_eq!(third, vec!["filler 0".to_string()]);
    assert_eq!(fourth, vec!["filler 1".to_string()]);
    assert_eq!(issued(&h.store, PoolKind::Discount).await, 2);
    assert_eq!(h.store.claims().len(), 2);
}

#[tokio::test]
async fn claimed_codes_are_distinct_across_users() {
    let h = harness(ClaimPolicy::default());
    let mut codes = HashSet::new();

    for user_id in 1..=5 {
        let grant = assert_ok!(h.engine.claim_discount(&user(user_id)).await);
        assert_eq!(grant.ordinal, 1);
        assert!(!grant.is_extra());
        assert!(codes.insert(grant.code));
    }

    assert_eq!(issued(&h.store, PoolKind::Discount).await, 5);
}

#[tokio::test]
async fn state_machine_walks_through_every_state() {
    let h = harness(ClaimPolicy {
        daily_discount_cap: 3,
        ..ClaimPolicy::default()
    });
    let alice = user(1);

    assert_eq!(h.engine.user_day(1).await.unwrap().state, DailyState::None);
    assert_ok!(h.engine.claim_discount(&alice).await);
    assert_eq!(h.engine.user_day(1).await.unwrap().state, DailyState::FirstClaimed);
    let extra = assert_ok!(h.engine.claim_discount(&alice).await);
    assert!(extra.is_extra());
    assert_eq!(h.engine.user_day(1).await.unwrap().state, DailyState::ExtraClaimed);
    assert_ok!(h.engine.claim_discount(&alice).await);
    assert_eq!(h.engine.user_day(1).await.unwrap().state, DailyState::Exhausted);

    let err = assert_err!(h.engine.claim_discount(&alice).await);
    assert!(matches!(err, ClaimError::AlreadyExhausted { pool: PoolKind::Discount }));
}

#[tokio::test]
async fn cap_of_one_refuses_the_second_claim() {
    let h = harness(ClaimPolicy {
        daily_discount_cap: 1,
        ..ClaimPolicy::default()
    });
    let alice = user(1);

    h.engine.handle(&alice, Intent::ClaimDiscount).await;
    let second = h.engine.handle(&alice, Intent::ClaimDiscount).await;

    assert_eq!(second, vec!["filler 0".to_string()]);
    assert_eq!(issued(&h.store, PoolKind::Discount).await, 1);
}

#[tokio::test]
async fn drink_before_discount_is_not_yet_eligible() {
    let h = harness(ClaimPolicy::default());

    let replies = h.engine.handle(&user(1), Intent::ClaimDrink).await;

    assert_eq!(replies, vec![replies::NOT_YET_ELIGIBLE.to_string()]);
    assert_eq!(issued(&h.store, PoolKind::Drink).await, 0);
    let err = assert_err!(h.engine.claim_drink(&user(1)).await);
    assert!(matches!(err, ClaimError::NotYetEligible));
}

#[tokio::test]
async fn drink_is_attached_to_latest_claim_once_per_day() {
    let h = harness(ClaimPolicy::default());
    let alice = user(1);

    h.engine.handle(&alice, Intent::ClaimDiscount).await;
    h.engine.handle(&alice, Intent::ClaimDiscount).await;
    let replies = h.engine.handle(&alice, Intent::ClaimDrink).await;

    assert_eq!(replies.len(), 1);
    assert!(replies[0].starts_with("Here is your drink code: DRINK"));
    let claims = h.store.claims();
    assert!(claims[0].drink_code.is_none());
    assert!(replies[0].ends_with(claims[1].drink_code.as_deref().unwrap()));
    assert!(h.engine.user_day(1).await.unwrap().drink_claimed);

    let again = h.engine.handle(&alice, Intent::ClaimDrink).await;
    assert_eq!(again, vec![replies::DRINK_EXHAUSTED.to_string()]);
    assert_eq!(issued(&h.store, PoolKind::Drink).await, 1);
}

#[tokio::test]
async fn empty_pool_is_out_of_stock_and_records_nothing() {
    let h = harness(ClaimPolicy::default());
    let store = Arc::new(InMemoryRowStore::new());
    store.seed_codes(PoolKind::Discount, ["LAST"]);
    let engine = ClaimPolicyEngine::new(
        store.clone(),
        Arc::new(InMemorySessionStore::new()),
        h.clock.clone(),
        ClaimPolicy::default(),
    );

    let first = engine.handle(&user(1), Intent::ClaimDiscount).await;
    assert_eq!(first[0], replies::discount_code("LAST"));

    let second = engine.handle(&user(2), Intent::ClaimDiscount).await;
    assert_eq!(second, vec![replies::OUT_OF_DISCOUNT_CODES.to_string()]);
    assert_eq!(store.claims().len(), 1);

    let drink = engine.handle(&user(1), Intent::ClaimDrink).await;
    assert_eq!(drink, vec![replies::OUT_OF_DRINK_CODES.to_string()]);
    assert!(store.claims()[0].drink_code.is_none());
}

#[tokio::test]
async fn a_new_day_resets_the_allowance() {
    let h = harness(ClaimPolicy::default());
    let alice = user(1);

    h.engine.handle(&alice, Intent::ClaimDiscount).await;
    h.engine.handle(&alice, Intent::ClaimDiscount).await;
    h.engine.handle(&alice, Intent::ClaimDrink).await;
    h.engine.handle(&alice, Intent::ClaimDiscount).await;

    h.clock.advance(Duration::days(1));

    let replies = h.engine.handle(&alice, Intent::ClaimDiscount).await;
    assert_eq!(replies.len(), 2);
    assert!(replies[0].starts_with("Here is your discount code:"));
    let drink = h.engine.handle(&alice, Intent::ClaimDrink).await;
    assert!(drink[0].starts_with("Here is your drink code:"));

    // Rotation counters start over as well
    h.engine.handle(&alice, Intent::ClaimDiscount).await;
    let filler = h.engine.handle(&alice, Intent::ClaimDiscount).await;
    assert_eq!(filler, vec!["filler 0".to_string()]);
}

#[tokio::test]
async fn claims_outside_the_window_change_nothing() {
    let h = harness(ClaimPolicy {
        claim_window: Some(TimeWindow::new(14, 22).unwrap()),
        ..ClaimPolicy::default()
    });

    let replies = h.engine.handle(&user(1), Intent::ClaimDiscount).await;

    assert_eq!(replies, vec![replies::outside_window(&TimeWindow::new(14, 22).unwrap())]);
    assert_eq!(issued(&h.store, PoolKind::Discount).await, 0);
    assert!(h.store.claims().is_empty());

    h.clock.advance(Duration::hours(3));
    let replies = h.engine.handle(&user(1), Intent::ClaimDiscount).await;
    assert!(replies[0].starts_with("Here is your discount code:"));

    h.clock.advance(Duration::hours(8));
    let err = assert_err!(h.engine.claim_drink(&user(1)).await);
    assert!(matches!(err, ClaimError::OutsideTimeWindow { .. }));
    assert_eq!(issued(&h.store, PoolKind::Drink).await, 0);
}

#[tokio::test]
async fn drink_claims_can_bypass_the_window() {
    let h = harness(ClaimPolicy {
        claim_window: Some(TimeWindow::new(10, 13).unwrap()),
        gate_drink_claims: false,
        ..ClaimPolicy::default()
    });

    assert_ok!(h.engine.claim_discount(&user(1)).await);
    h.clock.advance(Duration::hours(5));

    let err = assert_err!(h.engine.claim_discount(&user(1)).await);
    assert!(matches!(err, ClaimError::OutsideTimeWindow { .. }));
    assert_ok!(h.engine.claim_drink(&user(1)).await);
}

#[tokio::test]
async fn failed_claim_write_releases_the_code() {
    let h = harness(ClaimPolicy::default());
    h.store.set_fail_claim_writes(true);

    let replies = h.engine.handle(&user(1), Intent::ClaimDiscount).await;

    assert_eq!(replies, vec![replies::TRY_AGAIN_LATER.to_string()]);
    assert_eq!(issued(&h.store, PoolKind::Discount).await, 0);
    assert!(h.store.claims().is_empty());

    h.store.set_fail_claim_writes(false);
    let replies = h.engine.handle(&user(1), Intent::ClaimDiscount).await;
    assert!(replies[0].starts_with("Here is your discount code:"));
}

#[tokio::test]
async fn failed_drink_attach_releases_the_drink_code() {
    let h = harness(ClaimPolicy::default());
    h.engine.handle(&user(1), Intent::ClaimDiscount).await;
    h.store.set_fail_claim_writes(true);

    let err = assert_err!(h.engine.claim_drink(&user(1)).await);

    assert!(err.is_transient());
    assert_eq!(issued(&h.store, PoolKind::Drink).await, 0);
    assert!(h.store.claims()[0].drink_code.is_none());
}

#[tokio::test]
async fn unreachable_store_gives_generic_apology() {
    let h = harness(ClaimPolicy::default());
    h.store.set_fail_reads(true);

    let replies = h.engine.handle(&user(1), Intent::ClaimDiscount).await;

    assert_eq!(replies, vec![replies::TRY_AGAIN_LATER.to_string()]);
    h.store.set_fail_reads(false);
    assert_eq!(issued(&h.store, PoolKind::Discount).await, 0);
    assert!(h.store.claims().is_empty());
}

#[tokio::test]
async fn start_and_other_messages() {
    let h = harness(ClaimPolicy::default());

    assert_eq!(
        h.engine.handle(&user(1), Intent::Start).await,
        vec![replies::WELCOME.to_string()]
    );
    assert_eq!(
        h.engine.handle(&user(1), Intent::Other).await,
        vec!["filler 0".to_string()]
    );
    assert_eq!(
        h.engine.handle(&user(1), Intent::Other).await,
        vec!["filler 1".to_string()]
    );
    assert_eq!(issued(&h.store, PoolKind::Discount).await, 0);
}

#[tokio::test]
async fn other_messages_with_empty_filler_pool_get_no_reply() {
    let h = harness(ClaimPolicy::default());
    h.store.seed_messages(MessagePool::Filler, Vec::<String>::new());

    assert!(h.engine.handle(&user(1), Intent::Other).await.is_empty());

    // The exhausted path still answers with a fixed text
    h.engine.handle(&user(1), Intent::ClaimDiscount).await;
    h.engine.handle(&user(1), Intent::ClaimDiscount).await;
    assert_eq!(
        h.engine.handle(&user(1), Intent::ClaimDiscount).await,
        vec![replies::DISCOUNT_EXHAUSTED.to_string()]
    );
}

#[tokio::test]
async fn global_rotation_is_shared_between_users() {
    let h = harness(ClaimPolicy {
        rotation_scope: RotationScope::Global,
        ..ClaimPolicy::default()
    });

    assert_eq!(h.engine.handle(&user(1), Intent::Other).await, vec!["filler 0".to_string()]);
    assert_eq!(h.engine.handle(&user(2), Intent::Other).await, vec!["filler 1".to_string()]);
    assert_eq!(h.engine.handle(&user(3), Intent::Other).await, vec!["filler 2".to_string()]);

    let random = h.engine.handle(&user(4), Intent::Other).await;
    assert!(random == vec!["filler 3".to_string()] || random == vec!["filler 4".to_string()]);
}

#[tokio::test]
async fn per_user_rotation_is_independent() {
    let h = harness(ClaimPolicy::default());

    assert_eq!(h.engine.handle(&user(1), Intent::Other).await, vec!["filler 0".to_string()]);
    assert_eq!(h.engine.handle(&user(2), Intent::Other).await, vec!["filler 0".to_string()]);
    assert_eq!(h.engine.handle(&user(1), Intent::Other).await, vec!["filler 1".to_string()]);
}
