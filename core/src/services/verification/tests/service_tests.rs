//! Unit tests for the verification code cache

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, TimeZone, Utc};
use vc_shared::config::VerificationCodeConfig;

use crate::clock::{Clock, ManualClock};
use crate::domain::entities::{AttemptStatus, CodeEntry, MAX_ATTEMPTS};
use crate::errors::CodeCacheError;
use crate::services::verification::{CodeCache, CodeCacheService};

use super::mocks::MockStore;

const BIZ: &str = "login";
const PHONE: &str = "13812345678";

fn cache_with_clock() -> (CodeCacheService<MockStore>, Arc<ManualClock>) {
    cache_with_config(VerificationCodeConfig::default())
}

fn cache_with_config(
    config: VerificationCodeConfig,
) -> (CodeCacheService<MockStore>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
    ));
    let cache = CodeCacheService::with_clock(MockStore::new(), config, clock.clone());
    (cache, clock)
}

#[tokio::test]
async fn test_set_then_verify_success() {
    let (cache, _) = cache_with_clock();

    cache.set(BIZ, PHONE, "123456").await.unwrap();
    assert_eq!(cache.verify(BIZ, PHONE, "123456").await, Ok(true));
    assert_eq!(
        cache.remaining_attempts(BIZ, PHONE).await,
        Ok(Some(AttemptStatus::Consumed))
    );
}

#[tokio::test]
async fn test_verified_code_cannot_be_replayed() {
    let (cache, _) = cache_with_clock();

    cache.set(BIZ, PHONE, "123456").await.unwrap();
    assert_eq!(cache.verify(BIZ, PHONE, "123456").await, Ok(true));
    assert_eq!(
        cache.verify(BIZ, PHONE, "123456").await,
        Err(CodeCacheError::CodeVerifyTooManyTimes)
    );
}

#[tokio::test]
async fn test_consumption_leaves_code_entry_in_place() {
    let (cache, _) = cache_with_clock();
    let keys = cache.keys(BIZ, PHONE);

    cache.set(BIZ, PHONE, "123456").await.unwrap();
    cache.verify(BIZ, PHONE, "123456").await.unwrap();

    let raw = cache.store().raw(&keys.code).expect("code entry kept");
    let entry: CodeEntry = serde_json::from_slice(&raw).unwrap();
    assert_eq!(entry.code, "123456");
}

#[tokio::test]
async fn test_set_within_cooldown_rejected() {
    let (cache, clock) = cache_with_clock();

    cache.set(BIZ, PHONE, "123456").await.unwrap();
    clock.advance(Duration::seconds(59));
    assert_eq!(
        cache.set(BIZ, PHONE, "654321").await,
        Err(CodeCacheError::CodeSendTooMany)
    );

    // The rejected code never replaced the first one
    assert_eq!(cache.verify(BIZ, PHONE, "123456").await, Ok(true));
}

#[tokio::test]
async fn test_set_after_cooldown_resets_attempts() {
    let (cache, clock) = cache_with_clock();

    cache.set(BIZ, PHONE, "123456").await.unwrap();
    assert_eq!(cache.verify(BIZ, PHONE, "000000").await, Ok(false));
    assert_eq!(cache.verify(BIZ, PHONE, "000000").await, Ok(false));
    assert_eq!(
        cache.remaining_attempts(BIZ, PHONE).await,
        Ok(Some(AttemptStatus::Active(1)))
    );

    clock.advance(Duration::seconds(60));
    cache.set(BIZ, PHONE, "654321").await.unwrap();

    assert_eq!(
        cache.remaining_attempts(BIZ, PHONE).await,
        Ok(Some(AttemptStatus::Active(MAX_ATTEMPTS)))
    );
    assert_eq!(cache.verify(BIZ, PHONE, "123456").await, Ok(false));
    assert_eq!(cache.verify(BIZ, PHONE, "654321").await, Ok(true));
}

#[tokio::test]
async fn test_set_allowed_when_previous_code_expired() {
    let (cache, _) = cache_with_clock();
    let keys = cache.keys(BIZ, PHONE);

    cache.set(BIZ, PHONE, "123456").await.unwrap();
    cache.store().expire(&keys.code);

    assert_eq!(cache.set(BIZ, PHONE, "654321").await, Ok(()));
    assert_eq!(cache.verify(BIZ, PHONE, "654321").await, Ok(true));
}

#[tokio::test]
async fn test_wrong_codes_exhaust_attempts() {
    let (cache, _) = cache_with_clock();
    cache.set(BIZ, PHONE, "123456").await.unwrap();

    let mut remaining = Vec::new();
    for _ in 0..MAX_ATTEMPTS {
        assert_eq!(cache.verify(BIZ, PHONE, "000000").await, Ok(false));
        let status = cache.remaining_attempts(BIZ, PHONE).await.unwrap().unwrap();
        remaining.push(status.to_raw());
    }
    assert_eq!(remaining, vec![2, 1, 0]);

    assert_eq!(
        cache.verify(BIZ, PHONE, "000000").await,
        Err(CodeCacheError::CodeVerifyTooManyTimes)
    );
    // Even the right code is refused once attempts are spent
    assert_eq!(
        cache.verify(BIZ, PHONE, "123456").await,
        Err(CodeCacheError::CodeVerifyTooManyTimes)
    );
}

#[tokio::test]
async fn test_verify_without_code_is_not_an_error() {
    let (cache, _) = cache_with_clock();

    assert_eq!(cache.verify(BIZ, PHONE, "123456").await, Ok(false));
    assert_eq!(cache.remaining_attempts(BIZ, PHONE).await, Ok(None));
}

#[tokio::test]
async fn test_verify_with_expired_counter() {
    let (cache, _) = cache_with_clock();
    let keys = cache.keys(BIZ, PHONE);

    cache.set(BIZ, PHONE, "123456").await.unwrap();
    cache.store().expire(&keys.counter);

    assert_eq!(cache.verify(BIZ, PHONE, "123456").await, Ok(false));
}

#[tokio::test]
async fn test_verify_with_expired_code_keeps_attempts() {
    let (cache, _) = cache_with_clock();
    let keys = cache.keys(BIZ, PHONE);

    cache.set(BIZ, PHONE, "123456").await.unwrap();
    cache.store().expire(&keys.code);

    assert_eq!(cache.verify(BIZ, PHONE, "000000").await, Ok(false));
    assert_eq!(
        cache.remaining_attempts(BIZ, PHONE).await,
        Ok(Some(AttemptStatus::Active(MAX_ATTEMPTS)))
    );
}

#[tokio::test]
async fn test_pairs_are_independent() {
    let (cache, _) = cache_with_clock();

    cache.set("login", PHONE, "111111").await.unwrap();
    cache.set("reset", PHONE, "222222").await.unwrap();
    cache.set("login", "13900000000", "333333").await.unwrap();

    assert_eq!(cache.verify("reset", PHONE, "111111").await, Ok(false));
    assert_eq!(cache.verify("login", PHONE, "111111").await, Ok(true));
    assert_eq!(cache.verify("reset", PHONE, "222222").await, Ok(true));
    assert_eq!(cache.verify("login", "13900000000", "333333").await, Ok(true));
}

#[tokio::test]
async fn test_stored_code_round_trips() {
    let (cache, _) = cache_with_clock();

    for (i, code) in ["042917", "ab-Cd_9", "验证码", " padded "].iter().enumerate() {
        let biz = format!("flow-{}", i);
        let keys = cache.keys(&biz, PHONE);
        cache.set(&biz, PHONE, code).await.unwrap();

        let raw = cache.store().raw(&keys.code).unwrap();
        let entry: CodeEntry = serde_json::from_slice(&raw).unwrap();
        assert_eq!(entry.code, *code);
    }
}

#[tokio::test]
async fn test_set_and_counter_share_timestamp() {
    let (cache, clock) = cache_with_clock();
    let keys = cache.keys(BIZ, PHONE);
    cache.set(BIZ, PHONE, "123456").await.unwrap();

    let code: serde_json::Value =
        serde_json::from_slice(&cache.store().raw(&keys.code).unwrap()).unwrap();
    let counter: serde_json::Value =
        serde_json::from_slice(&cache.store().raw(&keys.counter).unwrap()).unwrap();

    assert_eq!(code["timestamp"], counter["timestamp"]);
    assert_eq!(counter["value"], 3);
    assert_eq!(
        code["timestamp"],
        serde_json::to_value(clock.now()).unwrap()
    );
}

#[tokio::test]
async fn test_store_read_failure_is_unknown() {
    let (cache, _) = cache_with_clock();
    cache.store().fail_reads.store(true, Ordering::SeqCst);

    assert_eq!(
        cache.set(BIZ, PHONE, "123456").await,
        Err(CodeCacheError::Unknown)
    );
    assert_eq!(
        cache.verify(BIZ, PHONE, "123456").await,
        Err(CodeCacheError::Unknown)
    );
}

#[tokio::test]
async fn test_store_write_failure_on_set_is_unknown() {
    let (cache, _) = cache_with_clock();
    cache.store().fail_writes.store(true, Ordering::SeqCst);

    assert_eq!(
        cache.set(BIZ, PHONE, "123456").await,
        Err(CodeCacheError::Unknown)
    );
    assert_eq!(cache.clear(BIZ, PHONE).await, Err(CodeCacheError::Unknown));
}

#[tokio::test]
async fn test_corrupt_entries_are_unknown() {
    let (cache, _) = cache_with_clock();
    let keys = cache.keys(BIZ, PHONE);

    cache.store().put_raw(&keys.code, b"not json");
    assert_eq!(
        cache.set(BIZ, PHONE, "123456").await,
        Err(CodeCacheError::Unknown)
    );

    cache.store().put_raw(&keys.counter, b"{\"value\":\"three\"}");
    assert_eq!(
        cache.verify(BIZ, PHONE, "123456").await,
        Err(CodeCacheError::Unknown)
    );
}

#[tokio::test]
async fn test_failed_decrement_keeps_mismatch_result() {
    let (cache, _) = cache_with_clock();
    cache.set(BIZ, PHONE, "123456").await.unwrap();
    cache.store().fail_writes_ending_with(":cnt");

    assert_eq!(cache.verify(BIZ, PHONE, "000000").await, Ok(false));
    // The decrement was lost, so the counter still shows every attempt
    assert_eq!(
        cache.remaining_attempts(BIZ, PHONE).await,
        Ok(Some(AttemptStatus::Active(MAX_ATTEMPTS)))
    );
}

#[tokio::test]
async fn test_failed_consumption_keeps_match_result() {
    let (cache, _) = cache_with_clock();
    cache.set(BIZ, PHONE, "123456").await.unwrap();
    cache.store().fail_writes_ending_with(":cnt");

    assert_eq!(cache.verify(BIZ, PHONE, "123456").await, Ok(true));
}

#[tokio::test]
async fn test_empty_arguments_rejected() {
    let (cache, _) = cache_with_clock();

    assert_eq!(
        cache.set("", PHONE, "123456").await,
        Err(CodeCacheError::InvalidArgument { field: "biz" })
    );
    assert_eq!(
        cache.verify(BIZ, "", "123456").await,
        Err(CodeCacheError::InvalidArgument { field: "phone" })
    );
}

#[tokio::test]
async fn test_clear_removes_code_and_cooldown() {
    let (cache, _) = cache_with_clock();
    let keys = cache.keys(BIZ, PHONE);

    cache.set(BIZ, PHONE, "123456").await.unwrap();
    cache.clear(BIZ, PHONE).await.unwrap();

    assert!(cache.store().raw(&keys.code).is_none());
    assert!(cache.store().raw(&keys.counter).is_none());
    assert_eq!(cache.verify(BIZ, PHONE, "123456").await, Ok(false));
    assert_eq!(cache.set(BIZ, PHONE, "654321").await, Ok(()));
}

#[tokio::test]
async fn test_custom_cooldown() {
    let config = VerificationCodeConfig::default().with_cooldown_secs(5);
    let (cache, clock) = cache_with_config(config);

    cache.set(BIZ, PHONE, "123456").await.unwrap();
    clock.advance(Duration::seconds(5));
    assert_eq!(cache.set(BIZ, PHONE, "654321").await, Ok(()));
}

#[tokio::test(start_paused = true)]
async fn test_dropped_caller_does_not_abort_set() {
    let (cache, _) = cache_with_clock();
    let keys = cache.keys(BIZ, PHONE);
    cache.store().delay_writes(StdDuration::from_millis(100));

    let timed_out =
        tokio::time::timeout(StdDuration::from_millis(10), cache.set(BIZ, PHONE, "123456")).await;
    assert!(timed_out.is_err());

    tokio::time::sleep(StdDuration::from_millis(500)).await;
    assert!(cache.store().raw(&keys.code).is_some());
    assert!(cache.store().raw(&keys.counter).is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sets_single_winner() {
    for stripes in [1, 8] {
        let config = VerificationCodeConfig::default().with_lock_stripes(stripes);
        let (cache, _) = cache_with_config(config);

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.set(BIZ, PHONE, &format!("{:06}", i)).await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => winners += 1,
                Err(e) => assert_eq!(e, CodeCacheError::CodeSendTooMany),
            }
        }
        assert_eq!(winners, 1, "stripes = {}", stripes);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_wrong_codes_never_lose_decrements() {
    let (cache, _) = cache_with_clock();
    cache.set(BIZ, PHONE, "123456").await.unwrap();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.verify(BIZ, PHONE, "000000").await })
        })
        .collect();

    let mut mismatches = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(false) => mismatches += 1,
            Err(CodeCacheError::CodeVerifyTooManyTimes) => rejected += 1,
            other => panic!("unexpected verify outcome: {:?}", other),
        }
    }

    assert_eq!(mismatches, MAX_ATTEMPTS as usize);
    assert_eq!(rejected, 10 - MAX_ATTEMPTS as usize);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_correct_codes_consumed_once() {
    let (cache, _) = cache_with_clock();
    cache.set(BIZ, PHONE, "123456").await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.verify(BIZ, PHONE, "123456").await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap() == Ok(true) {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
}
