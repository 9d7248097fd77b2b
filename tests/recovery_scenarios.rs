//! Circuit breaker and retry behavior, directly and through tool calls.

mod common;

use common::{server_with, ScriptedEngine};
use repocontext::recovery::{BreakerState, RecoveryManager};
use repocontext::tools::ToolRequest;
use repocontext::types::{BreakerConfig, RecoveryConfig, RetryConfig};
use repocontext::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn fast_recovery(threshold: u32, breaker_timeout: Duration) -> RecoveryConfig {
    RecoveryConfig {
        retry: RetryConfig {
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            jitter_factor: 0.0,
            ..RetryConfig::default()
        },
        breaker: BreakerConfig {
            failure_threshold: threshold,
            timeout: breaker_timeout,
            ..BreakerConfig::default()
        },
    }
}

fn pattern_request() -> ToolRequest {
    ToolRequest::new("query_by_pattern").arg("pattern", "*")
}

#[tokio::test]
async fn test_query_errors_are_retried_until_success() {
    let engine = Arc::new(ScriptedEngine::failing(&["query failed", "query failed"]));
    let (_dir, server) = server_with(engine.clone(), fast_recovery(5, Duration::from_secs(30)));

    let response = server
        .call_tool(&pattern_request(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!response.is_error, "{}", response.text_content());
    assert_eq!(engine.calls(), 3);
    let stats = server.recovery_stats();
    assert_eq!(stats.circuit_breakers["query_by_pattern"].failure_count, 0);
    assert_eq!(stats.circuit_breakers["query_by_pattern"].state, BreakerState::Closed);
}

#[tokio::test]
async fn test_validation_failure_is_not_retried() {
    let engine = Arc::new(ScriptedEngine::always("validation failed for pattern"));
    let (_dir, server) = server_with(engine.clone(), fast_recovery(5, Duration::from_secs(30)));

    let response = server
        .call_tool(&pattern_request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(engine.calls(), 1);
    assert!(response.is_error);
    let text = response.text_content();
    assert!(text.starts_with(
        "Operation 'query_by_pattern' failed: operation 'query_by_pattern' failed: validation failed for pattern"
    ));
    assert!(text.contains("error_code: max_retries_exhausted"));
}

#[tokio::test]
async fn test_capitalized_keywords_are_not_retried() {
    let engine = Arc::new(ScriptedEngine::always("Query failed"));
    let (_dir, server) = server_with(engine.clone(), fast_recovery(5, Duration::from_secs(30)));

    let response = server
        .call_tool(&pattern_request(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(response.is_error);
    assert_eq!(engine.calls(), 1);
}

#[tokio::test]
async fn test_breaker_opens_and_fails_fast_through_tools() {
    let engine = Arc::new(ScriptedEngine::always("engine exploded"));
    let (_dir, server) = server_with(engine.clone(), fast_recovery(5, Duration::from_secs(30)));
    let cancel = CancellationToken::new();

    for _ in 0..5 {
        let response = server.call_tool(&pattern_request(), &cancel).await.unwrap();
        assert!(response.is_error);
    }
    assert_eq!(engine.calls(), 5);
    assert_eq!(
        server.recovery_stats().circuit_breakers["query_by_pattern"].state,
        BreakerState::Open
    );

    let rejected = server.call_tool(&pattern_request(), &cancel).await.unwrap();
    assert!(rejected.is_error);
    assert!(rejected.text_content().contains("circuit_breaker_open"));
    assert_eq!(engine.calls(), 5);

    // breakers are per tool: another tool still reaches the engine
    let other = server
        .call_tool(&ToolRequest::new("query_by_name").arg("name", "x"), &cancel)
        .await
        .unwrap();
    assert!(other.is_error);
    assert_eq!(engine.calls(), 6);
}

#[tokio::test]
async fn test_threshold_scenario_on_manager() {
    let manager = RecoveryManager::new(&fast_recovery(5, Duration::from_secs(30)));
    let cancel = CancellationToken::new();
    let calls = AtomicUsize::new(0);

    for _ in 0..5 {
        let result: Result<()> = manager
            .execute_with_recovery("x", &cancel, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::backend("boom")) }
            })
            .await;
        assert!(result.is_err());
    }
    assert_eq!(manager.breaker("x").state(), BreakerState::Open);

    let result: Result<()> = manager
        .execute_with_recovery("x", &cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;
    let err = result.unwrap_err();
    let ctx = err.recovery_context().unwrap();
    assert_eq!(ctx.error_code, "circuit_breaker_open");
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_open_breaker_recovers_after_timeout() {
    let engine = Arc::new(ScriptedEngine::failing(&["boom", "boom"]));
    let (_dir, server) = server_with(engine.clone(), fast_recovery(2, Duration::from_millis(50)));
    let cancel = CancellationToken::new();

    for _ in 0..2 {
        server.call_tool(&pattern_request(), &cancel).await.unwrap();
    }
    assert_eq!(server.recovery().breaker("query_by_pattern").state(), BreakerState::Open);

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(server.recovery().breaker("query_by_pattern").can_execute());

    let response = server.call_tool(&pattern_request(), &cancel).await.unwrap();
    assert!(!response.is_error);
    let breaker = server.recovery().breaker("query_by_pattern");
    assert_eq!(breaker.state(), BreakerState::Closed);
    assert_eq!(breaker.failure_count(), 0);
}

#[tokio::test]
async fn test_cancellation_interrupts_backoff() {
    let config = RecoveryConfig {
        retry: RetryConfig {
            initial_backoff: Duration::from_secs(10),
            max_backoff: Duration::from_secs(10),
            ..RetryConfig::default()
        },
        ..RecoveryConfig::default()
    };
    let manager = RecoveryManager::new(&config);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let result: Result<()> = manager
        .execute_with_recovery("slow", &cancel, || async {
            Err(Error::backend("storage unavailable"))
        })
        .await;

    assert!(matches!(result, Err(Error::Cancelled(_))));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_concurrent_callers_share_one_breaker() {
    let manager = Arc::new(RecoveryManager::new(&fast_recovery(1000, Duration::from_secs(30))));
    let cancel = CancellationToken::new();

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let manager = manager.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let result: Result<()> = manager
                    .execute_with_recovery("shared", &cancel, || async {
                        Err(Error::backend("unexpected failure"))
                    })
                    .await;
                result.is_err()
            })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap());
    }
    assert_eq!(manager.breaker("shared").failure_count(), 16);
    assert_eq!(manager.stats().total_circuit_breakers, 1);
}
