//! Integration tests for [`FalClient`] against an in-process fake queue.
//!
//! Verifies the submit / poll / fetch / download cycle and that every
//! failure mode surfaces as the right [`GenerationError`] kind.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;

use agentmint_fal::client::GenerationClient;
use agentmint_fal::error::GenerationError;
use common::{client_for, png_bytes, start, work_item, Scenario};

// ---------------------------------------------------------------------------
// Test: happy path
// ---------------------------------------------------------------------------

/// A request that stays in progress for a few polls eventually yields the
/// image bytes served by the file endpoint.
#[tokio::test]
async fn completes_after_polling_and_returns_image_bytes() {
    let queue = start(Scenario::Completes { pending_polls: 2 }).await;
    let client = client_for(&queue);

    let bytes = client.generate(&work_item(42)).await.expect("generation should succeed");

    assert_eq!(bytes, png_bytes());
    assert_eq!(queue.submit_count(), 1);
    assert_eq!(queue.polls.load(std::sync::atomic::Ordering::SeqCst), 3);
}

/// The credential is sent as `Key <key>` and the body carries the prompt
/// and default generation parameters.
#[tokio::test]
async fn sends_credential_and_parameters() {
    let queue = start(Scenario::Completes { pending_polls: 0 }).await;
    let client = client_for(&queue);

    client.generate(&work_item(7)).await.expect("generation should succeed");

    assert_eq!(*queue.auth_headers.lock().unwrap(), vec!["Key test-key".to_string()]);
    let bodies = queue.submitted_bodies.lock().unwrap();
    assert_eq!(bodies[0]["prompt"], "chibi agent #7, black suit, sunglasses");
    assert_eq!(bodies[0]["aspect_ratio"], "1:1");
    assert_eq!(bodies[0]["output_format"], "png");
    assert_eq!(bodies[0]["num_images"], 1);
}

/// Models that nest images under `output` as bare URL strings still work.
#[tokio::test]
async fn accepts_nested_string_image_list() {
    let queue = start(Scenario::NestedStringImage).await;
    let client = client_for(&queue);

    let bytes = client.generate(&work_item(1)).await.expect("generation should succeed");
    assert!(!bytes.is_empty());
}

// ---------------------------------------------------------------------------
// Test: HTTP status classification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unauthorized_is_authentication_error() {
    let queue = start(Scenario::SubmitRejected {
        status: 401,
        retry_after: None,
    })
    .await;
    let err = client_for(&queue).generate(&work_item(1)).await.unwrap_err();
    assert_matches!(err, GenerationError::Authentication(_));
}

#[tokio::test]
async fn too_many_requests_carries_retry_after() {
    let queue = start(Scenario::SubmitRejected {
        status: 429,
        retry_after: Some("7"),
    })
    .await;
    let err = client_for(&queue).generate(&work_item(1)).await.unwrap_err();
    assert_matches!(err, GenerationError::RateLimited { .. });
    assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
}

/// A `Retry-After` too large to represent is dropped instead of crashing
/// the client; the error is still a retryable rate limit.
#[tokio::test]
async fn unrepresentable_retry_after_is_ignored() {
    let queue = start(Scenario::SubmitRejected {
        status: 429,
        retry_after: Some("1e30"),
    })
    .await;
    let err = client_for(&queue).generate(&work_item(1)).await.unwrap_err();
    assert_matches!(err, GenerationError::RateLimited { retry_after: None, .. });
    assert!(err.is_retryable());
}

#[tokio::test]
async fn server_error_is_transient() {
    let queue = start(Scenario::SubmitRejected {
        status: 503,
        retry_after: None,
    })
    .await;
    let err = client_for(&queue).generate(&work_item(1)).await.unwrap_err();
    assert_matches!(err, GenerationError::Transient(_));
}

#[tokio::test]
async fn unprocessable_prompt_is_invalid_request() {
    let queue = start(Scenario::SubmitRejected {
        status: 422,
        retry_after: None,
    })
    .await;
    let err = client_for(&queue).generate(&work_item(1)).await.unwrap_err();
    assert_matches!(err, GenerationError::InvalidRequest(_));
}

// ---------------------------------------------------------------------------
// Test: queue-level failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_queue_status_is_transient_with_detail() {
    let queue = start(Scenario::QueueFailed).await;
    let err = client_for(&queue).generate(&work_item(1)).await.unwrap_err();
    assert_matches!(err, GenerationError::Transient(ref msg) if msg.contains("content policy violation"));
}

#[tokio::test]
async fn exhausted_poll_budget_is_transient() {
    let queue = start(Scenario::NeverCompletes).await;
    let err = client_for(&queue).generate(&work_item(1)).await.unwrap_err();
    assert_matches!(err, GenerationError::Transient(ref msg) if msg.contains("5 polls"));
    assert_eq!(queue.polls.load(std::sync::atomic::Ordering::SeqCst), 5);
}

#[tokio::test]
async fn result_without_images_is_transient() {
    let queue = start(Scenario::NoImages).await;
    let err = client_for(&queue).generate(&work_item(1)).await.unwrap_err();
    assert_matches!(err, GenerationError::Transient(ref msg) if msg.contains("No image URL"));
}

#[tokio::test]
async fn non_image_payload_is_rejected() {
    let queue = start(Scenario::NotAnImage).await;
    let err = client_for(&queue).generate(&work_item(1)).await.unwrap_err();
    assert_matches!(err, GenerationError::Transient(_));
}
