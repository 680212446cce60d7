use std::time::Duration;

use crate::delivery::payload::TEXT_ALPHABET;

use super::runtime;

#[tokio::test]
#[tracing_test::traced_test]
async fn test_text_payload_of_requested_size() {
    let runtime = runtime::get().await;

    let resp = runtime.get("/?size=1000&id=e2e-text").await;
    assert_eq!(200, resp.status());
    assert_eq!(Some(1000), resp.head().content_length());
    assert_eq!(
        Some("text/plain; charset=us-ascii"),
        resp.head().header("content-type")
    );
    assert!(resp.head().header("server").is_some());
    assert_eq!(1000, resp.body.len());
    assert!(resp.body.iter().all(|b| TEXT_ALPHABET.contains(b)));
    assert!(!resp.is_truncated());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_binary_payload() {
    let runtime = runtime::get().await;

    let resp = runtime.get("/download/blob?size=4096&bin&id=e2e-bin").await;
    assert_eq!(200, resp.status());
    assert_eq!(
        Some("application/octet-stream"),
        resp.head().header("content-type")
    );
    assert_eq!(4096, resp.body.len());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_empty_payload() {
    let runtime = runtime::get().await;

    let resp = runtime.get("/?size=0&id=e2e-empty&cutOffs=0").await;
    assert_eq!(200, resp.status());
    assert_eq!(Some(0), resp.head().content_length());
    assert!(resp.body.is_empty());
    assert!(!resp.is_truncated());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_cut_off_on_third_request() {
    let runtime = runtime::get().await;

    for attempt in 0..2 {
        let resp = runtime.get("/?size=1000&id=e2e-cut-third&cutOffs=,,300").await;
        assert_eq!(200, resp.status(), "attempt: {attempt}");
        assert_eq!(1000, resp.body.len(), "attempt: {attempt}");
    }

    for attempt in 2..4 {
        let resp = runtime.get("/?size=1000&id=e2e-cut-third&cutOffs=,,300").await;
        assert_eq!(200, resp.status(), "attempt: {attempt}");
        assert_eq!(Some(1000), resp.head().content_length());
        assert_eq!(300, resp.body.len(), "attempt: {attempt}");
        assert!(resp.is_truncated());
    }
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_cut_off_zero_sends_head_only() {
    let runtime = runtime::get().await;

    let resp = runtime.get("/?size=1000&id=e2e-cut-zero&cutOffs=0").await;
    assert_eq!(200, resp.status());
    assert_eq!(Some(1000), resp.head().content_length());
    assert!(resp.body.is_empty());
    assert!(resp.is_truncated());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_cut_off_beyond_size_is_ignored() {
    let runtime = runtime::get().await;

    let resp = runtime.get("/?size=500&id=e2e-cut-beyond&cutOffs=500").await;
    assert_eq!(500, resp.body.len());
    assert!(!resp.is_truncated());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_bandwidth_cap_paces_chunks() {
    let runtime = runtime::get().await;

    // three chunks, two pauses in between
    let resp = runtime.get("/?size=1500&bps=500&id=e2e-bps").await;
    assert_eq!(200, resp.status());
    assert_eq!(1500, resp.body.len());
    assert!(
        resp.elapsed >= Duration::from_secs(2),
        "elapsed: {:?}",
        resp.elapsed
    );
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_cut_off_inside_paced_chunk() {
    let runtime = runtime::get().await;

    let resp = runtime
        .get("/?size=1000&bps=100&cutOffs=150&id=e2e-bps-cut")
        .await;
    assert_eq!(200, resp.status());
    assert_eq!(150, resp.body.len());
    assert!(resp.is_truncated());
    assert!(
        resp.elapsed >= Duration::from_secs(1),
        "elapsed: {:?}",
        resp.elapsed
    );
    assert!(
        resp.elapsed < Duration::from_secs(5),
        "elapsed: {:?}",
        resp.elapsed
    );
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_large_cut_off_with_slow_reader_delivers_every_byte() {
    let runtime = runtime::get().await;

    let resp = runtime
        .get_with_read_delay(
            "/?size=4000000&cutOffs=3000000&id=e2e-cut-slow-reader",
            Duration::from_millis(500),
        )
        .await;
    assert_eq!(200, resp.status());
    assert_eq!(Some(4_000_000), resp.head().content_length());
    assert_eq!(3_000_000, resp.body.len());
    assert!(resp.is_truncated());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_no_content_status_has_no_body() {
    let runtime = runtime::get().await;

    let resp = runtime
        .get("/?size=1000&cutOffs=10&codes=204&id=e2e-no-content")
        .await;
    assert_eq!(204, resp.status());
    assert_eq!(None, resp.head().content_length());
    assert!(resp.body.is_empty());
}
