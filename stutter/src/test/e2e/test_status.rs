use std::time::Duration;

use crate::server::USAGE;

use super::runtime;

#[tokio::test]
#[tracing_test::traced_test]
async fn test_status_codes_follow_session_steps() {
    let runtime = runtime::get().await;

    let mut statuses = Vec::new();
    for _ in 0..4 {
        let resp = runtime.get("/?size=10&id=e2e-codes&codes=200,500,200").await;
        statuses.push(resp.status());
    }
    assert_eq!(vec![200, 500, 200, 200], statuses);
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_failure_status_has_reason_body() {
    let runtime = runtime::get().await;

    let resp = runtime.get("/?size=1000&id=e2e-reason&codes=503").await;
    assert_eq!(503, resp.status());
    assert_eq!("Service Unavailable\n", resp.body_str());
    assert_eq!(
        Some("text/plain; charset=utf-8"),
        resp.head().header("content-type")
    );
    assert_eq!(
        Some("nosniff"),
        resp.head().header("x-content-type-options")
    );
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_missing_size_is_bad_request() {
    let runtime = runtime::get().await;

    let resp = runtime.get("/?id=e2e-missing-size&codes=500").await;
    assert_eq!(400, resp.status());
    let body = resp.body_str();
    assert!(body.starts_with("Error parsing query string: "), "{body}");
    assert!(body.contains("size"), "{body}");
    assert!(body.ends_with(USAGE), "{body}");
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_bad_request_does_not_advance_session() {
    let runtime = runtime::get().await;

    let resp = runtime.get("/?size=oops&id=e2e-no-advance&codes=201,500").await;
    assert_eq!(400, resp.status());

    let resp = runtime.get("/?size=1&id=e2e-no-advance&codes=201,500").await;
    assert_eq!(201, resp.status());

    let resp = runtime.get("/?size=1&id=e2e-no-advance&codes=201,500").await;
    assert_eq!(500, resp.status());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_sessions_are_independent() {
    let runtime = runtime::get().await;

    let resp = runtime.get("/?size=1&id=e2e-indep-a&codes=500,200").await;
    assert_eq!(500, resp.status());

    let resp = runtime.get("/?size=1&id=e2e-indep-b&codes=500,200").await;
    assert_eq!(500, resp.status());

    let resp = runtime.get("/?size=1&id=e2e-indep-a&codes=500,200").await;
    assert_eq!(200, resp.status());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_requests_without_id_share_a_session() {
    let runtime = runtime::spawn().await;

    let resp = runtime.get("/?size=1&codes=404,202").await;
    assert_eq!(404, resp.status());

    let resp = runtime.get("/other/path?size=5&codes=404,202").await;
    assert_eq!(202, resp.status());

    let resp = runtime.get("/?size=1&id=&codes=404,202").await;
    assert_eq!(202, resp.status());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_delay_is_applied() {
    let runtime = runtime::get().await;

    let resp = runtime.get("/?size=10&id=e2e-delay&delay=300ms,0ms").await;
    assert_eq!(200, resp.status());
    assert!(
        resp.elapsed >= Duration::from_millis(300),
        "elapsed: {:?}",
        resp.elapsed
    );

    let resp = runtime.get("/?size=10&id=e2e-delay-range&delay=100ms-200ms").await;
    assert_eq!(200, resp.status());
    assert!(
        resp.elapsed >= Duration::from_millis(100),
        "elapsed: {:?}",
        resp.elapsed
    );
}
