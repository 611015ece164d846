//! Integration tests for the admission filter in front of the HTTP routes.
//!
//! Drives the router directly with `oneshot`, setting the peer address the
//! same way `into_make_service_with_connect_info` does.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use netwarden::admission::{AdmissionEngine, AdmissionPolicy, NetworkKey};
use netwarden::http::{router, FORWARDED_FOR, TOO_MANY_REQUESTS_BODY};

fn engine(limit_per_minute: u32) -> Arc<AdmissionEngine> {
    Arc::new(AdmissionEngine::new(AdmissionPolicy {
        limit_per_minute,
        cooldown: Duration::from_secs(60),
        netmask: 24,
    }))
}

fn request(path: &str, peer: &str, forwarded: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(path);
    if let Some(value) = forwarded {
        builder = builder.header(FORWARDED_FOR, value);
    }
    let mut req = builder.body(Body::empty()).unwrap();
    let addr: SocketAddr = peer.parse().unwrap();
    req.extensions_mut().insert(ConnectInfo(addr));
    req
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Option<String>, String) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let retry_after = resp
        .headers()
        .get(header::RETRY_AFTER)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, retry_after, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn index_is_served_within_budget() {
    let app = router(engine(10));

    let (status, _, body) = send(&app, request("/", "192.168.1.10:40000", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Hello from netwarden\n");
}

#[tokio::test]
async fn sixth_request_is_rejected_with_429() {
    let app = router(engine(5));

    for i in 1..=5 {
        let (status, _, _) = send(&app, request("/", "192.168.1.10:40000", None)).await;
        assert_eq!(status, StatusCode::OK, "Request {} should be admitted", i);
    }

    let (status, retry_after, body) = send(&app, request("/", "192.168.1.10:40000", None)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, TOO_MANY_REQUESTS_BODY);
    assert_eq!(retry_after.as_deref(), Some("60"));
}

#[tokio::test]
async fn hosts_in_same_network_share_budget() {
    let app = router(engine(2));

    let (status, _, _) = send(&app, request("/", "10.0.0.1:1000", None)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(&app, request("/", "10.0.0.2:1000", None)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(&app, request("/", "10.0.0.3:1000", None)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // A different /24 has its own budget
    let (status, _, _) = send(&app, request("/", "10.0.1.1:1000", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn forwarded_address_is_rate_limited_not_peer() {
    let engine = engine(1);
    let app = router(Arc::clone(&engine));

    let (status, _, _) = send(&app, request("/", "127.0.0.1:1000", Some("10.20.30.40"))).await;
    assert_eq!(status, StatusCode::OK);

    // Same proxy, different client network
    let (status, _, _) = send(&app, request("/", "127.0.0.1:1000", Some("10.20.31.40"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&app, request("/", "127.0.0.1:1000", Some("10.20.30.41"))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let proxy = NetworkKey::resolve("127.0.0.1", 24).unwrap();
    assert!(!engine.store().contains(&proxy));
}

#[tokio::test]
async fn malformed_forwarded_address_is_a_bad_request() {
    let engine = engine(5);
    let app = router(Arc::clone(&engine));

    let (status, _, body) = send(&app, request("/", "127.0.0.1:1000", Some("541.221.1.10"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with("bad client IP address received"));
    assert!(body.ends_with('\n'));
    assert_eq!(engine.tracked_networks(), 0);
}

#[tokio::test]
async fn clear_readmits_blocked_network() {
    let engine = engine(1);
    let app = router(Arc::clone(&engine));

    let (status, _, _) = send(&app, request("/", "10.0.0.1:1000", None)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(&app, request("/", "10.0.0.1:1000", None)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // The clear endpoint is behind the filter too, so call it from another network
    let (status, _, body) = send(&app, request("/clear/", "10.9.9.9:1000", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Limits are cleared\n");
    assert_eq!(engine.tracked_networks(), 0);

    let (status, _, _) = send(&app, request("/", "10.0.0.1:1000", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn clear_without_trailing_slash() {
    let app = router(engine(5));
    let (status, _, body) = send(&app, request("/clear", "10.0.0.1:1000", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Limits are cleared\n");
}

#[tokio::test]
async fn blocked_network_cannot_clear() {
    let engine = engine(1);
    let app = router(Arc::clone(&engine));

    send(&app, request("/", "10.0.0.1:1000", None)).await;
    let (status, _, _) = send(&app, request("/clear/", "10.0.0.1:1000", None)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(engine.tracked_networks(), 1);
}

#[tokio::test]
async fn request_without_any_address_is_rejected() {
    let app = router(engine(5));
    let req = Request::builder().uri("/").body(Body::empty()).unwrap();

    let (status, _, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
