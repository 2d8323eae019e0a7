//! Axum router and HTTP handlers.

use std::net::{IpAddr, Ipv4Addr};

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use coupon_core::{ClaimOutcome, ClaimResponse, EligibilityResponse};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use crate::AppState;

// Embed the web UI at compile time.
const INDEX_HTML: &str = include_str!("static/index.html");

// Replaced with the configured cooldown when the page is served.
const COOLDOWN_PLACEHOLDER: &str = "__COOLDOWN_MS__";

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(web_ui))
        .route("/api/claim", post(api_claim))
        .route("/api/eligibility", get(api_eligibility))
        .route("/api/status", get(api_status))
        .with_state(state)
        .layer(cors)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Serve the embedded web UI with the server's cooldown filled in.
async fn web_ui(State(state): State<AppState>) -> Html<String> {
    let cooldown_ms = state.gatekeeper.lock().await.cooldown().as_millis();
    Html(INDEX_HTML.replace(COOLDOWN_PLACEHOLDER, &cooldown_ms.to_string()))
}

#[derive(Default, Deserialize)]
struct ClaimRequest {
    /// Client-resolved identity; the request's forwarded IP is used when absent.
    #[serde(default)]
    identity: Option<String>,
}

/// `POST /api/claim`: claim the next coupon for the caller's identity.
async fn api_claim(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // An empty body is the same as `{}`.
    let req: ClaimRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ClaimRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(req) => req,
            Err(e) => {
                debug!(error = %e, "Rejected claim body");
                return (StatusCode::BAD_REQUEST, Json(json!({"error": "Invalid JSON"})))
                    .into_response();
            }
        }
    };
    let identity = resolve_identity(req.identity.as_deref(), &headers);

    // Eligibility, allocation and record update run under one lock.
    let outcome = state.gatekeeper.lock().await.claim(&identity);

    let status = match &outcome {
        ClaimOutcome::Claimed(coupon) => {
            info!(%identity, code = %coupon.code, "Coupon claimed");
            StatusCode::OK
        }
        ClaimOutcome::RateLimited { remaining } => {
            debug!(%identity, remaining_ms = remaining.as_millis() as u64, "Claim rate limited");
            StatusCode::TOO_MANY_REQUESTS
        }
        ClaimOutcome::Unavailable => {
            warn!(%identity, "No coupon available");
            StatusCode::SERVICE_UNAVAILABLE
        }
    };

    (status, Json(ClaimResponse::from(outcome))).into_response()
}

#[derive(Deserialize)]
struct EligibilityQuery {
    identity: Option<String>,
}

/// `GET /api/eligibility`: whether the caller may claim now.
async fn api_eligibility(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<EligibilityQuery>,
) -> Json<EligibilityResponse> {
    let identity = resolve_identity(q.identity.as_deref(), &headers);
    let eligibility = state.gatekeeper.lock().await.check_eligibility(&identity);
    Json(eligibility.into())
}

/// `GET /api/status`: pool and cooldown information.
async fn api_status(State(state): State<AppState>) -> impl IntoResponse {
    let gatekeeper = state.gatekeeper.lock().await;
    let allocator = gatekeeper.allocator();
    (
        StatusCode::OK,
        Json(json!({
            "pool_size": allocator.len(),
            "unused_in_round": allocator.unused_count(),
            "cooldown_secs": gatekeeper.cooldown().as_secs(),
            "tracked_identities": gatekeeper.tracked_identities(),
            "prune_interval_secs": state.config.prune_interval_secs,
        })),
    )
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Prefer the client-supplied identity; otherwise fall back to the request IP.
fn resolve_identity(supplied: Option<&str>, headers: &HeaderMap) -> String {
    match supplied.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => extract_ip(headers).to_string(),
    }
}

/// Extract the client IP from `X-Forwarded-For` or `X-Real-IP` headers.
fn extract_ip(headers: &HeaderMap) -> IpAddr {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse().ok())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse().ok())
        })
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use coupon_core::clock::{Clock, ManualClock};
    use coupon_core::{Allocator, Gatekeeper};
    use serde_json::Value;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    use crate::config::Config;

    fn test_state(clock: Arc<ManualClock>) -> AppState {
        state_with_cooldown(clock, "3600")
    }

    fn state_with_cooldown(clock: Arc<ManualClock>, cooldown_secs: &str) -> AppState {
        let config = Config::from_lookup(|key| {
            (key == "COUPON_COOLDOWN_SECS").then(|| cooldown_secs.to_string())
        })
        .unwrap();
        let clock: Arc<dyn Clock> = clock;
        let gatekeeper = Gatekeeper::new(Allocator::default(), config.cooldown(), clock);
        AppState {
            gatekeeper: Arc::new(Mutex::new(gatekeeper)),
            config: Arc::new(config),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn claim_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/claim")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn extract_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "198.51.100.1".parse().unwrap());
        assert_eq!(extract_ip(&headers), "203.0.113.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn extract_ip_falls_back_to_real_ip_then_unspecified() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "198.51.100.1".parse().unwrap());
        assert_eq!(extract_ip(&headers), "198.51.100.1".parse::<IpAddr>().unwrap());
        assert_eq!(extract_ip(&HeaderMap::new()), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }

    #[test]
    fn blank_supplied_identity_uses_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "198.51.100.1".parse().unwrap());
        assert_eq!(resolve_identity(Some("  "), &headers), "198.51.100.1");
        assert_eq!(resolve_identity(Some("demo-abc"), &headers), "demo-abc");
    }

    #[tokio::test]
    async fn claim_then_rate_limited() {
        let app = router(test_state(Arc::new(ManualClock::new(1_000_000))));

        let (status, body) = send(&app, claim_request(r#"{"identity": "1.2.3.4"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["coupon"]["code"], "SAVE10");

        let (status, body) = send(&app, claim_request(r#"{"identity": "1.2.3.4"}"#)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["success"], false);
        assert_eq!(body["timeRemaining"], 3_600_000);
        assert_eq!(body["message"], "You can claim another coupon in 60 minutes.");
    }

    #[tokio::test]
    async fn claims_rotate_across_identities() {
        let app = router(test_state(Arc::new(ManualClock::new(0))));
        let mut codes = Vec::new();
        for i in 0..6 {
            let (_, body) = send(&app, claim_request(&format!(r#"{{"identity": "user-{i}"}}"#))).await;
            codes.push(body["coupon"]["code"].as_str().unwrap().to_string());
        }
        assert_eq!(
            codes,
            ["SAVE10", "SAVE20", "FREESHIP", "BOGO50", "WELCOME15", "SAVE10"]
        );
    }

    #[tokio::test]
    async fn claim_without_identity_keys_on_forwarded_ip() {
        let app = router(test_state(Arc::new(ManualClock::new(0))));
        let req = || {
            Request::builder()
                .method("POST")
                .uri("/api/claim")
                .header("content-type", "application/json")
                .header("x-forwarded-for", "203.0.113.9")
                .body(Body::from("{}"))
                .unwrap()
        };
        assert_eq!(send(&app, req()).await.0, StatusCode::OK);
        assert_eq!(send(&app, req()).await.0, StatusCode::TOO_MANY_REQUESTS);

        let eligibility = Request::builder()
            .uri("/api/eligibility?identity=203.0.113.9")
            .body(Body::empty())
            .unwrap();
        let (_, body) = send(&app, eligibility).await;
        assert_eq!(body["allowed"], false);
    }

    #[tokio::test]
    async fn eligibility_reflects_clock() {
        let clock = Arc::new(ManualClock::new(0));
        let app = router(test_state(Arc::clone(&clock)));
        send(&app, claim_request(r#"{"identity": "x"}"#)).await;

        clock.advance(Duration::from_millis(3_599_999));
        let req = Request::builder()
            .uri("/api/eligibility?identity=x")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"allowed": false, "timeRemaining": 1}));

        clock.advance(Duration::from_millis(1));
        let req = Request::builder()
            .uri("/api/eligibility?identity=x")
            .body(Body::empty())
            .unwrap();
        let (_, body) = send(&app, req).await;
        assert_eq!(body, serde_json::json!({"allowed": true}));
    }

    #[tokio::test]
    async fn empty_pool_is_service_unavailable() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let state = AppState {
            gatekeeper: Arc::new(Mutex::new(Gatekeeper::new(
                Allocator::new(Vec::new()),
                Duration::from_secs(60),
                clock,
            ))),
            config: Arc::new(Config::from_lookup(|_| None).unwrap()),
        };
        let app = router(state);
        let (status, body) = send(&app, claim_request(r#"{"identity": "x"}"#)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["message"], "No coupons available at the moment.");
    }

    #[tokio::test]
    async fn status_reports_pool() {
        let app = router(test_state(Arc::new(ManualClock::new(0))));
        send(&app, claim_request(r#"{"identity": "x"}"#)).await;
        let req = Request::builder().uri("/api/status").body(Body::empty()).unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pool_size"], 5);
        assert_eq!(body["unused_in_round"], 4);
        assert_eq!(body["cooldown_secs"], 3600);
        assert_eq!(body["tracked_identities"], 1);
        assert_eq!(body["prune_interval_secs"], 600);
    }

    #[tokio::test]
    async fn web_ui_is_served() {
        let app = router(test_state(Arc::new(ManualClock::new(0))));
        let resp = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let page = String::from_utf8_lossy(&bytes);
        assert!(page.contains("Coupon Hub"));
        assert!(page.contains("const COOLDOWN_MS = 3600000;"));
    }

    #[tokio::test]
    async fn web_ui_uses_configured_cooldown() {
        let app = router(state_with_cooldown(Arc::new(ManualClock::new(0)), "60"));
        let resp = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let page = String::from_utf8_lossy(&bytes);
        assert!(page.contains("const COOLDOWN_MS = 60000;"));
        assert!(!page.contains(COOLDOWN_PLACEHOLDER));
    }

    #[tokio::test]
    async fn claim_without_body_uses_request_ip() {
        let app = router(test_state(Arc::new(ManualClock::new(0))));
        let req = || {
            Request::builder()
                .method("POST")
                .uri("/api/claim")
                .header("x-real-ip", "198.51.100.7")
                .body(Body::empty())
                .unwrap()
        };
        let (status, body) = send(&app, req()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["coupon"]["code"], "SAVE10");
        assert_eq!(send(&app, req()).await.0, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn malformed_claim_body_is_json_error() {
        let app = router(test_state(Arc::new(ManualClock::new(0))));
        let (status, body) = send(&app, claim_request("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"error": "Invalid JSON"}));

        let (status, body) = send(&app, claim_request(r#"{"identity": 42}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid JSON");
    }
}
