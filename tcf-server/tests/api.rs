//! Router tests that never reach the database.
//!
//! The pool is created lazily and every request here is rejected (or
//! answered) before a connection would be acquired.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

use tcf_server::auth::{Claims, AUDIENCE, SESSION_COOKIE};
use tcf_server::{build_router, AppConfig, AppState};

const SECRET: &str = "router-test-secret-at-least-32-bytes";

fn app() -> Router {
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/tcf_router_test")
        .unwrap();
    let config = AppConfig {
        jwt_secret: Some(SECRET.into()),
        ..Default::default()
    };
    build_router(AppState::new(pool, config).unwrap())
}

fn token(secret: &str, exp_offset_secs: i64) -> String {
    let claims = Claims {
        sub: Uuid::new_v4(),
        exp: chrono::Utc::now().timestamp() + exp_offset_secs,
        email: Some("new.seller@example.com".into()),
        aud: Some(AUDIENCE.into()),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let (status, body) = send(app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    for uri in [
        "/api/auth/me",
        "/api/orders",
        "/api/conversations",
        "/api/likes",
        "/api/admin/users",
        "/api/admin/dashboard",
        "/api/admin/reports",
    ] {
        let (status, body) = send(app(), get(uri)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["error"], "unauthorized");
    }
}

#[tokio::test]
async fn expired_and_foreign_tokens_are_rejected() {
    let expired = Request::get("/api/auth/me")
        .header(header::AUTHORIZATION, format!("Bearer {}", token(SECRET, -600)))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(), expired).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "token has expired");

    let foreign = Request::get("/api/auth/me")
        .header(
            header::COOKIE,
            format!("theme=dark; {}={}", SESSION_COOKIE, token("some-other-secret-value-here!!", 600)),
        )
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app(), foreign).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_path_id_is_a_client_error() {
    let (status, body) = send(app(), get("/api/listings/not-a-number")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = send(app(), get("/api/listings/-4")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_validates_before_touching_the_database() {
    let bad_username = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/register")
        .header(header::AUTHORIZATION, format!("Bearer {}", token(SECRET, 600)))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"username": "no spaces allowed"}"#))
        .unwrap();
    let (status, body) = send(app(), bad_username).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let broken_json = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/register")
        .header(header::AUTHORIZATION, format!("Bearer {}", token(SECRET, 600)))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"username\":"))
        .unwrap();
    let (status, body) = send(app(), broken_json).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn reports_require_a_token() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/reports")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"target_type": "listing", "target_id": 1, "details": "fake"}"#))
        .unwrap();
    let (status, _) = send(app(), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_username_is_a_client_error() {
    for uri in ["/api/users/x", "/api/users/x/listings"] {
        let (status, body) = send(app(), get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], "validation_error");
    }
}

#[tokio::test]
async fn unknown_route_is_404() {
    let (status, _) = send(app(), get("/api/nothing-here")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
