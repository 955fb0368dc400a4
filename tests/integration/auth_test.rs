use axum::http::{header, Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{TestApp, INVITE_CODE, PASSWORD};

#[tokio::test]
async fn test_health_and_version() {
    let app = TestApp::new();

    let health = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.json(), json!({ "status": "ok" }));

    let version = app.send(Method::GET, "/version", None, None).await;
    assert_eq!(version.status, StatusCode::OK);
    assert_eq!(version.json()["env"], "development");
    assert!(version.json()["version"].is_string());
    assert_eq!(
        version.headers.get("x-content-type-options").unwrap(),
        "nosniff"
    );
}

#[tokio::test]
async fn test_signup_returns_public_profile() {
    let app = TestApp::new();

    let (status, body) = app
        .signup(json!({
            "email": "Lane1@Example.com",
            "password": PASSWORD,
            "username": "lane1",
        }))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "lane1@example.com");
    assert_eq!(body["role"], "swimmer");
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_signup_conflicts_and_validation() {
    let app = TestApp::new();
    app.swimmer("lane1").await;

    let (status, _) = app
        .signup(json!({ "email": "LANE1@example.com", "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .signup(json!({ "email": "other@example.com", "password": PASSWORD, "username": "LANE1" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .signup(json!({ "email": "not-an-email", "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["field"], "email");

    let (status, body) = app
        .signup(json!({ "email": "weak@example.com", "password": "short" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["field"], "password");

    let (status, _) = app
        .signup(json!({ "email": "weird@example.com", "password": PASSWORD, "role": "admin" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_coach_signup_needs_invite_code() {
    let app = TestApp::new();

    let (status, _) = app
        .signup(json!({ "email": "coach@example.com", "password": PASSWORD, "role": "coach" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .signup(json!({
            "email": "coach@example.com",
            "password": PASSWORD,
            "role": "coach",
            "invite_code": INVITE_CODE,
        }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "coach");
}

#[tokio::test]
async fn test_login_and_me() {
    let app = TestApp::new();
    let (id, token) = app.swimmer("lane1").await;

    // By email as well as by username
    let by_email = app.login("lane1@example.com").await;
    assert!(!by_email.is_empty());

    let (status, body) = app.get("/api/v1/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.to_string());
    assert_eq!(body["username"], "lane1");
}

#[tokio::test]
async fn test_bad_credentials_are_indistinguishable() {
    let app = TestApp::new();
    app.swimmer("lane1").await;

    let wrong_password = app
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "identifier": "lane1", "password": "swimslow1" })),
        )
        .await;
    let unknown = app
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "ghost@example.com", "password": PASSWORD })),
        )
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.json()["message"], unknown.json()["message"]);
}

#[tokio::test]
async fn test_authorization_header_handling() {
    let app = TestApp::new();
    let (_, token) = app.swimmer("lane1").await;

    let missing = app.send(Method::GET, "/api/v1/auth/me", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.json()["message"], "Missing authorization header");

    let request = |value: String| {
        axum::http::Request::builder()
            .uri("/api/v1/auth/me")
            .header(header::AUTHORIZATION, value)
            .body(axum::body::Body::empty())
            .unwrap()
    };

    use tower::ServiceExt;
    let basic = app
        .router
        .clone()
        .oneshot(request("Basic abc".to_string()))
        .await
        .unwrap();
    assert_eq!(basic.status(), StatusCode::UNAUTHORIZED);

    let doubled = app
        .router
        .clone()
        .oneshot(request(format!("bearer  Bearer {}", token)))
        .await
        .unwrap();
    assert_eq!(doubled.status(), StatusCode::OK);

    let garbage = app.send(Method::GET, "/api/v1/auth/me", Some("not-a-jwt"), None).await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_gates() {
    let app = TestApp::new();
    let (_, swimmer_token) = app.swimmer("lane1").await;
    let (_, coach_token) = app.coach("deck").await;

    let (status, body) = app.get("/api/v1/coach/swimmers", &swimmer_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Insufficient permissions");

    let (status, _) = app.get("/api/v1/me/sessions", &coach_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/api/v1/me/sessions",
            &coach_token,
            json!({ "date": "2025-01-01" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_login_is_rate_limited() {
    let app = TestApp::new();

    let mut last = StatusCode::OK;
    for _ in 0..21 {
        last = app
            .send(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "identifier": "ghost", "password": PASSWORD })),
            )
            .await
            .status;
    }

    assert_eq!(last, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_login_throttle_is_per_client() {
    let app = TestApp::new();
    app.swimmer("victim").await;

    for _ in 0..20 {
        app.login_from("198.51.100.7:40000", None, "victim", "wrongpass1")
            .await;
    }
    let attacker = app
        .login_from("198.51.100.7:40001", None, "victim", "wrongpass1")
        .await;
    assert_eq!(attacker, StatusCode::TOO_MANY_REQUESTS);

    let victim = app
        .login_from("192.0.2.44:52000", None, "victim", PASSWORD)
        .await;
    assert_eq!(victim, StatusCode::OK);
}

#[tokio::test]
async fn test_forwarded_header_ignored_without_trusted_proxy() {
    let app = TestApp::new();

    let mut throttled = 0;
    for i in 0..30 {
        let status = app
            .login_from(
                "198.51.100.7:40000",
                Some(&format!("203.0.113.{}", i)),
                "ghost",
                PASSWORD,
            )
            .await;
        if status == StatusCode::TOO_MANY_REQUESTS {
            throttled += 1;
        }
    }

    assert_eq!(throttled, 10);
}

#[tokio::test]
async fn test_trusted_proxy_keys_on_forwarded_client() {
    let app = TestApp::with_config(|config| config.trust_proxy_headers = true);

    for _ in 0..20 {
        app.login_from("10.0.0.1:443", Some("203.0.113.1"), "ghost", PASSWORD)
            .await;
    }
    let first = app
        .login_from("10.0.0.1:443", Some("203.0.113.1"), "ghost", PASSWORD)
        .await;
    let second = app
        .login_from("10.0.0.1:443", Some("203.0.113.2"), "ghost", PASSWORD)
        .await;

    assert_eq!(first, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(second, StatusCode::UNAUTHORIZED);
}
