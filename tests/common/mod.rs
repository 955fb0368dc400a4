// Shared helpers: an in-memory app driven through `tower::ServiceExt::oneshot`

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use fake::faker::lorem::en::Sentence;
use fake::Fake;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use swimsmart::api::create_routes;
use swimsmart::config::AppConfig;
use swimsmart::store::{MemoryStore, SwimStore};

pub const PASSWORD: &str = "swimfast1";
pub const INVITE_CODE: &str = "coach-invite";

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        if self.text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&self.text).unwrap_or_else(|_| Value::String(self.text.clone()))
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut config = AppConfig {
            bcrypt_cost: 4,
            coach_invite_code: Some(INVITE_CODE.to_string()),
            ..AppConfig::default()
        };
        adjust(&mut config);
        let store = Arc::new(MemoryStore::new());
        let shared: Arc<dyn SwimStore> = store.clone();

        Self {
            router: create_routes(shared, &config),
            store,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            headers,
            text: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }

    /// A login attempt arriving from `peer`, optionally through a proxy header
    pub async fn login_from(
        &self,
        peer: &str,
        forwarded_for: Option<&str>,
        identifier: &str,
        password: &str,
    ) -> StatusCode {
        let peer: SocketAddr = peer.parse().unwrap();
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .extension(ConnectInfo(peer));
        if let Some(forwarded) = forwarded_for {
            builder = builder.header("x-forwarded-for", forwarded);
        }
        let body = json!({ "identifier": identifier, "password": password }).to_string();

        self.router
            .clone()
            .oneshot(builder.body(Body::from(body)).unwrap())
            .await
            .unwrap()
            .status()
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        let response = self.send(Method::GET, uri, Some(token), None).await;
        (response.status, response.json())
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        let response = self.send(Method::POST, uri, Some(token), Some(body)).await;
        (response.status, response.json())
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        let response = self.send(Method::PUT, uri, Some(token), Some(body)).await;
        (response.status, response.json())
    }

    pub async fn delete(&self, uri: &str, token: &str) -> StatusCode {
        self.send(Method::DELETE, uri, Some(token), None).await.status
    }

    pub async fn signup(&self, body: Value) -> (StatusCode, Value) {
        let response = self
            .send(Method::POST, "/api/v1/auth/signup", None, Some(body))
            .await;
        (response.status, response.json())
    }

    pub async fn login(&self, identifier: &str) -> String {
        let response = self
            .send(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "identifier": identifier, "password": PASSWORD })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.text);
        response.json()["access_token"].as_str().unwrap().to_string()
    }

    /// Register and log in a swimmer; returns (id, token)
    pub async fn swimmer(&self, username: &str) -> (Uuid, String) {
        let (status, body) = self
            .signup(json!({
                "email": format!("{}@example.com", username),
                "password": PASSWORD,
                "username": username,
            }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        let id = Uuid::parse_str(body["id"].as_str().unwrap()).unwrap();
        (id, self.login(username).await)
    }

    /// Register and log in a coach; returns (id, token)
    pub async fn coach(&self, username: &str) -> (Uuid, String) {
        let (status, body) = self
            .signup(json!({
                "email": format!("{}@example.com", username),
                "password": PASSWORD,
                "username": username,
                "role": "coach",
                "invite_code": INVITE_CODE,
            }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        let id = Uuid::parse_str(body["id"].as_str().unwrap()).unwrap();
        (id, self.login(username).await)
    }

    pub async fn link(&self, swimmer_token: &str, coach_username: &str) {
        let (status, body) = self
            .post(
                "/api/v1/me/coaches",
                swimmer_token,
                json!({ "identifier": coach_username }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
    }

    pub async fn create_session(&self, token: &str, date: &str) -> Uuid {
        let notes: String = Sentence(3..6).fake();
        let (status, body) = self
            .post(
                "/api/v1/me/sessions",
                token,
                json!({ "date": date, "notes": notes }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        Uuid::parse_str(body["id"].as_str().unwrap()).unwrap()
    }

    /// 4x100 free and 6x50 fly, fully logged: 700 m in 547 s
    pub async fn reference_session(&self, token: &str, date: &str) -> Uuid {
        let session_id = self.create_session(token, date).await;
        let uri = format!("/api/v1/me/sessions/{}/sets", session_id);

        let (status, body) = self.post(&uri, token, free_set()).await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        let (status, body) = self.post(&uri, token, fly_set()).await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);

        session_id
    }
}

fn reps(times: &[f64], rpes: &[i64]) -> Vec<Value> {
    times
        .iter()
        .zip(rpes)
        .map(|(time, rpe)| json!({ "time_sec": time, "rpe": rpe }))
        .collect()
}

pub fn free_set() -> Value {
    json!({
        "repeat_count": 4,
        "distance_m": 100,
        "stroke": "free",
        "interval_sec": 90,
        "reps": reps(&[75.0, 76.0, 77.0, 75.0], &[5, 6, 6, 5]),
    })
}

pub fn fly_set() -> Value {
    json!({
        "repeat_count": 6,
        "distance_m": 50,
        "stroke": "fly",
        "reps": reps(&[40.0, 41.0, 42.0, 40.0, 41.0, 40.0], &[7, 7, 8, 7, 7, 7]),
    })
}
