use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};

use crate::auth::{extract_bearer_token, AccountSession, AuthError, AuthService, RateLimitConfig};

/// JWT authentication middleware
pub async fn jwt_auth_middleware(
    State(auth_service): State<AuthService>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .filter(|header| !header.trim().is_empty())
        .ok_or(AuthError::MissingAuthHeader)?;

    let token = extract_bearer_token(auth_header)?;
    let session = auth_service.validate_session(token).await?;

    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

/// Swimmer-only middleware; must run after `jwt_auth_middleware`
pub async fn swimmer_only_middleware(request: Request, next: Next) -> Result<Response, AuthError> {
    let session = request
        .extensions()
        .get::<AccountSession>()
        .ok_or(AuthError::MissingAuthHeader)?;

    if !session.is_swimmer() {
        tracing::debug!(account_id = %session.account_id, "swimmer route denied");
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Coach-only middleware; must run after `jwt_auth_middleware`
pub async fn coach_only_middleware(request: Request, next: Next) -> Result<Response, AuthError> {
    let session = request
        .extensions()
        .get::<AccountSession>()
        .ok_or(AuthError::MissingAuthHeader)?;

    if !session.is_coach() {
        tracing::debug!(account_id = %session.account_id, "coach route denied");
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Handlers take the caller as an extractor once the auth layer has run
#[async_trait]
impl<S> FromRequestParts<S> for AccountSession
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccountSession>()
            .cloned()
            .ok_or(AuthError::MissingAuthHeader)
    }
}

/// CORS configuration
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Security headers middleware
pub fn security_headers_layer() -> tower_http::set_header::SetResponseHeaderLayer<axum::http::HeaderValue> {
    tower_http::set_header::SetResponseHeaderLayer::overriding(
        axum::http::header::HeaderName::from_static("x-content-type-options"),
        axum::http::HeaderValue::from_static("nosniff"),
    )
}

/// Sliding-window limiter keyed by client address
#[derive(Debug, Clone)]
pub struct RateLimiter {
    requests: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
    max_requests: usize,
    window: Duration,
    trust_forwarded_headers: bool,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            requests: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
            trust_forwarded_headers: false,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            trust_forwarded_headers: config.trust_forwarded_headers,
            ..Self::new(config.max_requests, Duration::from_secs(config.window_seconds))
        }
    }

    pub fn check_rate_limit(&self, key: &str) -> bool {
        let mut requests = match self.requests.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let now = Instant::now();

        // Forget clients whose attempts all fell out of the window
        requests.retain(|_, times| {
            times.retain(|&time| now.duration_since(time) < self.window);
            !times.is_empty()
        });

        let entry = requests.entry(key.to_string()).or_default();
        if entry.len() >= self.max_requests {
            return false;
        }

        entry.push(now);
        true
    }

    /// Forwarding headers count only behind a trusted proxy; otherwise the peer address
    pub fn client_key(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        if self.trust_forwarded_headers {
            let forwarded = headers
                .get("x-forwarded-for")
                .or_else(|| headers.get("x-real-ip"))
                .and_then(|header| header.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|value| !value.is_empty());
            if let Some(client) = forwarded {
                return client.to_string();
            }
        }

        match peer {
            Some(addr) => addr.ip().to_string(),
            None => "unknown".to_string(),
        }
    }
}

/// Throttle requests per client address
pub async fn rate_limit_middleware(
    State(rate_limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = rate_limiter.client_key(request.headers(), peer);

    if !rate_limiter.check_rate_limit(&client) {
        tracing::warn!(client = %client, "login rate limit exceeded");
        return Err(AuthError::RateLimitExceeded);
    }

    Ok(next.run(request).await)
}
