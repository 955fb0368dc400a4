use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use axum_extra::extract::WithRejection;
use validator::Validate;

use crate::auth::{
    jwt_auth_middleware, rate_limit_middleware, AccountSession, AuthService, RateLimiter,
    TokenResponse,
};
use crate::error::{AppError, AppResult};
use crate::models::{AccountInfo, LoginRequest, SignupRequest};

/// Authentication routes
pub fn auth_routes(auth_service: AuthService, rate_limiter: RateLimiter) -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route(
            "/login",
            post(login).route_layer(middleware::from_fn_with_state(
                rate_limiter,
                rate_limit_middleware,
            )),
        )
        .route(
            "/me",
            get(me).route_layer(middleware::from_fn_with_state(
                auth_service.clone(),
                jwt_auth_middleware,
            )),
        )
        .with_state(auth_service)
}

/// Register a swimmer or coach account
#[tracing::instrument(skip(auth_service, request))]
async fn signup(
    State(auth_service): State<AuthService>,
    WithRejection(Json(request), _): WithRejection<Json<SignupRequest>, AppError>,
) -> AppResult<(StatusCode, Json<AccountInfo>)> {
    request.validate()?;
    let info = auth_service.signup(request).await?;
    Ok((StatusCode::CREATED, Json(info)))
}

/// Exchange credentials for a bearer token
#[tracing::instrument(skip(auth_service, request))]
async fn login(
    State(auth_service): State<AuthService>,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, AppError>,
) -> AppResult<Json<TokenResponse>> {
    request.validate()?;
    let response = auth_service.login(request).await?;
    Ok(Json(response))
}

#[tracing::instrument(skip(auth_service, session), fields(account_id = %session.account_id))]
async fn me(
    State(auth_service): State<AuthService>,
    session: AccountSession,
) -> AppResult<Json<AccountInfo>> {
    let info = auth_service.me(session.account_id).await?;
    Ok(Json(info))
}
