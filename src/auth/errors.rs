use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Account not found")]
    AccountNotFound,
    #[error("Email already registered")]
    EmailAlreadyExists,
    #[error("Username already taken")]
    UsernameTaken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Missing authorization header")]
    MissingAuthHeader,
    #[error("Authorization scheme must be Bearer")]
    InvalidAuthScheme,
    #[error("Invalid authorization header format")]
    InvalidAuthHeaderFormat,
    #[error("Insufficient permissions")]
    InsufficientPermissions,
    #[error("A valid coach invite code is required")]
    InviteCodeRequired,
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error("{0}")]
    PasswordValidation(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("Password hashing error: {0}")]
    PasswordHashing(#[from] crate::auth::password::PasswordError),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) if message.starts_with("Username") => {
                AuthError::UsernameTaken
            }
            StoreError::Conflict(_) => AuthError::EmailAlreadyExists,
            StoreError::NotFound(_) => AuthError::AccountNotFound,
            StoreError::Database(err) => AuthError::Database(err),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials"),
            AuthError::AccountNotFound => (StatusCode::NOT_FOUND, "Account not found"),
            AuthError::EmailAlreadyExists => (StatusCode::CONFLICT, "Email already registered"),
            AuthError::UsernameTaken => (StatusCode::CONFLICT, "Username already taken"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AuthError::MissingAuthHeader => (StatusCode::UNAUTHORIZED, "Missing authorization header"),
            AuthError::InvalidAuthScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidAuthHeaderFormat => (StatusCode::UNAUTHORIZED, "Invalid authorization header format"),
            AuthError::InsufficientPermissions => (StatusCode::FORBIDDEN, "Insufficient permissions"),
            AuthError::InviteCodeRequired => (StatusCode::FORBIDDEN, "Invite code required"),
            AuthError::RateLimitExceeded => (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded"),
            AuthError::PasswordValidation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "Validation failed"),
            AuthError::Database(err) => {
                tracing::error!(error = %err, "store failure during authentication");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AuthError::Jwt(_) => (StatusCode::UNAUTHORIZED, "Token error"),
            AuthError::PasswordHashing(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Password processing error"),
        };

        let body = match &self {
            AuthError::PasswordValidation(message) => json!({
                "error": error_message,
                "message": "Validation failed",
                "errors": [{ "field": "password", "code": "password_policy", "message": message }],
            }),
            AuthError::Database(_) => json!({
                "error": error_message,
                "message": "Internal server error",
            }),
            _ => json!({
                "error": error_message,
                "message": self.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}
