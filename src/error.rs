use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

use crate::auth::AuthError;
use crate::store::StoreError;

/// One failed field rule in a 422 response
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Database error: {0}")]
    Database(sqlx::Error),
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// A single field failure raised by a service-level rule
    pub fn field(field: &str, code: &str, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldError::new(field, code, message)])
    }

    /// Flatten validator output, prefixing nested paths such as `reps[1]`
    pub fn from_validation(errors: &ValidationErrors, prefix: Option<&str>) -> Self {
        AppError::Validation(field_errors(errors, prefix))
    }
}

pub fn field_errors(errors: &ValidationErrors, prefix: Option<&str>) -> Vec<FieldError> {
    let mut flattened: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, failures)| {
            let field = field.to_string();
            let path = match prefix {
                Some(prefix) => format!("{}.{}", prefix, field),
                None => field.clone(),
            };
            failures
                .iter()
                .map(move |failure| {
                    FieldError::new(path.clone(), failure.code.to_string(), describe(&field, failure))
                })
                .collect::<Vec<_>>()
        })
        .collect();

    flattened.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.code.cmp(&b.code)));
    flattened
}

fn describe(field: &str, failure: &ValidationError) -> String {
    if let Some(message) = &failure.message {
        return message.to_string();
    }

    let min = failure.params.get("min");
    let max = failure.params.get("max");
    match (failure.code.as_ref(), min, max) {
        ("range", Some(min), Some(max)) => format!("{} must be between {} and {}", field, min, max),
        ("length", Some(min), Some(max)) => {
            format!("{} length must be between {} and {}", field, min, max)
        }
        ("length", None, Some(max)) => format!("{} length must be at most {}", field, max),
        ("email", _, _) => format!("{} must be a valid email address", field),
        (code, _, _) => format!("{} failed the {} check", field, code),
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::from_validation(&errors, None)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(entity) => AppError::NotFound(entity),
            StoreError::Conflict(message) => AppError::Conflict(message),
            StoreError::Database(err) => AppError::Database(err),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            // Well-formed JSON that does not fit the request shape
            JsonRejection::JsonDataError(err) => {
                AppError::field("body", "invalid", err.body_text())
            }
            other => AppError::BadRequest(other.body_text()),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Auth(err) = self {
            return err.into_response();
        }

        let (status, error_message) = match &self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "Bad request"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "Validation failed"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "Forbidden"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "Conflict"),
            AppError::Auth(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            AppError::Database(err) => {
                tracing::error!(error = %err, "store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = match &self {
            AppError::Validation(errors) => json!({
                "error": error_message,
                "message": self.to_string(),
                "errors": errors,
            }),
            AppError::Database(_) | AppError::Internal(_) => json!({
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
