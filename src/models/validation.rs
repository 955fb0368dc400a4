use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use super::account::AccountRole;

static USERNAME_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]{3,32}$").ok());

/// Usernames are 3 to 32 characters of letters, digits, `_`, `.` or `-`
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let valid = USERNAME_PATTERN
        .as_ref()
        .map(|pattern| pattern.is_match(username))
        .unwrap_or(false);

    if valid {
        Ok(())
    } else {
        let mut error = ValidationError::new("username");
        error.message = Some("username must be 3-32 characters of letters, digits, '_', '.' or '-'".into());
        Err(error)
    }
}

/// Blank notes are stored as absent
pub fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes.and_then(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Patch semantics for notes: absent keeps, blank clears
pub fn notes_change(notes: Option<String>) -> Option<Option<String>> {
    notes.map(|text| normalize_notes(Some(text)))
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: AccountRole,
    #[validate(custom(function = "validate_username"))]
    pub username: Option<String>,
    pub invite_code: Option<String>,
}

fn default_role() -> AccountRole {
    AccountRole::Swimmer
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email or username
    #[serde(alias = "email", alias = "username")]
    #[validate(length(min = 1, max = 255))]
    pub identifier: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LinkCoachRequest {
    /// Coach email or username
    #[serde(alias = "email", alias = "username")]
    #[validate(length(min = 1, max = 255))]
    pub identifier: String,
}
