use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AccountInfo, AccountRole};

/// JWT token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,        // Subject (account ID)
    pub role: AccountRole,  // Role at issue time
    pub exp: usize,         // Expiration time
    pub iat: usize,         // Issued at
    pub jti: String,        // JWT ID
}

/// Authentication response
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: usize,
    pub user: AccountInfo,
}

/// Authenticated caller, resolved against the store on every request
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSession {
    pub account_id: Uuid,
    pub email: String,
    pub role: AccountRole,
    pub jti: String,
}

impl AccountSession {
    pub fn is_swimmer(&self) -> bool {
        self.role == AccountRole::Swimmer
    }

    pub fn is_coach(&self) -> bool {
        self.role == AccountRole::Coach
    }
}

/// Rate limiting models
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_seconds: u64,
    /// Key on `X-Forwarded-For`/`X-Real-IP` instead of the peer address
    pub trust_forwarded_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 20,     // 20 login attempts
            window_seconds: 300,  // per 5 minutes
            trust_forwarded_headers: false,
        }
    }
}
