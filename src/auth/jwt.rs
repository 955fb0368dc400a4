use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::{AuthError, Claims};
use crate::models::AccountRole;

/// JWT token service for creating and validating tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expires_in: Duration,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("encoding_key", &"[REDACTED]")
            .field("decoding_key", &"[REDACTED]")
            .field("access_token_expires_in", &self.access_token_expires_in)
            .finish()
    }
}

impl JwtService {
    /// Create a new JWT service with the given secret and token lifetime
    pub fn new(secret: &str, access_token_expires_in: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expires_in,
        }
    }

    /// Create an access token for an account
    pub fn create_access_token(&self, account_id: Uuid, role: AccountRole) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + self.access_token_expires_in;

        let claims = Claims {
            sub: account_id.to_string(),
            role,
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(AuthError::Jwt)
    }

    /// Validate and decode a token
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|token_data| token_data.claims)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }

    /// Account id carried in the `sub` claim
    pub fn subject(&self, claims: &Claims) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)
    }

    /// Get access token expiration time in seconds
    pub fn access_token_expires_in_seconds(&self) -> usize {
        self.access_token_expires_in.num_seconds().max(0) as usize
    }
}

/// Extract the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively, surrounding whitespace is
/// ignored, and a doubled `Bearer Bearer <token>` prefix is tolerated.
pub fn extract_bearer_token(auth_header: &str) -> Result<&str, AuthError> {
    let mut parts = auth_header.split_whitespace();

    let scheme = parts.next().ok_or(AuthError::MissingAuthHeader)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidAuthScheme);
    }

    let mut token = parts.next().ok_or(AuthError::InvalidAuthHeaderFormat)?;
    if token.eq_ignore_ascii_case("bearer") {
        token = parts.next().ok_or(AuthError::InvalidAuthHeaderFormat)?;
    }

    if parts.next().is_some() {
        return Err(AuthError::InvalidAuthHeaderFormat);
    }

    Ok(token)
}
