use chrono::Duration;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password, PasswordPolicy};
use crate::auth::{AccountSession, AuthError, JwtService, TokenResponse};
use crate::config::AppConfig;
use crate::models::{AccountInfo, AccountRole, LoginRequest, NewAccount, SignupRequest};
use crate::store::SwimStore;

#[derive(Clone)]
pub struct AuthService {
    jwt_service: JwtService,
    store: Arc<dyn SwimStore>,
    password_policy: PasswordPolicy,
    bcrypt_cost: u32,
    coach_invite_code: Option<String>,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("jwt_service", &self.jwt_service)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("coach_invite_code", &self.coach_invite_code.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl AuthService {
    pub fn new(store: Arc<dyn SwimStore>, config: &AppConfig) -> Self {
        Self {
            jwt_service: JwtService::new(&config.jwt_secret, Duration::hours(config.token_ttl_hours)),
            store,
            password_policy: PasswordPolicy::default(),
            bcrypt_cost: config.bcrypt_cost,
            coach_invite_code: config.coach_invite_code.clone(),
        }
    }

    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }

    /// Register a new account
    pub async fn signup(&self, request: SignupRequest) -> Result<AccountInfo, AuthError> {
        let email = request.email.trim().to_lowercase();
        let username = request
            .username
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        self.password_policy
            .check(&request.password)
            .map_err(|err| AuthError::PasswordValidation(err.to_string()))?;

        if request.role == AccountRole::Coach {
            if let Some(expected) = &self.coach_invite_code {
                if request.invite_code.as_deref().map(str::trim) != Some(expected.as_str()) {
                    tracing::warn!(email = %email, "coach signup without a valid invite code");
                    return Err(AuthError::InviteCodeRequired);
                }
            }
        }

        if self.store.find_account_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailAlreadyExists);
        }
        if let Some(name) = &username {
            if self.store.find_account_by_username(name).await?.is_some() {
                return Err(AuthError::UsernameTaken);
            }
        }

        let password_hash = hash_password(&request.password, self.bcrypt_cost)?;

        let account = self
            .store
            .insert_account(NewAccount {
                email,
                username,
                password_hash,
                role: request.role,
            })
            .await?;

        tracing::info!(account_id = %account.id, role = %account.role, "account created");

        Ok(AccountInfo::from(account))
    }

    /// Login with an email or a username
    pub async fn login(&self, request: LoginRequest) -> Result<TokenResponse, AuthError> {
        let account = self
            .store
            .find_account_by_identifier(&request.identifier)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&request.password, &account.password_hash)? {
            tracing::debug!(account_id = %account.id, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = self.jwt_service.create_access_token(account.id, account.role)?;

        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: self.jwt_service.access_token_expires_in_seconds(),
            user: AccountInfo::from(account),
        })
    }

    /// Resolve a bearer token into the caller's session
    pub async fn validate_session(&self, token: &str) -> Result<AccountSession, AuthError> {
        let claims = self.jwt_service.validate_token(token)?;
        let account_id = self.jwt_service.subject(&claims)?;

        let account = self
            .store
            .find_account(account_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        Ok(AccountSession {
            account_id: account.id,
            email: account.email,
            role: account.role,
            jti: claims.jti,
        })
    }

    /// Profile of the authenticated caller
    pub async fn me(&self, account_id: Uuid) -> Result<AccountInfo, AuthError> {
        self.store
            .find_account(account_id)
            .await?
            .map(AccountInfo::from)
            .ok_or(AuthError::AccountNotFound)
    }
}
