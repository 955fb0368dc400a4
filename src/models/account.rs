use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Account roles for role-based access control
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Type)]
#[sqlx(type_name = "account_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    Swimmer,
    Coach,
}

impl AccountRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::Swimmer => "swimmer",
            AccountRole::Coach => "coach",
        }
    }
}

impl std::fmt::Display for AccountRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub password_hash: String,
    pub role: AccountRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn is_swimmer(&self) -> bool {
        self.role == AccountRole::Swimmer
    }

    pub fn is_coach(&self) -> bool {
        self.role == AccountRole::Coach
    }
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub username: Option<String>,
    pub password_hash: String,
    pub role: AccountRole,
}

/// Public projection of an account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountInfo {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub role: AccountRole,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountInfo {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            username: account.username.clone(),
            role: account.role,
            created_at: account.created_at,
        }
    }
}

impl From<Account> for AccountInfo {
    fn from(account: Account) -> Self {
        Self::from(&account)
    }
}

/// Coach supervises swimmer
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CoachLink {
    pub coach_id: Uuid,
    pub swimmer_id: Uuid,
    pub created_at: DateTime<Utc>,
}
