// Service-level tests that run directly against the in-memory store

pub mod template_service_test;

use swimsmart::auth::AccountSession;
use swimsmart::models::{AccountRole, NewAccount};
use swimsmart::store::{MemoryStore, SwimStore};
use uuid::Uuid;

/// Insert an account and return the session a token for it would carry
pub async fn account(store: &MemoryStore, name: &str, role: AccountRole) -> AccountSession {
    let account = store
        .insert_account(NewAccount {
            email: format!("{}@example.com", name),
            username: Some(name.to_string()),
            password_hash: "not-a-real-hash".to_string(),
            role,
        })
        .await
        .unwrap();

    AccountSession {
        account_id: account.id,
        email: account.email,
        role,
        jti: Uuid::new_v4().to_string(),
    }
}
