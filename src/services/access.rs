// Who may read or write which sessions and templates

use uuid::Uuid;

use crate::auth::AccountSession;
use crate::error::{AppError, AppResult};
use crate::models::{AccountRole, Template};
use crate::store::SwimStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Read,
    Write,
}

/// Decide access to a session graph owned by `owner_id`.
///
/// `supervising` says whether the actor coaches the owner; it is ignored for
/// swimmers.
pub fn check_session_access(
    actor: &AccountSession,
    owner_id: Uuid,
    supervising: bool,
    intent: Intent,
) -> AppResult<()> {
    match (actor.role, intent) {
        (AccountRole::Swimmer, _) if actor.account_id == owner_id => Ok(()),
        (AccountRole::Swimmer, _) => Err(AppError::Forbidden(
            "You can only access your own sessions".to_string(),
        )),
        (AccountRole::Coach, Intent::Write) => Err(AppError::Forbidden(
            "Coaches have read-only access to swimmer sessions".to_string(),
        )),
        (AccountRole::Coach, Intent::Read) if supervising => Ok(()),
        (AccountRole::Coach, Intent::Read) => Err(AppError::Forbidden(
            "You do not supervise this swimmer".to_string(),
        )),
    }
}

/// Resolve supervision from the store, then apply [`check_session_access`]
pub async fn authorize_session(
    store: &dyn SwimStore,
    actor: &AccountSession,
    owner_id: Uuid,
    intent: Intent,
) -> AppResult<()> {
    let supervising = if actor.is_coach() {
        store.is_supervising(actor.account_id, owner_id).await?
    } else {
        false
    };

    let decision = check_session_access(actor, owner_id, supervising, intent);
    if decision.is_err() {
        tracing::debug!(
            account_id = %actor.account_id,
            owner_id = %owner_id,
            ?intent,
            "session access denied"
        );
    }
    decision
}

/// Templates are readable by their owner and by swimmers the owning coach supervises
pub fn check_template_read(
    actor: &AccountSession,
    template: &Template,
    owner_supervises_actor: bool,
) -> AppResult<()> {
    if template.owner_id == actor.account_id || (actor.is_swimmer() && owner_supervises_actor) {
        Ok(())
    } else {
        Err(AppError::Forbidden("You cannot view this template".to_string()))
    }
}

/// Only the owner changes or deletes a template
pub fn check_template_write(actor: &AccountSession, template: &Template) -> AppResult<()> {
    if template.owner_id == actor.account_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the template owner can change it".to_string(),
        ))
    }
}
