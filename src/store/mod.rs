// Persistence seam: PostgreSQL in production, in-memory for tests and demos

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Account, CoachLink, NewAccount, NewSession, NewTemplate, Rep, RepChanges, RepDraft,
    SessionChanges, SessionDetail, SetChanges, SetDetail, SetDraft, SwimSession, SwimSet,
    Template, TemplateChanges,
};

pub use memory::MemoryStore;
pub use postgres::{run_migrations, PgStore};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[async_trait]
pub trait SwimStore: Send + Sync {
    // Accounts
    async fn insert_account(&self, account: NewAccount) -> StoreResult<Account>;
    async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>>;
    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>>;
    async fn find_account_by_username(&self, username: &str) -> StoreResult<Option<Account>>;

    /// Email when the identifier contains `@`, username otherwise
    async fn find_account_by_identifier(&self, identifier: &str) -> StoreResult<Option<Account>> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Ok(None);
        }
        if identifier.contains('@') {
            return self.find_account_by_email(&identifier.to_lowercase()).await;
        }
        self.find_account_by_username(identifier).await
    }

    // Supervision
    async fn link_coach(&self, coach_id: Uuid, swimmer_id: Uuid) -> StoreResult<CoachLink>;
    async fn unlink_coach(&self, coach_id: Uuid, swimmer_id: Uuid) -> StoreResult<bool>;
    async fn is_supervising(&self, coach_id: Uuid, swimmer_id: Uuid) -> StoreResult<bool>;
    async fn list_swimmers_of_coach(&self, coach_id: Uuid) -> StoreResult<Vec<Account>>;
    async fn list_coaches_of_swimmer(&self, swimmer_id: Uuid) -> StoreResult<Vec<Account>>;

    // Sessions
    async fn create_session(
        &self,
        session: NewSession,
        sets: Vec<SetDraft>,
    ) -> StoreResult<SessionDetail>;
    async fn get_session(&self, id: Uuid) -> StoreResult<Option<SwimSession>>;
    async fn update_session(
        &self,
        id: Uuid,
        changes: SessionChanges,
    ) -> StoreResult<Option<SwimSession>>;
    async fn delete_session(&self, id: Uuid) -> StoreResult<bool>;
    /// Newest first: date descending, then creation descending
    async fn list_sessions(
        &self,
        swimmer_id: Uuid,
        range: Option<DateRange>,
        limit: Option<i64>,
    ) -> StoreResult<Vec<SwimSession>>;

    // Sets
    async fn create_set(&self, session_id: Uuid, set: SetDraft) -> StoreResult<SetDetail>;
    async fn get_set(&self, id: Uuid) -> StoreResult<Option<SwimSet>>;
    async fn update_set(&self, id: Uuid, changes: SetChanges) -> StoreResult<Option<SwimSet>>;
    async fn delete_set(&self, id: Uuid) -> StoreResult<bool>;
    async fn list_sets(&self, session_ids: &[Uuid]) -> StoreResult<Vec<SwimSet>>;

    // Reps
    async fn create_rep(&self, set_id: Uuid, rep: RepDraft) -> StoreResult<Rep>;
    async fn get_rep(&self, id: Uuid) -> StoreResult<Option<Rep>>;
    async fn update_rep(&self, id: Uuid, changes: RepChanges) -> StoreResult<Option<Rep>>;
    async fn delete_rep(&self, id: Uuid) -> StoreResult<bool>;
    async fn list_reps(&self, set_ids: &[Uuid]) -> StoreResult<Vec<Rep>>;

    // Templates
    async fn create_template(&self, template: NewTemplate) -> StoreResult<Template>;
    async fn get_template(&self, id: Uuid) -> StoreResult<Option<Template>>;
    async fn update_template(
        &self,
        id: Uuid,
        changes: TemplateChanges,
    ) -> StoreResult<Option<Template>>;
    async fn delete_template(&self, id: Uuid) -> StoreResult<bool>;
    /// Ordered by name, then creation
    async fn list_templates(&self, owner_ids: &[Uuid]) -> StoreResult<Vec<Template>>;

    /// Load sets and reps for the given sessions, keeping the input order
    async fn load_details(&self, sessions: Vec<SwimSession>) -> StoreResult<Vec<SessionDetail>> {
        if sessions.is_empty() {
            return Ok(Vec::new());
        }

        let session_ids: Vec<Uuid> = sessions.iter().map(|s| s.id).collect();
        let sets = self.list_sets(&session_ids).await?;
        let set_ids: Vec<Uuid> = sets.iter().map(|s| s.id).collect();
        let reps = self.list_reps(&set_ids).await?;

        let details = sessions
            .into_iter()
            .map(|session| {
                let session_sets: Vec<SwimSet> = sets
                    .iter()
                    .filter(|set| set.session_id == session.id)
                    .cloned()
                    .collect();
                let session_reps: Vec<Rep> = reps
                    .iter()
                    .filter(|rep| session_sets.iter().any(|set| set.id == rep.set_id))
                    .cloned()
                    .collect();
                SessionDetail::assemble(session, session_sets, session_reps)
            })
            .collect();

        Ok(details)
    }

    async fn load_detail(&self, session_id: Uuid) -> StoreResult<Option<SessionDetail>> {
        let session = match self.get_session(session_id).await? {
            Some(session) => session,
            None => return Ok(None),
        };
        Ok(self.load_details(vec![session]).await?.into_iter().next())
    }
}
