use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, types::Json, PgConnection, PgPool};
use uuid::Uuid;

use super::{DateRange, StoreError, StoreResult, SwimStore};
use crate::config::DatabaseSettings;
use crate::models::{
    Account, CoachLink, NewAccount, NewSession, NewTemplate, Rep, RepChanges, RepDraft,
    SessionChanges, SessionDetail, SetChanges, SetDetail, SetDraft, SwimSession, SwimSet,
    Template, TemplateChanges, TemplateRow,
};

const ACCOUNT_COLUMNS: &str = "id, email, username, password_hash, role, created_at, updated_at";
const SESSION_COLUMNS: &str = "id, swimmer_id, date, notes, template_id, created_at, updated_at";
const SET_COLUMNS: &str =
    "id, session_id, position, repeat_count, distance_m, stroke, interval_sec, notes, created_at";
const REP_COLUMNS: &str = "id, set_id, rep_index, time_sec, rpe, notes, created_at";
const TEMPLATE_COLUMNS: &str = "id, owner_id, name, description, sets, created_at, updated_at";

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Translate constraint violations into domain conflicts
fn map_account_error(err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            let message = match db_err.constraint() {
                Some(constraint) if constraint.contains("username") => "Username already taken",
                _ => "Email already registered",
            };
            return StoreError::Conflict(message.to_string());
        }
    }
    StoreError::Database(err)
}

fn map_link_error(err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => {
                return StoreError::Conflict("Coach already linked".to_string())
            }
            Some(FOREIGN_KEY_VIOLATION) => return StoreError::NotFound("Account"),
            _ => {}
        }
    }
    StoreError::Database(err)
}

fn full_set(logged: i64, repeat_count: i32) -> StoreError {
    StoreError::Conflict(format!(
        "Set already has {} of {} reps logged",
        logged, repeat_count
    ))
}

/// PostgreSQL-backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool sized by `settings` and bring the schema up to date
    pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect(&settings.url)
            .await?;
        run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    async fn insert_set(
        conn: &mut PgConnection,
        session_id: Uuid,
        draft: SetDraft,
    ) -> StoreResult<SetDetail> {
        if draft.reps.len() as i64 > i64::from(draft.repeat_count) {
            return Err(full_set(draft.reps.len() as i64, draft.repeat_count));
        }

        let position: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position), 0) + 1 FROM swim_sets WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_one(&mut *conn)
        .await?;

        let set = sqlx::query_as::<_, SwimSet>(&format!(
            "INSERT INTO swim_sets (id, session_id, position, repeat_count, distance_m, stroke, interval_sec, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {}",
            SET_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind(position)
        .bind(draft.repeat_count)
        .bind(draft.distance_m)
        .bind(draft.stroke)
        .bind(draft.interval_sec)
        .bind(&draft.notes)
        .fetch_one(&mut *conn)
        .await?;

        let mut reps = Vec::with_capacity(draft.reps.len());
        for (index, rep) in draft.reps.into_iter().enumerate() {
            let created = sqlx::query_as::<_, Rep>(&format!(
                "INSERT INTO reps (id, set_id, rep_index, time_sec, rpe, notes)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING {}",
                REP_COLUMNS
            ))
            .bind(Uuid::new_v4())
            .bind(set.id)
            .bind(index as i32 + 1)
            .bind(rep.time_sec)
            .bind(rep.rpe)
            .bind(&rep.notes)
            .fetch_one(&mut *conn)
            .await?;
            reps.push(created);
        }

        Ok(SetDetail { set, reps })
    }
}

#[async_trait]
impl SwimStore for PgStore {
    async fn insert_account(&self, account: NewAccount) -> StoreResult<Account> {
        sqlx::query_as::<_, Account>(&format!(
            "INSERT INTO accounts (id, email, username, password_hash, role)
             VALUES ($1, LOWER($2), $3, $4, $5)
             RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&account.email)
        .bind(&account.username)
        .bind(&account.password_hash)
        .bind(account.role)
        .fetch_one(&self.pool)
        .await
        .map_err(map_account_error)
    }

    async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE email = LOWER($1)",
            ACCOUNT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn find_account_by_username(&self, username: &str) -> StoreResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE LOWER(username) = LOWER($1)",
            ACCOUNT_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn link_coach(&self, coach_id: Uuid, swimmer_id: Uuid) -> StoreResult<CoachLink> {
        sqlx::query_as::<_, CoachLink>(
            "INSERT INTO coach_links (coach_id, swimmer_id)
             VALUES ($1, $2)
             RETURNING coach_id, swimmer_id, created_at",
        )
        .bind(coach_id)
        .bind(swimmer_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_link_error)
    }

    async fn unlink_coach(&self, coach_id: Uuid, swimmer_id: Uuid) -> StoreResult<bool> {
        let result =
            sqlx::query("DELETE FROM coach_links WHERE coach_id = $1 AND swimmer_id = $2")
                .bind(coach_id)
                .bind(swimmer_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_supervising(&self, coach_id: Uuid, swimmer_id: Uuid) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM coach_links WHERE coach_id = $1 AND swimmer_id = $2)",
        )
        .bind(coach_id)
        .bind(swimmer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn list_swimmers_of_coach(&self, coach_id: Uuid) -> StoreResult<Vec<Account>> {
        let swimmers = sqlx::query_as::<_, Account>(
            "SELECT a.id, a.email, a.username, a.password_hash, a.role, a.created_at, a.updated_at
             FROM accounts a
             JOIN coach_links l ON l.swimmer_id = a.id
             WHERE l.coach_id = $1
             ORDER BY a.email",
        )
        .bind(coach_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(swimmers)
    }

    async fn list_coaches_of_swimmer(&self, swimmer_id: Uuid) -> StoreResult<Vec<Account>> {
        let coaches = sqlx::query_as::<_, Account>(
            "SELECT a.id, a.email, a.username, a.password_hash, a.role, a.created_at, a.updated_at
             FROM accounts a
             JOIN coach_links l ON l.coach_id = a.id
             WHERE l.swimmer_id = $1
             ORDER BY a.email",
        )
        .bind(swimmer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(coaches)
    }

    async fn create_session(
        &self,
        session: NewSession,
        sets: Vec<SetDraft>,
    ) -> StoreResult<SessionDetail> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, SwimSession>(&format!(
            "INSERT INTO swim_sessions (id, swimmer_id, date, notes, template_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            SESSION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(session.swimmer_id)
        .bind(session.date)
        .bind(&session.notes)
        .bind(session.template_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut set_details = Vec::with_capacity(sets.len());
        for draft in sets {
            set_details.push(Self::insert_set(&mut *tx, created.id, draft).await?);
        }

        tx.commit().await?;

        Ok(SessionDetail {
            session: created,
            sets: set_details,
        })
    }

    async fn get_session(&self, id: Uuid) -> StoreResult<Option<SwimSession>> {
        let session = sqlx::query_as::<_, SwimSession>(&format!(
            "SELECT {} FROM swim_sessions WHERE id = $1",
            SESSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn update_session(
        &self,
        id: Uuid,
        changes: SessionChanges,
    ) -> StoreResult<Option<SwimSession>> {
        let notes_changed = changes.notes.is_some();
        let session = sqlx::query_as::<_, SwimSession>(&format!(
            "UPDATE swim_sessions
             SET date = COALESCE($2, date),
                 notes = CASE WHEN $3 THEN $4 ELSE notes END,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            SESSION_COLUMNS
        ))
        .bind(id)
        .bind(changes.date)
        .bind(notes_changed)
        .bind(changes.notes.flatten())
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn delete_session(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM swim_sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_sessions(
        &self,
        swimmer_id: Uuid,
        range: Option<DateRange>,
        limit: Option<i64>,
    ) -> StoreResult<Vec<SwimSession>> {
        let sessions = sqlx::query_as::<_, SwimSession>(&format!(
            "SELECT {} FROM swim_sessions
             WHERE swimmer_id = $1
               AND ($2::date IS NULL OR date >= $2)
               AND ($3::date IS NULL OR date <= $3)
             ORDER BY date DESC, created_at DESC, id
             LIMIT $4",
            SESSION_COLUMNS
        ))
        .bind(swimmer_id)
        .bind(range.map(|r| r.start))
        .bind(range.map(|r| r.end))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    async fn create_set(&self, session_id: Uuid, set: SetDraft) -> StoreResult<SetDetail> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM swim_sessions WHERE id = $1 FOR UPDATE")
                .bind(session_id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(StoreError::NotFound("Session"));
        }

        let detail = Self::insert_set(&mut *tx, session_id, set).await?;
        tx.commit().await?;

        Ok(detail)
    }

    async fn get_set(&self, id: Uuid) -> StoreResult<Option<SwimSet>> {
        let set = sqlx::query_as::<_, SwimSet>(&format!(
            "SELECT {} FROM swim_sets WHERE id = $1",
            SET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(set)
    }

    async fn update_set(&self, id: Uuid, changes: SetChanges) -> StoreResult<Option<SwimSet>> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes against create_rep on the same set
        let current: Option<i32> =
            sqlx::query_scalar("SELECT repeat_count FROM swim_sets WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if current.is_none() {
            return Ok(None);
        }

        if let Some(repeat_count) = changes.repeat_count {
            let logged: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reps WHERE set_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
            if i64::from(repeat_count) < logged {
                return Err(StoreError::Conflict(format!(
                    "Set already has {} reps logged",
                    logged
                )));
            }
        }

        let interval_changed = changes.interval_sec.is_some();
        let notes_changed = changes.notes.is_some();
        let set = sqlx::query_as::<_, SwimSet>(&format!(
            "UPDATE swim_sets
             SET repeat_count = COALESCE($2, repeat_count),
                 distance_m = COALESCE($3, distance_m),
                 stroke = COALESCE($4, stroke),
                 interval_sec = CASE WHEN $5 THEN $6 ELSE interval_sec END,
                 notes = CASE WHEN $7 THEN $8 ELSE notes END
             WHERE id = $1
             RETURNING {}",
            SET_COLUMNS
        ))
        .bind(id)
        .bind(changes.repeat_count)
        .bind(changes.distance_m)
        .bind(changes.stroke)
        .bind(interval_changed)
        .bind(changes.interval_sec.flatten())
        .bind(notes_changed)
        .bind(changes.notes.flatten())
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(set)
    }

    async fn delete_set(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM swim_sets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_sets(&self, session_ids: &[Uuid]) -> StoreResult<Vec<SwimSet>> {
        let sets = sqlx::query_as::<_, SwimSet>(&format!(
            "SELECT {} FROM swim_sets WHERE session_id = ANY($1) ORDER BY session_id, position",
            SET_COLUMNS
        ))
        .bind(session_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(sets)
    }

    async fn create_rep(&self, set_id: Uuid, rep: RepDraft) -> StoreResult<Rep> {
        let mut tx = self.pool.begin().await?;

        let repeat_count: Option<i32> =
            sqlx::query_scalar("SELECT repeat_count FROM swim_sets WHERE id = $1 FOR UPDATE")
                .bind(set_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(repeat_count) = repeat_count else {
            return Err(StoreError::NotFound("Set"));
        };

        let (logged, last_index): (i64, i32) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(MAX(rep_index), 0) FROM reps WHERE set_id = $1",
        )
        .bind(set_id)
        .fetch_one(&mut *tx)
        .await?;
        if logged >= i64::from(repeat_count) {
            return Err(full_set(logged, repeat_count));
        }

        let created = sqlx::query_as::<_, Rep>(&format!(
            "INSERT INTO reps (id, set_id, rep_index, time_sec, rpe, notes)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            REP_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(set_id)
        .bind(last_index + 1)
        .bind(rep.time_sec)
        .bind(rep.rpe)
        .bind(&rep.notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn get_rep(&self, id: Uuid) -> StoreResult<Option<Rep>> {
        let rep = sqlx::query_as::<_, Rep>(&format!(
            "SELECT {} FROM reps WHERE id = $1",
            REP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rep)
    }

    async fn update_rep(&self, id: Uuid, changes: RepChanges) -> StoreResult<Option<Rep>> {
        let rpe_changed = changes.rpe.is_some();
        let notes_changed = changes.notes.is_some();
        let rep = sqlx::query_as::<_, Rep>(&format!(
            "UPDATE reps
             SET time_sec = COALESCE($2, time_sec),
                 rpe = CASE WHEN $3 THEN $4 ELSE rpe END,
                 notes = CASE WHEN $5 THEN $6 ELSE notes END
             WHERE id = $1
             RETURNING {}",
            REP_COLUMNS
        ))
        .bind(id)
        .bind(changes.time_sec)
        .bind(rpe_changed)
        .bind(changes.rpe.flatten())
        .bind(notes_changed)
        .bind(changes.notes.flatten())
        .fetch_optional(&self.pool)
        .await?;
        Ok(rep)
    }

    async fn delete_rep(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM reps WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_reps(&self, set_ids: &[Uuid]) -> StoreResult<Vec<Rep>> {
        let reps = sqlx::query_as::<_, Rep>(&format!(
            "SELECT {} FROM reps WHERE set_id = ANY($1) ORDER BY set_id, rep_index",
            REP_COLUMNS
        ))
        .bind(set_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(reps)
    }

    async fn create_template(&self, template: NewTemplate) -> StoreResult<Template> {
        let row = sqlx::query_as::<_, TemplateRow>(&format!(
            "INSERT INTO templates (id, owner_id, name, description, sets)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            TEMPLATE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(template.owner_id)
        .bind(&template.name)
        .bind(&template.description)
        .bind(Json(&template.sets))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn get_template(&self, id: Uuid) -> StoreResult<Option<Template>> {
        let row = sqlx::query_as::<_, TemplateRow>(&format!(
            "SELECT {} FROM templates WHERE id = $1",
            TEMPLATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Template::from))
    }

    async fn update_template(
        &self,
        id: Uuid,
        changes: TemplateChanges,
    ) -> StoreResult<Option<Template>> {
        let description_changed = changes.description.is_some();
        let row = sqlx::query_as::<_, TemplateRow>(&format!(
            "UPDATE templates
             SET name = COALESCE($2, name),
                 description = CASE WHEN $3 THEN $4 ELSE description END,
                 sets = COALESCE($5, sets),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            TEMPLATE_COLUMNS
        ))
        .bind(id)
        .bind(changes.name)
        .bind(description_changed)
        .bind(changes.description.flatten())
        .bind(changes.sets.map(Json))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Template::from))
    }

    async fn delete_template(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM templates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_templates(&self, owner_ids: &[Uuid]) -> StoreResult<Vec<Template>> {
        let rows = sqlx::query_as::<_, TemplateRow>(&format!(
            "SELECT {} FROM templates WHERE owner_id = ANY($1) ORDER BY name, created_at",
            TEMPLATE_COLUMNS
        ))
        .bind(owner_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Template::from).collect())
    }
}
