use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AccountSession;
use crate::error::{field_errors, AppError, AppResult, FieldError};
use crate::models::{
    normalize_notes, notes_change, CreateRepRequest, CreateSessionRequest, CreateSetRequest,
    NewSession, Rep, RepChanges, RepDraft, SessionChanges, SessionDetail, SetChanges, SetDetail,
    SetDraft, Stroke, SwimSession, SwimSet, UpdateRepRequest, UpdateSessionRequest,
    UpdateSetRequest,
};
use crate::services::access::{authorize_session, Intent};
use crate::services::analytics::{
    self, BestSet, DashboardRow, RangeSummary, SessionStats, SessionSummary, StrokeBreakdown,
};
use crate::store::{DateRange, SwimStore};

pub const MAX_LIST_LIMIT: i64 = 500;

/// Session graph plus its totals
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub detail: SessionDetail,
    pub totals: SessionStats,
}

impl SessionView {
    pub fn new(detail: SessionDetail) -> Self {
        let totals = analytics::session_stats(&detail);
        Self { detail, totals }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionAnalytics {
    pub detail: SessionView,
    pub summary: SessionSummary,
    pub by_stroke: BTreeMap<Stroke, StrokeBreakdown>,
    pub best_set: Option<BestSet>,
}

impl SessionAnalytics {
    pub fn build(detail: SessionDetail, basis_m: i32) -> Self {
        let summary = analytics::session_summary(&detail, basis_m);
        let by_stroke = analytics::stroke_breakdown(&detail, basis_m);
        let best_set = analytics::best_set(&detail, basis_m);

        Self {
            detail: SessionView::new(detail),
            summary,
            by_stroke,
            best_set,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RangeItem {
    pub id: Uuid,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RangeListing {
    pub sessions: Vec<RangeItem>,
    pub summary: RangeSummary,
}

/// Inclusive range; `end` before `start` is a bad request
pub fn date_range(start: NaiveDate, end: NaiveDate) -> AppResult<DateRange> {
    if end < start {
        return Err(AppError::BadRequest("end must be >= start".to_string()));
    }
    Ok(DateRange::new(start, end))
}

pub fn list_limit(limit: Option<i64>) -> AppResult<Option<i64>> {
    match limit {
        Some(value) if !(1..=MAX_LIST_LIMIT).contains(&value) => Err(AppError::BadRequest(
            format!("limit must be between 1 and {}", MAX_LIST_LIMIT),
        )),
        other => Ok(other),
    }
}

/// Field checks for a set body, including its nested reps
pub fn validate_set_request(request: &CreateSetRequest) -> AppResult<()> {
    let mut errors: Vec<FieldError> = match request.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => field_errors(&errors, None),
    };

    for (index, rep) in request.reps.iter().enumerate() {
        if let Err(rep_errors) = rep.validate() {
            errors.extend(field_errors(&rep_errors, Some(&format!("reps[{}]", index))));
        }
    }

    if request.reps.len() > request.repeat_count.max(0) as usize {
        errors.push(FieldError::new(
            "reps",
            "too_many",
            format!(
                "{} reps logged but repeat_count is {}",
                request.reps.len(),
                request.repeat_count
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        errors.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.code.cmp(&b.code)));
        Err(AppError::Validation(errors))
    }
}

fn rep_draft(request: CreateRepRequest) -> RepDraft {
    RepDraft {
        time_sec: request.time_sec,
        rpe: request.rpe,
        notes: normalize_notes(request.notes),
    }
}

fn set_draft(request: CreateSetRequest) -> SetDraft {
    SetDraft {
        repeat_count: request.repeat_count,
        distance_m: request.distance_m,
        stroke: request.stroke,
        interval_sec: request.interval_sec,
        notes: normalize_notes(request.notes),
        reps: request.reps.into_iter().map(rep_draft).collect(),
    }
}

/// Sessions, sets and reps on behalf of an authenticated caller
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SwimStore>,
}

impl SessionService {
    pub fn new(store: Arc<dyn SwimStore>) -> Self {
        Self { store }
    }

    async fn session_for(
        &self,
        actor: &AccountSession,
        session_id: Uuid,
        intent: Intent,
    ) -> AppResult<SwimSession> {
        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or(AppError::NotFound("Session"))?;
        authorize_session(self.store.as_ref(), actor, session.swimmer_id, intent).await?;
        Ok(session)
    }

    async fn set_for(&self, actor: &AccountSession, set_id: Uuid, intent: Intent) -> AppResult<SwimSet> {
        let set = self
            .store
            .get_set(set_id)
            .await?
            .ok_or(AppError::NotFound("Set"))?;
        self.session_for(actor, set.session_id, intent).await?;
        Ok(set)
    }

    async fn rep_for(&self, actor: &AccountSession, rep_id: Uuid, intent: Intent) -> AppResult<Rep> {
        let rep = self
            .store
            .get_rep(rep_id)
            .await?
            .ok_or(AppError::NotFound("Rep"))?;
        self.set_for(actor, rep.set_id, intent).await?;
        Ok(rep)
    }

    async fn view(&self, session_id: Uuid) -> AppResult<SessionView> {
        let detail = self
            .store
            .load_detail(session_id)
            .await?
            .ok_or(AppError::NotFound("Session"))?;
        Ok(SessionView::new(detail))
    }

    /// Create a session owned by the caller
    #[tracing::instrument(skip(self, actor, request), fields(account_id = %actor.account_id))]
    pub async fn create_session(
        &self,
        actor: &AccountSession,
        request: CreateSessionRequest,
    ) -> AppResult<SessionView> {
        request.validate()?;
        if actor.is_coach() {
            return Err(AppError::Forbidden(
                "Coaches have read-only access to swimmer sessions".to_string(),
            ));
        }

        let detail = self
            .store
            .create_session(
                NewSession {
                    swimmer_id: actor.account_id,
                    date: request.date,
                    notes: normalize_notes(request.notes),
                    template_id: None,
                },
                Vec::new(),
            )
            .await?;

        tracing::info!(session_id = %detail.session.id, "session created");
        Ok(SessionView::new(detail))
    }

    /// Full session graph, readable by the owner or a supervising coach
    pub async fn get_session(&self, actor: &AccountSession, session_id: Uuid) -> AppResult<SessionView> {
        self.session_for(actor, session_id, Intent::Read).await?;
        self.view(session_id).await
    }

    pub async fn analytics(
        &self,
        actor: &AccountSession,
        session_id: Uuid,
        pace_per_m: Option<i32>,
    ) -> AppResult<SessionAnalytics> {
        let basis = analytics::pace_basis(pace_per_m)?;
        let view = self.get_session(actor, session_id).await?;
        Ok(SessionAnalytics::build(view.detail, basis))
    }

    #[tracing::instrument(skip(self, actor, request), fields(account_id = %actor.account_id))]
    pub async fn update_session(
        &self,
        actor: &AccountSession,
        session_id: Uuid,
        request: UpdateSessionRequest,
    ) -> AppResult<SessionView> {
        request.validate()?;
        self.session_for(actor, session_id, Intent::Write).await?;

        self.store
            .update_session(
                session_id,
                SessionChanges {
                    date: request.date,
                    notes: notes_change(request.notes),
                },
            )
            .await?
            .ok_or(AppError::NotFound("Session"))?;

        self.view(session_id).await
    }

    #[tracing::instrument(skip(self, actor), fields(account_id = %actor.account_id))]
    pub async fn delete_session(&self, actor: &AccountSession, session_id: Uuid) -> AppResult<()> {
        self.session_for(actor, session_id, Intent::Write).await?;

        if !self.store.delete_session(session_id).await? {
            return Err(AppError::NotFound("Session"));
        }
        tracing::info!(session_id = %session_id, "session deleted");
        Ok(())
    }

    /// Append a set, optionally with reps already logged
    #[tracing::instrument(skip(self, actor, request), fields(account_id = %actor.account_id))]
    pub async fn add_set(
        &self,
        actor: &AccountSession,
        session_id: Uuid,
        request: CreateSetRequest,
    ) -> AppResult<SetDetail> {
        validate_set_request(&request)?;
        self.session_for(actor, session_id, Intent::Write).await?;

        let set = self.store.create_set(session_id, set_draft(request)).await?;
        Ok(set)
    }

    #[tracing::instrument(skip(self, actor, request), fields(account_id = %actor.account_id))]
    pub async fn update_set(
        &self,
        actor: &AccountSession,
        set_id: Uuid,
        request: UpdateSetRequest,
    ) -> AppResult<SwimSet> {
        request.validate()?;
        self.set_for(actor, set_id, Intent::Write).await?;

        let changes = SetChanges {
            repeat_count: request.repeat_count,
            distance_m: request.distance_m,
            stroke: request.stroke,
            interval_sec: request.interval_sec,
            notes: notes_change(request.notes),
        };

        self.store
            .update_set(set_id, changes)
            .await?
            .ok_or(AppError::NotFound("Set"))
    }

    #[tracing::instrument(skip(self, actor), fields(account_id = %actor.account_id))]
    pub async fn delete_set(&self, actor: &AccountSession, set_id: Uuid) -> AppResult<()> {
        self.set_for(actor, set_id, Intent::Write).await?;

        if !self.store.delete_set(set_id).await? {
            return Err(AppError::NotFound("Set"));
        }
        Ok(())
    }

    /// Log the next rep of a set
    #[tracing::instrument(skip(self, actor, request), fields(account_id = %actor.account_id))]
    pub async fn add_rep(
        &self,
        actor: &AccountSession,
        set_id: Uuid,
        request: CreateRepRequest,
    ) -> AppResult<Rep> {
        request.validate()?;
        self.set_for(actor, set_id, Intent::Write).await?;

        let rep = self.store.create_rep(set_id, rep_draft(request)).await?;
        Ok(rep)
    }

    #[tracing::instrument(skip(self, actor, request), fields(account_id = %actor.account_id))]
    pub async fn update_rep(
        &self,
        actor: &AccountSession,
        rep_id: Uuid,
        request: UpdateRepRequest,
    ) -> AppResult<Rep> {
        request.validate()?;
        self.rep_for(actor, rep_id, Intent::Write).await?;

        let changes = RepChanges {
            time_sec: request.time_sec,
            rpe: request.rpe,
            notes: notes_change(request.notes),
        };

        self.store
            .update_rep(rep_id, changes)
            .await?
            .ok_or(AppError::NotFound("Rep"))
    }

    #[tracing::instrument(skip(self, actor), fields(account_id = %actor.account_id))]
    pub async fn delete_rep(&self, actor: &AccountSession, rep_id: Uuid) -> AppResult<()> {
        self.rep_for(actor, rep_id, Intent::Write).await?;

        if !self.store.delete_rep(rep_id).await? {
            return Err(AppError::NotFound("Rep"));
        }
        Ok(())
    }

    /// Newest-first dashboard rows for one swimmer; callers authorize
    pub async fn dashboard(
        &self,
        swimmer_id: Uuid,
        limit: Option<i64>,
        pace_per_m: Option<i32>,
    ) -> AppResult<Vec<DashboardRow>> {
        let basis = analytics::pace_basis(pace_per_m)?;
        let limit = list_limit(limit)?;

        let sessions = self.store.list_sessions(swimmer_id, None, limit).await?;
        let details = self.store.load_details(sessions).await?;

        Ok(details
            .iter()
            .map(|detail| analytics::dashboard_row(detail, basis))
            .collect())
    }

    /// Sessions in an inclusive range, oldest first
    pub async fn sessions_in_range(&self, swimmer_id: Uuid, range: DateRange) -> AppResult<Vec<SessionDetail>> {
        let mut sessions = self.store.list_sessions(swimmer_id, Some(range), None).await?;
        sessions.reverse();
        Ok(self.store.load_details(sessions).await?)
    }

    pub async fn range_listing(
        &self,
        swimmer_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        pace_per_m: Option<i32>,
    ) -> AppResult<RangeListing> {
        let range = date_range(start, end)?;
        let basis = analytics::pace_basis(pace_per_m)?;
        let details = self.sessions_in_range(swimmer_id, range).await?;

        let sessions = details
            .iter()
            .map(|detail| RangeItem {
                id: detail.session.id,
                date: detail.session.date,
                notes: detail.session.notes.clone(),
            })
            .collect();

        Ok(RangeListing {
            sessions,
            summary: analytics::sessions_summary(&details, basis),
        })
    }

    pub async fn range_summary(
        &self,
        swimmer_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        pace_per_m: Option<i32>,
    ) -> AppResult<RangeSummary> {
        let range = date_range(start, end)?;
        let basis = analytics::pace_basis(pace_per_m)?;
        let details = self.sessions_in_range(swimmer_id, range).await?;
        Ok(analytics::sessions_summary(&details, basis))
    }
}
