use chrono::NaiveDate;
use futures::future::try_join_all;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AccountSession;
use crate::error::{AppError, AppResult};
use crate::models::{Account, AccountInfo, LinkCoachRequest};
use crate::services::analytics::{self, DashboardRow, LeaderboardRow, RangeSummary};
use crate::services::session_service::{
    date_range, SessionAnalytics, SessionService, SessionView,
};
use crate::store::SwimStore;

pub const DEFAULT_OVERVIEW_LIMIT: i64 = 3;
pub const MAX_OVERVIEW_LIMIT: i64 = 50;

#[derive(Debug, Clone, Serialize)]
pub struct OverviewEntry {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub recent_sessions: Vec<DashboardRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub swimmers: Vec<OverviewEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Leaderboard {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub pace_basis_m: i32,
    pub rows: Vec<LeaderboardRow>,
}

fn overview_limit(limit: Option<i64>) -> AppResult<i64> {
    let limit = limit.unwrap_or(DEFAULT_OVERVIEW_LIMIT);
    if !(1..=MAX_OVERVIEW_LIMIT).contains(&limit) {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_OVERVIEW_LIMIT
        )));
    }
    Ok(limit)
}

/// Coach links seen from both sides, plus the coach's read-only views
#[derive(Clone)]
pub struct CoachService {
    store: Arc<dyn SwimStore>,
    sessions: SessionService,
}

impl CoachService {
    pub fn new(store: Arc<dyn SwimStore>) -> Self {
        Self {
            sessions: SessionService::new(store.clone()),
            store,
        }
    }

    /// Swimmer adds a coach by email or username
    #[tracing::instrument(skip(self, actor, request), fields(account_id = %actor.account_id))]
    pub async fn link_coach(
        &self,
        actor: &AccountSession,
        request: LinkCoachRequest,
    ) -> AppResult<AccountInfo> {
        request.validate()?;

        let coach = self
            .store
            .find_account_by_identifier(&request.identifier)
            .await?
            .ok_or(AppError::NotFound("Coach"))?;
        if !coach.is_coach() {
            return Err(AppError::BadRequest("Account is not a coach".to_string()));
        }

        self.store.link_coach(coach.id, actor.account_id).await?;
        tracing::info!(coach_id = %coach.id, "coach linked");

        Ok(AccountInfo::from(coach))
    }

    #[tracing::instrument(skip(self, actor), fields(account_id = %actor.account_id))]
    pub async fn unlink_coach(&self, actor: &AccountSession, coach_id: Uuid) -> AppResult<()> {
        if !self.store.unlink_coach(coach_id, actor.account_id).await? {
            return Err(AppError::NotFound("Coach link"));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, actor), fields(account_id = %actor.account_id))]
    pub async fn list_coaches(&self, actor: &AccountSession) -> AppResult<Vec<AccountInfo>> {
        let coaches = self.store.list_coaches_of_swimmer(actor.account_id).await?;
        Ok(coaches.into_iter().map(AccountInfo::from).collect())
    }

    #[tracing::instrument(skip(self, actor), fields(account_id = %actor.account_id))]
    pub async fn list_swimmers(&self, actor: &AccountSession) -> AppResult<Vec<AccountInfo>> {
        let swimmers = self.store.list_swimmers_of_coach(actor.account_id).await?;
        Ok(swimmers.into_iter().map(AccountInfo::from).collect())
    }

    /// The swimmer must exist, be a swimmer, and be supervised by the caller
    async fn supervised_swimmer(&self, actor: &AccountSession, swimmer_id: Uuid) -> AppResult<Account> {
        let swimmer = self
            .store
            .find_account(swimmer_id)
            .await?
            .ok_or(AppError::NotFound("Swimmer"))?;
        if !swimmer.is_swimmer() {
            return Err(AppError::BadRequest("Account is not a swimmer".to_string()));
        }
        if !self.store.is_supervising(actor.account_id, swimmer_id).await? {
            tracing::debug!(coach_id = %actor.account_id, swimmer_id = %swimmer_id, "swimmer not supervised");
            return Err(AppError::Forbidden(
                "You do not supervise this swimmer".to_string(),
            ));
        }
        Ok(swimmer)
    }

    #[tracing::instrument(skip(self, actor), fields(account_id = %actor.account_id))]
    pub async fn swimmer_dashboard(
        &self,
        actor: &AccountSession,
        swimmer_id: Uuid,
        limit: Option<i64>,
        pace_per_m: Option<i32>,
    ) -> AppResult<Vec<DashboardRow>> {
        self.supervised_swimmer(actor, swimmer_id).await?;
        self.sessions.dashboard(swimmer_id, limit, pace_per_m).await
    }

    #[tracing::instrument(skip(self, actor), fields(account_id = %actor.account_id))]
    pub async fn swimmer_session(
        &self,
        actor: &AccountSession,
        swimmer_id: Uuid,
        session_id: Uuid,
    ) -> AppResult<SessionView> {
        self.supervised_swimmer(actor, swimmer_id).await?;

        let detail = self
            .store
            .load_detail(session_id)
            .await?
            .ok_or(AppError::NotFound("Session"))?;
        if detail.session.swimmer_id != swimmer_id {
            return Err(AppError::Conflict(
                "Session does not belong to this swimmer".to_string(),
            ));
        }

        Ok(SessionView::new(detail))
    }

    #[tracing::instrument(skip(self, actor), fields(account_id = %actor.account_id))]
    pub async fn swimmer_session_analytics(
        &self,
        actor: &AccountSession,
        swimmer_id: Uuid,
        session_id: Uuid,
        pace_per_m: Option<i32>,
    ) -> AppResult<SessionAnalytics> {
        let basis = analytics::pace_basis(pace_per_m)?;
        let view = self.swimmer_session(actor, swimmer_id, session_id).await?;
        Ok(SessionAnalytics::build(view.detail, basis))
    }

    #[tracing::instrument(skip(self, actor), fields(account_id = %actor.account_id))]
    pub async fn swimmer_range_summary(
        &self,
        actor: &AccountSession,
        swimmer_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        pace_per_m: Option<i32>,
    ) -> AppResult<RangeSummary> {
        date_range(start, end)?;
        self.supervised_swimmer(actor, swimmer_id).await?;
        self.sessions
            .range_summary(swimmer_id, start, end, pace_per_m)
            .await
    }

    /// Most recent sessions of every supervised swimmer
    #[tracing::instrument(skip(self, actor), fields(account_id = %actor.account_id))]
    pub async fn overview(
        &self,
        actor: &AccountSession,
        limit: Option<i64>,
        pace_per_m: Option<i32>,
    ) -> AppResult<Overview> {
        let limit = overview_limit(limit)?;
        analytics::pace_basis(pace_per_m)?;

        let swimmers = self.store.list_swimmers_of_coach(actor.account_id).await?;
        let mut entries = Vec::with_capacity(swimmers.len());
        for swimmer in swimmers {
            let recent_sessions = self
                .sessions
                .dashboard(swimmer.id, Some(limit), pace_per_m)
                .await?;
            entries.push(OverviewEntry {
                id: swimmer.id,
                email: swimmer.email,
                username: swimmer.username,
                recent_sessions,
            });
        }

        Ok(Overview { swimmers: entries })
    }

    /// Supervised swimmers ranked by distance over an inclusive range
    #[tracing::instrument(skip(self, actor), fields(account_id = %actor.account_id))]
    pub async fn leaderboard(
        &self,
        actor: &AccountSession,
        start: NaiveDate,
        end: NaiveDate,
        pace_per_m: Option<i32>,
    ) -> AppResult<Leaderboard> {
        let range = date_range(start, end)?;
        let basis = analytics::pace_basis(pace_per_m)?;

        let swimmers = self.store.list_swimmers_of_coach(actor.account_id).await?;
        let entries = try_join_all(swimmers.into_iter().map(|swimmer| async move {
            let details = self.sessions.sessions_in_range(swimmer.id, range).await?;
            Ok::<_, AppError>((AccountInfo::from(swimmer), details))
        }))
        .await?;

        Ok(Leaderboard {
            start,
            end,
            pace_basis_m: basis,
            rows: analytics::leaderboard(&entries, basis),
        })
    }
}
