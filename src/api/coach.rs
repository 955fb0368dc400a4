use axum::{
    extract::{Path, Query, State},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use super::queries::{ListQuery, PaceQuery, RangeQuery};
use crate::auth::{coach_only_middleware, jwt_auth_middleware, AccountSession, AuthService};
use crate::error::{AppError, AppResult};
use crate::models::AccountInfo;
use crate::services::analytics::{DashboardRow, RangeSummary};
use crate::services::coach_service::{Leaderboard, Overview};
use crate::services::session_service::{SessionAnalytics, SessionView};
use crate::services::CoachService;

/// Read-only views over supervised swimmers
pub fn coach_routes(coaches: CoachService, auth_service: AuthService) -> Router {
    Router::new()
        .route("/swimmers", get(list_swimmers))
        .route("/swimmers/:swimmer_id/sessions", get(swimmer_sessions))
        .route(
            "/swimmers/:swimmer_id/sessions/range/summary",
            get(swimmer_range_summary),
        )
        .route(
            "/swimmers/:swimmer_id/sessions/:session_id",
            get(swimmer_session),
        )
        .route(
            "/swimmers/:swimmer_id/sessions/:session_id/analytics",
            get(swimmer_session_analytics),
        )
        .route("/overview", get(overview))
        .route("/leaderboard", get(leaderboard))
        .route_layer(middleware::from_fn(coach_only_middleware))
        .route_layer(middleware::from_fn_with_state(
            auth_service,
            jwt_auth_middleware,
        ))
        .with_state(coaches)
}

type SessionPath = WithRejection<Path<(Uuid, Uuid)>, AppError>;

#[tracing::instrument(skip(coaches, session), fields(account_id = %session.account_id))]
async fn list_swimmers(
    State(coaches): State<CoachService>,
    session: AccountSession,
) -> AppResult<Json<Vec<AccountInfo>>> {
    Ok(Json(coaches.list_swimmers(&session).await?))
}

#[tracing::instrument(skip(coaches, session, query), fields(account_id = %session.account_id))]
async fn swimmer_sessions(
    State(coaches): State<CoachService>,
    session: AccountSession,
    WithRejection(Path(swimmer_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Query(query), _): WithRejection<Query<ListQuery>, AppError>,
) -> AppResult<Json<Vec<DashboardRow>>> {
    let rows = coaches
        .swimmer_dashboard(&session, swimmer_id, query.limit, query.pace_per_m)
        .await?;
    Ok(Json(rows))
}

#[tracing::instrument(skip(coaches, session, query), fields(account_id = %session.account_id))]
async fn swimmer_range_summary(
    State(coaches): State<CoachService>,
    session: AccountSession,
    WithRejection(Path(swimmer_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Query(query), _): WithRejection<Query<RangeQuery>, AppError>,
) -> AppResult<Json<RangeSummary>> {
    let summary = coaches
        .swimmer_range_summary(&session, swimmer_id, query.start, query.end, query.pace_per_m)
        .await?;
    Ok(Json(summary))
}

#[tracing::instrument(skip(coaches, session), fields(account_id = %session.account_id))]
async fn swimmer_session(
    State(coaches): State<CoachService>,
    session: AccountSession,
    WithRejection(Path((swimmer_id, session_id)), _): SessionPath,
) -> AppResult<Json<SessionView>> {
    let view = coaches
        .swimmer_session(&session, swimmer_id, session_id)
        .await?;
    Ok(Json(view))
}

#[tracing::instrument(skip(coaches, session, query), fields(account_id = %session.account_id))]
async fn swimmer_session_analytics(
    State(coaches): State<CoachService>,
    session: AccountSession,
    WithRejection(Path((swimmer_id, session_id)), _): SessionPath,
    WithRejection(Query(query), _): WithRejection<Query<PaceQuery>, AppError>,
) -> AppResult<Json<SessionAnalytics>> {
    let analytics = coaches
        .swimmer_session_analytics(&session, swimmer_id, session_id, query.pace_per_m)
        .await?;
    Ok(Json(analytics))
}

/// Recent sessions for every supervised swimmer
#[tracing::instrument(skip(coaches, session, query), fields(account_id = %session.account_id))]
async fn overview(
    State(coaches): State<CoachService>,
    session: AccountSession,
    WithRejection(Query(query), _): WithRejection<Query<ListQuery>, AppError>,
) -> AppResult<Json<Overview>> {
    let overview = coaches
        .overview(&session, query.limit, query.pace_per_m)
        .await?;
    Ok(Json(overview))
}

#[tracing::instrument(skip(coaches, session, query), fields(account_id = %session.account_id))]
async fn leaderboard(
    State(coaches): State<CoachService>,
    session: AccountSession,
    WithRejection(Query(query), _): WithRejection<Query<RangeQuery>, AppError>,
) -> AppResult<Json<Leaderboard>> {
    let board = coaches
        .leaderboard(&session, query.start, query.end, query.pace_per_m)
        .await?;
    Ok(Json(board))
}
