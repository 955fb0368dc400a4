use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use super::queries::{ListQuery, PaceQuery, RangeQuery};
use crate::auth::{jwt_auth_middleware, swimmer_only_middleware, AccountSession, AuthService};
use crate::error::{AppError, AppResult};
use crate::models::{
    AccountInfo, CreateRepRequest, CreateSessionRequest, CreateSetRequest, LinkCoachRequest, Rep,
    SetDetail, SwimSet, UpdateRepRequest, UpdateSessionRequest, UpdateSetRequest,
};
use crate::services::analytics::{DashboardRow, RangeSummary};
use crate::services::session_service::{RangeListing, SessionAnalytics, SessionView};
use crate::services::{CoachService, SessionService};

#[derive(Clone)]
pub struct MeState {
    pub sessions: SessionService,
    pub coaches: CoachService,
}

/// The calling swimmer's own log and coach links
pub fn me_routes(state: MeState, auth_service: AuthService) -> Router {
    Router::new()
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/range", get(range_listing))
        .route("/sessions/range/summary", get(range_summary))
        .route(
            "/sessions/:session_id",
            get(get_session).put(update_session).delete(delete_session),
        )
        .route("/sessions/:session_id/analytics", get(session_analytics))
        .route("/sessions/:session_id/sets", post(add_set))
        .route("/sets/:set_id", put(update_set).delete(delete_set))
        .route("/sets/:set_id/reps", post(add_rep))
        .route("/reps/:rep_id", put(update_rep).delete(delete_rep))
        .route("/coaches", get(list_coaches).post(link_coach))
        .route("/coaches/:coach_id", delete(unlink_coach))
        .route_layer(middleware::from_fn(swimmer_only_middleware))
        .route_layer(middleware::from_fn_with_state(
            auth_service,
            jwt_auth_middleware,
        ))
        .with_state(state)
}

type IdPath = WithRejection<Path<Uuid>, AppError>;

/// Dashboard rows, newest first
#[tracing::instrument(skip(state, session, query), fields(account_id = %session.account_id))]
async fn list_sessions(
    State(state): State<MeState>,
    session: AccountSession,
    WithRejection(Query(query), _): WithRejection<Query<ListQuery>, AppError>,
) -> AppResult<Json<Vec<DashboardRow>>> {
    let rows = state
        .sessions
        .dashboard(session.account_id, query.limit, query.pace_per_m)
        .await?;
    Ok(Json(rows))
}

#[tracing::instrument(skip(state, session, request), fields(account_id = %session.account_id))]
async fn create_session(
    State(state): State<MeState>,
    session: AccountSession,
    WithRejection(Json(request), _): WithRejection<Json<CreateSessionRequest>, AppError>,
) -> AppResult<(StatusCode, Json<SessionView>)> {
    let view = state.sessions.create_session(&session, request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[tracing::instrument(skip(state, session, query), fields(account_id = %session.account_id))]
async fn range_listing(
    State(state): State<MeState>,
    session: AccountSession,
    WithRejection(Query(query), _): WithRejection<Query<RangeQuery>, AppError>,
) -> AppResult<Json<RangeListing>> {
    let listing = state
        .sessions
        .range_listing(session.account_id, query.start, query.end, query.pace_per_m)
        .await?;
    Ok(Json(listing))
}

#[tracing::instrument(skip(state, session, query), fields(account_id = %session.account_id))]
async fn range_summary(
    State(state): State<MeState>,
    session: AccountSession,
    WithRejection(Query(query), _): WithRejection<Query<RangeQuery>, AppError>,
) -> AppResult<Json<RangeSummary>> {
    let summary = state
        .sessions
        .range_summary(session.account_id, query.start, query.end, query.pace_per_m)
        .await?;
    Ok(Json(summary))
}

#[tracing::instrument(skip(state, session), fields(account_id = %session.account_id))]
async fn get_session(
    State(state): State<MeState>,
    session: AccountSession,
    WithRejection(Path(session_id), _): IdPath,
) -> AppResult<Json<SessionView>> {
    Ok(Json(state.sessions.get_session(&session, session_id).await?))
}

#[tracing::instrument(skip(state, session, request), fields(account_id = %session.account_id))]
async fn update_session(
    State(state): State<MeState>,
    session: AccountSession,
    WithRejection(Path(session_id), _): IdPath,
    WithRejection(Json(request), _): WithRejection<Json<UpdateSessionRequest>, AppError>,
) -> AppResult<Json<SessionView>> {
    let view = state
        .sessions
        .update_session(&session, session_id, request)
        .await?;
    Ok(Json(view))
}

#[tracing::instrument(skip(state, session), fields(account_id = %session.account_id))]
async fn delete_session(
    State(state): State<MeState>,
    session: AccountSession,
    WithRejection(Path(session_id), _): IdPath,
) -> AppResult<StatusCode> {
    state.sessions.delete_session(&session, session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Detail, summary, per-stroke breakdown and best set
#[tracing::instrument(skip(state, session, query), fields(account_id = %session.account_id))]
async fn session_analytics(
    State(state): State<MeState>,
    session: AccountSession,
    WithRejection(Path(session_id), _): IdPath,
    WithRejection(Query(query), _): WithRejection<Query<PaceQuery>, AppError>,
) -> AppResult<Json<SessionAnalytics>> {
    let analytics = state
        .sessions
        .analytics(&session, session_id, query.pace_per_m)
        .await?;
    Ok(Json(analytics))
}

#[tracing::instrument(skip(state, session, request), fields(account_id = %session.account_id))]
async fn add_set(
    State(state): State<MeState>,
    session: AccountSession,
    WithRejection(Path(session_id), _): IdPath,
    WithRejection(Json(request), _): WithRejection<Json<CreateSetRequest>, AppError>,
) -> AppResult<(StatusCode, Json<SetDetail>)> {
    let set = state.sessions.add_set(&session, session_id, request).await?;
    Ok((StatusCode::CREATED, Json(set)))
}

#[tracing::instrument(skip(state, session, request), fields(account_id = %session.account_id))]
async fn update_set(
    State(state): State<MeState>,
    session: AccountSession,
    WithRejection(Path(set_id), _): IdPath,
    WithRejection(Json(request), _): WithRejection<Json<UpdateSetRequest>, AppError>,
) -> AppResult<Json<SwimSet>> {
    Ok(Json(state.sessions.update_set(&session, set_id, request).await?))
}

#[tracing::instrument(skip(state, session), fields(account_id = %session.account_id))]
async fn delete_set(
    State(state): State<MeState>,
    session: AccountSession,
    WithRejection(Path(set_id), _): IdPath,
) -> AppResult<StatusCode> {
    state.sessions.delete_set(&session, set_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state, session, request), fields(account_id = %session.account_id))]
async fn add_rep(
    State(state): State<MeState>,
    session: AccountSession,
    WithRejection(Path(set_id), _): IdPath,
    WithRejection(Json(request), _): WithRejection<Json<CreateRepRequest>, AppError>,
) -> AppResult<(StatusCode, Json<Rep>)> {
    let rep = state.sessions.add_rep(&session, set_id, request).await?;
    Ok((StatusCode::CREATED, Json(rep)))
}

#[tracing::instrument(skip(state, session, request), fields(account_id = %session.account_id))]
async fn update_rep(
    State(state): State<MeState>,
    session: AccountSession,
    WithRejection(Path(rep_id), _): IdPath,
    WithRejection(Json(request), _): WithRejection<Json<UpdateRepRequest>, AppError>,
) -> AppResult<Json<Rep>> {
    Ok(Json(state.sessions.update_rep(&session, rep_id, request).await?))
}

#[tracing::instrument(skip(state, session), fields(account_id = %session.account_id))]
async fn delete_rep(
    State(state): State<MeState>,
    session: AccountSession,
    WithRejection(Path(rep_id), _): IdPath,
) -> AppResult<StatusCode> {
    state.sessions.delete_rep(&session, rep_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state, session), fields(account_id = %session.account_id))]
async fn list_coaches(
    State(state): State<MeState>,
    session: AccountSession,
) -> AppResult<Json<Vec<AccountInfo>>> {
    Ok(Json(state.coaches.list_coaches(&session).await?))
}

#[tracing::instrument(skip(state, session, request), fields(account_id = %session.account_id))]
async fn link_coach(
    State(state): State<MeState>,
    session: AccountSession,
    WithRejection(Json(request), _): WithRejection<Json<LinkCoachRequest>, AppError>,
) -> AppResult<(StatusCode, Json<AccountInfo>)> {
    let coach = state.coaches.link_coach(&session, request).await?;
    Ok((StatusCode::CREATED, Json(coach)))
}

#[tracing::instrument(skip(state, session), fields(account_id = %session.account_id))]
async fn unlink_coach(
    State(state): State<MeState>,
    session: AccountSession,
    WithRejection(Path(coach_id), _): IdPath,
) -> AppResult<StatusCode> {
    state.coaches.unlink_coach(&session, coach_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
