use axum::{
    extract::{Path, Query, State},
    http::header,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use super::queries::ExportRangeQuery;
use crate::auth::{jwt_auth_middleware, AccountSession, AuthService};
use crate::error::{AppError, AppResult};
use crate::services::export_service::CsvExport;
use crate::services::ExportService;

pub fn export_routes(exports: ExportService, auth_service: AuthService) -> Router {
    Router::new()
        .route("/sessions/:session_id", get(export_session))
        .route("/range", get(export_range))
        .route_layer(middleware::from_fn_with_state(
            auth_service,
            jwt_auth_middleware,
        ))
        .with_state(exports)
}

fn csv_response(export: CsvExport) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", export.filename);
    (
        [
            (header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.body,
    )
        .into_response()
}

#[tracing::instrument(skip(exports, session), fields(account_id = %session.account_id))]
async fn export_session(
    State(exports): State<ExportService>,
    session: AccountSession,
    WithRejection(Path(session_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Response> {
    let export = exports.session_csv(&session, session_id).await?;
    Ok(csv_response(export))
}

#[tracing::instrument(skip(exports, session, query), fields(account_id = %session.account_id))]
async fn export_range(
    State(exports): State<ExportService>,
    session: AccountSession,
    WithRejection(Query(query), _): WithRejection<Query<ExportRangeQuery>, AppError>,
) -> AppResult<Response> {
    let export = exports
        .range_csv(&session, query.start, query.end, query.swimmer_id)
        .await?;
    Ok(csv_response(export))
}
