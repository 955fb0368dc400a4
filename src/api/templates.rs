use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use crate::auth::{jwt_auth_middleware, AccountSession, AuthService};
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateTemplateRequest, InstantiateTemplateRequest, Template, UpdateTemplateRequest,
};
use crate::services::session_service::SessionView;
use crate::services::TemplateService;

pub fn template_routes(templates: TemplateService, auth_service: AuthService) -> Router {
    Router::new()
        .route("/", get(list_templates).post(create_template))
        .route(
            "/:template_id",
            get(get_template).put(update_template).delete(delete_template),
        )
        .route("/:template_id/instantiate", post(instantiate_template))
        .route_layer(middleware::from_fn_with_state(
            auth_service,
            jwt_auth_middleware,
        ))
        .with_state(templates)
}

type IdPath = WithRejection<Path<Uuid>, AppError>;

#[tracing::instrument(skip(templates, session), fields(account_id = %session.account_id))]
async fn list_templates(
    State(templates): State<TemplateService>,
    session: AccountSession,
) -> AppResult<Json<Vec<Template>>> {
    Ok(Json(templates.list(&session).await?))
}

#[tracing::instrument(skip(templates, session, request), fields(account_id = %session.account_id))]
async fn create_template(
    State(templates): State<TemplateService>,
    session: AccountSession,
    WithRejection(Json(request), _): WithRejection<Json<CreateTemplateRequest>, AppError>,
) -> AppResult<(StatusCode, Json<Template>)> {
    let template = templates.create(&session, request).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

#[tracing::instrument(skip(templates, session), fields(account_id = %session.account_id))]
async fn get_template(
    State(templates): State<TemplateService>,
    session: AccountSession,
    WithRejection(Path(template_id), _): IdPath,
) -> AppResult<Json<Template>> {
    Ok(Json(templates.get(&session, template_id).await?))
}

#[tracing::instrument(skip(templates, session, request), fields(account_id = %session.account_id))]
async fn update_template(
    State(templates): State<TemplateService>,
    session: AccountSession,
    WithRejection(Path(template_id), _): IdPath,
    WithRejection(Json(request), _): WithRejection<Json<UpdateTemplateRequest>, AppError>,
) -> AppResult<Json<Template>> {
    Ok(Json(templates.update(&session, template_id, request).await?))
}

#[tracing::instrument(skip(templates, session), fields(account_id = %session.account_id))]
async fn delete_template(
    State(templates): State<TemplateService>,
    session: AccountSession,
    WithRejection(Path(template_id), _): IdPath,
) -> AppResult<StatusCode> {
    templates.delete(&session, template_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Start a new session from a template
#[tracing::instrument(skip(templates, session, request), fields(account_id = %session.account_id))]
async fn instantiate_template(
    State(templates): State<TemplateService>,
    session: AccountSession,
    WithRejection(Path(template_id), _): IdPath,
    WithRejection(Json(request), _): WithRejection<Json<InstantiateTemplateRequest>, AppError>,
) -> AppResult<(StatusCode, Json<SessionView>)> {
    let view = templates.instantiate(&session, template_id, request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}
