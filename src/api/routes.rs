use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::auth::auth_routes;
use super::coach::coach_routes;
use super::exports::export_routes;
use super::health::{system_routes, VersionInfo};
use super::me::{me_routes, MeState};
use super::templates::template_routes;
use crate::auth::{cors_layer, security_headers_layer, AuthService, RateLimitConfig, RateLimiter};
use crate::config::AppConfig;
use crate::services::{CoachService, ExportService, SessionService, TemplateService};
use crate::store::SwimStore;

pub fn create_routes(store: Arc<dyn SwimStore>, config: &AppConfig) -> Router {
    let auth_service = AuthService::new(store.clone(), config);
    let rate_limiter = RateLimiter::from_config(&RateLimitConfig {
        trust_forwarded_headers: config.trust_proxy_headers,
        ..RateLimitConfig::default()
    });

    let me_state = MeState {
        sessions: SessionService::new(store.clone()),
        coaches: CoachService::new(store.clone()),
    };

    let version = VersionInfo {
        version: config.version.clone(),
        env: config.environment.clone(),
    };

    Router::new()
        .merge(system_routes(version))
        .nest("/api/v1/auth", auth_routes(auth_service.clone(), rate_limiter))
        .nest("/api/v1/me", me_routes(me_state, auth_service.clone()))
        .nest(
            "/api/v1/coach",
            coach_routes(CoachService::new(store.clone()), auth_service.clone()),
        )
        .nest(
            "/api/v1/templates",
            template_routes(TemplateService::new(store.clone()), auth_service.clone()),
        )
        .nest(
            "/api/v1/export",
            export_routes(ExportService::new(store), auth_service),
        )
        .layer(TraceLayer::new_for_http())
        .layer(security_headers_layer())
        .layer(cors_layer())
}
