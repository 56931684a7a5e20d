//! Steward - company-scoped RBAC, work-item inbox and approval workflows.

pub mod audit;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod pagination;
pub mod rbac;
pub mod schema;
pub mod workflow;
pub mod workitems;

use axum::{
    http::StatusCode,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
    Json, Router,
};

use diesel::r2d2::{self, ConnectionManager};
use diesel::PgConnection;
use std::sync::Arc;
use std::time::Duration;

use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::jwt::JwtConfig;
use cache::{create_redis_pool, RoleCache};
use config::LogFormat;
use middleware::{
    auth::auth_middleware,
    rbac::{rbac_guard, RbacPolicy},
    request_id::request_id_middleware,
};
use rbac::Permission;

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub const MIGRATIONS: diesel_migrations::EmbeddedMigrations = diesel_migrations::embed_migrations!();

pub fn run_migrations(
    conn: &mut PgConnection,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use diesel_migrations::MigrationHarness;
    conn.run_pending_migrations(MIGRATIONS)?;
    Ok(())
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub jwt_config: Arc<JwtConfig>,
    pub role_cache: Arc<RoleCache>,
}

impl AppState {
    pub fn new(db_pool: DbPool, redis_pool: Option<deadpool_redis::Pool>, config: &Config) -> Self {
        let jwt_config = JwtConfig::from_env_with_expiry(
            config.jwt.access_token_expiry_secs,
            config.jwt.issuer.clone(),
            config.jwt.audience.clone(),
        );

        let redis_pool = redis_pool.or_else(|| create_redis_pool(&config.redis));
        let role_cache = RoleCache::with_ttl(redis_pool, config.redis.role_cache_ttl_secs);

        Self {
            db_pool,
            jwt_config: Arc::new(jwt_config),
            role_cache: Arc::new(role_cache),
        }
    }
}

pub fn create_router(state: AppState, config: &config::Config) -> Router {
    let cors = build_cors_layer(config);
    let body_limit = RequestBodyLimitLayer::new(config.server.max_body_size);

    #[allow(deprecated)]
    let timeout = TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check_simple))
        .route("/health/status", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::ready_check))
        .route("/health/live", get(handlers::health::live_check))
        .with_state(state.clone());

    // Authenticated but not company-scoped: profile bootstrap and company
    // management happen before the caller has a resolvable role.
    let account_routes = Router::new()
        .route(
            "/profile",
            put(handlers::profile::ensure_profile).get(handlers::profile::get_profile),
        )
        .route(
            "/profile/active-company",
            put(handlers::profile::set_active_company),
        )
        .route(
            "/companies",
            post(handlers::companies::create_company).get(handlers::companies::list_my_companies),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state.clone());

    // Company-scoped routes, one RBAC gate per permission group. The gate
    // layer runs after the auth layer added below it.
    let inbox_read_routes = Router::new()
        .route("/inbox", get(handlers::inbox::list_inbox))
        .route_layer(axum_middleware::from_fn_with_state(
            RbacPolicy::require(state.clone(), Permission::InboxRead),
            rbac_guard,
        ));

    let inbox_complete_routes = Router::new()
        .route(
            "/inbox/{id}/complete",
            patch(handlers::inbox::complete_work_item),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            RbacPolicy::require(state.clone(), Permission::InboxComplete),
            rbac_guard,
        ));

    let task_routes = Router::new()
        .route(
            "/tasks",
            post(handlers::tasks::create_task).get(handlers::tasks::list_tasks),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            RbacPolicy::require(state.clone(), Permission::TasksCreate),
            rbac_guard,
        ));

    let attendance_create_routes = Router::new()
        .route(
            "/attendance",
            post(handlers::attendance::create_attendance_request),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            RbacPolicy::require_any(
                state.clone(),
                &[
                    Permission::AttendanceCreateOwn,
                    Permission::AttendanceCreateAll,
                ],
            ),
            rbac_guard,
        ));

    let attendance_review_routes = Router::new()
        .route(
            "/attendance/{id}/approve",
            post(handlers::attendance::approve_attendance_request),
        )
        .route(
            "/attendance/{id}/reject",
            post(handlers::attendance::reject_attendance_request),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            RbacPolicy::require(state.clone(), Permission::AttendanceReview),
            rbac_guard,
        ));

    let contract_routes = Router::new()
        .route(
            "/contract-actions",
            post(handlers::contract_actions::create_contract_action),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            RbacPolicy::require(state.clone(), Permission::ContractsManage),
            rbac_guard,
        ));

    let member_routes = Router::new()
        .route(
            "/members",
            post(handlers::members::grant_role).get(handlers::members::list_members),
        )
        .route(
            "/members/{profile_id}",
            delete(handlers::members::revoke_membership),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            RbacPolicy::require(state.clone(), Permission::MembersManage),
            rbac_guard,
        ));

    let company_scoped_routes = Router::new()
        .merge(inbox_read_routes)
        .merge(inbox_complete_routes)
        .merge(task_routes)
        .merge(attendance_create_routes)
        .merge(attendance_review_routes)
        .merge(contract_routes)
        .merge(member_routes)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state.clone());

    let docs_routes = openapi::swagger_router();

    Router::new()
        .merge(docs_routes)
        .merge(public_routes)
        .merge(account_routes)
        .merge(company_scoped_routes)
        .fallback(fallback_handler)
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(trace_layer)
        .layer(timeout)
        .layer(body_limit)
        .layer(cors)
}

async fn fallback_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": "Not found", "code": "NOT_FOUND"})),
    )
}

fn build_cors_layer(config: &config::Config) -> CorsLayer {
    use axum::http::header::HeaderName;
    use axum::http::Method;

    let is_wildcard_origin = config.cors.allowed_origins.contains(&"*".to_string())
        || config.cors.allowed_origins.is_empty();

    let methods: Vec<Method> = config
        .cors
        .allowed_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();

    let headers: Vec<HeaderName> = config
        .cors
        .allowed_headers
        .iter()
        .filter_map(|h| h.parse().ok())
        .collect();

    if config.cors.allow_credentials && is_wildcard_origin {
        CorsLayer::new()
            .allow_origin(tower_http::cors::AllowOrigin::mirror_request())
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(true)
            .max_age(Duration::from_secs(config.cors.max_age_secs))
    } else if config.cors.allow_credentials {
        let origins: Vec<_> = config
            .cors
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(true)
            .max_age(Duration::from_secs(config.cors.max_age_secs))
    } else {
        let cors = if is_wildcard_origin {
            CorsLayer::new().allow_origin(Any)
        } else {
            let origins: Vec<_> = config
                .cors
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new().allow_origin(origins)
        };

        cors.allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(false)
            .max_age(Duration::from_secs(config.cors.max_age_secs))
    }
}

pub fn create_db_pool(config: &config::Config) -> DbPool {
    let manager = ConnectionManager::<PgConnection>::new(&config.database.url);
    r2d2::Pool::builder()
        .max_size(config.database.max_connections)
        .min_idle(Some(config.database.min_connections))
        .connection_timeout(Duration::from_secs(config.database.connection_timeout_secs))
        .idle_timeout(Some(Duration::from_secs(config.database.idle_timeout_secs)))
        .build(manager)
        .expect("Failed to create database pool")
}

pub fn create_db_pool_with_url(database_url: &str) -> DbPool {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    r2d2::Pool::builder()
        .max_size(10)
        .min_idle(Some(2))
        .connection_timeout(Duration::from_secs(30))
        .idle_timeout(Some(Duration::from_secs(600)))
        .build(manager)
        .expect("Failed to create database pool")
}

pub fn init_tracing(config: &config::Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}

pub use config::Config;
