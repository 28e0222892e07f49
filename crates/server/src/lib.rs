//! oml-server library crate
//!
//! Exposes `build_app`, `AppState` and `config` for integration tests.
//! The actual binary entrypoint is in `main.rs`.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
mod routes;
pub mod state;

use axum::{
    Extension, Router,
    middleware as axum_mw,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use middleware::AuditState;
use state::AppState;

/// Routes shared by `/api/klanten` and its English alias
fn customer_routes(router: Router<AppState>, base: &str) -> Router<AppState> {
    router
        .route(
            base,
            get(routes::customer::list).post(routes::customer::create),
        )
        .route(
            &format!("{}/{{id}}", base),
            get(routes::customer::read)
                .put(routes::customer::update)
                .patch(routes::customer::patch)
                .delete(routes::customer::delete),
        )
}

/// Build the full application router with all routes and middleware.
///
/// Extracted from `main()` so integration tests can construct the app
/// without binding to a TCP port.
pub fn build_app(state: AppState, config: &Config) -> Router {
    let rate_limiter = middleware::create_rate_limiter(config.rate_limit_rps);

    let audit = AuditState {
        store: state.audit_logs.clone(),
        snapshots: state.snapshots(),
        log_reads: config.audit_log_reads,
    };

    // Admin only; the role check runs inside the audit layer so denied
    // attempts are recorded too
    let admin_routes = Router::new()
        .route(
            "/api/users",
            get(routes::user::list).post(routes::user::create),
        )
        .route(
            "/api/users/{id}",
            get(routes::user::read)
                .put(routes::user::update)
                .delete(routes::user::delete),
        )
        .route("/api/logs", get(routes::audit::list))
        .route_layer(axum_mw::from_fn(middleware::require_admin));

    // Authenticated and audited
    let protected_routes = customer_routes(
        customer_routes(Router::new(), "/api/klanten"),
        "/api/customers",
    )
    .route("/api/auth/refresh", post(routes::auth::refresh))
    .merge(admin_routes)
    .route_layer(axum_mw::from_fn_with_state(
        audit,
        middleware::audit_middleware,
    ))
    .route_layer(axum_mw::from_fn_with_state(
        state.tokens.clone(),
        middleware::require_auth,
    ));

    let api_routes = Router::new()
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/register", post(routes::auth::register))
        .merge(protected_routes)
        .layer(axum_mw::from_fn_with_state(
            rate_limiter,
            middleware::rate_limit_middleware,
        ));

    // Install Prometheus metrics recorder.
    // Use build_recorder() + set_global_recorder() so that repeated calls
    // (e.g. in integration tests) don't panic; the second install is
    // silently ignored and we still get a valid handle for /metrics.
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let prometheus_handle = recorder.handle();
    let _ = metrics::set_global_recorder(recorder);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(routes::system::health))
        .route("/metrics", get(routes::system::metrics))
        .layer(Extension(prometheus_handle));

    // Build CORS layer
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Build application
    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .with_state(state)
        .layer(axum_mw::from_fn(middleware::request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum_mw::from_fn(middleware::metrics_middleware))
}
