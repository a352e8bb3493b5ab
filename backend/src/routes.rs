use axum::{
    http::{HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::Config,
    docs::ApiDoc,
    handlers,
    middleware::{self as app_middleware, rate_limit::create_ip_rate_limiter},
    state::AppState,
};

/// Full application router. Serve it with
/// `into_make_service_with_connect_info::<SocketAddr>()` so the IP rate
/// limiter can see peer addresses.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let ip_limiter = create_ip_rate_limiter(&state.config)?;

    let throttled_routes = Router::new()
        .route("/api/attendance/scan", post(handlers::attendance::scan))
        .route("/api/auth/sign-up", post(handlers::auth::sign_up))
        .route("/api/auth/sign-in", post(handlers::auth::sign_in))
        .route_layer(ip_limiter);

    let public_routes = Router::new().route("/api/health", get(handlers::health::health));

    let user_routes = Router::new()
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/auth/sign-out", post(handlers::auth::sign_out))
        .route("/api/users/teachers", get(handlers::users::list_teachers))
        .route(
            "/api/users/{user_id}",
            get(handlers::users::get_user).put(handlers::users::update_user),
        )
        .route(
            "/api/subjects",
            get(handlers::subjects::list_subjects).post(handlers::subjects::create_subject),
        )
        .route(
            "/api/subjects/{subject_id}",
            get(handlers::subjects::get_subject),
        )
        .route(
            "/api/subjects/{subject_id}/join",
            post(handlers::subjects::join_subject),
        )
        .route(
            "/api/attendance/sessions",
            get(handlers::attendance::list_sessions).post(handlers::attendance::create_session),
        )
        .route(
            "/api/attendance/sessions/{session_id}",
            get(handlers::attendance::get_session),
        )
        .route(
            "/api/attendance/sessions/{session_id}/complete",
            put(handlers::attendance::complete_session),
        )
        .route(
            "/api/attendance/sessions/{session_id}/cancel",
            put(handlers::attendance::cancel_session),
        )
        .route(
            "/api/attendance/sessions/{session_id}/records",
            get(handlers::attendance::list_session_records),
        )
        .route(
            "/api/attendance/update-status",
            put(handlers::attendance::update_status),
        )
        .route(
            "/api/attendance/reports/{subject_id}",
            get(handlers::reports::subject_report),
        )
        .route(
            "/api/attendance/reports/{subject_id}/export",
            get(handlers::reports::export_subject_records),
        )
        .route(
            "/api/attendance/admin/dashboard",
            get(handlers::reports::admin_dashboard),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            app_middleware::auth,
        ));

    let admin_routes = Router::new()
        .route("/api/users", get(handlers::users::list_users))
        .route(
            "/api/subjects/{subject_id}",
            put(handlers::subjects::update_subject).delete(handlers::subjects::delete_subject),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            app_middleware::auth_admin,
        ));

    let cors = cors_layer(&state.config);

    Ok(Router::new()
        .merge(throttled_routes)
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(app_middleware::request_id))
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(axum_middleware::from_fn(app_middleware::log_error_responses)),
        )
        .with_state(state))
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origin = if config.cors_allow_origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            config
                .cors_allow_origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(24 * 60 * 60))
}
