use std::net::SocketAddr;

use attendance_backend::{
    config::Config,
    db::connection::{create_pool_with_config, DbPool, PoolConfig},
    routes::build_router,
    state::AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "attendance_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!(
        jwt_secret = %mask_secret(&config.jwt_secret),
        jwt_expiration_hours = config.jwt_expiration_hours,
        qr_token_expiration_minutes = config.qr_token_expiration_minutes,
        time_zone = %config.time_zone,
        rate_limit_ip_max_requests = config.rate_limit_ip_max_requests,
        rate_limit_ip_window_seconds = config.rate_limit_ip_window_seconds,
        "Loaded configuration from environment/.env"
    );

    let pool: DbPool = create_pool_with_config(
        &config.database_url,
        PoolConfig {
            max_connections: config.database_max_connections,
            ..PoolConfig::default()
        },
    )
    .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let bind_addr: SocketAddr = config.bind_addr.parse()?;
    let app = build_router(AppState::new(pool, config))?;

    tracing::info!("Server listening on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
