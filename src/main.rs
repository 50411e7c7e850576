mod app;
mod auth;
mod config;
mod error;
mod extract;
mod state;
mod users;

use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "identity=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    // No default signing key: a missing JWT_SECRET stops startup here.
    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!(error = %e, "invalid configuration");
        e
    })?;
    let (host, port) = (config.host.clone(), config.port);

    let (app_state, db) = state::AppState::init(config).await?;
    tracing::info!("database connected");

    state::run_migrations(&db).await?;

    let app = app::build_app(app_state);
    app::serve(app, &host, port).await
}
