use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use server::config::AppConfig;
use server::database::init_db;
use server::mailer::LogMailer;
use server::seed::seed_role_permissions;
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let db = init_db(&config.database.url)
        .await
        .context("failed to connect to the database")?;
    seed_role_permissions(&db)
        .await
        .context("failed to seed role permissions")?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;
    let state = AppState {
        db,
        mailer: Arc::new(LogMailer::new(config.mailer.from_address.clone())),
        config,
    };

    let app = server::build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("ChallengeGov API listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
