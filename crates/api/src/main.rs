use std::time::Duration;

use hive_api::{build_router, state::AppState};
use hive_config::Settings;
use hive_db::{connect, indexes::ensure_indexes};
use hive_services::background::spawn_invite_janitor;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (silently ignore if missing)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "hive_api=debug,hive_services=debug,hive_db=debug,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load()?;
    info!("Starting Hive API on {}:{}", settings.app.host, settings.app.port);

    // Transactions need a replica set; the client is kept for sessions.
    let (client, db) = connect(&settings.database).await?;
    ensure_indexes(&db).await?;

    let app_state = AppState::new(client, db, settings.clone());

    let janitor = spawn_invite_janitor(
        app_state.invites.clone(),
        Duration::from_secs(settings.invites.janitor_interval_secs.max(1)),
    );

    let app = build_router(app_state);

    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;
    janitor.abort();

    Ok(())
}
