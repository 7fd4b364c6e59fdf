use std::time::Duration;

use hive_config::DatabaseSettings;
use mongodb::{Client, Database, options::ClientOptions};
use tracing::info;

/// Connects and pings the deployment. Returns the client as well as the
/// database handle because transactions are started from the client.
pub async fn connect(
    settings: &DatabaseSettings,
) -> Result<(Client, Database), mongodb::error::Error> {
    let client = client(settings, None).await?;

    // Verify connection
    client
        .database("admin")
        .run_command(bson::doc! { "ping": 1 })
        .await?;

    info!(db = %settings.name, "Connected to MongoDB");

    let db = client.database(&settings.name);
    Ok((client, db))
}

pub async fn client(
    settings: &DatabaseSettings,
    server_selection_timeout: Option<Duration>,
) -> Result<Client, mongodb::error::Error> {
    let mut client_options = ClientOptions::parse(&settings.url).await?;

    if let Some(max_pool) = settings.max_pool_size {
        client_options.max_pool_size = Some(max_pool);
    }
    if let Some(min_pool) = settings.min_pool_size {
        client_options.min_pool_size = Some(min_pool);
    }
    if let Some(timeout) = server_selection_timeout {
        client_options.server_selection_timeout = Some(timeout);
    }

    Client::with_options(client_options)
}
