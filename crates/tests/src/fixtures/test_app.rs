use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hive_api::{build_router, state::AppState};
use hive_config::Settings;
use hive_db::{connection::client, indexes::ensure_indexes};
use mongodb::Database;
use tokio::net::TcpListener;
use tracing::warn;

use super::mailer::RecordingMailer;

/// A running test application with its own MongoDB database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub base_url: String,
    pub db: Database,
    pub settings: Settings,
    pub client: reqwest::Client,
    pub mailer: Arc<RecordingMailer>,
    pub state: AppState,
}

impl TestApp {
    /// Spawn a test server against the configured MongoDB.
    ///
    /// Transactions require a replica set; set `HIVE__DATABASE__URL` to point
    /// at one (default `mongodb://localhost:27017/?replicaSet=rs0`). Returns
    /// `None` when no replica set is reachable so the caller can skip.
    /// Each test gets a unique database name for isolation.
    pub async fn try_spawn() -> Option<Self> {
        let mut settings = Settings::load().ok()?;
        settings.database.name = format!("hive_test_{}", uuid::Uuid::new_v4().simple());

        let mongo = client(&settings.database, Some(Duration::from_secs(2)))
            .await
            .ok()?;
        let hello = match mongo
            .database("admin")
            .run_command(bson::doc! { "hello": 1 })
            .await
        {
            Ok(hello) => hello,
            Err(e) => {
                warn!(%e, "MongoDB unreachable; skipping end-to-end test");
                return None;
            }
        };
        if hello.get_str("setName").is_err() {
            warn!("MongoDB is not a replica set; skipping end-to-end test");
            return None;
        }

        let db = mongo.database(&settings.database.name);
        ensure_indexes(&db).await.expect("Failed to create indexes");

        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::with_mailer(mongo, db.clone(), settings.clone(), mailer.clone());
        let app = build_router(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base_url = format!("http://{}", addr);
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to build HTTP client");

        Some(Self {
            addr,
            base_url,
            db,
            settings,
            client,
            mailer,
            state,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let db = self.db.clone();
        // Best effort cleanup: drop the test database
        tokio::spawn(async move {
            let _ = db.drop().await;
        });
    }
}

/// Spawns a [`TestApp`] or returns from the calling test when MongoDB is unavailable.
///
/// [`TestApp`]: crate::fixtures::test_app::TestApp
#[macro_export]
macro_rules! spawn_or_skip {
    () => {
        match $crate::fixtures::test_app::TestApp::try_spawn().await {
            Some(app) => app,
            None => {
                eprintln!("skipping: no MongoDB replica set available");
                return;
            }
        }
    };
}
