use std::sync::Arc;
use std::time::Duration;

use hive_config::Settings;
use hive_services::{
    AccountService, AuthService, InviteService, Mailer, ProjectService, Store, TaskService,
    Transactions, WorkspaceService, build_mailer,
};
use mongodb::{Client, Database};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub store: Arc<Store>,
    pub accounts: Arc<AccountService>,
    pub workspaces: Arc<WorkspaceService>,
    pub invites: Arc<InviteService>,
    pub projects: Arc<ProjectService>,
    pub tasks: Arc<TaskService>,
}

impl AppState {
    pub fn new(client: Client, db: Database, settings: Settings) -> Self {
        let mailer = build_mailer(&settings.email);
        Self::with_mailer(client, db, settings, mailer)
    }

    /// Same as [`AppState::new`] with an explicit mail transport.
    pub fn with_mailer(
        client: Client,
        db: Database,
        settings: Settings,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let auth = Arc::new(AuthService::new(settings.jwt.clone()));
        let store = Arc::new(Store::new(&db));
        let txn = Transactions::new(
            client,
            Duration::from_millis(settings.database.max_commit_time_ms),
        );
        let frontend_url = settings.email.frontend_url.clone();

        let accounts = Arc::new(AccountService::new(
            store.clone(),
            auth.clone(),
            mailer.clone(),
            frontend_url.clone(),
        ));
        let workspaces = Arc::new(WorkspaceService::new(store.clone(), txn.clone()));
        let invites = Arc::new(InviteService::new(
            store.clone(),
            txn.clone(),
            mailer,
            Duration::from_secs(settings.invites.ttl_secs),
            frontend_url,
        ));
        let projects = Arc::new(ProjectService::new(store.clone(), txn.clone()));
        let tasks = Arc::new(TaskService::new(store.clone(), txn));

        Self {
            db,
            settings,
            auth,
            store,
            accounts,
            workspaces,
            invites,
            projects,
            tasks,
        }
    }
}
