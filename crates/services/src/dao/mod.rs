pub mod audit;
pub mod base;
pub mod invite;
pub mod membership;
pub mod project;
pub mod task;
pub mod user;
pub mod workspace;

pub use base::BaseDao;

use mongodb::Database;

use self::{
    audit::AuditRecorder, invite::InviteDao, membership::MembershipDao, project::ProjectDao,
    task::TaskDao, user::UserDao, workspace::WorkspaceDao,
};

/// One DAO per logical collection, built from a single database handle.
pub struct Store {
    pub users: UserDao,
    pub workspaces: WorkspaceDao,
    pub memberships: MembershipDao,
    pub invites: InviteDao,
    pub projects: ProjectDao,
    pub tasks: TaskDao,
    pub audit: AuditRecorder,
}

impl Store {
    pub fn new(db: &Database) -> Self {
        Self {
            users: UserDao::new(db),
            workspaces: WorkspaceDao::new(db),
            memberships: MembershipDao::new(db),
            invites: InviteDao::new(db),
            projects: ProjectDao::new(db),
            tasks: TaskDao::new(db),
            audit: AuditRecorder::new(db),
        }
    }
}
