//! Load, authorize, mutate, audit. Each operation loads the authoritative
//! record, consults [`crate::permissions`], then performs its writes and the
//! matching audit append inside one transaction.

pub mod account;
pub mod invite;
pub mod project;
pub mod task;
pub mod workspace;

use bson::{DateTime, Document, doc, oid::ObjectId};

pub use account::{AccountError, AccountService, Registration};
pub use invite::InviteService;
pub use project::{NewProject, ProjectPatch, ProjectService};
pub use task::{NewTask, TaskPatch, TaskService};
pub use workspace::{MemberEntry, NewWorkspace, SettingsPatch, WorkspacePatch, WorkspaceService};

/// `$set` fields recording who last touched a project or task.
pub(crate) fn modified_by(actor: ObjectId) -> Document {
    doc! {
        "last_modified_at": DateTime::now(),
        "last_modified_by": actor,
    }
}
