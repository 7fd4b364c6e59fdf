pub mod audit_log;
pub mod project;
pub mod task;
pub mod user;
pub mod workspace;
pub mod workspace_invite;
pub mod workspace_member;

pub use audit_log::*;
pub use project::*;
pub use task::*;
pub use user::*;
pub use workspace::*;
pub use workspace_invite::*;
pub use workspace_member::*;
