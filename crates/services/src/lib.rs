pub mod auth;
pub mod background;
pub mod context;
pub mod coordinator;
pub mod dao;
pub mod mail;
pub mod outcome;
pub mod permissions;
pub mod slug;
pub mod transaction;

pub use auth::AuthService;
pub use context::{ActorContext, Identity};
pub use coordinator::{AccountService, InviteService, ProjectService, TaskService, WorkspaceService};
pub use dao::*;
pub use mail::{Mailer, OutboundEmail, build_mailer};
pub use outcome::Outcome;
pub use transaction::Transactions;
