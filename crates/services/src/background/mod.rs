pub mod janitor;

pub use janitor::spawn_invite_janitor;
