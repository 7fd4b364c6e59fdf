pub mod auth;
pub mod common;
pub mod invite;
pub mod project;
pub mod task;
pub mod workspace;
