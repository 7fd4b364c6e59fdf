use axum::{Json, http::StatusCode};
use bson::{DateTime, oid::ObjectId};
use chrono::Utc;
use hive_db::models::User;
use hive_services::Outcome;
use hive_services::dao::base::PaginatedResult;
use serde::Serialize;

use crate::{error::ApiError, extractors::workspace::parse_id};

/// Success body: `{ "success": true, "message", "data" }`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub type ApiResult<T> = Result<(StatusCode, Json<Envelope<T>>), ApiError>;

/// Serialises a service outcome with its own status code, converting the
/// payload into its wire shape.
pub fn respond<T, U: Serialize>(outcome: Outcome<T>, to_wire: impl FnOnce(T) -> U) -> ApiResult<U> {
    let outcome = outcome.map(to_wire);
    let status = StatusCode::from_u16(outcome.status).unwrap_or(StatusCode::OK);
    Ok((
        status,
        Json(Envelope {
            success: true,
            message: outcome.message,
            data: outcome.data,
        }),
    ))
}

pub fn respond_page<T, U: Serialize>(
    outcome: Outcome<PaginatedResult<T>>,
    to_wire: impl FnMut(T) -> U,
) -> ApiResult<PaginatedResult<U>> {
    respond(outcome, |page| page.map(to_wire))
}

/// Wire form of a stored timestamp.
pub fn ts(value: DateTime) -> chrono::DateTime<Utc> {
    value.to_chrono()
}

pub fn opt_ts(value: Option<DateTime>) -> Option<chrono::DateTime<Utc>> {
    value.map(ts)
}

pub fn hex(id: Option<ObjectId>) -> String {
    id.map(|id| id.to_hex()).unwrap_or_default()
}

pub fn hex_all(ids: &[ObjectId]) -> Vec<String> {
    ids.iter().copied().map(ObjectId::to_hex).collect()
}

pub fn parse_user_id(raw: &str) -> Result<ObjectId, ApiError> {
    parse_id(raw, "user_id")
}

/// Public profile; hashes and verification tokens never leave the server.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub is_email_verified: bool,
    pub last_login_at: Option<chrono::DateTime<Utc>>,
    pub created_at: chrono::DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: hex(user.id),
            username: user.username,
            full_name: user.full_name,
            email: user.email,
            is_email_verified: user.is_email_verified,
            last_login_at: opt_ts(user.last_login_at),
            created_at: ts(user.created_at),
        }
    }
}
