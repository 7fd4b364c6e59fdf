use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
};
use hive_services::{auth::TokenPair, coordinator::Registration};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::{ApiResult, Envelope, UserResponse, parse_user_id, respond};
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyEmailRequest {
    pub user_id: String,
    #[validate(length(min = 1))]
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResendVerificationRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

impl From<TokenPair> for TokenResponse {
    fn from(tokens: TokenPair) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub tokens: TokenResponse,
    pub user: UserResponse,
}

fn access_cookie(value: &str, max_age: u64) -> Result<HeaderMap, ApiError> {
    let cookie = format!(
        "access_token={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        value, max_age
    );
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|_| ApiError::Internal("Invalid cookie value".to_string()))?,
    );
    Ok(headers)
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<UserResponse> {
    body.validate()?;
    let outcome = state
        .accounts
        .register(Registration {
            username: body.username,
            full_name: body.full_name,
            email: body.email,
            password: body.password,
        })
        .await?;
    respond(outcome, UserResponse::from)
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<(StatusCode, HeaderMap, Json<Envelope<AuthResponse>>), ApiError> {
    body.validate()?;
    let outcome = state.accounts.login(&body.email, &body.password).await?;
    let (status, Json(envelope)) = respond(outcome, |(user, tokens)| AuthResponse {
        tokens: tokens.into(),
        user: user.into(),
    })?;

    let headers = match &envelope.data {
        Some(auth) => access_cookie(&auth.tokens.access_token, auth.tokens.expires_in)?,
        None => HeaderMap::new(),
    };
    Ok((status, headers, Json(envelope)))
}

pub async fn logout() -> Result<(HeaderMap, Json<Envelope<()>>), ApiError> {
    let headers = access_cookie("", 0)?;
    Ok((
        headers,
        Json(Envelope {
            success: true,
            message: "Logged out".to_string(),
            data: None,
        }),
    ))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> ApiResult<TokenResponse> {
    let outcome = state.accounts.refresh(&body.refresh_token).await?;
    respond(outcome, TokenResponse::from)
}

pub async fn verify_email(
    State(state): State<AppState>,
    Json(body): Json<VerifyEmailRequest>,
) -> ApiResult<UserResponse> {
    body.validate()?;
    let user_id = parse_user_id(&body.user_id)?;
    let outcome = state.accounts.verify_email(user_id, &body.token).await?;
    respond(outcome, UserResponse::from)
}

pub async fn resend_verification(
    State(state): State<AppState>,
    Json(body): Json<ResendVerificationRequest>,
) -> ApiResult<()> {
    body.validate()?;
    let outcome = state.accounts.resend_verification(&body.email).await?;
    respond(outcome, |unit| unit)
}

pub async fn me(State(state): State<AppState>, auth: AuthUser) -> ApiResult<UserResponse> {
    let outcome = state.accounts.me(auth.user_id).await?;
    respond(outcome, UserResponse::from)
}
