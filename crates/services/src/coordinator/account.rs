use std::sync::Arc;

use bson::{DateTime, oid::ObjectId};
use hive_db::models::User;
use thiserror::Error;
use tracing::{error, info};

use crate::auth::{AuthError, AuthService, TokenPair, token};
use crate::dao::Store;
use crate::dao::base::{DaoError, DaoResult};
use crate::mail::{Mailer, templates};
use crate::outcome::Outcome;

const VERIFICATION_TTL_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Dao(#[from] DaoError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
}

/// Sign-up, email verification and credential exchange.
pub struct AccountService {
    store: Arc<Store>,
    auth: Arc<AuthService>,
    mailer: Arc<dyn Mailer>,
    frontend_url: String,
}

impl AccountService {
    pub fn new(
        store: Arc<Store>,
        auth: Arc<AuthService>,
        mailer: Arc<dyn Mailer>,
        frontend_url: String,
    ) -> Self {
        Self {
            store,
            auth,
            mailer,
            frontend_url,
        }
    }

    pub async fn register(&self, input: Registration) -> Result<Outcome<User>, AccountError> {
        let email = input.email.trim().to_lowercase();
        let username = input.username.trim().to_string();
        if self.store.users.find_by_email(&email).await?.is_some() {
            return Err(DaoError::conflict("Email is already registered").into());
        }
        if self.store.users.username_taken(&username).await? {
            return Err(DaoError::conflict("Username is already taken").into());
        }

        let password_hash = self.auth.hash_password(&input.password)?;
        let user = self
            .store
            .users
            .create(username, input.full_name, email, password_hash)
            .await?;
        let user_id = user
            .id
            .ok_or_else(|| DaoError::validation("User has no id"))?;

        self.send_verification(&user, user_id).await?;

        info!(%user_id, "User registered");
        Ok(Outcome::created(
            "Registration successful; check your email to verify your account",
            user,
        ))
    }

    /// Issues a fresh verification token and mails it. The token is cleared
    /// again when delivery fails so no unsent token stays valid.
    async fn send_verification(&self, user: &User, user_id: ObjectId) -> DaoResult<()> {
        let (plain, digest) = token::issue();
        let expires_at =
            DateTime::from_millis(DateTime::now().timestamp_millis() + VERIFICATION_TTL_MS);
        self.store
            .users
            .set_verification_token(user_id, Some(digest), Some(expires_at))
            .await?;

        let mail = templates::email_verification(
            &user.email,
            &self.frontend_url,
            &user_id.to_hex(),
            &user.full_name,
            &plain,
        );
        if let Err(send_err) = self.mailer.send(mail).await {
            error!(%user_id, %send_err, "Verification email failed");
            self.store
                .users
                .set_verification_token(user_id, None, None)
                .await?;
            return Err(DaoError::Dependency(
                "The verification email could not be sent; try resending it later".to_string(),
            ));
        }
        Ok(())
    }

    /// Always answers the same way for unknown or verified addresses.
    pub async fn resend_verification(&self, email: &str) -> DaoResult<Outcome<()>> {
        let user = self
            .store
            .users
            .find_by_email(&email.trim().to_lowercase())
            .await?;
        if let Some(user) = user.filter(|u| !u.is_email_verified && u.is_active()) {
            let user_id = user
                .id
                .ok_or_else(|| DaoError::validation("User has no id"))?;
            self.send_verification(&user, user_id).await?;
        }
        Ok(Outcome::ok_empty(
            "If the account exists and is unverified, a verification email was sent",
        ))
    }

    /// Idempotent once the account is verified.
    pub async fn verify_email(&self, user_id: ObjectId, plain_token: &str) -> DaoResult<Outcome<User>> {
        let user = self.store.users.find_by_id(user_id).await?;
        if user.is_email_verified {
            return Ok(Outcome::ok("Email already verified", user));
        }
        if !self
            .store
            .users
            .mark_verified(user_id, &token::hash(plain_token.trim()))
            .await?
        {
            return Err(DaoError::not_found("Invalid or expired verification token"));
        }
        let user = self.store.users.find_by_id(user_id).await?;
        info!(%user_id, "Email verified");
        Ok(Outcome::ok("Email verified successfully", user))
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Outcome<(User, TokenPair)>, AccountError> {
        let user = self
            .store
            .users
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let hash = user
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        if !self.auth.verify_password(password, hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }
        let user_id = Self::admit(&user)?;

        let tokens = self
            .auth
            .generate_tokens(user_id, &user.email, &user.username)?;
        self.store.users.record_login(user_id).await?;
        Ok(Outcome::ok("Login successful", (user, tokens)))
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<Outcome<TokenPair>, AccountError> {
        let claims = self.auth.verify_refresh_token(refresh_token)?;
        let user = self.store.users.find_by_id(claims.user_id()?).await?;
        let user_id = Self::admit(&user)?;
        let tokens = self
            .auth
            .generate_tokens(user_id, &user.email, &user.username)?;
        Ok(Outcome::ok("Token refreshed", tokens))
    }

    pub async fn me(&self, user_id: ObjectId) -> DaoResult<Outcome<User>> {
        let user = self.store.users.find_by_id(user_id).await?;
        Ok(Outcome::ok("User retrieved successfully", user))
    }

    /// Banned and unverified accounts may not hold credentials.
    fn admit(user: &User) -> DaoResult<ObjectId> {
        if !user.is_active() {
            return Err(DaoError::forbidden("This account has been banned"));
        }
        if !user.is_email_verified {
            return Err(DaoError::forbidden("Verify your email address before signing in"));
        }
        user.id.ok_or_else(|| DaoError::validation("User has no id"))
    }
}
