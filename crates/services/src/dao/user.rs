use bson::{DateTime, doc, oid::ObjectId};
use hive_db::models::{AccountStatus, User};
use mongodb::Database;

use super::base::{BaseDao, DaoError, DaoResult};

pub struct UserDao {
    pub base: BaseDao<User>,
}

impl UserDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, User::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        username: String,
        full_name: String,
        email: String,
        password_hash: String,
    ) -> DaoResult<User> {
        let now = DateTime::now();
        let user = User {
            id: None,
            username,
            full_name,
            email,
            password_hash: Some(password_hash),
            is_email_verified: false,
            email_verification_token: None,
            email_verification_expires_at: None,
            email_verified_at: None,
            account_status: AccountStatus::Active,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };

        let id = self
            .base
            .insert_one(&user)
            .await
            .map_err(|e| e.on_duplicate("Username or email already in use"))?;
        self.find_by_id(id).await
    }

    pub async fn find_by_id(&self, id: ObjectId) -> DaoResult<User> {
        self.base
            .find_by_id(id)
            .await?
            .ok_or_else(|| DaoError::not_found("User account not found"))
    }

    pub async fn find_many_by_ids(&self, ids: &[ObjectId]) -> DaoResult<Vec<User>> {
        self.base
            .find_many(doc! { "_id": { "$in": ids.to_vec() } }, Some(doc! { "username": 1 }))
            .await
    }

    pub async fn find_by_email(&self, email: &str) -> DaoResult<Option<User>> {
        self.base.find_one(doc! { "email": email }).await
    }

    pub async fn find_active_by_email(&self, email: &str) -> DaoResult<Option<User>> {
        self.base
            .find_one(doc! { "email": email, "account_status": "active" })
            .await
    }

    pub async fn username_taken(&self, username: &str) -> DaoResult<bool> {
        self.base.exists(doc! { "username": username }).await
    }

    pub async fn set_verification_token(
        &self,
        user_id: ObjectId,
        token_hash: Option<String>,
        expires_at: Option<DateTime>,
    ) -> DaoResult<bool> {
        self.base
            .update_by_id(
                user_id,
                doc! {
                    "$set": {
                        "email_verification_token": token_hash,
                        "email_verification_expires_at": expires_at,
                    }
                },
            )
            .await
    }

    /// Flips the account to verified only when the stored hash matches and
    /// has not expired.
    pub async fn mark_verified(&self, user_id: ObjectId, token_hash: &str) -> DaoResult<bool> {
        let now = DateTime::now();
        let result = self
            .base
            .collection()
            .update_one(
                doc! {
                    "_id": user_id,
                    "email_verification_token": token_hash,
                    "email_verification_expires_at": { "$gt": now },
                },
                doc! {
                    "$set": {
                        "is_email_verified": true,
                        "email_verified_at": now,
                        "email_verification_token": null,
                        "email_verification_expires_at": null,
                        "updated_at": now,
                    }
                },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    pub async fn record_login(&self, user_id: ObjectId) -> DaoResult<bool> {
        self.base
            .update_by_id(user_id, doc! { "$set": { "last_login_at": DateTime::now() } })
            .await
    }
}
