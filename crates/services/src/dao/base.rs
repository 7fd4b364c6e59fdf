use bson::{Bson, DateTime, Document, doc, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::{
    ClientSession,
    Collection,
    Database,
    error::{
        ErrorKind, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT, WriteFailure,
    },
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::debug;

const DUPLICATE_KEY_CODE: i32 = 11000;
const MAX_TIME_EXPIRED_CODE: i32 = 50;

#[derive(Debug, Error)]
pub enum DaoError {
    #[error("MongoDB error: {0}")]
    Mongo(mongodb::error::Error),
    #[error("BSON serialization error: {0}")]
    BsonSer(#[from] bson::ser::Error),
    #[error("BSON deserialization error: {0}")]
    BsonDe(#[from] bson::de::Error),
    #[error("{0}")]
    NotFound(String),
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("Validation: {0}")]
    Validation(String),
    #[error("{0}")]
    Dependency(String),
    #[error("{0}")]
    Retryable(String),
}

impl DaoError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        DaoError::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        DaoError::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        DaoError::Conflict(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        DaoError::InvalidState(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        DaoError::Validation(msg.into())
    }

    /// Rewrites a duplicate-key failure into a conflict with a caller-facing
    /// message; other errors pass through untouched.
    pub fn on_duplicate(self, msg: &str) -> Self {
        match self {
            DaoError::DuplicateKey(_) => DaoError::Conflict(msg.to_string()),
            other => other,
        }
    }
}

impl From<mongodb::error::Error> for DaoError {
    fn from(err: mongodb::error::Error) -> Self {
        if err.contains_label(TRANSIENT_TRANSACTION_ERROR)
            || err.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
        {
            return DaoError::Retryable(
                "The operation conflicted with a concurrent change, please retry".to_string(),
            );
        }

        let (code, message) = match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
                (write_error.code, write_error.message.clone())
            }
            ErrorKind::Command(command_error) => {
                (command_error.code, command_error.message.clone())
            }
            _ => return DaoError::Mongo(err),
        };

        match code {
            DUPLICATE_KEY_CODE => DaoError::DuplicateKey(message),
            MAX_TIME_EXPIRED_CODE => {
                DaoError::Retryable("The operation timed out, please retry".to_string())
            }
            _ => DaoError::Mongo(err),
        }
    }
}

pub type DaoResult<T> = Result<T, DaoError>;

const MAX_PAGE_LIMIT: u64 = 100;
/// Keeps `skip` within the signed range the driver sends to the server.
const MAX_PAGE: u64 = i64::MAX as u64 / MAX_PAGE_LIMIT;

/// Raw `page`/`limit` query values; resolved against the configured default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PaginationParams {
    pub fn resolve(&self, default_limit: u64) -> Pagination {
        Pagination {
            page: self.page.unwrap_or(1).clamp(1, MAX_PAGE),
            limit: self
                .limit
                .unwrap_or(default_limit)
                .clamp(1, MAX_PAGE_LIMIT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Pagination {
    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResult<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResult<U> {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
        }
    }
}

/// Adds `updated_at` to the `$set` stage, creating the stage when absent.
pub fn stamp_updated_at(mut update: Document) -> Document {
    let now = DateTime::now();
    match update.get_document_mut("$set") {
        Ok(set_doc) => {
            set_doc.insert("updated_at", now);
        }
        Err(_) => {
            update.insert("$set", doc! { "updated_at": now });
        }
    }
    update
}

/// Escapes regex metacharacters so user input can be used in `$regex`.
pub fn escape_regex(query: &str) -> String {
    query
        .chars()
        .flat_map(|c| {
            if ".*+?^${}()|[]\\".contains(c) {
                vec!['\\', c]
            } else {
                vec![c]
            }
        })
        .collect()
}

/// Case-insensitive `$or` over `fields`; `None` for a blank query.
pub fn search_clause(query: Option<&str>, fields: &[&str]) -> Option<Document> {
    let query = query.map(str::trim).filter(|q| !q.is_empty())?;
    let escaped = escape_regex(query);
    let alternatives: Vec<Document> = fields
        .iter()
        .map(|field| doc! { *field: { "$regex": &escaped, "$options": "i" } })
        .collect();
    Some(doc! { "$or": alternatives })
}

/// Ands `clauses` onto `base`. Each clause keeps its own `$or`, so a search
/// never widens a visibility restriction.
pub fn and_all(mut base: Document, clauses: Vec<Document>) -> Document {
    if !clauses.is_empty() {
        base.insert("$and", clauses);
    }
    base
}

pub struct BaseDao<T: Send + Sync> {
    collection: Collection<T>,
}

impl<T> BaseDao<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    pub fn new(db: &Database, collection_name: &str) -> Self {
        Self {
            collection: db.collection::<T>(collection_name),
        }
    }

    pub fn collection(&self) -> &Collection<T> {
        &self.collection
    }

    pub async fn find_by_id(&self, id: ObjectId) -> DaoResult<Option<T>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    pub async fn find_one(&self, filter: Document) -> DaoResult<Option<T>> {
        Ok(self.collection.find_one(filter).await?)
    }

    pub async fn find_many(
        &self,
        filter: Document,
        sort: Option<Document>,
    ) -> DaoResult<Vec<T>> {
        let cursor = if let Some(sort) = sort {
            self.collection.find(filter).sort(sort).await?
        } else {
            self.collection.find(filter).await?
        };

        Ok(cursor.try_collect().await?)
    }

    pub async fn find_paginated(
        &self,
        filter: Document,
        sort: Option<Document>,
        pagination: Pagination,
    ) -> DaoResult<PaginatedResult<T>> {
        let total = self.collection.count_documents(filter.clone()).await?;
        let sort = sort.unwrap_or_else(|| doc! { "created_at": -1 });

        let items: Vec<T> = self
            .collection
            .find(filter)
            .sort(sort)
            .skip(pagination.skip())
            .limit(pagination.limit as i64)
            .await?
            .try_collect()
            .await?;

        let total_pages = total.div_ceil(pagination.limit);

        Ok(PaginatedResult {
            items,
            total,
            page: pagination.page,
            limit: pagination.limit,
            total_pages,
        })
    }

    pub async fn count(&self, filter: Document) -> DaoResult<u64> {
        Ok(self.collection.count_documents(filter).await?)
    }

    pub async fn exists(&self, filter: Document) -> DaoResult<bool> {
        Ok(self.count(filter).await? > 0)
    }

    pub async fn distinct_ids(&self, field: &str, filter: Document) -> DaoResult<Vec<ObjectId>> {
        let values = self.collection.distinct(field, filter).await?;
        Ok(values
            .into_iter()
            .filter_map(|v| match v {
                Bson::ObjectId(id) => Some(id),
                _ => None,
            })
            .collect())
    }

    /// Write outside a transaction. Used only where one collection is touched
    /// and no audit entry is owed.
    pub async fn update_many(&self, filter: Document, update: Document) -> DaoResult<u64> {
        let result = self
            .collection
            .update_many(filter, stamp_updated_at(update))
            .await?;
        Ok(result.modified_count)
    }

    pub async fn insert_one(&self, doc: &T) -> DaoResult<ObjectId> {
        let result = self.collection.insert_one(doc).await?;
        inserted_id(result.inserted_id)
    }

    pub async fn update_by_id(&self, id: ObjectId, update: Document) -> DaoResult<bool> {
        let result = self
            .collection
            .update_one(doc! { "_id": id }, stamp_updated_at(update))
            .await?;
        Ok(result.matched_count > 0)
    }

    // Session-bound variants. Every multi-collection mutation runs through
    // these so its writes commit or roll back together.

    pub async fn find_one_in(
        &self,
        session: &mut ClientSession,
        filter: Document,
    ) -> DaoResult<Option<T>> {
        Ok(self
            .collection
            .find_one(filter)
            .session(&mut *session)
            .await?)
    }

    pub async fn count_in(&self, session: &mut ClientSession, filter: Document) -> DaoResult<u64> {
        Ok(self
            .collection
            .count_documents(filter)
            .session(&mut *session)
            .await?)
    }

    pub async fn insert_one_in(&self, session: &mut ClientSession, doc: &T) -> DaoResult<ObjectId> {
        let result = self
            .collection
            .insert_one(doc)
            .session(&mut *session)
            .await?;
        let id = inserted_id(result.inserted_id)?;
        debug!(?id, collection = self.collection.name(), "Inserted document");
        Ok(id)
    }

    /// Returns whether a document matched `filter`, which makes it usable as
    /// a conditional state transition.
    pub async fn update_one_in(
        &self,
        session: &mut ClientSession,
        filter: Document,
        update: Document,
    ) -> DaoResult<bool> {
        let result = self
            .collection
            .update_one(filter, stamp_updated_at(update))
            .session(&mut *session)
            .await?;
        Ok(result.matched_count > 0)
    }

    pub async fn update_many_in(
        &self,
        session: &mut ClientSession,
        filter: Document,
        update: Document,
    ) -> DaoResult<u64> {
        let result = self
            .collection
            .update_many(filter, stamp_updated_at(update))
            .session(&mut *session)
            .await?;
        Ok(result.modified_count)
    }

    pub async fn delete_one_in(
        &self,
        session: &mut ClientSession,
        filter: Document,
    ) -> DaoResult<bool> {
        let result = self
            .collection
            .delete_one(filter)
            .session(&mut *session)
            .await?;
        Ok(result.deleted_count > 0)
    }

    pub async fn delete_many_in(
        &self,
        session: &mut ClientSession,
        filter: Document,
    ) -> DaoResult<u64> {
        let result = self
            .collection
            .delete_many(filter)
            .session(&mut *session)
            .await?;
        debug!(
            deleted = result.deleted_count,
            collection = self.collection.name(),
            "Deleted documents"
        );
        Ok(result.deleted_count)
    }
}

fn inserted_id(id: Bson) -> DaoResult<ObjectId> {
    id.as_object_id()
        .ok_or_else(|| DaoError::Validation("inserted_id is not an ObjectId".to_string()))
}
