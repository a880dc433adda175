//! Trait and row types for the hosted relational store.
//!
//! Rows come back exactly as the store produced them, joins included. Turning
//! a joined row into what clients see is [`crate::services::denormalize`]'s
//! job, not the store's.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::fetch::FetchError;

pub type FeedbackId = i64;
pub type ReplyId = i64;
pub type UserId = Uuid;

/// Profile row from the `users` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "uid")]
    pub id: UserId,
    pub username: String,
    pub email: String,
}

/// Partial profile update; absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none()
    }
}

/// The embedded side of a join against `users`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub username: Option<String>,
}

/// A `feedback` row joined to its author.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedbackRow {
    pub id: FeedbackId,
    pub created_at: DateTime<Utc>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub rating: Option<Number>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default, alias = "user")]
    pub users: Option<Author>,
}

/// A `replies` row joined to its author.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplyRow {
    pub id: ReplyId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub feedback_id: FeedbackId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default, alias = "user")]
    pub users: Option<Author>,
}

/// Insert payload for `replies`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewReply {
    pub feedback_id: FeedbackId,
    pub user_id: UserId,
    pub content: String,
}

/// A freshly inserted reply, as the store echoes it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub id: ReplyId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub feedback_id: FeedbackId,
    pub user_id: UserId,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    /// The write was refused or echoed nothing back. Foreign-key violations
    /// land here too; the cause is not told apart.
    #[error("failed to insert {0}")]
    InsertFailed(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("unexpected row shape: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid store url: {0}")]
    Url(#[from] url::ParseError),
}

/// Abstraction over the users / feedback / replies tables.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Point lookup; [`StoreError::NotFound`] on a miss.
    async fn get_user(&self, id: UserId) -> Result<User, StoreError>;

    async fn create_user(&self, user: &User) -> Result<User, StoreError>;

    /// [`StoreError::NotFound`] when no row matched `id`.
    async fn update_user(&self, id: UserId, changes: &UserChanges) -> Result<User, StoreError>;

    /// All feedback, newest first, joined to the author's username.
    async fn list_feedback(&self) -> Result<Vec<FeedbackRow>, StoreError>;

    /// Deletes by id and returns whatever rows went; empty when `id` was absent.
    async fn delete_feedback(&self, id: FeedbackId) -> Result<Vec<Value>, StoreError>;

    /// Replies to one feedback, oldest first, joined to the author's username.
    async fn list_replies(&self, feedback_id: FeedbackId) -> Result<Vec<ReplyRow>, StoreError>;

    async fn create_reply(&self, reply: &NewReply) -> Result<Reply, StoreError>;

    /// Deletes a reply, but only through the feedback it belongs to.
    async fn delete_reply(
        &self,
        feedback_id: FeedbackId,
        id: ReplyId,
    ) -> Result<Vec<Value>, StoreError>;

    /// Removes the caller's profile row. Anything cascading from it is the
    /// schema's business.
    async fn delete_account(&self, user_id: UserId) -> Result<Vec<Value>, StoreError>;
}
