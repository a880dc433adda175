//! Feedback listing and threaded replies.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::api::AppState;
use crate::api::error::AppError;
use crate::api::extract::{Bearer, Path, parse_id};
use crate::services::denormalize::{self, FeedbackView, ReplyView};
use crate::services::store::{FeedbackId, NewReply, Reply, ReplyId};

#[derive(Debug, Deserialize)]
pub struct ReplyIn {
    pub content: String,
}

/// The stored reply plus a note for the user.
#[derive(Debug, Serialize)]
pub struct ReplyCreated {
    pub id: ReplyId,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub user_id: uuid::Uuid,
    pub message: String,
}

impl From<Reply> for ReplyCreated {
    fn from(reply: Reply) -> Self {
        Self {
            message: format!("Reply added to feedback {}", reply.feedback_id),
            id: reply.id,
            content: reply.content,
            created_at: reply.created_at,
            user_id: reply.user_id,
        }
    }
}

pub async fn list_feedback(
    State(state): State<AppState>,
) -> Result<Json<Vec<FeedbackView>>, AppError> {
    let rows = state.store.list_feedback().await?;
    Ok(Json(denormalize::feedback(rows)))
}

pub async fn delete_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id: FeedbackId = parse_id(&id, "feedback id")?;
    let deleted = state.store.delete_feedback(id).await?;

    info!(id, count = deleted.len(), "Feedback deleted");
    Ok(Json(json!({
        "message": format!("Feedback {id} deleted"),
        "deleted": deleted,
    })))
}

pub async fn list_replies(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ReplyView>>, AppError> {
    let id: FeedbackId = parse_id(&id, "feedback id")?;
    let rows = state.store.list_replies(id).await?;
    Ok(Json(denormalize::replies(rows)))
}

/// Inputs are checked first, then the caller's token, then the row is written.
pub async fn create_reply(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<ReplyIn>, JsonRejection>,
) -> Result<(StatusCode, Json<ReplyCreated>), AppError> {
    let feedback_id: FeedbackId = parse_id(&id, "feedback id")?;
    let Json(body) = body?;
    let content = body.content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("reply content must not be empty".into()));
    }

    let user_id = Bearer::from_headers(&headers)?
        .user(state.identity.as_ref())
        .await?;

    let reply = state
        .store
        .create_reply(&NewReply {
            feedback_id,
            user_id,
            content: content.to_string(),
        })
        .await?;

    info!(feedback_id, reply_id = reply.id, %user_id, "Reply created");
    Ok((StatusCode::CREATED, Json(reply.into())))
}

pub async fn delete_reply(
    State(state): State<AppState>,
    Path((id, reply_id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let feedback_id: FeedbackId = parse_id(&id, "feedback id")?;
    let reply_id: ReplyId = parse_id(&reply_id, "reply id")?;
    let deleted = state.store.delete_reply(feedback_id, reply_id).await?;

    info!(feedback_id, reply_id, count = deleted.len(), "Reply deleted");
    Ok(Json(json!({
        "message": format!("Reply {reply_id} deleted"),
        "deleted": deleted,
    })))
}
