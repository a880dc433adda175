//! Flattens joined rows into the shapes clients receive.
//!
//! The author's username replaces both the raw user id and the nested join
//! object. A reply whose author cannot be found is attributed to
//! [`UNKNOWN_AUTHOR`]; feedback keeps a null `username` in that case.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Number;

use crate::services::store::{FeedbackId, FeedbackRow, ReplyId, ReplyRow};

pub const UNKNOWN_AUTHOR: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackView {
    pub id: FeedbackId,
    pub created_at: DateTime<Utc>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub rating: Option<Number>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyView {
    pub id: ReplyId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub feedback_id: FeedbackId,
    pub author: String,
}

pub fn feedback(rows: Vec<FeedbackRow>) -> Vec<FeedbackView> {
    rows.into_iter()
        .map(|row| FeedbackView {
            id: row.id,
            created_at: row.created_at,
            title: row.title,
            description: row.description,
            kind: row.kind,
            rating: row.rating,
            username: row.users.and_then(|a| a.username),
        })
        .collect()
}

pub fn replies(rows: Vec<ReplyRow>) -> Vec<ReplyView> {
    rows.into_iter()
        .map(|row| ReplyView {
            id: row.id,
            content: row.content,
            created_at: row.created_at,
            feedback_id: row.feedback_id,
            author: row
                .users
                .and_then(|a| a.username)
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        })
        .collect()
}
