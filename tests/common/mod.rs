#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
};
use chrono::{DateTime, Duration, Utc};
use datamall_gateway::api::{AppState, router};
use datamall_gateway::fetch::FetchError;
use datamall_gateway::services::identity::{AuthError, IdentityProvider, NewAccount};
use datamall_gateway::services::store::{
    Author, FeedbackId, FeedbackRow, NewReply, Reply, ReplyId, ReplyRow, Store, StoreError, User,
    UserChanges, UserId,
};
use datamall_gateway::services::transit::{Dataset, Query, TransitSource, Upstream};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

pub const MEI_TOKEN: &str = "mei-token";
pub const RAVI_TOKEN: &str = "ravi-token";

pub fn mei() -> UserId {
    "6f1c2a52-8c1e-4d55-9a1b-0b4f3c0f2a11".parse().unwrap()
}

pub fn ravi() -> UserId {
    "0d9a7d3e-2b7f-4b8e-8f0e-5a1c9e2f3b44".parse().unwrap()
}

// ---------------------------------------------------------------- transit

/// Serves canned records per dataset, or reports everything unavailable.
#[derive(Default)]
pub struct FakeTransit {
    pub records: HashMap<Dataset, Vec<Value>>,
    pub down: bool,
    pub queries: Mutex<Vec<Query>>,
}

impl FakeTransit {
    pub fn with(mut self, dataset: Dataset, records: Vec<Value>) -> Self {
        self.records.insert(dataset, records);
        self
    }

    pub fn down() -> Self {
        Self {
            down: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl TransitSource for FakeTransit {
    async fn fetch(&self, query: &Query) -> Upstream {
        self.queries.lock().unwrap().push(query.clone());
        if self.down {
            return Upstream::Unavailable("connection refused".into());
        }
        Upstream::Available(
            self.records
                .get(&query.dataset())
                .cloned()
                .unwrap_or_default(),
        )
    }
}

// ------------------------------------------------------------------ store

pub struct StoredFeedback {
    pub id: FeedbackId,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub user_id: Option<UserId>,
}

pub struct StoredReply {
    pub id: ReplyId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub feedback_id: FeedbackId,
    pub user_id: Option<UserId>,
}

/// Tables in memory. Joins and ordering are done the way the real store
/// does them, so the HTTP layer sees realistic rows.
#[derive(Default)]
pub struct FakeStore {
    pub users: Mutex<Vec<User>>,
    pub feedback: Mutex<Vec<StoredFeedback>>,
    pub replies: Mutex<Vec<StoredReply>>,
    pub calls: AtomicUsize,
    pub fail_user_insert: bool,
}

impl FakeStore {
    pub fn seeded() -> Self {
        let base = DateTime::parse_from_rfc3339("2025-03-01T08:00:00+00:00")
            .unwrap()
            .with_timezone(&Utc);
        let store = Self::default();

        store.users.lock().unwrap().extend([
            User {
                id: mei(),
                username: "mei".into(),
                email: "mei@example.com".into(),
            },
            User {
                id: ravi(),
                username: "ravi".into(),
                email: "ravi@example.com".into(),
            },
        ]);

        store.feedback.lock().unwrap().extend([
            StoredFeedback {
                id: 1,
                created_at: base,
                title: "Bus 14 late".into(),
                user_id: Some(mei()),
            },
            StoredFeedback {
                id: 2,
                created_at: base + Duration::hours(2),
                title: "Crowded platform".into(),
                user_id: Some(ravi()),
            },
            StoredFeedback {
                id: 3,
                created_at: base + Duration::hours(1),
                title: "Anonymous".into(),
                user_id: None,
            },
        ]);

        store.replies.lock().unwrap().extend([
            StoredReply {
                id: 10,
                content: "Second".into(),
                created_at: base + Duration::minutes(30),
                feedback_id: 1,
                user_id: Some(ravi()),
            },
            StoredReply {
                id: 11,
                content: "First".into(),
                created_at: base + Duration::minutes(5),
                feedback_id: 1,
                user_id: Some(Uuid::new_v4()),
            },
            StoredReply {
                id: 12,
                content: "Elsewhere".into(),
                created_at: base,
                feedback_id: 2,
                user_id: Some(mei()),
            },
        ]);

        store
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn author(&self, id: Option<UserId>) -> Option<Author> {
        let id = id?;
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .map(|u| Author {
                username: Some(u.username.clone()),
            })
    }
}

#[async_trait]
impl Store for FakeStore {
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        self.hit();
        Ok(self.users.lock().unwrap().clone())
    }

    async fn get_user(&self, id: UserId) -> Result<User, StoreError> {
        self.hit();
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
    }

    async fn create_user(&self, user: &User) -> Result<User, StoreError> {
        self.hit();
        if self.fail_user_insert {
            return Err(StoreError::InsertFailed("user".into()));
        }
        self.users.lock().unwrap().push(user.clone());
        Ok(user.clone())
    }

    async fn update_user(&self, id: UserId, changes: &UserChanges) -> Result<User, StoreError> {
        self.hit();
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        if let Some(username) = &changes.username {
            user.username = username.clone();
        }
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        Ok(user.clone())
    }

    async fn list_feedback(&self) -> Result<Vec<FeedbackRow>, StoreError> {
        self.hit();
        let feedback = self.feedback.lock().unwrap();
        let mut rows: Vec<FeedbackRow> = feedback
            .iter()
            .map(|f| FeedbackRow {
                id: f.id,
                created_at: f.created_at,
                title: Some(f.title.clone()),
                description: Some("details".into()),
                kind: Some("service".into()),
                rating: Some(serde_json::Number::from(4u8)),
                user_id: f.user_id,
                users: self.author(f.user_id),
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn delete_feedback(&self, id: FeedbackId) -> Result<Vec<Value>, StoreError> {
        self.hit();
        let mut feedback = self.feedback.lock().unwrap();
        let before = feedback.len();
        feedback.retain(|f| f.id != id);
        Ok(if feedback.len() < before {
            vec![json!({"id": id})]
        } else {
            Vec::new()
        })
    }

    async fn list_replies(&self, feedback_id: FeedbackId) -> Result<Vec<ReplyRow>, StoreError> {
        self.hit();
        let replies = self.replies.lock().unwrap();
        let mut rows: Vec<ReplyRow> = replies
            .iter()
            .filter(|r| r.feedback_id == feedback_id)
            .map(|r| ReplyRow {
                id: r.id,
                content: r.content.clone(),
                created_at: r.created_at,
                feedback_id: r.feedback_id,
                user_id: r.user_id,
                users: self.author(r.user_id),
            })
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(rows)
    }

    async fn create_reply(&self, reply: &NewReply) -> Result<Reply, StoreError> {
        self.hit();
        let parent_exists = self
            .feedback
            .lock()
            .unwrap()
            .iter()
            .any(|f| f.id == reply.feedback_id);
        if !parent_exists {
            return Err(StoreError::InsertFailed("reply".into()));
        }

        let mut replies = self.replies.lock().unwrap();
        let id = replies.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let created_at = Utc::now();
        replies.push(StoredReply {
            id,
            content: reply.content.clone(),
            created_at,
            feedback_id: reply.feedback_id,
            user_id: Some(reply.user_id),
        });

        Ok(Reply {
            id,
            content: reply.content.clone(),
            created_at,
            feedback_id: reply.feedback_id,
            user_id: reply.user_id,
        })
    }

    async fn delete_reply(
        &self,
        feedback_id: FeedbackId,
        id: ReplyId,
    ) -> Result<Vec<Value>, StoreError> {
        self.hit();
        let mut replies = self.replies.lock().unwrap();
        let before = replies.len();
        replies.retain(|r| !(r.id == id && r.feedback_id == feedback_id));
        Ok(if replies.len() < before {
            vec![json!({"id": id})]
        } else {
            Vec::new()
        })
    }

    async fn delete_account(&self, user_id: UserId) -> Result<Vec<Value>, StoreError> {
        self.hit();
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != user_id);
        Ok(if users.len() < before {
            vec![json!({"uid": user_id})]
        } else {
            Vec::new()
        })
    }
}

// --------------------------------------------------------------- identity

/// Knows a fixed set of tokens.
#[derive(Default)]
pub struct FakeIdentity {
    pub tokens: HashMap<String, UserId>,
    pub created: Mutex<Vec<UserId>>,
    pub deleted: Mutex<Vec<UserId>>,
    pub emails: Mutex<Vec<(UserId, String)>>,
    pub resolves: AtomicUsize,
    pub fail_delete: bool,
}

impl FakeIdentity {
    pub fn standard() -> Self {
        let mut tokens = HashMap::new();
        tokens.insert(MEI_TOKEN.to_string(), mei());
        tokens.insert(RAVI_TOKEN.to_string(), ravi());
        Self {
            tokens,
            ..Self::default()
        }
    }

    pub fn resolves(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn resolve(&self, token: &str) -> Result<UserId, AuthError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        self.tokens
            .get(token)
            .copied()
            .ok_or_else(|| AuthError::Rejected("unknown token".into()))
    }

    async fn create_account(&self, account: &NewAccount) -> Result<UserId, AuthError> {
        if account.email == "taken@example.com" {
            return Err(AuthError::Refused("email already registered".into()));
        }
        let id = Uuid::new_v4();
        self.created.lock().unwrap().push(id);
        Ok(id)
    }

    async fn update_email(&self, id: UserId, email: &str) -> Result<(), AuthError> {
        if email == "taken@example.com" {
            return Err(AuthError::Refused("email already registered".into()));
        }
        self.emails.lock().unwrap().push((id, email.to_string()));
        Ok(())
    }

    async fn delete_account(&self, id: UserId) -> Result<(), AuthError> {
        if self.fail_delete {
            return Err(AuthError::Provider(FetchError::Status {
                status: StatusCode::BAD_GATEWAY,
                body: "bad gateway".into(),
            }));
        }
        self.deleted.lock().unwrap().push(id);
        Ok(())
    }
}

// ---------------------------------------------------------------- harness

pub struct Harness {
    pub transit: Arc<FakeTransit>,
    pub store: Arc<FakeStore>,
    pub identity: Arc<FakeIdentity>,
}

impl Harness {
    pub fn new(transit: FakeTransit, store: FakeStore, identity: FakeIdentity) -> Self {
        Self {
            transit: Arc::new(transit),
            store: Arc::new(store),
            identity: Arc::new(identity),
        }
    }

    pub fn standard() -> Self {
        Self::new(FakeTransit::default(), FakeStore::seeded(), FakeIdentity::standard())
    }

    pub fn app(&self) -> Router {
        router(AppState {
            transit: self.transit.clone(),
            store: self.store.clone(),
            identity: self.identity.clone(),
        })
    }

    pub async fn send(&self, req: Request<Body>) -> Sent {
        let resp = self.app().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        Sent {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> Sent {
        self.send(request(Method::GET, uri, None, None)).await
    }
}

/// A response, taken apart.
pub struct Sent {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
