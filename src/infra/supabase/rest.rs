use async_trait::async_trait;
use reqwest::header::HeaderValue;
use reqwest::{Method, Request};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::config::SupabaseConfig;
use crate::fetch::{
    ApiKey, BasicClient, FetchError, HttpClient, json_request, send_json, with_json_body,
};
use crate::services::store::{
    FeedbackId, FeedbackRow, NewReply, Reply, ReplyId, ReplyRow, Store, StoreError, User,
    UserChanges, UserId,
};

const USER_COLUMNS: &str = "uid,username,email";
const FEEDBACK_COLUMNS: &str =
    "id,created_at,title,description,type,rating,user_id,users(username)";
const REPLY_COLUMNS: &str = "id,content,created_at,feedback_id,user_id,users(username)";

/// [`Store`] backed by the hosted database's PostgREST interface.
pub struct PostgrestStore<C> {
    http: C,
    rest_url: Url,
}

impl PostgrestStore<ApiKey<ApiKey<BasicClient>>> {
    /// Production store authenticated with the service key.
    pub fn from_config(config: &SupabaseConfig) -> anyhow::Result<Self> {
        let http = ApiKey::new(
            ApiKey::bearer(BasicClient::new(), &config.key)?,
            "apikey",
            &config.key,
        )?;
        Ok(Self::new(http, &config.url)?)
    }
}

impl<C: HttpClient> PostgrestStore<C> {
    pub fn new(http: C, base_url: &Url) -> Result<Self, url::ParseError> {
        Ok(Self {
            http,
            rest_url: base_url.join("rest/v1/")?,
        })
    }

    fn table(&self, table: &str, params: &[(&str, String)]) -> Result<Url, StoreError> {
        let mut url = self.rest_url.join(table)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in params {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }

    async fn rows<T: DeserializeOwned>(&self, req: Request) -> Result<Vec<T>, StoreError> {
        let body = send_json(&self.http, req).await?;
        if body.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(body)?)
    }

    /// Inserts one row and hands back the stored version of it.
    async fn insert<T: DeserializeOwned>(
        &self,
        table: &str,
        body: &Value,
        what: &str,
    ) -> Result<T, StoreError> {
        let url = self.table(table, &[])?;
        let req = returning(with_json_body(json_request(Method::POST, url), body)?);

        let rows: Vec<T> = match self.rows(req).await {
            Ok(rows) => rows,
            Err(StoreError::Fetch(e @ FetchError::Status { .. })) => {
                warn!(table, error = %e, "Insert refused");
                return Err(StoreError::InsertFailed(what.to_string()));
            }
            Err(e) => return Err(e),
        };

        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::InsertFailed(what.to_string()))
    }

    async fn delete(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<Value>, StoreError> {
        let url = self.table(table, filters)?;
        let deleted: Vec<Value> = self.rows(returning(json_request(Method::DELETE, url))).await?;
        debug!(table, count = deleted.len(), "Rows deleted");
        Ok(deleted)
    }
}

/// Asks the store to echo written rows back.
fn returning(mut req: Request) -> Request {
    req.headers_mut()
        .insert("Prefer", HeaderValue::from_static("return=representation"));
    req
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

#[async_trait]
impl<C: HttpClient> Store for PostgrestStore<C> {
    #[tracing::instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let url = self.table("users", &[("select", USER_COLUMNS.into())])?;
        self.rows(json_request(Method::GET, url)).await
    }

    #[tracing::instrument(skip(self))]
    async fn get_user(&self, id: UserId) -> Result<User, StoreError> {
        let url = self.table("users", &[("select", USER_COLUMNS.into()), ("uid", eq(id))])?;
        let users: Vec<User> = self.rows(json_request(Method::GET, url)).await?;
        users
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
    }

    #[tracing::instrument(skip(self, user), fields(id = %user.id))]
    async fn create_user(&self, user: &User) -> Result<User, StoreError> {
        let body = json!({"uid": user.id, "username": user.username, "email": user.email});
        self.insert("users", &body, "user").await
    }

    #[tracing::instrument(skip(self))]
    async fn update_user(&self, id: UserId, changes: &UserChanges) -> Result<User, StoreError> {
        let url = self.table("users", &[("select", USER_COLUMNS.into()), ("uid", eq(id))])?;
        let req = returning(with_json_body(json_request(Method::PATCH, url), changes)?);
        let users: Vec<User> = self.rows(req).await?;
        users
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
    }

    #[tracing::instrument(skip(self))]
    async fn list_feedback(&self) -> Result<Vec<FeedbackRow>, StoreError> {
        let url = self.table(
            "feedback",
            &[
                ("select", FEEDBACK_COLUMNS.into()),
                ("order", "created_at.desc".into()),
            ],
        )?;
        self.rows(json_request(Method::GET, url)).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_feedback(&self, id: FeedbackId) -> Result<Vec<Value>, StoreError> {
        self.delete("feedback", &[("id", eq(id))]).await
    }

    #[tracing::instrument(skip(self))]
    async fn list_replies(&self, feedback_id: FeedbackId) -> Result<Vec<ReplyRow>, StoreError> {
        let url = self.table(
            "replies",
            &[
                ("select", REPLY_COLUMNS.into()),
                ("feedback_id", eq(feedback_id)),
                ("order", "created_at.asc".into()),
            ],
        )?;
        self.rows(json_request(Method::GET, url)).await
    }

    #[tracing::instrument(skip(self, reply), fields(feedback_id = reply.feedback_id))]
    async fn create_reply(&self, reply: &NewReply) -> Result<Reply, StoreError> {
        self.insert("replies", &serde_json::to_value(reply)?, "reply")
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_reply(
        &self,
        feedback_id: FeedbackId,
        id: ReplyId,
    ) -> Result<Vec<Value>, StoreError> {
        self.delete("replies", &[("id", eq(id)), ("feedback_id", eq(feedback_id))])
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_account(&self, user_id: UserId) -> Result<Vec<Value>, StoreError> {
        self.delete("users", &[("uid", eq(user_id))]).await
    }
}
