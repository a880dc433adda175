//! Outbound HTTP plumbing shared by every upstream client.
//!
//! [`HttpClient`] is the seam: production code stacks [`ApiKey`] decorators on
//! top of a [`BasicClient`], tests swap in a stub that returns canned responses.

mod api_key;
mod basic;
mod client;

pub use api_key::ApiKey;
pub use basic::BasicClient;
pub use client::HttpClient;

use reqwest::{Method, Request, StatusCode, Url, header};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Failure of a single outbound JSON exchange.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    /// Status code of a non-success response, if that is what this is.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Builds a request that announces a JSON response is expected.
pub fn json_request(method: Method, url: Url) -> Request {
    let mut req = Request::new(method, url);
    req.headers_mut().insert(
        header::ACCEPT,
        header::HeaderValue::from_static("application/json"),
    );
    req
}

/// Serializes `body` as the JSON payload of `req`.
pub fn with_json_body<T: Serialize + ?Sized>(
    mut req: Request,
    body: &T,
) -> Result<Request, FetchError> {
    let bytes = serde_json::to_vec(body)?;
    req.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    *req.body_mut() = Some(bytes.into());
    Ok(req)
}

/// Executes `req` and decodes the body as JSON.
///
/// Non-2xx responses become [`FetchError::Status`]. An empty body decodes to
/// [`Value::Null`].
pub async fn send_json<C: HttpClient + ?Sized>(
    client: &C,
    req: Request,
) -> Result<Value, FetchError> {
    let resp = client.execute(req).await?;
    let status = resp.status();
    let bytes = resp.bytes().await?;

    if !status.is_success() {
        let body = String::from_utf8_lossy(&bytes).into_owned();
        return Err(FetchError::Status { status, body });
    }

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording stand-in for a real transport.

    use super::HttpClient;
    use async_trait::async_trait;
    use reqwest::{Method, Request, Response, header::HeaderMap};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// What the stub saw of one outgoing request.
    #[derive(Debug, Clone)]
    pub struct Recorded {
        pub method: Method,
        pub url: reqwest::Url,
        pub headers: HeaderMap,
        pub body: Option<serde_json::Value>,
    }

    /// Replays queued `(status, body)` pairs in order; once the queue is
    /// drained every further request gets `200 []`.
    #[derive(Default)]
    pub struct StubClient {
        replies: Mutex<VecDeque<(u16, String)>>,
        seen: Mutex<Vec<Recorded>>,
    }

    impl StubClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, status: u16, body: impl Into<String>) -> Self {
            self.replies.lock().unwrap().push_back((status, body.into()));
            self
        }

        pub fn requests(&self) -> Vec<Recorded> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClient for StubClient {
        async fn execute(&self, req: Request) -> reqwest::Result<Response> {
            let body = req
                .body()
                .and_then(|b| b.as_bytes())
                .map(|b| serde_json::from_slice(b).unwrap());
            self.seen.lock().unwrap().push(Recorded {
                method: req.method().clone(),
                url: req.url().clone(),
                headers: req.headers().clone(),
                body,
            });

            let (status, body) = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or((200, "[]".to_string()));
            let resp = axum::http::Response::builder()
                .status(status)
                .body(body)
                .unwrap();
            Ok(Response::from(resp))
        }
    }
}
