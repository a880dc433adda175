use crate::fetch::client::HttpClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that injects a credential as an HTTP header.
///
/// DataMall wants `AccountKey: <key>`; the hosted database wants both
/// `apikey: <key>` and `Authorization: Bearer <key>`, which is two of these
/// stacked. The header is validated once here rather than on every request,
/// and is marked sensitive so it never shows up in `Debug` output.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    value: HeaderValue,
}

impl<C> ApiKey<C> {
    pub fn new(inner: C, header_name: &str, key: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes())
            .with_context(|| format!("invalid header name '{header_name}'"))?;
        let mut value = HeaderValue::from_str(key).with_context(|| {
            format!("credential for '{header_name}' is not a valid header value")
        })?;
        value.set_sensitive(true);

        Ok(Self {
            inner,
            header_name,
            value,
        })
    }

    /// Convenience constructor that uses `Authorization: Bearer <key>`.
    pub fn bearer(inner: C, key: &str) -> Result<Self> {
        Self::new(inner, AUTHORIZATION.as_str(), &format!("Bearer {key}"))
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        // A header the caller already set wins; the admin and user-token calls
        // against the identity service rely on that.
        if !req.headers().contains_key(&self.header_name) {
            req.headers_mut()
                .insert(self.header_name.clone(), self.value.clone());
        }
        self.inner.execute(req).await
    }
}
