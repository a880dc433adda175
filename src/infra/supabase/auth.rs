use anyhow::Context;
use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};
use url::Url;

use crate::config::SupabaseConfig;
use crate::fetch::{
    ApiKey, BasicClient, FetchError, HttpClient, json_request, send_json, with_json_body,
};
use crate::services::identity::{AuthError, IdentityProvider, NewAccount};
use crate::services::store::UserId;

#[derive(Deserialize)]
struct IdentityResponse {
    id: UserId,
}

/// [`IdentityProvider`] backed by the hosted auth service.
///
/// Every request carries the project `apikey`. Token resolution sends the
/// caller's own token as the bearer; account administration sends the
/// service key.
pub struct GoTrueClient<C> {
    http: C,
    auth_url: Url,
    service_bearer: HeaderValue,
}

impl GoTrueClient<ApiKey<BasicClient>> {
    pub fn from_config(config: &SupabaseConfig) -> anyhow::Result<Self> {
        let http = ApiKey::new(BasicClient::new(), "apikey", &config.key)?;
        Self::new(http, &config.url, &config.key)
    }
}

impl<C: HttpClient> GoTrueClient<C> {
    pub fn new(http: C, base_url: &Url, service_key: &str) -> anyhow::Result<Self> {
        let mut service_bearer = HeaderValue::from_str(&format!("Bearer {service_key}"))
            .context("service key is not a valid header value")?;
        service_bearer.set_sensitive(true);

        Ok(Self {
            http,
            auth_url: base_url
                .join("auth/v1/")
                .with_context(|| format!("invalid identity url under {base_url}"))?,
            service_bearer,
        })
    }

    fn admin_request(&self, method: Method, path: &str) -> Result<reqwest::Request, AuthError> {
        let mut req = json_request(method, self.auth_url.join(path)?);
        req.headers_mut()
            .insert(AUTHORIZATION, self.service_bearer.clone());
        Ok(req)
    }
}

/// Only a 4xx on the token lookup rejects the token; anything else is the
/// provider failing.
fn resolve_error(e: FetchError) -> AuthError {
    match &e {
        FetchError::Status { status, .. } if status.is_client_error() => {
            warn!(error = %e, "Token rejected");
            AuthError::Rejected(e.to_string())
        }
        _ => {
            error!(error = %e, "Identity provider unavailable");
            AuthError::Provider(e)
        }
    }
}

/// Admin refusals (4xx) carry a message meant for the user; anything else is
/// the provider failing.
fn admin_error(e: FetchError) -> AuthError {
    match &e {
        FetchError::Status { status, body } if status.is_client_error() => {
            AuthError::Refused(provider_message(body))
        }
        _ => AuthError::Provider(e),
    }
}

fn provider_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["msg", "message", "error_description"]
                .iter()
                .find_map(|key| v[*key].as_str().map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl<C: HttpClient> IdentityProvider for GoTrueClient<C> {
    #[tracing::instrument(skip_all)]
    async fn resolve(&self, token: &str) -> Result<UserId, AuthError> {
        let mut req = json_request(Method::GET, self.auth_url.join("user")?);
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| AuthError::Rejected("token is not a valid header value".into()))?;
        req.headers_mut().insert(AUTHORIZATION, bearer);

        let body = send_json(&self.http, req).await.map_err(resolve_error)?;

        let identity: IdentityResponse = serde_json::from_value(body)
            .map_err(|e| AuthError::Rejected(format!("unreadable identity: {e}")))?;
        Ok(identity.id)
    }

    #[tracing::instrument(skip_all, fields(email = %account.email))]
    async fn create_account(&self, account: &NewAccount) -> Result<UserId, AuthError> {
        let req = with_json_body(
            self.admin_request(Method::POST, "admin/users")?,
            &json!({
                "email": account.email,
                "password": account.password,
                "user_metadata": {"username": account.username},
            }),
        )?;

        let body = send_json(&self.http, req).await.map_err(admin_error)?;
        let identity: IdentityResponse =
            serde_json::from_value(body).map_err(|e| AuthError::Provider(e.into()))?;

        info!(id = %identity.id, "Identity created");
        Ok(identity.id)
    }

    #[tracing::instrument(skip(self, email))]
    async fn update_email(&self, id: UserId, email: &str) -> Result<(), AuthError> {
        let req = with_json_body(
            self.admin_request(Method::PUT, &format!("admin/users/{id}"))?,
            &json!({ "email": email }),
        )?;
        send_json(&self.http, req).await.map_err(admin_error)?;

        info!("Login email updated");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_account(&self, id: UserId) -> Result<(), AuthError> {
        let req = self.admin_request(Method::DELETE, &format!("admin/users/{id}"))?;
        send_json(&self.http, req).await.map_err(admin_error)?;

        info!("Identity deleted");
        Ok(())
    }
}
