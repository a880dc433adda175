//! Request pieces parsed before a handler runs.

use std::str::FromStr;

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header::AUTHORIZATION, request::Parts};
use serde::de::DeserializeOwned;

use crate::api::error::AppError;
use crate::services::IdentityProvider;
use crate::services::identity::bearer_token;
use crate::services::store::UserId;

/// The caller's bearer token, not yet checked with the identity provider.
///
/// Extraction only looks at the header, so a request without one is turned
/// away before anything else is consulted.
#[derive(Debug, Clone)]
pub struct Bearer(String);

impl Bearer {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let raw = headers
            .get(AUTHORIZATION)
            .map(|v| v.to_str().unwrap_or_default());
        Ok(Self(bearer_token(raw)?.to_string()))
    }

    /// Asks the identity provider who this token belongs to.
    pub async fn user(&self, identity: &dyn IdentityProvider) -> Result<UserId, AppError> {
        Ok(identity.resolve(&self.0).await?)
    }
}

impl<S> FromRequestParts<S> for Bearer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}

/// Path segments, with malformed ones rejected through the usual error
/// envelope instead of axum's plain-text body.
#[derive(Debug)]
pub struct Path<T>(pub T);

impl<S, T> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Path(value) =
            axum::extract::Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Parses an identifier taken from the path.
pub fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("invalid {what} '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use uuid::Uuid;

    #[test]
    fn test_bearer_from_headers() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            Bearer::from_headers(&headers),
            Err(AppError::Unauthorized(_))
        ));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert!(Bearer::from_headers(&headers).is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(Bearer::from_headers(&headers).unwrap().0, "abc");
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id::<i64>("42", "feedback id").unwrap(), 42);
        assert!(parse_id::<i64>("abc", "feedback id").is_err());
        assert!(parse_id::<Uuid>("12", "user id").is_err());
    }
}
