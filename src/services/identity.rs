//! Trait and helpers for the identity provider that issues bearer tokens.

use thiserror::Error;

use crate::fetch::FetchError;
use crate::services::store::UserId;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingHeader,

    #[error("authorization header must use the Bearer scheme")]
    InvalidScheme,

    #[error("invalid or expired token: {0}")]
    Rejected(String),

    /// The provider refused an account operation (duplicate email, weak
    /// password, ...). The message is the provider's own.
    #[error("{0}")]
    Refused(String),

    #[error("identity provider error: {0}")]
    Provider(#[from] FetchError),

    #[error("invalid identity provider url: {0}")]
    Url(#[from] url::ParseError),
}

/// Pulls the token out of an `Authorization` header value.
///
/// The scheme is matched case-insensitively; the token itself must be
/// non-empty.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingHeader)?.trim();
    let (scheme, token) = header.split_once(' ').ok_or(AuthError::InvalidScheme)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidScheme);
    }

    match token.trim() {
        "" => Err(AuthError::InvalidScheme),
        token => Ok(token),
    }
}

/// Sign-up details for a new account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Abstraction over the token-issuing identity service.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves a bearer token to the user it was issued to.
    async fn resolve(&self, token: &str) -> Result<UserId, AuthError>;

    /// Registers a new identity and returns its id.
    async fn create_account(&self, account: &NewAccount) -> Result<UserId, AuthError>;

    /// Changes the email the identity signs in with.
    async fn update_email(&self, id: UserId, email: &str) -> Result<(), AuthError>;

    /// Removes an identity for good.
    async fn delete_account(&self, id: UserId) -> Result<(), AuthError>;
}
