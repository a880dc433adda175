//! User profiles and account lifecycle.
//!
//! Reads are open. Every write except sign-up needs a bearer token, and a
//! caller can only touch their own account.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::api::AppState;
use crate::api::error::AppError;
use crate::api::extract::{Bearer, Path, parse_id};
use crate::services::NewAccount;
use crate::services::store::{User, UserChanges, UserId};

#[derive(Debug, Deserialize)]
pub struct SignUp {
    pub username: String,
    pub email: String,
    pub password: String,
}

fn required(value: &str, field: &str) -> Result<String, AppError> {
    match value.trim() {
        "" => Err(AppError::Validation(format!("{field} must not be empty"))),
        v => Ok(v.to_string()),
    }
}

fn email(value: &str) -> Result<String, AppError> {
    let email = required(value, "email")?;
    if !email.contains('@') {
        return Err(AppError::Validation(format!("invalid email '{email}'")));
    }
    Ok(email)
}

/// Resolves the caller and makes sure they are acting on themselves.
async fn authorize_self(
    state: &AppState,
    headers: &HeaderMap,
    target: UserId,
) -> Result<(), AppError> {
    let caller = Bearer::from_headers(headers)?
        .user(state.identity.as_ref())
        .await?;
    if caller != target {
        return Err(AppError::Forbidden(
            "you can only modify your own account".into(),
        ));
    }
    Ok(())
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.store.list_users().await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let id: UserId = parse_id(&id, "user id")?;
    Ok(Json(state.store.get_user(id).await?))
}

/// Registers the identity first, then the profile row. A profile that cannot
/// be written takes the fresh identity down with it.
pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<SignUp>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let Json(body) = body?;
    let account = NewAccount {
        username: required(&body.username, "username")?,
        email: email(&body.email)?,
        password: body.password,
    };
    if account.password.is_empty() {
        return Err(AppError::Validation("password must not be empty".into()));
    }

    let id = state.identity.create_account(&account).await?;
    let profile = User {
        id,
        username: account.username,
        email: account.email,
    };

    match state.store.create_user(&profile).await {
        Ok(user) => {
            info!(%id, "Account created");
            Ok((StatusCode::CREATED, Json(user)))
        }
        Err(e) => {
            if let Err(cleanup) = state.identity.delete_account(id).await {
                error!(
                    %id,
                    error = %cleanup,
                    "Could not remove identity after failed profile insert"
                );
            }
            Err(e.into())
        }
    }
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<UserChanges>, JsonRejection>,
) -> Result<Json<User>, AppError> {
    let id: UserId = parse_id(&id, "user id")?;
    let Json(body) = body?;
    let changes = UserChanges {
        username: body
            .username
            .as_deref()
            .map(|u| required(u, "username"))
            .transpose()?,
        email: body.email.as_deref().map(email).transpose()?,
    };
    if changes.is_empty() {
        return Err(AppError::Validation(
            "nothing to update, provide username or email".into(),
        ));
    }

    authorize_self(&state, &headers, id).await?;

    // The login email moves first so a refused address leaves the profile as is.
    if let Some(email) = &changes.email {
        state.identity.update_email(id, email).await?;
    }

    let user = state.store.update_user(id, &changes).await?;
    info!(%id, "Profile updated");
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let id: UserId = parse_id(&id, "user id")?;
    authorize_self(&state, &headers, id).await?;
    remove_account(&state, id).await
}

/// Deletes whoever the bearer token belongs to.
pub async fn delete_profile(
    State(state): State<AppState>,
    bearer: Bearer,
) -> Result<Json<Value>, AppError> {
    let id = bearer.user(state.identity.as_ref()).await?;
    remove_account(&state, id).await
}

/// Profile first, identity second. Until the identity is gone the caller's
/// token still resolves, so a failed run can be repeated.
async fn remove_account(state: &AppState, id: UserId) -> Result<Json<Value>, AppError> {
    let deleted = state.store.delete_account(id).await?;
    if let Err(e) = state.identity.delete_account(id).await {
        error!(%id, error = %e, "Profile deleted but identity remains");
        return Err(e.into());
    }

    info!(%id, rows = deleted.len(), "Account deleted");
    Ok(Json(json!({
        "message": "Account deleted",
        "user_id": id,
    })))
}
