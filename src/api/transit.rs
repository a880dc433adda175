//! Pass-through routes for the transit datasets.
//!
//! Each route validates its key, pulls one dataset, and returns the records
//! verbatim. When the provider could not be reached the body is still `[]`,
//! but the `x-upstream-status` header says `unavailable` instead of `ok`.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
    routing::{MethodRouter, get},
};
use tracing::debug;

use crate::api::AppState;
use crate::api::error::AppError;
use crate::api::extract::Path;
use crate::services::{Dataset, Query};

pub const UPSTREAM_STATUS_HEADER: &str = "x-upstream-status";

async fn pass_through(
    state: &AppState,
    dataset: Dataset,
    key: Option<&str>,
) -> Result<Response, AppError> {
    let query = Query::new(dataset, key)?;
    let upstream = state.transit.fetch(&query).await;

    let status = if upstream.is_available() {
        "ok"
    } else {
        "unavailable"
    };
    debug!(%dataset, status, "Serving dataset");

    Ok(([(UPSTREAM_STATUS_HEADER, status)], Json(upstream.into_records())).into_response())
}

/// Route for a dataset addressed without a key. Mounted for keyed datasets
/// too, where it answers with the missing-key error.
pub fn collection(dataset: Dataset) -> MethodRouter<AppState> {
    get(move |State(state): State<AppState>| async move {
        pass_through(&state, dataset, None).await
    })
}

/// Route for a dataset addressed by the last path segment.
pub fn keyed(dataset: Dataset) -> MethodRouter<AppState> {
    get(
        move |State(state): State<AppState>, Path(key): Path<String>| async move {
            pass_through(&state, dataset, Some(&key)).await
        },
    )
}
