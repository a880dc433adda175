//! HTTP surface: one route per (path, method), all under `/api`.

pub mod error;
pub mod extract;
pub mod feedback;
pub mod state;
pub mod transit;
pub mod users;

pub use error::AppError;
pub use state::AppState;

use axum::{
    Json, Router,
    http::Uri,
    routing::{delete, get},
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::Dataset;

/// Builds the full application router around `state`.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/busstops", transit::collection(Dataset::BusStops))
        .route("/busarrivals", transit::collection(Dataset::BusArrival))
        .route("/busarrivals/{code}", transit::keyed(Dataset::BusArrival))
        .route("/busservices", transit::collection(Dataset::BusServices))
        .route("/busroutes", transit::collection(Dataset::BusRoutes))
        .route(
            "/stationcrowddensityrealtime",
            transit::collection(Dataset::CrowdDensityRealtime),
        )
        .route(
            "/stationcrowddensityrealtime/{line}",
            transit::keyed(Dataset::CrowdDensityRealtime),
        )
        .route(
            "/stationcrowddensityforecast",
            transit::collection(Dataset::CrowdDensityForecast),
        )
        .route(
            "/stationcrowddensityforecast/{line}",
            transit::keyed(Dataset::CrowdDensityForecast),
        )
        .route("/taxiavailability", transit::collection(Dataset::TaxiAvailability))
        .route("/taxistands", transit::collection(Dataset::TaxiStands))
        .route("/trainservicealerts", transit::collection(Dataset::TrainServiceAlerts))
        .route(
            "/estimatedtraveltimes",
            transit::collection(Dataset::EstimatedTravelTimes),
        )
        .route("/trafficimages", transit::collection(Dataset::TrafficImages))
        .route("/trafficincidents", transit::collection(Dataset::TrafficIncidents))
        .route(
            "/geospatialwholeisland",
            transit::collection(Dataset::GeospatialWholeIsland),
        )
        .route(
            "/geospatialwholeisland/{id}",
            transit::keyed(Dataset::GeospatialWholeIsland),
        )
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/UserProfile", delete(users::delete_profile))
        .route("/feedbacks", get(feedback::list_feedback))
        .route("/feedbacks/{id}", delete(feedback::delete_feedback))
        .route(
            "/feedbacks/{id}/replies",
            get(feedback::list_replies).post(feedback::create_reply),
        )
        .route(
            "/feedbacks/{id}/replies/{reply_id}",
            delete(feedback::delete_reply),
        );

    Router::new()
        .route("/", get(root))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", api)
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to the DataMall gateway" }))
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {}", uri.path()))
}
