//! Trait and types for pulling datasets from the transit open-data provider.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Every dataset the gateway forwards.
///
/// Each variant knows its path relative to the provider's base URL and, for
/// the keyed datasets, the name of the query parameter carrying the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Dataset {
    BusStops,
    BusArrival,
    BusServices,
    BusRoutes,
    CrowdDensityRealtime,
    CrowdDensityForecast,
    TaxiAvailability,
    TaxiStands,
    TrainServiceAlerts,
    EstimatedTravelTimes,
    TrafficImages,
    TrafficIncidents,
    GeospatialWholeIsland,
}

impl Dataset {
    pub const ALL: [Dataset; 13] = [
        Dataset::BusStops,
        Dataset::BusArrival,
        Dataset::BusServices,
        Dataset::BusRoutes,
        Dataset::CrowdDensityRealtime,
        Dataset::CrowdDensityForecast,
        Dataset::TaxiAvailability,
        Dataset::TaxiStands,
        Dataset::TrainServiceAlerts,
        Dataset::EstimatedTravelTimes,
        Dataset::TrafficImages,
        Dataset::TrafficIncidents,
        Dataset::GeospatialWholeIsland,
    ];

    /// Upstream path, relative to the provider base URL.
    pub fn path(self) -> &'static str {
        match self {
            Dataset::BusStops => "BusStops",
            Dataset::BusArrival => "v3/BusArrival",
            Dataset::BusServices => "BusServices",
            Dataset::BusRoutes => "BusRoutes",
            Dataset::CrowdDensityRealtime => "PCDRealTime",
            Dataset::CrowdDensityForecast => "PCDForecast",
            Dataset::TaxiAvailability => "Taxi-Availability",
            Dataset::TaxiStands => "TaxiStands",
            Dataset::TrainServiceAlerts => "TrainServiceAlerts",
            Dataset::EstimatedTravelTimes => "EstTravelTimes",
            Dataset::TrafficImages => "Traffic-Imagesv2",
            Dataset::TrafficIncidents => "TrafficIncidents",
            Dataset::GeospatialWholeIsland => "GeospatialWholeIsland",
        }
    }

    /// Query parameter that carries the required key, for keyed datasets.
    pub fn key_param(self) -> Option<&'static str> {
        match self {
            Dataset::BusArrival => Some("BusStopCode"),
            Dataset::CrowdDensityRealtime | Dataset::CrowdDensityForecast => Some("TrainLine"),
            Dataset::GeospatialWholeIsland => Some("ID"),
            _ => None,
        }
    }

    /// Human name of the key, used in validation messages.
    fn key_label(self) -> &'static str {
        match self {
            Dataset::BusArrival => "bus stop code",
            Dataset::CrowdDensityRealtime | Dataset::CrowdDensityForecast => "train line",
            Dataset::GeospatialWholeIsland => "geospatial id",
            _ => "key",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("{0} is required")]
    MissingKey(&'static str),
}

/// A validated request for one dataset.
///
/// Construction is the only place a keyed dataset's key is checked, so a
/// `Query` that exists is always safe to put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    dataset: Dataset,
    key: Option<String>,
}

impl Query {
    /// Validates `key` against what `dataset` needs.
    ///
    /// Keyed datasets reject a missing or blank key. Unkeyed datasets ignore
    /// whatever is passed.
    pub fn new(dataset: Dataset, key: Option<&str>) -> Result<Self, QueryError> {
        if dataset.key_param().is_none() {
            return Ok(Self { dataset, key: None });
        }

        match key.map(str::trim) {
            Some(k) if !k.is_empty() => Ok(Self {
                dataset,
                key: Some(k.to_string()),
            }),
            _ => Err(QueryError::MissingKey(dataset.key_label())),
        }
    }

    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    /// `(parameter name, value)` to append to the upstream URL, if any.
    pub fn param(&self) -> Option<(&'static str, &str)> {
        Some((self.dataset.key_param()?, self.key.as_deref()?))
    }
}

/// Outcome of one upstream pull.
///
/// The provider being down is not an error for the caller, but it is also not
/// the same thing as an empty dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum Upstream {
    Available(Vec<Value>),
    Unavailable(String),
}

impl Upstream {
    pub fn is_available(&self) -> bool {
        matches!(self, Upstream::Available(_))
    }

    /// Records to hand to the client; unavailable renders as empty.
    pub fn into_records(self) -> Vec<Value> {
        match self {
            Upstream::Available(records) => records,
            Upstream::Unavailable(_) => Vec::new(),
        }
    }
}

/// Abstraction over the transit data provider.
#[async_trait::async_trait]
pub trait TransitSource: Send + Sync {
    /// Pulls one dataset. Never fails: transport problems come back as
    /// [`Upstream::Unavailable`].
    async fn fetch(&self, query: &Query) -> Upstream;
}
