use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::{error, info, warn};
use url::Url;

use crate::config::DatamallConfig;
use crate::fetch::{ApiKey, BasicClient, HttpClient, json_request, send_json};
use crate::services::transit::{Query, TransitSource, Upstream};

const ACCOUNT_KEY_HEADER: &str = "AccountKey";

/// Client for the LTA DataMall open-data API.
///
/// Holds no transport at all when no account key is configured, in which case
/// every pull reports [`Upstream::Unavailable`] without going near the network.
pub struct DatamallClient<C> {
    http: Option<C>,
    base_url: Url,
}

impl DatamallClient<ApiKey<BasicClient>> {
    /// Builds the production client: timeout-bound transport with the
    /// `AccountKey` header injected on every request.
    pub fn from_config(config: &DatamallConfig) -> anyhow::Result<Self> {
        let http = match &config.api_key {
            Some(key) => Some(ApiKey::new(
                BasicClient::with_timeout(config.timeout)?,
                ACCOUNT_KEY_HEADER,
                key,
            )?),
            None => None,
        };

        Ok(Self::new(http, config.base_url.clone()))
    }
}

impl<C: HttpClient> DatamallClient<C> {
    pub fn new(http: Option<C>, base_url: Url) -> Self {
        Self { http, base_url }
    }

    fn url(&self, query: &Query) -> Result<Url, url::ParseError> {
        let mut url = self.base_url.join(query.dataset().path())?;
        if let Some((name, value)) = query.param() {
            url.query_pairs_mut().append_pair(name, value);
        }
        Ok(url)
    }
}

#[async_trait]
impl<C: HttpClient> TransitSource for DatamallClient<C> {
    #[tracing::instrument(skip(self), fields(dataset = %query.dataset()))]
    async fn fetch(&self, query: &Query) -> Upstream {
        let Some(http) = &self.http else {
            warn!("No DataMall API key configured");
            return Upstream::Unavailable("DataMall API key is not configured".to_string());
        };

        let url = match self.url(query) {
            Ok(url) => url,
            Err(e) => {
                error!(error = %e, "Could not build DataMall URL");
                return Upstream::Unavailable(e.to_string());
            }
        };

        match send_json(http, json_request(Method::GET, url)).await {
            Ok(body) => {
                let records = unwrap_envelope(body);
                if records.is_empty() {
                    warn!("No records returned, the API key may not be subscribed to this dataset");
                } else {
                    info!(count = records.len(), "Dataset retrieved");
                }
                Upstream::Available(records)
            }
            Err(e) => {
                error!(error = %e, "DataMall request failed");
                Upstream::Unavailable(e.to_string())
            }
        }
    }
}

/// Takes the records out of the provider's `{"value": ...}` envelope.
///
/// Most datasets carry an array. A lone object (train service alerts) becomes
/// a one-record sequence; anything absent or null is empty.
pub fn unwrap_envelope(body: Value) -> Vec<Value> {
    let Value::Object(mut map) = body else {
        return Vec::new();
    };

    match map.remove("value") {
        Some(Value::Array(records)) => records,
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other],
    }
}
