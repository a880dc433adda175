//! Environment-driven configuration.
//!
//! Everything is read once at startup. Lookups go through a function so tests
//! can feed a map instead of touching the process environment.

use anyhow::{Context, Result, anyhow};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

pub const DEFAULT_DATAMALL_BASE_URL: &str = "https://datamall2.mytransport.sg/ltaodataservice/";
pub const DEFAULT_TRANSIT_TIMEOUT_SECS: u64 = 10;

/// Transit provider settings.
pub struct DatamallConfig {
    /// `None` means every dataset reports itself unavailable.
    pub api_key: Option<String>,
    pub base_url: Url,
    pub timeout: Duration,
}

/// Hosted database and identity service settings.
pub struct SupabaseConfig {
    pub url: Url,
    /// Service key; sent as both `apikey` and the default bearer.
    pub key: String,
}

pub struct Config {
    pub datamall: DatamallConfig,
    pub supabase: SupabaseConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            datamall: DatamallConfig::from_lookup(&lookup)?,
            supabase: SupabaseConfig::from_lookup(&lookup)?,
        })
    }
}

impl DatamallConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = non_empty(lookup("DATAMALL_API_KEY"));
        if api_key.is_none() {
            warn!("DATAMALL_API_KEY not set, transit datasets will report unavailable");
        }

        let base_url = non_empty(lookup("DATAMALL_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_DATAMALL_BASE_URL.to_string());

        let timeout_secs: u64 = try_load(
            &lookup,
            "TRANSIT_TIMEOUT_SECS",
            DEFAULT_TRANSIT_TIMEOUT_SECS,
        )?;

        Ok(Self {
            api_key,
            base_url: directory_url(&base_url).context("DATAMALL_BASE_URL is not a valid URL")?,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl SupabaseConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = non_empty(lookup("SUPABASE_URL"))
            .ok_or_else(|| anyhow!("SUPABASE_URL must be set"))?;
        let key = non_empty(lookup("SUPABASE_KEY"))
            .ok_or_else(|| anyhow!("SUPABASE_KEY must be set"))?;

        Ok(Self {
            url: directory_url(&url).context("SUPABASE_URL is not a valid URL")?,
            key,
        })
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parses `key` or falls back to `default` when it is unset.
fn try_load<T>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match non_empty(lookup(key)) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow!("invalid {key} value '{raw}': {e}")),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

/// Parses `raw` so that relative joins land beneath its path.
fn directory_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
