//! Configuration system for marker synchronization and navigation tuning
//!
//! Configuration is hierarchical: a [`SyncProfile`] preset resolves to a full
//! [`FieldMapConfig`], and individual sections can be overridden afterwards or
//! loaded from a JSON file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::constants::{
    DEFAULT_DISTANCE_FILTER_M, DEFAULT_GEOCODING_ENDPOINT, DEFAULT_GEOCODING_LIMIT,
    DEFAULT_PLACES_PATH, DEFAULT_REFRESH_INTERVAL_MS, DEFAULT_REQUEST_TIMEOUT_MS,
};
use crate::{MapError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum SyncProfile {
    Balanced,
    /// Fewer fetches and coarser position updates
    LowPower,
    /// Frequent fetches and fine-grained route refresh
    Realtime,
    Custom(FieldMapConfig),
}

impl SyncProfile {
    pub fn resolve(&self) -> FieldMapConfig {
        match self {
            Self::Balanced => FieldMapConfig::default(),
            Self::LowPower => FieldMapConfig {
                refresh: RefreshConfig {
                    interval_ms: 30_000,
                    enabled: true,
                },
                navigation: NavigationConfig {
                    distance_filter_m: 50.0,
                },
                ..FieldMapConfig::default()
            },
            Self::Realtime => FieldMapConfig {
                refresh: RefreshConfig {
                    interval_ms: 2_000,
                    enabled: true,
                },
                navigation: NavigationConfig {
                    distance_filter_m: 5.0,
                },
                ..FieldMapConfig::default()
            },
            Self::Custom(config) => config.clone(),
        }
    }
}

impl Default for SyncProfile {
    fn default() -> Self {
        Self::Balanced
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FieldMapConfig {
    pub api: ApiConfig,
    pub live: LiveChannelConfig,
    pub refresh: RefreshConfig,
    pub navigation: NavigationConfig,
    pub geocoding: GeocodingConfig,
}

impl FieldMapConfig {
    /// Loads a configuration from a JSON file. Missing sections take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: FieldMapConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(MapError::Config("api.base_url must not be empty".into()));
        }
        if self.api.request_timeout_ms == 0 {
            return Err(MapError::Config(
                "api.request_timeout_ms must be positive".into(),
            ));
        }
        if self.refresh.enabled && self.refresh.interval_ms == 0 {
            return Err(MapError::Config(
                "refresh.interval_ms must be positive".into(),
            ));
        }
        if !(self.navigation.distance_filter_m.is_finite()
            && self.navigation.distance_filter_m >= 0.0)
        {
            return Err(MapError::Config(format!(
                "navigation.distance_filter_m must be a non-negative number, got {}",
                self.navigation.distance_filter_m
            )));
        }
        if let Some(endpoint) = &self.live.endpoint {
            if endpoint.trim().is_empty() {
                return Err(MapError::Config("live.endpoint must not be empty".into()));
            }
        }
        if self.geocoding.endpoint.trim().is_empty() {
            return Err(MapError::Config(
                "geocoding.endpoint must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Full URL of the bulk places endpoint
    pub fn places_url(&self) -> String {
        format!(
            "{}{}",
            self.api.base_url.trim_end_matches('/'),
            self.api.places_path
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub places_path: String,
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            places_path: DEFAULT_PLACES_PATH.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LiveChannelConfig {
    /// Push endpoint. `None` disables the live channel.
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_ms: u64,
    pub enabled: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            enabled: true,
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Minimum movement in meters before a new route is published
    pub distance_filter_m: f64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            distance_filter_m: DEFAULT_DISTANCE_FILTER_M,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    pub endpoint: String,
    pub limit: u32,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_GEOCODING_ENDPOINT.to_string(),
            limit: DEFAULT_GEOCODING_LIMIT,
        }
    }
}
