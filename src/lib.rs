//! # fieldmap
//!
//! Marker synchronization and navigation core for field-data-collection maps.
//!
//! The crate keeps a set of geolocated observations in sync with a remote
//! API and a live push channel, drives an opaque map rendering surface through
//! a closed set of typed commands, and tracks navigation towards a selected or
//! nearest observation as the device moves.

pub mod api;
pub mod core;
pub mod live;
pub mod markers;
pub mod navigation;
pub mod prelude;
pub mod render;
pub mod runtime;
pub mod session;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::{FieldMapConfig, SyncProfile},
    geo::{distance_km, LatLng},
};

pub use markers::{
    marker::{Marker, RawPlace},
    reconcile::{reconcile, MarkerDiff},
    store::MarkerStore,
};

pub use render::{
    command::{RenderCommand, SurfaceEvent},
    surface::{ChannelSurface, RecordingSurface, RenderSurface},
};

pub use live::{
    channel::{ChannelNotice, DrainReport, LiveUpdateChannel},
    event::{LiveUpdate, PlaceAction, PlaceEnvelope},
    source::PushSource,
};

pub use navigation::{
    nearest::nearest_marker,
    provider::PositionProvider,
    tracker::{NavigationState, NavigationTracker, RouteRequest},
};

pub use api::{geocoding::Geocoder, places::PlaceSource};

pub use session::MapSession;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Current position unavailable: {0}")]
    PositionUnavailable(String),

    #[error("No markers available")]
    EmptyStore,

    #[error("No marker selected")]
    NoSelection,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MapError {
    /// Whether the error came from the network or the transport and may clear up on its own
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Network(_) | Self::Channel(_))
    }

    /// Whether the error rejects an operation before any state was touched
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::PositionUnavailable(_) | Self::EmptyStore | Self::NoSelection
        )
    }
}

/// Error type alias for convenience
pub type Error = MapError;

/// Installs the `env_logger` backend for the `log` facade, defaulting to `info`.
/// Safe to call more than once.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
