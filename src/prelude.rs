//! Prelude module for common fieldmap types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use fieldmap::prelude::*;`

pub use crate::core::{
    config::{
        ApiConfig, FieldMapConfig, GeocodingConfig, LiveChannelConfig, NavigationConfig,
        RefreshConfig, SyncProfile,
    },
    geo::{distance_km, LatLng},
};

pub use crate::markers::{
    marker::{Marker, RawPlace},
    reconcile::{reconcile, MarkerDiff},
    store::MarkerStore,
};

pub use crate::render::{
    command::{RenderCommand, SurfaceEvent},
    surface::{ChannelSurface, LogSurface, RecordingSurface, RenderSurface},
};

pub use crate::live::{
    channel::{ChannelNotice, DrainReport, LiveUpdateChannel},
    event::{LiveUpdate, PlaceAction, PlaceEnvelope},
    source::{PushSource, PushStream},
};

pub use crate::navigation::{
    nearest::nearest_marker,
    provider::{PositionProvider, PositionStream},
    tracker::{NavigationState, NavigationTracker, RouteRequest},
};

pub use crate::api::{
    geocoding::{search_address, Geocoder, NominatimGeocoder},
    places::{HttpPlaceSource, PlaceSource},
    push::HttpLinePushSource,
};

pub use crate::runtime::{spawn, AsyncHandle, AsyncSpawner};

pub use crate::session::MapSession;

pub use crate::{Error as MapError, Result};

pub use std::{
    pin::Pin,
    sync::Arc,
    time::{Duration, Instant},
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};

pub use futures::Future;
