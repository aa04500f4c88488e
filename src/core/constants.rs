//! Core constants shared across the synchronization and navigation code.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Mean Earth radius used by the haversine distance, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Minimum movement before the navigation tracker republishes a route, in meters.
pub const DEFAULT_DISTANCE_FILTER_M: f64 = 10.0;

/// How often the full marker set is refetched.
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 5_000;

/// Request timeout handed to the HTTP client. The core itself never times out.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Largest push frame accepted before a newline, in bytes. Longer frames are dropped.
pub const MAX_PUSH_FRAME_BYTES: usize = 1024 * 1024;

/// Default path of the bulk places endpoint, relative to the API base URL.
pub const DEFAULT_PLACES_PATH: &str = "/places/";

/// Default public geocoding endpoint.
pub const DEFAULT_GEOCODING_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";

/// Number of candidates requested from the geocoder.
pub const DEFAULT_GEOCODING_LIMIT: u32 = 5;

/// User agent sent with every outbound request.
pub const USER_AGENT: &str = "fieldmap/0.1.0";
