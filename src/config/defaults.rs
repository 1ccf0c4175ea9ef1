//! Default configuration values
//!
//! Named constants for all tunable parameters

/// Default branch search radius in kilometers
pub const DEFAULT_RADIUS_KM: f64 = 3.0;

/// Default city used when IP detection fails
pub const DEFAULT_CITY: &str = "서울특별시";

/// Default region used when IP detection fails
pub const DEFAULT_REGION: &str = "서울특별시";

/// Default district used when IP detection fails
pub const DEFAULT_DISTRICT: &str = "강남구";

/// Upper bound on waiting for a GPS fix, in seconds
pub const DEFAULT_GPS_TIMEOUT_SECS: u64 = 10;

/// Oldest cached GPS fix still accepted, in seconds
pub const DEFAULT_GPS_MAXIMUM_AGE_SECS: u64 = 60;

/// Whether to request a high-accuracy GPS fix
pub const DEFAULT_GPS_HIGH_ACCURACY: bool = true;

/// Language hint passed to the reverse geocoder
pub const DEFAULT_LANGUAGE: &str = "ko";

/// Timeout for IP lookup and reverse geocoding requests, in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 8;

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 7979;

/// Sessions idle longer than this are dropped, in seconds
pub const DEFAULT_SESSION_TTL_SECS: u64 = 1800;

/// Upper bound on sessions held by the server
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Default output format
pub const DEFAULT_FORMAT: &str = "text";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Branch directory file name (under the XDG data directory)
pub const DIRECTORY_FILE_NAME: &str = "directory.json";

/// Application directory name (for XDG paths)
pub const APP_DIR_NAME: &str = "branch-locator";
