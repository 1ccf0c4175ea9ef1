//! Configuration management
//!
//! Loads and saves configuration from XDG-compliant paths.
//! Config location: ~/.config/branch-locator/config.toml

pub mod defaults;

use crate::error::{Error, Result};
use crate::geo::gps::GpsOptions;
use defaults::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Branch search settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Location detection settings
    #[serde(default)]
    pub location: LocationConfig,

    /// External service endpoints
    #[serde(default)]
    pub services: ServicesConfig,

    /// Branch directory settings
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Branch search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Radius around the guest within which branches are listed, in km
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
}

/// Location detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// City assumed when IP detection fails
    #[serde(default = "default_city")]
    pub default_city: String,

    /// Region assumed when IP detection fails
    #[serde(default = "default_region")]
    pub default_region: String,

    /// District assumed when IP detection fails
    #[serde(default = "default_district")]
    pub default_district: String,

    /// Seconds to wait for a GPS fix
    #[serde(default = "default_gps_timeout")]
    pub gps_timeout_secs: u64,

    /// Maximum age of a cached GPS fix, in seconds
    #[serde(default = "default_gps_maximum_age")]
    pub gps_maximum_age_secs: u64,

    /// Request a high-accuracy fix
    #[serde(default = "default_gps_high_accuracy")]
    pub gps_high_accuracy: bool,
}

/// External service endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// IP geolocation endpoint
    #[serde(default = "default_ip_lookup_url")]
    pub ip_lookup_url: String,

    /// Reverse geocoding base URL (Nominatim-compatible)
    #[serde(default = "default_reverse_geocode_url")]
    pub reverse_geocode_url: String,

    /// Language hint for reverse geocoding
    #[serde(default = "default_language")]
    pub language: String,

    /// Timeout applied to every external lookup, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Branch directory settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Path to the directory JSON file; empty means the XDG data default
    #[serde(default)]
    pub path: String,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Idle time after which a session is dropped
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Most sessions kept at once; the least recently used go first
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format for CLI commands
    #[serde(default = "default_format")]
    pub format: String,
}

// Default value functions for serde
fn default_radius_km() -> f64 {
    DEFAULT_RADIUS_KM
}
fn default_city() -> String {
    DEFAULT_CITY.to_string()
}
fn default_region() -> String {
    DEFAULT_REGION.to_string()
}
fn default_district() -> String {
    DEFAULT_DISTRICT.to_string()
}
fn default_gps_timeout() -> u64 {
    DEFAULT_GPS_TIMEOUT_SECS
}
fn default_gps_maximum_age() -> u64 {
    DEFAULT_GPS_MAXIMUM_AGE_SECS
}
fn default_gps_high_accuracy() -> bool {
    DEFAULT_GPS_HIGH_ACCURACY
}
fn default_ip_lookup_url() -> String {
    crate::constants::api::IP_API_URL.to_string()
}
fn default_reverse_geocode_url() -> String {
    crate::constants::api::NOMINATIM_URL.to_string()
}
fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}
fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_session_ttl() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}
fn default_max_sessions() -> usize {
    DEFAULT_MAX_SESSIONS
}
fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            radius_km: default_radius_km(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            default_city: default_city(),
            default_region: default_region(),
            default_district: default_district(),
            gps_timeout_secs: default_gps_timeout(),
            gps_maximum_age_secs: default_gps_maximum_age(),
            gps_high_accuracy: default_gps_high_accuracy(),
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            ip_lookup_url: default_ip_lookup_url(),
            reverse_geocode_url: default_reverse_geocode_url(),
            language: default_language(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            session_ttl_secs: default_session_ttl(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default path
    ///
    /// Creates default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&path, content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Get a configuration value by key path
    ///
    /// Key format: "section.key". Returns None for unknown keys.
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["search", "radius_km"] => Some(self.search.radius_km.to_string()),

            ["location", "default_city"] => Some(self.location.default_city.clone()),
            ["location", "default_region"] => Some(self.location.default_region.clone()),
            ["location", "default_district"] => Some(self.location.default_district.clone()),
            ["location", "gps_timeout_secs"] => Some(self.location.gps_timeout_secs.to_string()),
            ["location", "gps_maximum_age_secs"] => {
                Some(self.location.gps_maximum_age_secs.to_string())
            }
            ["location", "gps_high_accuracy"] => {
                Some(self.location.gps_high_accuracy.to_string())
            }

            ["services", "ip_lookup_url"] => Some(self.services.ip_lookup_url.clone()),
            ["services", "reverse_geocode_url"] => {
                Some(self.services.reverse_geocode_url.clone())
            }
            ["services", "language"] => Some(self.services.language.clone()),
            ["services", "request_timeout_secs"] => {
                Some(self.services.request_timeout_secs.to_string())
            }

            ["directory", "path"] => Some(self.directory.path.clone()),

            ["server", "host"] => Some(self.server.host.clone()),
            ["server", "port"] => Some(self.server.port.to_string()),
            ["server", "session_ttl_secs"] => Some(self.server.session_ttl_secs.to_string()),
            ["server", "max_sessions"] => Some(self.server.max_sessions.to_string()),

            ["output", "format"] => Some(self.output.format.clone()),

            _ => None,
        }
    }

    /// Set a configuration value by key path
    ///
    /// Returns error if key is invalid or value type is wrong
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["search", "radius_km"] => {
                let radius: f64 = value
                    .parse()
                    .map_err(|_| Error::Config(format!("Invalid radius value: {}", value)))?;
                if radius.is_nan() || radius <= 0.0 {
                    return Err(Error::Config(format!("Radius must be positive: {}", value)));
                }
                self.search.radius_km = radius;
            }

            ["location", "default_city"] => self.location.default_city = value.to_string(),
            ["location", "default_region"] => self.location.default_region = value.to_string(),
            ["location", "default_district"] => {
                self.location.default_district = value.to_string();
            }
            ["location", "gps_timeout_secs"] => {
                self.location.gps_timeout_secs = parse_secs(value)?;
            }
            ["location", "gps_maximum_age_secs"] => {
                self.location.gps_maximum_age_secs = parse_secs(value)?;
            }
            ["location", "gps_high_accuracy"] => {
                self.location.gps_high_accuracy = value
                    .parse()
                    .map_err(|_| Error::Config(format!("Invalid boolean value: {}", value)))?;
            }

            ["services", "ip_lookup_url"] => self.services.ip_lookup_url = value.to_string(),
            ["services", "reverse_geocode_url"] => {
                self.services.reverse_geocode_url = value.to_string();
            }
            ["services", "language"] => self.services.language = value.to_string(),
            ["services", "request_timeout_secs"] => {
                self.services.request_timeout_secs = parse_secs(value)?;
            }

            ["directory", "path"] => self.directory.path = value.to_string(),

            ["server", "host"] => self.server.host = value.to_string(),
            ["server", "port"] => {
                self.server.port = value
                    .parse()
                    .map_err(|_| Error::Config(format!("Invalid port value: {}", value)))?;
            }
            ["server", "session_ttl_secs"] => {
                self.server.session_ttl_secs = parse_secs(value)?;
            }
            ["server", "max_sessions"] => {
                let max: usize = value
                    .parse()
                    .map_err(|_| Error::Config(format!("Invalid session count: {}", value)))?;
                if max == 0 {
                    return Err(Error::Config("max_sessions must be at least 1".to_string()));
                }
                self.server.max_sessions = max;
            }

            ["output", "format"] => self.output.format = value.to_string(),

            _ => {
                return Err(Error::Config(format!("Unknown config key: {}", key)));
            }
        }

        Ok(())
    }

    /// List all available config keys
    pub fn available_keys() -> Vec<&'static str> {
        vec![
            "search.radius_km",
            "location.default_city",
            "location.default_region",
            "location.default_district",
            "location.gps_timeout_secs",
            "location.gps_maximum_age_secs",
            "location.gps_high_accuracy",
            "services.ip_lookup_url",
            "services.reverse_geocode_url",
            "services.language",
            "services.request_timeout_secs",
            "directory.path",
            "server.host",
            "server.port",
            "server.session_ttl_secs",
            "server.max_sessions",
            "output.format",
        ]
    }

    /// Resolve the branch directory file path
    pub fn directory_path(&self) -> Result<PathBuf> {
        if !self.directory.path.is_empty() {
            return Ok(PathBuf::from(&self.directory.path));
        }
        dirs::data_dir()
            .map(|p| p.join(APP_DIR_NAME).join(DIRECTORY_FILE_NAME))
            .ok_or_else(|| Error::Config("Could not determine data directory".to_string()))
    }

    /// GPS acquisition options derived from the location settings
    pub fn gps_options(&self) -> GpsOptions {
        GpsOptions {
            enable_high_accuracy: self.location.gps_high_accuracy,
            timeout: Duration::from_secs(self.location.gps_timeout_secs),
            maximum_age: Duration::from_secs(self.location.gps_maximum_age_secs),
        }
    }

    /// Timeout for external lookups
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.services.request_timeout_secs)
    }

    /// Idle time after which a server session is dropped
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.server.session_ttl_secs)
    }

    /// Get server address as "host:port"
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_secs(value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("Invalid seconds value: {}", value)))
}
