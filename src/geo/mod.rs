//! Location detection
//!
//! Coarse IP geolocation, device GPS fixes and reverse geocoding, plus the
//! `LocationGuess` they all feed.

pub mod gps;
pub mod ip_location;
pub mod nominatim;

use crate::config::Config;
use crate::constants::locale::{
    ADDRESS_NOT_FOUND, CONNECTING_FROM_SUFFIX, GUEST_FALLBACK, RESOLVING_ADDRESS,
};
use crate::coord::Coordinates;
use crate::error::Result;
use serde::{Deserialize, Serialize};

pub use nominatim::{AddressDetails, ReverseGeocodeResponse};

/// Where a location guess came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Ip,
    Gps,
    Default,
}

impl std::fmt::Display for LocationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ip => write!(f, "ip"),
            Self::Gps => write!(f, "gps"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Region assumed when nothing better is known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionDefaults {
    pub city: String,
    pub region: String,
    pub district: String,
}

impl RegionDefaults {
    pub fn from_config(config: &Config) -> Self {
        Self {
            city: config.location.default_city.clone(),
            region: config.location.default_region.clone(),
            district: config.location.default_district.clone(),
        }
    }
}

impl Default for RegionDefaults {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Best-effort guess of where the guest is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationGuess {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub coords: Option<Coordinates>,

    /// Normalized address, once a GPS fix has been reverse geocoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    pub source: LocationSource,
}

impl LocationGuess {
    /// The hard-coded fallback guess
    pub fn fallback(defaults: &RegionDefaults) -> Self {
        Self {
            city: Some(defaults.city.clone()),
            region: Some(defaults.region.clone()),
            district: Some(defaults.district.clone()),
            country: None,
            coords: None,
            address: None,
            source: LocationSource::Default,
        }
    }

    /// Usable downstream when either a named field or a coordinate is known
    pub fn is_usable(&self) -> bool {
        self.coords.is_some()
            || self.city.is_some()
            || self.region.is_some()
            || self.district.is_some()
    }

    /// Layer a GPS fix on top of this guess
    ///
    /// Named fields are kept; any previous address belonged to the old
    /// coordinate and is cleared.
    pub fn with_gps_fix(mut self, coords: Coordinates) -> Self {
        self.coords = Some(coords);
        self.address = None;
        self.source = LocationSource::Gps;
        self
    }

    /// Attach a normalized address
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

/// Text shown to the guest describing where they are connecting from
///
/// Precedence: resolved address, then a pending-address placeholder when a
/// coordinate is known, then the named region, then a generic fallback.
pub fn display_text(guess: Option<&LocationGuess>) -> String {
    let Some(guess) = guess else {
        return GUEST_FALLBACK.to_string();
    };

    if let Some(address) = guess.address.as_deref() {
        if !address.is_empty() && address != ADDRESS_NOT_FOUND {
            return format!("{}{}", address, CONNECTING_FROM_SUFFIX);
        }
    }

    if guess.coords.is_some() {
        return RESOLVING_ADDRESS.to_string();
    }

    match (guess.city.as_deref(), guess.district.as_deref()) {
        (Some(city), Some(district)) => format!("{} {}{}", city, district, CONNECTING_FROM_SUFFIX),
        (Some(city), None) => format!("{}{}", city, CONNECTING_FROM_SUFFIX),
        _ => GUEST_FALLBACK.to_string(),
    }
}

/// Trait for reverse geocoding backends
pub trait GeoBackend: Send + Sync {
    /// Reverse geocode coordinates into the provider's raw response
    fn reverse_geocode(
        &self,
        coords: Coordinates,
    ) -> impl std::future::Future<Output = Result<ReverseGeocodeResponse>> + Send;
}
