//! Nominatim reverse geocoding backend (OpenStreetMap)
//!
//! Uses the free Nominatim API. Its usage policy requires a User-Agent and
//! at most one request per second.

use crate::config::Config;
use crate::constants::api::USER_AGENT;
use crate::coord::Coordinates;
use crate::error::{Error, Result};
use crate::geo::GeoBackend;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Nominatim reverse geocoding backend
#[derive(Debug, Clone)]
pub struct NominatimBackend {
    client: reqwest::Client,
    base_url: String,
    language: String,
}

/// Reverse geocoding response
///
/// Every field is optional: Nominatim answers coordinates it cannot place
/// with `{"error": "Unable to geocode"}` and a 200 status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReverseGeocodeResponse {
    pub display_name: Option<String>,
    pub address: Option<AddressDetails>,
}

/// Structured address breakdown (`addressdetails=1`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressDetails {
    pub state: Option<String>,
    pub province: Option<String>,
    pub district: Option<String>,
    pub suburb: Option<String>,
    pub neighbourhood: Option<String>,
    pub quarter: Option<String>,
}

impl NominatimBackend {
    /// Create a backend for `base_url` answering in `language`
    pub fn new(
        base_url: impl Into<String>,
        language: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            language: language.into(),
        })
    }

    /// Create a backend from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.services.reverse_geocode_url.clone(),
            config.services.language.clone(),
            config.request_timeout(),
        )
    }

    fn reverse_url(&self, coords: Coordinates) -> String {
        format!(
            "{}/reverse?format=json&lat={}&lon={}&zoom=18&accept-language={}&addressdetails=1",
            self.base_url,
            coords.lat,
            coords.lng,
            urlencoding::encode(&self.language)
        )
    }
}

impl GeoBackend for NominatimBackend {
    async fn reverse_geocode(&self, coords: Coordinates) -> Result<ReverseGeocodeResponse> {
        let response = self
            .client
            .get(self.reverse_url(coords))
            .send()
            .await
            .map_err(|e| Error::Geo(format!("Nominatim request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Geo(format!(
                "Nominatim returned status: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Geo(format!("Failed to parse Nominatim response: {}", e)))
    }
}
