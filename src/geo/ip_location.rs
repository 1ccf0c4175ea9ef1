//! IP-based geolocation
//!
//! Uses ipapi.co for a coarse guess of where the guest is connecting from.
//! Every failure is soft: the caller gets `None` and falls back.
//!
//! The server looks up the guest's address explicitly; without one (or with a
//! private one) ipapi.co sees the process's own public address, which is what
//! the CLI wants.

use crate::config::Config;
use crate::coord::Coordinates;
use crate::error::{Error, Result};
use crate::geo::{LocationGuess, LocationSource, RegionDefaults};
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, warn};

/// IP location service
#[derive(Debug, Clone)]
pub struct IpLocator {
    client: reqwest::Client,
    url: String,
    defaults: RegionDefaults,
}

/// ipapi.co response
#[derive(Debug, Deserialize)]
struct IpApiResponse {
    #[serde(default)]
    error: bool,
    reason: Option<String>,
    city: Option<String>,
    region: Option<String>,
    region_code: Option<String>,
    country: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl IpLocator {
    /// Create an IP locator for `url` with a bounded request timeout
    pub fn new(url: impl Into<String>, timeout: Duration, defaults: RegionDefaults) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: url.into(),
            defaults,
        })
    }

    /// Create an IP locator from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.services.ip_lookup_url.clone(),
            config.request_timeout(),
            RegionDefaults::from_config(config),
        )
    }

    /// Guess the current location from this process's public IP address
    ///
    /// Returns `None` on any network or parse failure.
    pub async fn locate(&self) -> Option<LocationGuess> {
        self.locate_ip(None).await
    }

    /// Guess the location of `ip`
    ///
    /// Non-public addresses cannot be geolocated and are looked up as if no
    /// address had been given.
    pub async fn locate_ip(&self, ip: Option<IpAddr>) -> Option<LocationGuess> {
        let url = self.lookup_url(ip);
        match self.fetch_location(&url).await {
            Ok(guess) => {
                debug!(?ip, city = ?guess.city, coords = ?guess.coords, "IP location detected");
                Some(guess)
            }
            Err(e) => {
                warn!("IP location lookup failed: {}", e);
                None
            }
        }
    }

    /// `{base}/{ip}/json/` for a public address, the configured URL otherwise
    fn lookup_url(&self, ip: Option<IpAddr>) -> String {
        match ip.filter(is_public) {
            Some(ip) => {
                let base = self.url.trim_end_matches('/').trim_end_matches("/json");
                format!("{}/{}/json/", base, ip)
            }
            None => self.url.clone(),
        }
    }

    /// Fetch location from ipapi.co
    async fn fetch_location(&self, url: &str) -> Result<LocationGuess> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Geo(format!("IP location request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Geo(format!(
                "IP location API returned status: {}",
                response.status()
            )));
        }

        let data: IpApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Geo(format!("Failed to parse IP location response: {}", e)))?;

        if data.error {
            return Err(Error::Geo(format!(
                "IP location lookup failed: {}",
                data.reason.as_deref().unwrap_or("unknown reason")
            )));
        }

        Ok(self.to_guess(data))
    }

    /// Blank fields take the configured defaults, unless the response named
    /// nothing at all; that guess is left empty so callers can reject it.
    fn to_guess(&self, data: IpApiResponse) -> LocationGuess {
        let coords = Coordinates::from_parts(data.latitude, data.longitude);
        let blank = |value: &Option<String>| value.as_deref().map_or(true, |v| v.trim().is_empty());

        if coords.is_none() && blank(&data.city) && blank(&data.region) && blank(&data.region_code) {
            return LocationGuess {
                city: None,
                region: None,
                district: None,
                country: data.country,
                coords: None,
                address: None,
                source: LocationSource::Ip,
            };
        }

        let or_default = |value: Option<String>, fallback: &str| {
            Some(
                value
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| fallback.to_string()),
            )
        };

        LocationGuess {
            city: or_default(data.city, self.defaults.city.as_str()),
            region: or_default(data.region, self.defaults.region.as_str()),
            district: or_default(data.region_code, self.defaults.district.as_str()),
            country: data.country,
            coords,
            address: None,
            source: LocationSource::Ip,
        }
    }
}

fn is_public(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast())
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            // fc00::/7 unique local, fe80::/10 link local
            !(v6.is_loopback()
                || v6.is_unspecified()
                || first & 0xfe00 == 0xfc00
                || first & 0xffc0 == 0xfe80)
        }
    }
}
