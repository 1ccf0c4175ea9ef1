//! Session-scoped location resolution
//!
//! A [`SessionContext`] holds what one client session currently knows (its
//! location, the last GPS failure, the last sync time). A [`Locator`] runs
//! the detect -> normalize -> match pipeline and commits results to the
//! session, discarding results that a newer request has superseded.

use crate::address::{normalize, NormalizedAddress};
use crate::branch::{find_in_region, find_nearby, summarize, BranchMatch, InventorySummary, RegionFilter};
use crate::config::Config;
use crate::coord::Coordinates;
use crate::directory::BranchDirectory;
use crate::error::{Error, Result};
use crate::geo::gps::{detect_by_gps, GpsError, GpsOptions, PositionSource};
use crate::geo::ip_location::IpLocator;
use crate::geo::nominatim::NominatimBackend;
use crate::geo::{display_text, LocationGuess, LocationSource, RegionDefaults};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Sequence number handed out when a resolution starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

/// Snapshot of what a session knows
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionState {
    pub location: Option<LocationGuess>,
    pub gps_error: Option<GpsError>,
    pub last_sync: Option<DateTime<Utc>>,
    /// Sequence of the report that produced this state
    pub sequence: u64,
}

/// State of one client session
#[derive(Debug)]
pub struct SessionContext {
    id: Uuid,
    issued: AtomicU64,
    state: RwLock<SessionState>,
    opened: Instant,
    /// Milliseconds after `opened` of the last request
    last_active_ms: AtomicU64,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            issued: AtomicU64::new(0),
            state: RwLock::new(SessionState::default()),
            opened: Instant::now(),
            last_active_ms: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Record activity on this session
    pub fn touch(&self) {
        let elapsed = u64::try_from(self.opened.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_active_ms.fetch_max(elapsed, Ordering::Relaxed);
    }

    /// Time since the session was last used
    pub fn idle_for(&self) -> Duration {
        let last_active = Duration::from_millis(self.last_active_ms.load(Ordering::Relaxed));
        self.opened.elapsed().saturating_sub(last_active)
    }

    /// Start a new request; earlier tickets become stale
    pub fn begin(&self) -> Ticket {
        self.touch();
        Ticket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether no newer request has started since `ticket` was issued
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket.0
    }

    /// Store a finished report unless a newer request has started
    ///
    /// Returns whether the report was committed.
    pub async fn commit(&self, ticket: Ticket, report: &LocationReport) -> bool {
        let mut state = self.state.write().await;

        // Checked under the write lock so two finishing requests cannot interleave
        if !self.is_current(ticket) || ticket.0 <= state.sequence {
            debug!(
                session = %self.id,
                ticket = ticket.0,
                "discarding superseded location result"
            );
            return false;
        }

        state.location = Some(report.location.clone());
        state.gps_error = report.gps_error;
        state.last_sync = Some(report.synced_at);
        state.sequence = ticket.0;
        true
    }

    /// Current location, if any request has completed
    pub async fn location(&self) -> Option<LocationGuess> {
        self.state.read().await.location.clone()
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Text describing where the session is connecting from
    pub async fn display_text(&self) -> String {
        display_text(self.state.read().await.location.as_ref())
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of location detection
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub guess: LocationGuess,
    /// Reported but non-fatal
    pub gps_error: Option<GpsError>,
}

/// Branches around a coordinate with their inventory summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyResult {
    pub center: Coordinates,
    pub radius_km: f64,
    pub branches: Vec<BranchMatch>,
    pub summary: InventorySummary,
}

/// Branches in a named region with their inventory summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionResult {
    pub region: RegionFilter,
    pub branches: Vec<BranchMatch>,
    pub summary: InventorySummary,
}

/// Everything the UI needs after a location request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationReport {
    pub session_id: Uuid,
    pub sequence: u64,
    pub display: String,
    pub location: LocationGuess,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<NormalizedAddress>,
    /// Set when branches were chosen by region instead of radius
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<RegionFilter>,
    pub radius_km: f64,
    pub branches: Vec<BranchMatch>,
    pub summary: InventorySummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_error: Option<GpsError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_message: Option<String>,
    pub synced_at: DateTime<Utc>,
    /// True when a newer request finished first and this result was not kept
    pub superseded: bool,
}

/// Location resolution and branch matching pipeline
#[derive(Debug)]
pub struct Locator<D> {
    ip_locator: IpLocator,
    geocoder: NominatimBackend,
    directory: D,
    defaults: RegionDefaults,
    gps_options: GpsOptions,
    radius_km: f64,
}

impl<D: BranchDirectory> Locator<D> {
    pub fn new(
        ip_locator: IpLocator,
        geocoder: NominatimBackend,
        directory: D,
        config: &Config,
    ) -> Self {
        Self {
            ip_locator,
            geocoder,
            directory,
            defaults: RegionDefaults::from_config(config),
            gps_options: config.gps_options(),
            radius_km: config.search.radius_km,
        }
    }

    /// Build a locator whose external services come from `config`
    pub fn from_config(config: &Config, directory: D) -> Result<Self> {
        Ok(Self::new(
            IpLocator::from_config(config)?,
            NominatimBackend::from_config(config)?,
            directory,
            config,
        ))
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// IP-based guess for `client_ip`, or `None` when the lookup failed
    ///
    /// Without a client address the lookup is for this process's own
    /// public address.
    pub async fn detect_by_ip(&self, client_ip: Option<IpAddr>) -> Option<LocationGuess> {
        self.ip_locator
            .locate_ip(client_ip)
            .await
            .filter(LocationGuess::is_usable)
    }

    /// The hard-coded fallback guess
    pub fn fallback_guess(&self) -> LocationGuess {
        LocationGuess::fallback(&self.defaults)
    }

    /// Run IP and GPS detection concurrently and combine them
    ///
    /// `previous` is used when IP detection fails, before the hard-coded
    /// default. A GPS failure never discards the IP-based guess.
    pub async fn resolve<P: PositionSource>(
        &self,
        source: &P,
        previous: Option<LocationGuess>,
        client_ip: Option<IpAddr>,
    ) -> Resolution {
        let (ip_guess, gps) = tokio::join!(
            self.detect_by_ip(client_ip),
            detect_by_gps(source, &self.gps_options)
        );

        let base = ip_guess
            .or(previous)
            .unwrap_or_else(|| self.fallback_guess());

        match gps {
            Ok(coords) => Resolution {
                guess: base.with_gps_fix(coords),
                gps_error: None,
            },
            Err(error) => Resolution {
                guess: base,
                gps_error: Some(error),
            },
        }
    }

    /// Reverse geocode and normalize a coordinate
    pub async fn normalize(&self, coords: Coordinates) -> NormalizedAddress {
        normalize(&self.geocoder, coords).await
    }

    /// Branches within `radius_km` (the configured radius when `None`)
    ///
    /// Directory failures propagate; an empty result is not an error.
    pub async fn nearby(&self, center: Coordinates, radius_km: Option<f64>) -> Result<NearbyResult> {
        center.validate()?;
        let radius_km = radius_km.unwrap_or(self.radius_km);
        if radius_km.is_nan() || radius_km < 0.0 {
            return Err(Error::InvalidRadius(format!(
                "Radius must be non-negative, got {}",
                radius_km
            )));
        }

        let branches = self.directory.branches().await?;
        let matches = find_nearby(center, &branches, radius_km);
        let summary = self.summarize(&matches).await?;

        if matches.is_empty() {
            info!(%center, radius_km, total = branches.len(), "no branches within radius");
        } else {
            debug!(%center, radius_km, matched = matches.len(), "branches matched");
        }

        Ok(NearbyResult {
            center,
            radius_km,
            branches: matches,
            summary,
        })
    }

    /// Branches whose address falls in `region`
    ///
    /// Used when no coordinate is known. Directory failures propagate.
    pub async fn in_region(&self, region: &RegionFilter) -> Result<RegionResult> {
        let branches = self.directory.branches_in_region(region).await?;
        let matches = find_in_region(region, &branches);
        let summary = self.summarize(&matches).await?;

        debug!(%region, matched = matches.len(), "branches matched by region");

        Ok(RegionResult {
            region: region.clone(),
            branches: matches,
            summary,
        })
    }

    async fn summarize(&self, matches: &[BranchMatch]) -> Result<InventorySummary> {
        let codes: Vec<String> = matches.iter().map(|m| m.branch.code.clone()).collect();
        let rows = if codes.is_empty() {
            Vec::new()
        } else {
            self.directory.inventory(&codes).await?
        };
        Ok(summarize(matches, &rows))
    }

    /// Full pipeline for one session request
    ///
    /// `client_ip` is the guest's address when known. With a coordinate the
    /// branches are ranked by distance; without one they are scoped to the
    /// guessed city and district.
    pub async fn locate<P: PositionSource>(
        &self,
        session: &SessionContext,
        source: &P,
        client_ip: Option<IpAddr>,
    ) -> Result<LocationReport> {
        let ticket = session.begin();
        let previous = session.location().await;

        let Resolution {
            mut guess,
            gps_error,
        } = self.resolve(source, previous, client_ip).await;

        if let Some(error) = gps_error {
            warn!(session = %session.id(), "GPS unavailable, keeping {} location: {}", guess.source, error);
        }

        let mut region = None;
        let (address, branches, summary) = match guess.coords {
            Some(coords) => {
                let (address, nearby) =
                    tokio::join!(self.normalize(coords), self.nearby(coords, None));
                let nearby = nearby?;
                (Some(address), nearby.branches, nearby.summary)
            }
            None => match RegionFilter::new(guess.city.as_deref(), guess.district.as_deref()) {
                Some(filter) => {
                    let result = self.in_region(&filter).await?;
                    region = Some(result.region);
                    (None, result.branches, result.summary)
                }
                None => (None, Vec::new(), InventorySummary::default()),
            },
        };

        if let Some(address) = &address {
            guess = guess.with_address(address.display_text.clone());
        }

        let mut report = LocationReport {
            session_id: session.id(),
            sequence: ticket.sequence(),
            display: display_text(Some(&guess)),
            location: guess,
            address,
            region,
            radius_km: self.radius_km,
            branches,
            summary,
            gps_error,
            gps_message: gps_error.map(|e| e.user_message().to_string()),
            synced_at: Utc::now(),
            superseded: false,
        };

        report.superseded = !session.commit(ticket, &report).await;
        if !report.superseded && report.location.source != LocationSource::Default {
            debug!(session = %session.id(), display = %report.display, "session location updated");
        }

        Ok(report)
    }
}
