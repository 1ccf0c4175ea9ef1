//! Device GPS positioning
//!
//! The device's location capability sits behind [`PositionSource`]. The
//! detector enforces the timeout and the maximum fix age itself, so a source
//! that ignores [`GpsOptions`] still behaves.

use crate::coord::Coordinates;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Options for a GPS fix request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpsOptions {
    pub enable_high_accuracy: bool,
    /// Give up when no fix arrives within this long
    pub timeout: Duration,
    /// Accept a cached fix up to this old
    pub maximum_age: Duration,
}

impl Default for GpsOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::from_secs(60),
        }
    }
}

/// A position reported by the device
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFix {
    pub coords: Coordinates,
    /// How long ago the device obtained this fix
    pub age: Duration,
}

impl PositionFix {
    /// A fix obtained just now
    pub fn fresh(coords: Coordinates) -> Self {
        Self {
            coords,
            age: Duration::ZERO,
        }
    }
}

/// Why no GPS fix could be obtained
///
/// Clients may also send the short names `unsupported` and `denied`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpsError {
    #[error("device has no location capability")]
    #[serde(alias = "unsupported")]
    LocationUnavailable,

    #[error("location permission denied")]
    #[serde(alias = "denied")]
    PermissionDenied,

    #[error("timed out waiting for a position fix")]
    Timeout,

    #[error("position unavailable")]
    PositionUnavailable,
}

impl GpsError {
    /// Message shown to the guest for this failure
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::LocationUnavailable => "이 기기에서는 위치 서비스를 지원하지 않습니다.",
            Self::PermissionDenied => "위치 권한이 거부되었습니다. 브라우저 설정에서 위치 접근을 허용해 주세요.",
            Self::Timeout => "현재 위치를 가져오는 시간이 초과되었습니다.",
            Self::PositionUnavailable => "현재 위치를 확인할 수 없습니다.",
        }
    }
}

/// A device's location-sensing capability
pub trait PositionSource: Send + Sync {
    /// Request the current position
    fn current_position(
        &self,
        options: &GpsOptions,
    ) -> impl Future<Output = Result<PositionFix, GpsError>> + Send;
}

/// What a client reported about its device position
///
/// Browsers and the CLI hand over either a fix or the failure they saw;
/// a client without the capability reports nothing at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportedPosition {
    Unsupported,
    Fix(PositionFix),
    Failed(GpsError),
}

impl ReportedPosition {
    /// Build a report from optional client-provided parts
    ///
    /// A reported failure wins over coordinates.
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>, error: Option<GpsError>) -> Self {
        if let Some(error) = error {
            return Self::Failed(error);
        }
        match (lat, lng) {
            (Some(lat), Some(lng)) => Self::Fix(PositionFix::fresh(Coordinates::new(lat, lng))),
            _ => Self::Unsupported,
        }
    }
}

impl PositionSource for ReportedPosition {
    async fn current_position(&self, _options: &GpsOptions) -> Result<PositionFix, GpsError> {
        match self {
            Self::Unsupported => Err(GpsError::LocationUnavailable),
            Self::Fix(fix) => Ok(*fix),
            Self::Failed(error) => Err(*error),
        }
    }
}

/// Obtain a GPS coordinate from `source`, bounded by `options`
pub async fn detect_by_gps<P: PositionSource>(
    source: &P,
    options: &GpsOptions,
) -> Result<Coordinates, GpsError> {
    let fix = match tokio::time::timeout(options.timeout, source.current_position(options)).await
    {
        Ok(result) => result,
        Err(_) => Err(GpsError::Timeout),
    };

    let fix = fix.inspect_err(|e| warn!("GPS detection failed: {}", e))?;

    if fix.age > options.maximum_age {
        warn!(
            age_secs = fix.age.as_secs(),
            "GPS fix older than maximum age, discarding"
        );
        return Err(GpsError::PositionUnavailable);
    }

    if let Err(e) = fix.coords.validate() {
        warn!("GPS reported an invalid coordinate: {}", e);
        return Err(GpsError::PositionUnavailable);
    }

    debug!(coords = %fix.coords, "GPS fix obtained");
    Ok(fix.coords)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Source that never answers within any sane timeout
    struct StalledSource;

    impl PositionSource for StalledSource {
        async fn current_position(&self, _options: &GpsOptions) -> Result<PositionFix, GpsError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(PositionFix::fresh(Coordinates::new(37.5, 127.0)))
        }
    }

    #[tokio::test]
    async fn test_fix_success() {
        let source = ReportedPosition::Fix(PositionFix::fresh(Coordinates::new(37.5, 127.0)));
        let coords = detect_by_gps(&source, &GpsOptions::default()).await.unwrap();
        assert_eq!(coords, Coordinates::new(37.5, 127.0));
    }

    #[tokio::test]
    async fn test_unsupported_device() {
        let result = detect_by_gps(&ReportedPosition::Unsupported, &GpsOptions::default()).await;
        assert_eq!(result, Err(GpsError::LocationUnavailable));
    }

    #[tokio::test]
    async fn test_permission_denied() {
        let source = ReportedPosition::Failed(GpsError::PermissionDenied);
        let result = detect_by_gps(&source, &GpsOptions::default()).await;
        assert_eq!(result, Err(GpsError::PermissionDenied));
    }

    #[tokio::test]
    async fn test_timeout_enforced() {
        let options = GpsOptions {
            timeout: Duration::from_millis(50),
            ..GpsOptions::default()
        };
        let result = detect_by_gps(&StalledSource, &options).await;
        assert_eq!(result, Err(GpsError::Timeout));
    }

    #[tokio::test]
    async fn test_cached_fix_within_maximum_age() {
        let source = ReportedPosition::Fix(PositionFix {
            coords: Coordinates::new(37.5, 127.0),
            age: Duration::from_secs(59),
        });
        assert!(detect_by_gps(&source, &GpsOptions::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_stale_fix_rejected() {
        let source = ReportedPosition::Fix(PositionFix {
            coords: Coordinates::new(37.5, 127.0),
            age: Duration::from_secs(61),
        });
        let result = detect_by_gps(&source, &GpsOptions::default()).await;
        assert_eq!(result, Err(GpsError::PositionUnavailable));
    }

    #[tokio::test]
    async fn test_invalid_fix_rejected() {
        let source = ReportedPosition::Fix(PositionFix::fresh(Coordinates::new(120.0, 127.0)));
        let result = detect_by_gps(&source, &GpsOptions::default()).await;
        assert_eq!(result, Err(GpsError::PositionUnavailable));
    }

    #[test]
    fn test_user_messages_are_distinct() {
        let kinds = [
            GpsError::LocationUnavailable,
            GpsError::PermissionDenied,
            GpsError::Timeout,
            GpsError::PositionUnavailable,
        ];
        let messages: std::collections::HashSet<_> =
            kinds.iter().map(|k| k.user_message()).collect();
        assert_eq!(messages.len(), 4);
    }

    #[test]
    fn test_from_parts() {
        assert_eq!(
            ReportedPosition::from_parts(Some(37.5), Some(127.0), Some(GpsError::Timeout)),
            ReportedPosition::Failed(GpsError::Timeout)
        );
        assert_eq!(
            ReportedPosition::from_parts(Some(37.5), None, None),
            ReportedPosition::Unsupported
        );
        assert!(matches!(
            ReportedPosition::from_parts(Some(37.5), Some(127.0), None),
            ReportedPosition::Fix(_)
        ));
    }

    #[test]
    fn test_parse_error_kind() {
        let parse = |s: &str| serde_json::from_value::<GpsError>(serde_json::json!(s));

        assert_eq!(parse("denied").unwrap(), GpsError::PermissionDenied);
        assert_eq!(parse("permission_denied").unwrap(), GpsError::PermissionDenied);
        assert_eq!(parse("unsupported").unwrap(), GpsError::LocationUnavailable);
        assert_eq!(parse("timeout").unwrap(), GpsError::Timeout);
        assert!(parse("bogus").is_err());
    }

    #[test]
    fn test_error_serialization() {
        let json = serde_json::to_string(&GpsError::PermissionDenied).unwrap();
        assert_eq!(json, "\"permission_denied\"");
    }
}
