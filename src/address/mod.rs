//! Address normalization
//!
//! Turns a reverse geocoder response into a short Korean address label such
//! as "서울특별시 강남구 역삼동". Extraction is an ordered chain of tiers; the
//! first tier producing a label wins and the label is then post-filtered.
//! Whatever goes wrong, the caller gets a label: the sentinel
//! [`ADDRESS_NOT_FOUND`] stands in for "no address".

use crate::constants::locale::{
    ADDRESS_NOT_FOUND, DISTRICT_MARKERS, DROPPED_MARKERS, NEIGHBOURHOOD_MARKERS,
    TOP_LEVEL_REGIONS,
};
use crate::coord::Coordinates;
use crate::geo::{GeoBackend, ReverseGeocodeResponse};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A display-ready address label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedAddress {
    pub display_text: String,
}

impl NormalizedAddress {
    /// The "address unavailable" sentinel
    pub fn not_found() -> Self {
        Self {
            display_text: ADDRESS_NOT_FOUND.to_string(),
        }
    }

    /// False for the sentinel
    pub fn is_found(&self) -> bool {
        self.display_text != ADDRESS_NOT_FOUND
    }
}

impl std::fmt::Display for NormalizedAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_text)
    }
}

/// One extraction strategy over a geocoder response
pub type Tier = fn(&ReverseGeocodeResponse) -> Option<String>;

/// Extraction tiers, tried in order
pub const TIERS: &[Tier] = &[structured_tier, display_text_tier];

/// Reverse geocode `coords` and normalize the result
///
/// Never fails; lookup errors are logged and yield the sentinel.
pub async fn normalize<G: GeoBackend>(geocoder: &G, coords: Coordinates) -> NormalizedAddress {
    match geocoder.reverse_geocode(coords).await {
        Ok(response) => {
            let address = normalize_response(&response);
            if address.is_found() {
                debug!(%coords, address = %address, "address normalized");
            } else {
                warn!(%coords, "no address could be derived from geocoder response");
            }
            address
        }
        Err(e) => {
            warn!(%coords, "reverse geocoding failed: {}", e);
            NormalizedAddress::not_found()
        }
    }
}

/// Normalize an already-fetched geocoder response
pub fn normalize_response(response: &ReverseGeocodeResponse) -> NormalizedAddress {
    if response
        .display_name
        .as_deref()
        .map_or(true, |name| name.trim().is_empty())
    {
        return NormalizedAddress::not_found();
    }

    TIERS
        .iter()
        .find_map(|tier| tier(response))
        .map(|label| post_filter(&label))
        .filter(|label| !label.is_empty())
        .map(|display_text| NormalizedAddress { display_text })
        .unwrap_or_else(NormalizedAddress::not_found)
}

/// First tier: the structured address breakdown
///
/// Region (state or province), then district (district or suburb), then
/// neighbourhood (neighbourhood or quarter), whichever are present.
pub fn structured_tier(response: &ReverseGeocodeResponse) -> Option<String> {
    let addr = response.address.as_ref()?;

    let components: Vec<&str> = [
        first_present(&[&addr.state, &addr.province]),
        first_present(&[&addr.district, &addr.suburb]),
        first_present(&[&addr.neighbourhood, &addr.quarter]),
    ]
    .into_iter()
    .flatten()
    .collect();

    if components.is_empty() {
        None
    } else {
        Some(components.join(" "))
    }
}

/// Second tier: scan the comma-separated display string
///
/// Finds a top-level region segment, then a later district segment, then a
/// later neighbourhood segment, and stops there.
pub fn display_text_tier(response: &ReverseGeocodeResponse) -> Option<String> {
    let display_name = response.display_name.as_deref()?;

    let mut stage = ScanStage::Region;
    let mut components = Vec::new();

    for part in display_name.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match stage {
            ScanStage::Region if contains_any(part, TOP_LEVEL_REGIONS) => {
                components.push(part);
                stage = ScanStage::District;
            }
            ScanStage::District if contains_any(part, DISTRICT_MARKERS) => {
                components.push(part);
                stage = ScanStage::Neighbourhood;
            }
            ScanStage::Neighbourhood if contains_any(part, NEIGHBOURHOOD_MARKERS) => {
                components.push(part);
                break;
            }
            _ => {}
        }
    }

    if components.is_empty() {
        None
    } else {
        Some(components.join(" "))
    }
}

/// Drop tokens naming minor units (hamlet, street, alley, lot) or the country
pub fn post_filter(label: &str) -> String {
    label
        .split_whitespace()
        .filter(|token| !contains_any(token, DROPPED_MARKERS))
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanStage {
    Region,
    District,
    Neighbourhood,
}

fn first_present<'a>(candidates: &[&'a Option<String>]) -> Option<&'a str> {
    candidates
        .iter()
        .copied()
        .filter_map(Option::as_deref)
        .map(str::trim)
        .find(|c| !c.is_empty())
}

fn contains_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| text.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::geo::AddressDetails;

    fn response(display_name: &str, address: Option<AddressDetails>) -> ReverseGeocodeResponse {
        ReverseGeocodeResponse {
            display_name: Some(display_name.to_string()),
            address,
        }
    }

    struct StubGeocoder(Option<ReverseGeocodeResponse>);

    impl GeoBackend for StubGeocoder {
        async fn reverse_geocode(&self, _coords: Coordinates) -> Result<ReverseGeocodeResponse> {
            self.0
                .clone()
                .ok_or_else(|| Error::Geo("connection refused".to_string()))
        }
    }

    #[test]
    fn test_structured_tier_priority_order() {
        let details = AddressDetails {
            state: Some("경기도".to_string()),
            province: Some("ignored".to_string()),
            suburb: Some("분당구".to_string()),
            quarter: Some("정자동".to_string()),
            ..AddressDetails::default()
        };
        let resp = response("whatever", Some(details));

        assert_eq!(structured_tier(&resp).as_deref(), Some("경기도 분당구 정자동"));
    }

    #[test]
    fn test_structured_tier_partial() {
        let details = AddressDetails {
            province: Some("   ".to_string()),
            district: Some("강남구".to_string()),
            neighbourhood: Some("역삼1동".to_string()),
            ..AddressDetails::default()
        };
        let resp = response("whatever", Some(details));

        assert_eq!(structured_tier(&resp).as_deref(), Some("강남구 역삼1동"));
    }

    #[test]
    fn test_structured_tier_empty_details() {
        let resp = response("whatever", Some(AddressDetails::default()));
        assert_eq!(structured_tier(&resp), None);
        assert_eq!(structured_tier(&response("whatever", None)), None);
    }

    #[test]
    fn test_display_text_tier() {
        let resp = response("대한민국, 서울특별시, 강남구, 역삼동, 테헤란로", None);
        assert_eq!(
            display_text_tier(&resp).as_deref(),
            Some("서울특별시 강남구 역삼동")
        );
    }

    #[test]
    fn test_display_text_tier_requires_order() {
        // District and neighbourhood before the region are not picked up
        let resp = response("역삼동, 강남구, 서울특별시, 06234, 대한민국", None);
        assert_eq!(display_text_tier(&resp).as_deref(), Some("서울특별시"));
    }

    #[test]
    fn test_display_text_tier_no_markers() {
        let resp = response("Null Island, Atlantic Ocean", None);
        assert_eq!(display_text_tier(&resp), None);
    }

    #[test]
    fn test_post_filter() {
        assert_eq!(
            post_filter("경기도 성남시 분당구 정자동 불정로"),
            "경기도 성남시 분당구 정자동"
        );
        assert_eq!(post_filter("대한민국 부산광역시 123번지"), "부산광역시");
        assert_eq!(post_filter("  서울특별시   강남구 "), "서울특별시 강남구");
    }

    #[test]
    fn test_normalize_prefers_structured() {
        let details = AddressDetails {
            state: Some("서울특별시".to_string()),
            suburb: Some("서초구".to_string()),
            ..AddressDetails::default()
        };
        let resp = response("대한민국, 부산광역시, 해운대구, 우동", Some(details));

        assert_eq!(normalize_response(&resp).display_text, "서울특별시 서초구");
    }

    #[test]
    fn test_normalize_falls_back_to_display_text() {
        let resp = response(
            "대한민국, 대전광역시, 유성구, 봉명동",
            Some(AddressDetails::default()),
        );
        assert_eq!(
            normalize_response(&resp).display_text,
            "대전광역시 유성구 봉명동"
        );
    }

    #[test]
    fn test_normalize_without_anything_recognizable() {
        let resp = response("Null Island, Atlantic Ocean", None);
        let address = normalize_response(&resp);

        assert_eq!(address, NormalizedAddress::not_found());
        assert!(!address.is_found());
    }

    #[test]
    fn test_normalize_missing_display_name() {
        let details = AddressDetails {
            state: Some("서울특별시".to_string()),
            ..AddressDetails::default()
        };
        let resp = ReverseGeocodeResponse {
            display_name: None,
            address: Some(details),
        };
        assert_eq!(normalize_response(&resp), NormalizedAddress::not_found());
    }

    #[test]
    fn test_normalize_filtered_to_nothing() {
        let details = AddressDetails {
            neighbourhood: Some("종로1가".to_string()),
            ..AddressDetails::default()
        };
        let resp = response("종로1가", Some(details));
        assert_eq!(normalize_response(&resp), NormalizedAddress::not_found());
    }

    #[tokio::test]
    async fn test_normalize_lookup_failure() {
        let geocoder = StubGeocoder(None);
        let address = normalize(&geocoder, Coordinates::new(37.5, 127.0)).await;
        assert_eq!(address, NormalizedAddress::not_found());
    }

    #[tokio::test]
    async fn test_normalize_lookup_success() {
        let details = AddressDetails {
            state: Some("서울특별시".to_string()),
            district: Some("강남구".to_string()),
            neighbourhood: Some("역삼동".to_string()),
            ..AddressDetails::default()
        };
        let geocoder = StubGeocoder(Some(response("역삼동, 강남구, 서울특별시", Some(details))));
        let address = normalize(&geocoder, Coordinates::new(37.5, 127.0)).await;

        assert!(address.is_found());
        assert_eq!(address.to_string(), "서울특별시 강남구 역삼동");
    }
}
