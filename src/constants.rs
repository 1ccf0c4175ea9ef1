//! Centralized constants for the branch-locator crate
//!
//! Values shared across modules live here so the normalizer, the detector
//! and the outer surfaces agree on them.

/// Geographic constants
pub mod geo {
    /// Mean Earth radius in kilometers
    pub const EARTH_RADIUS_KM: f64 = 6_371.0;
}

/// External API endpoints
pub mod api {
    /// IP geolocation API (free, no key required)
    pub const IP_API_URL: &str = "https://ipapi.co/json/";

    /// OpenStreetMap Nominatim geocoding API
    pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

    /// User agent sent to Nominatim (required by its usage policy)
    pub const USER_AGENT: &str = concat!("branch-locator/", env!("CARGO_PKG_VERSION"));
}

/// Korean locale strings and markers used by the address normalizer
pub mod locale {
    /// Returned when no address could be derived from a coordinate
    pub const ADDRESS_NOT_FOUND: &str = "주소를 찾을 수 없습니다.";

    /// Top-level regions (major cities) recognized in display strings
    pub const TOP_LEVEL_REGIONS: &[&str] = &[
        "서울", "부산", "대구", "인천", "광주", "대전", "울산", "세종",
    ];

    /// District-level suffix markers (gu, gun)
    pub const DISTRICT_MARKERS: &[&str] = &["구", "군"];

    /// Neighbourhood-level suffix markers (dong, eup, myeon)
    pub const NEIGHBOURHOOD_MARKERS: &[&str] = &["동", "읍", "면"];

    /// Tokens containing any of these are dropped from the final label:
    /// hamlet, street block, road, alley, lot number, country name
    pub const DROPPED_MARKERS: &[&str] = &["리", "가", "로", "길", "번지", "대한민국"];

    /// Shown while a GPS fix is waiting on its address
    pub const RESOLVING_ADDRESS: &str = "위치 확인 중...";

    /// Shown when nothing at all is known about the guest's location
    pub const GUEST_FALLBACK: &str = "guest로 로그인 중입니다";

    /// Suffix of "<place> - currently connecting from"
    pub const CONNECTING_FROM_SUFFIX: &str = "에서 접속 중";
}
