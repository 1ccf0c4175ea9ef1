//! HTTP API routes
//!
//! Defines all REST API endpoints for the server.

use crate::address::NormalizedAddress;
use crate::branch::{known_classifications, RegionFilter};
use crate::coord::Coordinates;
use crate::directory::BranchDirectory;
use crate::error::Error;
use crate::geo::gps::{GpsError, ReportedPosition};
use crate::geo::LocationGuess;
use crate::server::state::AppState;
use crate::session::{LocationReport, NearbyResult, RegionResult, SessionState};

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;
use uuid::Uuid;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/location", get(location_handler))
        .route("/api/address", get(address_handler))
        .route("/api/branches/nearby", get(nearby_handler))
        .route("/api/branches/region", get(region_handler))
        .route("/api/classifications", get(classifications_handler))
        .route("/api/locate", post(locate_handler))
        .route("/api/session/:id", get(session_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Address of the guest behind this request
///
/// The first `X-Forwarded-For` entry wins over the socket peer so the
/// server still sees guests when it runs behind a reverse proxy.
fn client_ip(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|first| first.trim().parse().ok())
        .or_else(|| peer.map(|ConnectInfo(addr)| addr.ip()))
}

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "DIRECTORY_ERROR" => StatusCode::BAD_GATEWAY,
            "INTERNAL_ERROR" => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidCoordinates(_) => "INVALID_COORDINATES",
            Error::InvalidRadius(_) => "INVALID_RADIUS",
            Error::Directory(_) => "DIRECTORY_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            _ => "INTERNAL_ERROR",
        };
        if code == "DIRECTORY_ERROR" || code == "INTERNAL_ERROR" {
            error!("request failed: {}", err);
        }
        ApiError {
            error: err.to_string(),
            code: code.to_string(),
        }
    }
}

/// Status response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Server is running
    pub running: bool,
    /// Server version
    pub version: String,
    /// Configured search radius
    pub radius_km: f64,
    /// Branches in the directory, if it could be read
    pub branch_count: Option<usize>,
    /// Sessions currently held
    pub sessions: usize,
}

/// Server status endpoint
///
/// GET /api/status
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let branch_count = state
        .locator
        .directory()
        .branches()
        .await
        .map(|branches| branches.len())
        .ok();

    Json(StatusResponse {
        running: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        radius_km: state.locator.radius_km(),
        branch_count,
        sessions: state.session_count().await,
    })
}

/// Coarse location from the guest's IP address
///
/// GET /api/location
///
/// Falls back to the configured default region when lookup fails.
async fn location_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
) -> Json<LocationGuess> {
    let guess = state
        .locator
        .detect_by_ip(client_ip(&headers, peer.as_ref()))
        .await
        .unwrap_or_else(|| state.locator.fallback_guess());

    Json(guess)
}

/// Coordinate query parameters
#[derive(Debug, Deserialize)]
pub struct CoordinateQuery {
    pub lat: f64,
    pub lng: f64,
    /// Search radius in km (nearby only)
    pub radius: Option<f64>,
}

/// Normalized address for a coordinate
///
/// GET /api/address?lat=..&lng=..
async fn address_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CoordinateQuery>,
) -> Result<Json<NormalizedAddress>, ApiError> {
    let coords = Coordinates::new(query.lat, query.lng);
    coords.validate()?;

    Ok(Json(state.locator.normalize(coords).await))
}

/// Branches near a coordinate
///
/// GET /api/branches/nearby?lat=..&lng=..&radius=..
async fn nearby_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CoordinateQuery>,
) -> Result<Json<NearbyResult>, ApiError> {
    let result = state
        .locator
        .nearby(Coordinates::new(query.lat, query.lng), query.radius)
        .await?;

    Ok(Json(result))
}

/// Region query parameters
#[derive(Debug, Deserialize)]
pub struct RegionQuery {
    pub city: Option<String>,
    pub district: Option<String>,
}

/// Branches in a named region
///
/// GET /api/branches/region?city=..&district=..
async fn region_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RegionQuery>,
) -> Result<Json<RegionResult>, ApiError> {
    let region = RegionFilter::new(query.city.as_deref(), query.district.as_deref()).ok_or_else(
        || ApiError {
            error: "Either city or district is required".to_string(),
            code: "INVALID_REGION".to_string(),
        },
    )?;

    Ok(Json(state.locator.in_region(&region).await?))
}

/// Classification table entry
#[derive(Debug, Serialize, Deserialize)]
pub struct ClassificationInfo {
    pub code: i64,
    pub label: String,
    pub korean_label: String,
}

/// List branch classifications
///
/// GET /api/classifications
async fn classifications_handler() -> Json<Vec<ClassificationInfo>> {
    let classifications = known_classifications()
        .into_iter()
        .map(|c| ClassificationInfo {
            code: c.code(),
            label: c.label().to_string(),
            korean_label: c.korean_label().to_string(),
        })
        .collect();

    Json(classifications)
}

/// Locate request body
///
/// The browser reports either its GPS fix or the failure it ran into.
#[derive(Debug, Default, Deserialize)]
pub struct LocateRequest {
    pub session_id: Option<Uuid>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub gps_error: Option<GpsError>,
}

/// Resolve the session's location and nearby branches
///
/// POST /api/locate
async fn locate_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<LocateRequest>,
) -> Result<Json<LocationReport>, ApiError> {
    let session = state.session(req.session_id).await;
    let source = ReportedPosition::from_parts(req.lat, req.lng, req.gps_error);
    let ip = client_ip(&headers, peer.as_ref());

    let report = state.locator.locate(&session, &source, ip).await?;
    Ok(Json(report))
}

/// Current state of a session
///
/// GET /api/session/:id
async fn session_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionState>, ApiError> {
    let session = state.existing_session(id).await.ok_or_else(|| ApiError {
        error: format!("Session not found: {}", id),
        code: "NOT_FOUND".to_string(),
    })?;

    Ok(Json(session.state().await))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch::{Branch, Classification, InventoryRow};
    use crate::config::Config;
    use crate::directory::{DirectorySnapshot, FileDirectory};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// State with unreachable external services and a seeded directory
    async fn create_test_state() -> (Arc<AppState>, TempDir) {
        create_state_with(|_| {}).await
    }

    async fn create_state_with(customize: impl FnOnce(&mut Config)) -> (Arc<AppState>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("directory.json");

        let snapshot = DirectorySnapshot {
            branches: vec![
                Branch {
                    code: "BH001".to_string(),
                    name: "역삼 블루핸즈".to_string(),
                    coords: Coordinates::new(37.51, 127.01),
                    classification: Classification::Specialty,
                    phone_number: "02-555-0101".to_string(),
                    address: "서울특별시 강남구 역삼동 123".to_string(),
                },
                Branch {
                    code: "BH002".to_string(),
                    name: "잠실 블루핸즈".to_string(),
                    coords: Coordinates::new(37.6, 127.2),
                    classification: Classification::HighTech,
                    phone_number: "02-555-0202".to_string(),
                    address: "서울특별시 송파구 잠실동 45".to_string(),
                },
            ],
            inventory: vec![InventoryRow {
                id: "1".to_string(),
                branch_code: "BH001".to_string(),
                part_number: "58101-3XA00".to_string(),
                part_name: "브레이크 패드".to_string(),
                quantity: 6,
                created_at: None,
            }],
        };
        FileDirectory::new(&path).save(&snapshot).await.unwrap();

        let mut config = Config::default();
        config.directory.path = path.to_string_lossy().to_string();
        config.services.ip_lookup_url = "http://127.0.0.1:9/json/".to_string();
        config.services.reverse_geocode_url = "http://127.0.0.1:9".to_string();
        config.services.request_timeout_secs = 1;
        customize(&mut config);

        (Arc::new(AppState::new(&config).unwrap()), temp_dir)
    }

    async fn get_json(state: Arc<AppState>, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = create_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn post_locate(state: Arc<AppState>, body: serde_json::Value) -> axum::response::Response {
        create_router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/locate")
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let (state, _temp) = create_test_state().await;
        let (status, body) = get_json(state, "/api/status").await;

        assert_eq!(status, StatusCode::OK);
        let parsed: StatusResponse = serde_json::from_value(body).unwrap();
        assert!(parsed.running);
        assert_eq!(parsed.radius_km, 3.0);
        assert_eq!(parsed.branch_count, Some(2));
    }

    #[tokio::test]
    async fn test_location_endpoint_falls_back() {
        let (state, _temp) = create_test_state().await;
        let (status, body) = get_json(state, "/api/location").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "default");
        assert_eq!(body["district"], "강남구");
    }

    #[tokio::test]
    async fn test_address_endpoint_sentinel() {
        let (state, _temp) = create_test_state().await;
        let (status, body) = get_json(state, "/api/address?lat=37.5&lng=127.0").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["display_text"], "주소를 찾을 수 없습니다.");
    }

    #[tokio::test]
    async fn test_nearby_endpoint() {
        let (state, _temp) = create_test_state().await;
        let (status, body) = get_json(state, "/api/branches/nearby?lat=37.5&lng=127.0").await;

        assert_eq!(status, StatusCode::OK);
        let result: NearbyResult = serde_json::from_value(body).unwrap();
        assert_eq!(result.branches.len(), 1);
        assert_eq!(result.branches[0].branch.code, "BH001");
        assert_eq!(result.summary.total_quantity, 6);
    }

    #[tokio::test]
    async fn test_nearby_endpoint_wider_radius() {
        let (state, _temp) = create_test_state().await;
        let (status, body) =
            get_json(state, "/api/branches/nearby?lat=37.5&lng=127.0&radius=25").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["branches"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_nearby_invalid_coordinates() {
        let (state, _temp) = create_test_state().await;
        let (status, body) = get_json(state, "/api/branches/nearby?lat=91&lng=127.0").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_COORDINATES");
    }

    #[tokio::test]
    async fn test_nearby_directory_failure() {
        let (state, temp) = create_test_state().await;
        std::fs::write(temp.path().join("directory.json"), "garbage").unwrap();

        let (status, body) = get_json(state, "/api/branches/nearby?lat=37.5&lng=127.0").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "DIRECTORY_ERROR");
    }

    #[tokio::test]
    async fn test_classifications_endpoint() {
        let (state, _temp) = create_test_state().await;
        let (status, body) = get_json(state, "/api/classifications").await;

        assert_eq!(status, StatusCode::OK);
        let list: Vec<ClassificationInfo> = serde_json::from_value(body).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[2].label, "HighTech");
    }

    #[tokio::test]
    async fn test_locate_and_session_endpoints() {
        let (state, _temp) = create_test_state().await;

        let response = post_locate(
            Arc::clone(&state),
            serde_json::json!({"lat": 37.5, "lng": 127.0}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let report: LocationReport = serde_json::from_slice(&body).unwrap();
        assert_eq!(report.branches.len(), 1);
        assert_eq!(report.display, "위치 확인 중...");

        let (status, session) =
            get_json(state, &format!("/api/session/{}", report.session_id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session["sequence"], 1);
        assert_eq!(session["location"]["source"], "gps");
    }

    #[tokio::test]
    async fn test_locate_gps_denied() {
        let (state, _temp) = create_test_state().await;

        let response = post_locate(state, serde_json::json!({"gps_error": "permission_denied"})).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let report: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(report["gps_error"], "permission_denied");
        assert_eq!(report["display"], "서울특별시 강남구에서 접속 중");
        assert_eq!(report["region"]["district"], "강남구");
        assert_eq!(report["branches"][0]["code"], "BH001");
        assert!(report["branches"][0].get("distance_km").is_none());
    }

    #[tokio::test]
    async fn test_locate_reuses_session() {
        let (state, _temp) = create_test_state().await;
        let id = Uuid::new_v4();

        for expected in 1..=2u64 {
            let response = post_locate(
                Arc::clone(&state),
                serde_json::json!({"session_id": id, "lat": 37.5, "lng": 127.0}),
            )
            .await;
            let body = response.into_body().collect().await.unwrap().to_bytes();
            let report: LocationReport = serde_json::from_slice(&body).unwrap();

            assert_eq!(report.session_id, id);
            assert_eq!(report.sequence, expected);
        }
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let (state, _temp) = create_test_state().await;
        let (status, body) = get_json(state, &format!("/api/session/{}", Uuid::new_v4())).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_location_uses_forwarded_client_address() {
        let server = MockServer::start().await;
        for (ip, city) in [("1.2.3.4", "부산광역시"), ("5.6.7.8", "대전광역시")] {
            Mock::given(method("GET"))
                .and(path(format!("/{}/json/", ip)))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "city": city
                })))
                .expect(1)
                .mount(&server)
                .await;
        }

        let uri = server.uri();
        let (state, _temp) = create_state_with(|config| {
            config.services.ip_lookup_url = format!("{}/json/", uri);
        })
        .await;

        for (forwarded, city) in [("1.2.3.4, 10.0.0.1", "부산광역시"), ("5.6.7.8", "대전광역시")] {
            let response = create_router(Arc::clone(&state))
                .oneshot(
                    Request::builder()
                        .uri("/api/location")
                        .header("X-Forwarded-For", forwarded)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            let body = response.into_body().collect().await.unwrap().to_bytes();
            let guess: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(guess["source"], "ip");
            assert_eq!(guess["city"], city);
        }
    }

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let peer = ConnectInfo(SocketAddr::from(([203, 0, 113, 9], 50000)));

        let mut headers = HeaderMap::new();
        assert_eq!(
            client_ip(&headers, Some(&peer)),
            Some("203.0.113.9".parse().unwrap())
        );
        assert_eq!(client_ip(&headers, None), None);

        headers.insert("x-forwarded-for", "198.51.100.7, 10.0.0.2".parse().unwrap());
        assert_eq!(
            client_ip(&headers, Some(&peer)),
            Some("198.51.100.7".parse().unwrap())
        );

        headers.insert("x-forwarded-for", "garbage".parse().unwrap());
        assert_eq!(
            client_ip(&headers, Some(&peer)),
            Some("203.0.113.9".parse().unwrap())
        );
    }

    #[tokio::test]
    async fn test_region_endpoint() {
        let (state, _temp) = create_test_state().await;
        let uri = format!(
            "/api/branches/region?city={}&district={}",
            urlencoding::encode("서울특별시"),
            urlencoding::encode("송파구")
        );
        let (status, body) = get_json(state, &uri).await;

        assert_eq!(status, StatusCode::OK);
        let result: RegionResult = serde_json::from_value(body).unwrap();
        assert_eq!(result.branches.len(), 1);
        assert_eq!(result.branches[0].branch.code, "BH002");
        assert_eq!(result.summary.total_quantity, 0);
    }

    #[tokio::test]
    async fn test_region_endpoint_requires_a_name() {
        let (state, _temp) = create_test_state().await;
        let (status, body) = get_json(state, "/api/branches/region").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_REGION");
    }

    #[tokio::test]
    async fn test_locate_accepts_short_error_names() {
        let (state, _temp) = create_test_state().await;

        let response = post_locate(state, serde_json::json!({"gps_error": "denied"})).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let report: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(report["gps_error"], "permission_denied");
    }

    #[tokio::test]
    async fn test_status_counts_sessions() {
        let (state, _temp) = create_test_state().await;
        for _ in 0..3 {
            post_locate(Arc::clone(&state), serde_json::json!({"gps_error": "timeout"})).await;
        }

        let (_, body) = get_json(state, "/api/status").await;
        assert_eq!(body["sessions"], 3);
    }
}
