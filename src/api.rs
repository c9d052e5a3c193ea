//! REST API for network upload, point integration and TSP evaluation.
//!
//! Provides endpoints for:
//! - Network upload and export (GeoJSON, WKT)
//! - Point upload (CSV) and export of snapped points
//! - TSP evaluation with all solvers
//! - Swagger UI at /q/swagger-ui

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum::body::Bytes;
use geojson::{FeatureCollection, Geometry};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::warn;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ServerConfig;
use crate::console;
use crate::error::TspError;
use crate::formats::{
    network_to_geojson, parse_network_geojson, parse_points_csv, points_to_geojson,
    route_to_geojson, PointRow,
};
use crate::store::{EvaluationConfig, MethodResult, NetworkStore, TspEvaluation};
use crate::tsp::TspMethod;

/// Upper bound for uploaded files.
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Application state shared across handlers.
pub struct AppState {
    pub store: RwLock<NetworkStore>,
    pub evaluation: EvaluationConfig,
}

impl AppState {
    pub fn new(evaluation: EvaluationConfig) -> Self {
        Self {
            store: RwLock::new(NetworkStore::new()),
            evaluation,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(EvaluationConfig::default())
    }
}

/// Creates the API router from the server configuration.
pub fn create_router(config: &ServerConfig) -> Router {
    let state = Arc::new(AppState::new(config.evaluation()));
    router(state, &config.allowed_origins)
}

/// Builds the router around existing state, with CORS for `allowed_origins`.
pub fn router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    // Credentials rule out wildcards, so methods and headers are mirrored
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    Router::new()
        // Health & Info
        .route("/health", get(health))
        .route("/info", get(info))
        // Network
        .route("/upload/network", post(upload_network))
        .route("/network.geojson", get(get_network_geojson))
        .route("/network.wkt", get(get_network_wkt))
        // Points
        .route("/upload/points", post(upload_points))
        .route("/points.geojson", get(get_points_geojson))
        // TSP
        .route("/tsp/evaluate", get(evaluate_tsp))
        // Swagger UI at /q/swagger-ui (Quarkus-style path)
        .merge(SwaggerUi::new("/q/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Errors
// ============================================================================

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error class, e.g. `precondition` or `connectivity`.
    pub kind: &'static str,
    /// Human-readable message.
    pub detail: String,
}

/// A [`TspError`] on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub TspError);

impl From<TspError> for ApiError {
    fn from(err: TspError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        use crate::error::ErrorKind;
        match self.0.kind() {
            ErrorKind::Precondition | ErrorKind::Format => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Connectivity => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::InternalConsistency => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, "request rejected");
        }
        let body = ErrorResponse {
            kind: self.0.kind().as_str(),
            detail: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Health & Info
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always "ok".
    pub status: &'static str,
}

/// GET /health - Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Application info response.
#[derive(Debug, Serialize, ToSchema)]
pub struct InfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    /// Solver names accepted in evaluation results.
    pub methods: Vec<&'static str>,
}

/// GET /info - Application info endpoint.
#[utoipa::path(
    get,
    path = "/info",
    responses((status = 200, description = "Application info", body = InfoResponse))
)]
async fn info() -> Json<InfoResponse> {
    Json(InfoResponse {
        name: "Network TSP",
        version: env!("CARGO_PKG_VERSION"),
        methods: TspMethod::ALL.iter().map(|m| m.as_str()).collect(),
    })
}

// ============================================================================
// Uploads
// ============================================================================

/// Multipart form carrying one file.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// Returns the contents of the multipart field named `file`.
async fn read_upload(mut multipart: Multipart) -> Result<Bytes, ApiError> {
    let malformed = |e: axum::extract::multipart::MultipartError| {
        ApiError(TspError::Format(format!("malformed multipart body: {}", e)))
    };
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        if field.name() == Some("file") {
            return field.bytes().await.map_err(malformed);
        }
    }
    Err(ApiError(TspError::Format(
        "multipart field 'file' is missing".to_string(),
    )))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadNetworkResponse {
    pub ok: bool,
    /// Number of LineStrings loaded.
    pub lines: usize,
}

/// POST /upload/network - Replace the network with a GeoJSON FeatureCollection.
///
/// Previously integrated points are discarded.
#[utoipa::path(
    post,
    path = "/upload/network",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Network loaded", body = UploadNetworkResponse),
        (status = 400, description = "Malformed GeoJSON", body = ErrorResponse)
    )
)]
async fn upload_network(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<UploadNetworkResponse>, ApiError> {
    let bytes = read_upload(multipart).await?;
    let edges = parse_network_geojson(&bytes)?;
    let lines = state.store.write().load_network(edges)?;
    console::print_network_loaded(lines);
    Ok(Json(UploadNetworkResponse { ok: true, lines }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadPointsResponse {
    pub ok: bool,
    pub points_integrated: usize,
    pub total_points: usize,
    pub edges_after_split: usize,
}

/// POST /upload/points - Snap CSV points (id, lat, lon) into the network.
///
/// The upload is all-or-nothing: if any row fails, no point is added.
#[utoipa::path(
    post,
    path = "/upload/points",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Points integrated", body = UploadPointsResponse),
        (status = 400, description = "No network loaded or malformed CSV", body = ErrorResponse)
    )
)]
async fn upload_points(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<UploadPointsResponse>, ApiError> {
    let bytes = read_upload(multipart).await?;

    let response = tokio::task::spawn_blocking(move || {
        let rows = parse_points_csv(&bytes)?;
        integrate_points(&state, &rows)
    })
    .await
    .map_err(|e| TspError::InternalConsistency(format!("point upload task failed: {}", e)))??;

    console::print_points_integrated(
        response.points_integrated,
        response.total_points,
        response.edges_after_split,
    );
    Ok(Json(response))
}

/// Snaps `rows` into the store, all or nothing.
///
/// The rows are integrated into a copy which replaces the store only when
/// every row succeeds.
fn integrate_points(state: &AppState, rows: &[PointRow]) -> Result<UploadPointsResponse, TspError> {
    let mut store = state.store.write();
    if !store.has_network() {
        return Err(TspError::Precondition(
            "no network loaded; upload a network first".to_string(),
        ));
    }
    let mut next = store.clone();
    let points_integrated = next.snap_points(rows)?;
    *store = next;
    Ok(UploadPointsResponse {
        ok: true,
        points_integrated,
        total_points: store.point_count(),
        edges_after_split: store.edge_count(),
    })
}

// ============================================================================
// Exports
// ============================================================================

/// GET /network.geojson - Current network, including splits.
#[utoipa::path(
    get,
    path = "/network.geojson",
    responses(
        (status = 200, description = "FeatureCollection of LineStrings", body = Object),
        (status = 404, description = "No network loaded", body = ErrorResponse)
    )
)]
async fn get_network_geojson(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FeatureCollection>, ApiError> {
    let store = state.store.read();
    Ok(Json(network_to_geojson(store.export_network()?)))
}

/// GET /network.wkt - Current network as a WKT MULTILINESTRING.
#[utoipa::path(
    get,
    path = "/network.wkt",
    responses(
        (status = 200, description = "WKT text", body = String, content_type = "text/plain"),
        (status = 404, description = "No network loaded", body = ErrorResponse)
    )
)]
async fn get_network_wkt(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let wkt = state.store.read().export_network_wkt()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], wkt).into_response())
}

/// GET /points.geojson - Snapped points with their distance to the network.
#[utoipa::path(
    get,
    path = "/points.geojson",
    responses(
        (status = 200, description = "FeatureCollection of Points", body = Object),
        (status = 404, description = "No points integrated", body = ErrorResponse)
    )
)]
async fn get_points_geojson(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FeatureCollection>, ApiError> {
    let store = state.store.read();
    Ok(Json(points_to_geojson(store.export_snapped_points()?)))
}

// ============================================================================
// TSP
// ============================================================================

/// One solver's route.
#[derive(Debug, Serialize, ToSchema)]
pub struct MethodResultDto {
    pub route: Vec<usize>,
    pub route_ids: Vec<String>,
    /// Network distance in meters.
    pub distance: f64,
    pub elapsed_seconds: f64,
    /// GeoJSON LineString along the network.
    #[schema(value_type = Object)]
    pub route_geometry: Geometry,
}

impl MethodResultDto {
    fn from_result(result: &MethodResult) -> Self {
        Self {
            route: result.route.clone(),
            route_ids: result.route_ids.clone(),
            distance: result.distance,
            elapsed_seconds: result.elapsed_seconds,
            route_geometry: route_to_geojson(&result.route_geometry),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EvaluationResponse {
    pub point_count: usize,
    /// Keyed by method name.
    pub results: BTreeMap<String, MethodResultDto>,
    /// Methods that were not run.
    pub skipped: Vec<String>,
}

impl EvaluationResponse {
    pub fn from_evaluation(evaluation: &TspEvaluation) -> Self {
        Self {
            point_count: evaluation.point_count,
            results: evaluation
                .results
                .iter()
                .map(|(name, r)| (name.clone(), MethodResultDto::from_result(r)))
                .collect(),
            skipped: evaluation.skipped.clone(),
        }
    }
}

/// GET /tsp/evaluate - Solve the TSP over all points with every method.
#[utoipa::path(
    get,
    path = "/tsp/evaluate",
    responses(
        (status = 200, description = "Per-method routes", body = EvaluationResponse),
        (status = 400, description = "No network or fewer than 2 points", body = ErrorResponse),
        (status = 422, description = "Points are not mutually reachable", body = ErrorResponse)
    )
)]
async fn evaluate_tsp(
    State(state): State<Arc<AppState>>,
) -> Result<Json<EvaluationResponse>, ApiError> {
    let snapshot = state.store.read().clone();
    let config = state.evaluation.clone();

    let evaluation = tokio::task::spawn_blocking(move || snapshot.evaluate_tsp(&config))
        .await
        .map_err(|e| TspError::InternalConsistency(format!("evaluation task failed: {}", e)))??;

    console::print_evaluation(&evaluation);
    Ok(Json(EvaluationResponse::from_evaluation(&evaluation)))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        info,
        upload_network,
        get_network_geojson,
        get_network_wkt,
        upload_points,
        get_points_geojson,
        evaluate_tsp,
    ),
    components(schemas(
        HealthResponse,
        InfoResponse,
        ErrorResponse,
        UploadForm,
        UploadNetworkResponse,
        UploadPointsResponse,
        MethodResultDto,
        EvaluationResponse,
    ))
)]
struct ApiDoc;
