//! HTTP handlers for the classifier and shop lookup endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, Query, State, multipart::MultipartError, rejection::JsonRejection},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use leafscan::{Pipeline, decode_data_uri};
use serde::Deserialize;
use shops::{Coordinates, ShopLookup, shops_to_geojson};
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult};
use crate::responses::{AnalyzeResponse, HealthResponse, LabelsResponse, ShopsResponse};

pub const UPLOAD_MISSING: &str = "Please upload an image.";
pub const CAPTURE_MISSING: &str = "No photo captured.";

/// State shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Classifier; clones share one model
    pub pipeline: Pipeline,

    /// Nearby shop search
    pub shops: Arc<dyn ShopLookup>,

    /// Immutable server configuration
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(pipeline: Pipeline, shops: Arc<dyn ShopLookup>, config: ServerConfig) -> Self {
        Self {
            pipeline,
            shops,
            config: Arc::new(config),
        }
    }

    async fn classify(&self, bytes: Vec<u8>) -> ApiResult<AnalyzeResponse> {
        let result = self
            .pipeline
            .process_with_timeout(bytes, self.config.inference_timeout())
            .await?;
        info!(label = %result.label, confidence = result.confidence, "Analyzed leaf");
        Ok(result.into())
    }
}

/// Fields of the analyze form, as posted by the upload page
#[derive(Debug, Default)]
struct AnalyzeForm {
    action: Option<String>,
    leaf_image: Option<Vec<u8>>,
    captured_image: Option<String>,
}

enum Submission {
    Upload(Vec<u8>),
    Capture(String),
}

impl AnalyzeForm {
    async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(form_error)? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("action") => form.action = Some(field.text().await.map_err(form_error)?),
                Some("leaf_image") => form.leaf_image = Some(field.bytes().await.map_err(form_error)?.to_vec()),
                Some("captured_image") => form.captured_image = Some(field.text().await.map_err(form_error)?),
                other => debug!(field = ?other, "Ignoring form field"),
            }
        }

        Ok(form)
    }

    /// Pick the image to classify. Without an explicit action, whichever
    /// field carries data wins, upload first.
    fn submission(self) -> ApiResult<Submission> {
        let upload = self.leaf_image.filter(|bytes| !bytes.is_empty());
        let capture = self.captured_image.filter(|uri| !uri.trim().is_empty());

        match self.action.as_deref().map(str::trim) {
            Some("upload") => upload.map(Submission::Upload).ok_or_else(|| ApiError::bad_request(UPLOAD_MISSING)),
            Some("webcam") => capture.map(Submission::Capture).ok_or_else(|| ApiError::bad_request(CAPTURE_MISSING)),
            Some(other) => Err(ApiError::bad_request(format!("Unknown action: {}", other))),
            None => upload
                .map(Submission::Upload)
                .or_else(|| capture.map(Submission::Capture))
                .ok_or_else(|| ApiError::bad_request(UPLOAD_MISSING)),
        }
    }
}

fn form_error(err: MultipartError) -> ApiError {
    ApiError::with_code(err.status(), err.body_text(), "INVALID_FORM")
}

/// Body of `POST /api/analyze`
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Data URI or bare base64 image
    pub image: String,
}

/// Query parameters for the shop endpoints
#[derive(Debug, Deserialize)]
pub struct ShopQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
    /// `geojson` for a FeatureCollection, JSON list otherwise
    pub format: Option<String>,
}

/// POST /analyze - Classify an uploaded or captured photo (multipart form)
pub async fn analyze_form(State(state): State<AppState>, multipart: Multipart) -> ApiResult<Json<AnalyzeResponse>> {
    let bytes = match AnalyzeForm::read(multipart).await?.submission()? {
        Submission::Upload(bytes) => bytes,
        Submission::Capture(uri) => decode_data_uri(&uri)?,
    };
    Ok(Json(state.classify(bytes).await?))
}

/// POST /api/analyze - Classify a base64 image (JSON body)
pub async fn analyze_json(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let Json(request) = payload?;
    if request.image.trim().is_empty() {
        return Err(ApiError::bad_request(CAPTURE_MISSING));
    }
    let bytes = decode_data_uri(&request.image)?;
    Ok(Json(state.classify(bytes).await?))
}

/// GET /api/labels - Ordered label catalog
pub async fn list_labels(State(state): State<AppState>) -> Json<LabelsResponse> {
    Json(LabelsResponse::from(state.pipeline.catalog()))
}

/// GET /api/fertilizer-shops - Shops near `lat`/`lng`
pub async fn fertilizer_shops(State(state): State<AppState>, Query(params): Query<ShopQuery>) -> ApiResult<Response> {
    let geojson = match params.format.as_deref() {
        None | Some("json") => false,
        Some("geojson") => true,
        Some(other) => return Err(ApiError::bad_request(format!("Unsupported format: {}", other))),
    };

    let coords = Coordinates::parse(params.lat.as_deref(), params.lng.as_deref())?;
    let shops = state.shops.find_shops(coords).await?;

    if geojson {
        Ok(Json(shops_to_geojson(&shops)).into_response())
    } else {
        Ok(Json(ShopsResponse { shops }).into_response())
    }
}

/// GET /api/health - Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "leafscan".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        classes: state.pipeline.catalog().len(),
    })
}

/// Create router with all endpoints
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/labels", get(list_labels))
        .route("/analyze", post(analyze_form))
        .route("/api/analyze", post(analyze_json))
        .route("/api/fertilizer-shops", get(fertilizer_shops))
        .route("/api/fertilizer-shops-mapbox", get(fertilizer_shops))
}
