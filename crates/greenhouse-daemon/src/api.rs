//! REST API handlers

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use greenhouse_core::{ControlError, SelectedFile, SwitchAction, WateringRequest};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::state::AppState;

/// API error response
#[derive(Serialize)]
struct ApiError {
    error: String,
}

impl ApiError {
    fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

fn control_error(err: ControlError) -> Response {
    let status = match &err {
        ControlError::InvalidFileType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ControlError::NoImageSelected | ControlError::Superseded => StatusCode::CONFLICT,
        ControlError::InvalidSector(_)
        | ControlError::InvalidDuration(_)
        | ControlError::InvalidBrightness(_) => StatusCode::BAD_REQUEST,
        ControlError::TaskFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiError::new(err.to_string()))).into_response()
}

/// Parse an optional JSON body; `None` when the body is empty
fn parse_optional_body<T: DeserializeOwned>(body: &Bytes) -> Result<Option<T>, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body).map(Some).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(format!("Invalid request body: {}", e))),
        )
            .into_response()
    })
}

/// Parse an optional JSON body; an empty body yields the default request
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, Response> {
    parse_optional_body(body).map(Option::unwrap_or_default)
}

/// Get the full page document
pub async fn get_page(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.page.snapshot())
}

/// Upload query parameters
#[derive(Deserialize)]
pub struct UploadQuery {
    /// Original file name
    name: Option<String>,
}

/// Upload an image; the body is the raw file and `Content-Type` its media type
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let media_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .unwrap_or_default()
        .trim()
        .to_string();
    let name = query.name.unwrap_or_else(|| "upload".to_string());
    debug!(name = %name, media_type = %media_type, bytes = body.len(), "Image upload received");

    let file = SelectedFile::new(name, media_type, body.to_vec());
    match state.upload.handle_upload(file).await {
        Ok(image) => (StatusCode::CREATED, Json(image)).into_response(),
        Err(e) => control_error(e),
    }
}

/// Get the current image, its dimensions and the last analysis result
pub async fn get_image(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = state.upload.status().await;
    if status.image.is_none() {
        return (StatusCode::NOT_FOUND, Json(ApiError::new("No image uploaded"))).into_response();
    }
    Json(status).into_response()
}

/// Clear the current image and restore the upload prompt
pub async fn reset_image(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.upload.reset_upload_area().await;
    Json(serde_json::json!({ "status": "reset" }))
}

/// Start a simulated analysis of the current image
pub async fn analyze_image(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.upload.request_analysis().await {
        Ok(_pending) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({
                "status": "analyzing",
                "delay_ms": state.config.analysis.delay_ms
            })),
        )
            .into_response(),
        Err(e) => control_error(e),
    }
}

/// Watering duration for API requests that name no duration
const API_WATERING_SECS: u64 = 10;

/// Manual watering request body
#[derive(Debug, Deserialize)]
pub struct WaterPlantsRequest {
    sector: Option<u8>,
    /// Seconds
    duration: Option<u64>,
}

/// Water a sector; without a body this is the dashboard's water button
pub async fn water_plants(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    let req: Option<WaterPlantsRequest> = match parse_optional_body(&body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };

    let (request, result) = match req {
        None => {
            state.devices.activate_watering().await;
            let request = WateringRequest {
                sector: state.config.devices.default_sector,
                duration_secs: state.config.devices.watering_duration_secs,
            };
            (request, Ok(()))
        }
        Some(req) => {
            let request = WateringRequest {
                sector: req.sector.unwrap_or(state.config.devices.default_sector),
                duration_secs: req.duration.unwrap_or(API_WATERING_SECS),
            };
            (request, state.devices.activate_watering_with(request).await)
        }
    };

    match result {
        Ok(()) => {
            info!(sector = request.sector, duration = request.duration_secs, "Manual watering");
            Json(serde_json::json!({
                "message": format!(
                    "Watering sector {} for {} seconds",
                    request.sector, request.duration_secs
                ),
                "success": true
            }))
            .into_response()
        }
        Err(e) => control_error(e),
    }
}

/// Switch request body for fan and lights
#[derive(Debug, Default, Deserialize)]
pub struct SwitchRequest {
    #[serde(default)]
    action: SwitchAction,
    /// Light brightness (percent), ignored for the fan
    brightness: Option<u8>,
}

/// Manual fan control
pub async fn toggle_fan(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    let req: SwitchRequest = match parse_body(&body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };

    let ventilation = state.devices.set_ventilation(req.action).await;
    Json(serde_json::json!({
        "message": format!("Fan {} command sent", req.action),
        "success": true,
        "state": ventilation
    }))
    .into_response()
}

/// Manual grow light control
pub async fn toggle_lights(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    let req: SwitchRequest = match parse_body(&body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };

    match state.devices.set_light(req.action, req.brightness).await {
        Ok(applied) => Json(serde_json::json!({
            "message": format!(
                "Lights {} command sent (brightness: {}%)",
                req.action, applied.brightness
            ),
            "success": true,
            "state": applied.state,
            "brightness": applied.brightness
        }))
        .into_response(),
        Err(e) => control_error(e),
    }
}

/// Get sensor readings, device states and the last analysis
pub async fn system_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let devices = state.devices.status().await;
    let readings = state.sensors.lock().await.read(&devices);
    let analysis = state.upload.status().await;
    Json(serde_json::json!({
        "soil_moisture": readings.soil_moisture,
        "temperature": readings.temperature,
        "humidity": readings.humidity,
        "fan_status": readings.fan_status,
        "light_status": readings.light_status,
        "devices": devices,
        "analysis": analysis,
        "last_updated": readings.last_updated
    }))
}

/// Get current configuration
pub async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.config.clone())
}
