//! HTTP surface for the gateway.
//!
//! Routes mirror the camera API under `/api/v1`. Every capability takes its
//! arguments from the query string (`cameraIndex` plus capability fields) and
//! answers with the JSON [`Outcome`] envelope.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::device::{FunctionMode, TimelapseMode};
use crate::error::{ErrorKind, GatewayError, Outcome};
use crate::gateway::{Gateway, LiveStreamRequest, RecordingRequest, TimelapseRequest};
use crate::settings::{CaptureSettingsRequest, ExposureRequest};

pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/api/v1/healthy", get(healthy))
        .route("/api/v1/status", get(status))
        .route("/api/v1/reconnect", post(reconnect))
        .route("/api/v1/serialNumbers", get(serial_numbers))
        .route("/api/v1/getSerialNumber", post(serial_number))
        .route("/api/v1/getUUID", post(device_uuid))
        .route("/api/v1/takePhoto", post(take_photo))
        .route("/api/v1/startRecording", post(start_recording))
        .route("/api/v1/stopRecording", post(stop_recording))
        .route("/api/v1/startTimelapse", post(start_timelapse))
        .route("/api/v1/stopTimelapse", post(stop_timelapse))
        .route("/api/v1/startLiveStream", post(start_live_stream))
        .route("/api/v1/stopLiveStream", post(stop_live_stream))
        .route("/api/v1/getFileLists", post(list_files))
        .route("/api/v1/deleteFile", post(delete_file))
        .route("/api/v1/downloadFile", post(download_file))
        .route("/api/v1/getBatteryInfo", post(battery_info))
        .route("/api/v1/getStorageInfo", post(storage_info))
        .route("/api/v1/getCurrentCaptureStatus", post(capture_status))
        .route("/api/v1/getExposureSettings", post(exposure_settings))
        .route("/api/v1/setExposureSettings", post(set_exposure_settings))
        .route("/api/v1/getCaptureSettings", post(capture_settings))
        .route("/api/v1/setCaptureSettings", post(set_capture_settings))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(gateway)
}

/// HTTP status for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidIndex | ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorKind::DeviceNotReady => StatusCode::CONFLICT,
        ErrorKind::DeviceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::SettingsRejected => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::DeviceOperationFailed | ErrorKind::DownloadFailed => StatusCode::BAD_GATEWAY,
    }
}

fn respond<T: Serialize>(outcome: Outcome<T>) -> Response {
    let status = outcome.error_kind.map(status_for).unwrap_or(StatusCode::OK);
    (status, Json(outcome)).into_response()
}

/// A request rejected before it reached the gateway.
pub struct ApiError(GatewayError);

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(GatewayError::invalid_argument(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        respond(Outcome::<()>::failure(&self.0))
    }
}

type ApiResult = Result<Response, ApiError>;

/// Query extraction that reports malformed input as `invalid_argument`.
type Params<T> = Result<Query<T>, QueryRejection>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CameraQuery {
    camera_index: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModeQuery {
    function_mode: Option<FunctionMode>,
}

#[derive(Debug, Deserialize)]
struct TimelapseStopQuery {
    mode: Option<TimelapseMode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteQuery {
    #[serde(default)]
    file_to_delete: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadQuery {
    #[serde(default)]
    file_to_download: String,
}

async fn healthy() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], "Healthy")
}

async fn status(State(gateway): State<Arc<Gateway>>) -> impl IntoResponse {
    Json(gateway.status())
}

async fn reconnect(
    State(gateway): State<Arc<Gateway>>,
    camera: Params<CameraQuery>,
) -> ApiResult {
    let Query(camera) = camera?;
    Ok(respond(gateway.reconnect(camera.camera_index).await))
}

async fn serial_numbers(State(gateway): State<Arc<Gateway>>) -> Response {
    respond(gateway.serial_numbers())
}

async fn serial_number(
    State(gateway): State<Arc<Gateway>>,
    camera: Params<CameraQuery>,
) -> ApiResult {
    let Query(camera) = camera?;
    Ok(respond(gateway.serial_number(camera.camera_index).await))
}

async fn device_uuid(
    State(gateway): State<Arc<Gateway>>,
    camera: Params<CameraQuery>,
) -> ApiResult {
    let Query(camera) = camera?;
    Ok(respond(gateway.uuid(camera.camera_index).await))
}

async fn take_photo(
    State(gateway): State<Arc<Gateway>>,
    camera: Params<CameraQuery>,
) -> ApiResult {
    let Query(camera) = camera?;
    Ok(respond(gateway.take_photo(camera.camera_index).await))
}

async fn start_recording(
    State(gateway): State<Arc<Gateway>>,
    camera: Params<CameraQuery>,
    request: Params<RecordingRequest>,
) -> ApiResult {
    let Query(camera) = camera?;
    let Query(request) = request?;
    Ok(respond(gateway.start_recording(camera.camera_index, request).await))
}

async fn stop_recording(
    State(gateway): State<Arc<Gateway>>,
    camera: Params<CameraQuery>,
) -> ApiResult {
    let Query(camera) = camera?;
    Ok(respond(gateway.stop_recording(camera.camera_index).await))
}

async fn start_timelapse(
    State(gateway): State<Arc<Gateway>>,
    camera: Params<CameraQuery>,
    request: Params<TimelapseRequest>,
) -> ApiResult {
    let Query(camera) = camera?;
    let Query(request) = request?;
    Ok(respond(gateway.start_timelapse(camera.camera_index, request).await))
}

async fn stop_timelapse(
    State(gateway): State<Arc<Gateway>>,
    camera: Params<CameraQuery>,
    stop: Params<TimelapseStopQuery>,
) -> ApiResult {
    let Query(camera) = camera?;
    let Query(stop) = stop?;
    Ok(respond(gateway.stop_timelapse(camera.camera_index, stop.mode).await))
}

async fn start_live_stream(
    State(gateway): State<Arc<Gateway>>,
    camera: Params<CameraQuery>,
    request: Params<LiveStreamRequest>,
) -> ApiResult {
    let Query(camera) = camera?;
    let Query(request) = request?;
    Ok(respond(gateway.start_live_stream(camera.camera_index, request).await))
}

async fn stop_live_stream(
    State(gateway): State<Arc<Gateway>>,
    camera: Params<CameraQuery>,
) -> ApiResult {
    let Query(camera) = camera?;
    Ok(respond(gateway.stop_live_stream(camera.camera_index).await))
}

async fn list_files(
    State(gateway): State<Arc<Gateway>>,
    camera: Params<CameraQuery>,
) -> ApiResult {
    let Query(camera) = camera?;
    Ok(respond(gateway.list_files(camera.camera_index).await))
}

async fn delete_file(
    State(gateway): State<Arc<Gateway>>,
    camera: Params<CameraQuery>,
    target: Params<DeleteQuery>,
) -> ApiResult {
    let Query(camera) = camera?;
    let Query(target) = target?;
    Ok(respond(
        gateway
            .delete_file(camera.camera_index, &target.file_to_delete)
            .await,
    ))
}

async fn download_file(
    State(gateway): State<Arc<Gateway>>,
    camera: Params<CameraQuery>,
    target: Params<DownloadQuery>,
) -> ApiResult {
    let Query(camera) = camera?;
    let Query(target) = target?;
    Ok(respond(
        gateway
            .download_file(camera.camera_index, &target.file_to_download)
            .await,
    ))
}

async fn battery_info(
    State(gateway): State<Arc<Gateway>>,
    camera: Params<CameraQuery>,
) -> ApiResult {
    let Query(camera) = camera?;
    Ok(respond(gateway.battery_info(camera.camera_index).await))
}

async fn storage_info(
    State(gateway): State<Arc<Gateway>>,
    camera: Params<CameraQuery>,
) -> ApiResult {
    let Query(camera) = camera?;
    Ok(respond(gateway.storage_info(camera.camera_index).await))
}

async fn capture_status(
    State(gateway): State<Arc<Gateway>>,
    camera: Params<CameraQuery>,
) -> ApiResult {
    let Query(camera) = camera?;
    Ok(respond(gateway.capture_status(camera.camera_index).await))
}

async fn exposure_settings(
    State(gateway): State<Arc<Gateway>>,
    camera: Params<CameraQuery>,
    mode: Params<ModeQuery>,
) -> ApiResult {
    let Query(camera) = camera?;
    let Query(mode) = mode?;
    Ok(respond(
        gateway
            .exposure_settings(camera.camera_index, mode.function_mode)
            .await,
    ))
}

async fn set_exposure_settings(
    State(gateway): State<Arc<Gateway>>,
    camera: Params<CameraQuery>,
    request: Params<ExposureRequest>,
) -> ApiResult {
    let Query(camera) = camera?;
    let Query(request) = request?;
    Ok(respond(
        gateway
            .set_exposure_settings(camera.camera_index, request)
            .await,
    ))
}

async fn capture_settings(
    State(gateway): State<Arc<Gateway>>,
    camera: Params<CameraQuery>,
    mode: Params<ModeQuery>,
) -> ApiResult {
    let Query(camera) = camera?;
    let Query(mode) = mode?;
    Ok(respond(
        gateway
            .capture_settings(camera.camera_index, mode.function_mode)
            .await,
    ))
}

async fn set_capture_settings(
    State(gateway): State<Arc<Gateway>>,
    camera: Params<CameraQuery>,
    request: Params<CaptureSettingsRequest>,
) -> ApiResult {
    let Query(camera) = camera?;
    let Query(request) = request?;
    Ok(respond(
        gateway
            .set_capture_settings(camera.camera_index, request)
            .await,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::sim::SimulatedCamera;
    use crate::gateway::GatewayConfig;
    use crate::session::SessionManager;
    use crate::settings::SettingsDefaults;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn setup_test_gateway() -> (Arc<Gateway>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let session = Arc::new(SessionManager::new(Arc::new(SimulatedCamera::new("SIM0001"))));
        session.open().await.unwrap();
        let gateway = Gateway::new(
            session,
            GatewayConfig {
                save_dir: temp_dir.path().to_path_buf(),
                public_prefix: "/media".to_string(),
                defaults: SettingsDefaults::default(),
            },
        );
        (Arc::new(gateway), temp_dir)
    }

    async fn call(app: Router, method: Method, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn test_healthy() {
        let (gateway, _temp_dir) = setup_test_gateway().await;
        let response = router(gateway)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/healthy")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Healthy");
    }

    #[tokio::test]
    async fn test_take_photo() {
        let (gateway, _temp_dir) = setup_test_gateway().await;
        let (status, json) =
            call(router(gateway), Method::POST, "/api/v1/takePhoto?cameraIndex=0").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["ok"], true);
        assert!(json["data"]["publicLocator"]
            .as_str()
            .unwrap()
            .starts_with("/media/"));
    }

    #[tokio::test]
    async fn test_invalid_index_is_bad_request() {
        let (gateway, _temp_dir) = setup_test_gateway().await;
        let (status, json) =
            call(router(gateway), Method::POST, "/api/v1/takePhoto?cameraIndex=3").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["errorKind"], "invalid_index");
    }

    #[tokio::test]
    async fn test_missing_or_malformed_index() {
        let (gateway, _temp_dir) = setup_test_gateway().await;

        let (status, json) = call(router(gateway.clone()), Method::POST, "/api/v1/getUUID").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["errorKind"], "invalid_argument");

        let (status, json) =
            call(router(gateway), Method::POST, "/api/v1/getUUID?cameraIndex=zero").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["errorKind"], "invalid_argument");
    }

    #[tokio::test]
    async fn test_not_ready_is_conflict() {
        let (gateway, _temp_dir) = setup_test_gateway().await;
        gateway.session().close().await;

        let (status, json) =
            call(router(gateway), Method::POST, "/api/v1/getFileLists?cameraIndex=0").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["errorKind"], "device_not_ready");
    }

    #[tokio::test]
    async fn test_set_exposure_from_query() {
        let (gateway, _temp_dir) = setup_test_gateway().await;
        let (status, json) = call(
            router(gateway),
            Method::POST,
            "/api/v1/setExposureSettings?cameraIndex=0&iso=1600&exposureMode=manual",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["applied"]["iso"], 1600);
        assert_eq!(json["data"]["applied"]["exposureMode"], "manual");
        assert_eq!(json["data"]["applied"]["bias"], 0);
        assert_eq!(json["data"]["reloaded"], true);
    }

    #[tokio::test]
    async fn test_partial_resolution_rejected() {
        let (gateway, _temp_dir) = setup_test_gateway().await;
        let (status, json) = call(
            router(gateway),
            Method::POST,
            "/api/v1/startRecording?cameraIndex=0&width=1920",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["errorKind"], "invalid_argument");
    }

    #[tokio::test]
    async fn test_malformed_field_is_bad_request() {
        let (gateway, _temp_dir) = setup_test_gateway().await;
        let (status, json) = call(
            router(gateway),
            Method::POST,
            "/api/v1/setExposureSettings?cameraIndex=0&iso=high",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["errorKind"], "invalid_argument");
    }

    #[tokio::test]
    async fn test_timelapse_from_query() {
        let (gateway, _temp_dir) = setup_test_gateway().await;
        let (status, json) = call(
            router(gateway.clone()),
            Method::POST,
            "/api/v1/startTimelapse?cameraIndex=0&mode=image&width=1920&height=960&fps=30&interval=500",
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", json);
        assert_eq!(json["data"]["message"], "Timelapse started, interval 500 ms");

        let (status, json) = call(
            router(gateway),
            Method::POST,
            "/api/v1/stopTimelapse?cameraIndex=0&mode=mobile_image",
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", json);
        assert!(json["data"]["files"].is_array());
    }

    #[tokio::test]
    async fn test_set_capture_white_balance_alias() {
        let (gateway, _temp_dir) = setup_test_gateway().await;
        let (status, json) = call(
            router(gateway),
            Method::POST,
            "/api/v1/setCaptureSettings?cameraIndex=0&whiteBalance=4000K&functionMode=video",
        )
        .await;

        assert_eq!(status, StatusCode::OK, "{}", json);
        assert_eq!(json["data"]["applied"]["whiteBalance"], "4000k");
        assert_eq!(json["data"]["functionMode"], "normal_video");
    }

    #[tokio::test]
    async fn test_status_and_serial_numbers() {
        let (gateway, _temp_dir) = setup_test_gateway().await;

        let (status, json) = call(router(gateway.clone()), Method::GET, "/api/v1/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["state"], "ready");
        assert_eq!(json["serialNumber"], "SIM0001");

        let (_, json) = call(router(gateway), Method::GET, "/api/v1/serialNumbers").await;
        assert_eq!(json["data"]["serialNumbers"][0], "SIM0001");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::SettingsRejected), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorKind::DeviceUnavailable), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(ErrorKind::DownloadFailed), StatusCode::BAD_GATEWAY);
    }
}
