//! Gateway facade - the single entry point for camera capabilities.
//!
//! Each capability validates its camera index first (only index 0 exists),
//! then runs through [`SessionManager::with_device`] so it holds the session
//! ticket for its whole duration. Results come back as [`Outcome`]; nothing
//! escapes as a panic or a bare error.

pub mod status;
pub mod types;

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use camconf::CamConfig;

use crate::device::{CaptureSettings, ExposureSettings, FunctionMode, TimelapseMode};
use crate::error::{GatewayError, GatewayResult, Outcome};
use crate::files::{FileMaterializer, FileRef};
use crate::session::{OperationTicket, SessionManager, SessionStatus};
use crate::settings::{
    AppliedSettings, CaptureSettingsRequest, ExposureRequest, SettingsDefaults, SettingsReading,
    SettingsReconciler,
};

pub use status::{CaptureStatus, StorageCardState};
pub use types::{
    Ack, BatchFiles, BatteryInfo, CaptureStatusInfo, DeletedFile, DeviceUuid, FileList,
    LiveStreamRequest, RecordingRequest, SerialNumber, SerialNumbers, StorageInfo,
    TimelapseRequest,
};

/// The only camera index this gateway serves.
pub const CAMERA_INDEX: i64 = 0;

/// Construction-time settings for the gateway core.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub save_dir: PathBuf,
    pub public_prefix: String,
    pub defaults: SettingsDefaults,
}

impl GatewayConfig {
    pub fn from_config(config: &CamConfig) -> Result<Self> {
        Ok(Self {
            save_dir: config.infra.paths.save_dir.clone(),
            public_prefix: config.infra.media.public_prefix.clone(),
            defaults: SettingsDefaults::from_config(&config.bootstrap.defaults)?,
        })
    }
}

pub struct Gateway {
    session: Arc<SessionManager>,
    settings: Arc<SettingsReconciler>,
    files: Arc<FileMaterializer>,
}

fn check_index(index: i64) -> GatewayResult<()> {
    if index == CAMERA_INDEX {
        Ok(())
    } else {
        Err(GatewayError::InvalidIndex(index))
    }
}

fn require_uri(uri: &str, what: &str) -> GatewayResult<String> {
    let uri = uri.trim();
    if uri.is_empty() {
        return Err(GatewayError::invalid_argument(format!("{} is required", what)));
    }
    Ok(uri.to_string())
}

fn finish<T>(operation: &'static str, result: GatewayResult<T>) -> Outcome<T> {
    match &result {
        Ok(_) => debug!(operation, "operation succeeded"),
        Err(e) => warn!(operation, kind = e.kind().as_str(), error = %e, "operation failed"),
    }
    result.into()
}

impl Gateway {
    pub fn new(session: Arc<SessionManager>, config: GatewayConfig) -> Self {
        Self {
            session,
            settings: Arc::new(SettingsReconciler::new(config.defaults)),
            files: Arc::new(FileMaterializer::new(config.save_dir, config.public_prefix)),
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    async fn run<T, F>(&self, operation: &'static str, index: i64, op: F) -> Outcome<T>
    where
        F: FnOnce(&mut OperationTicket) -> GatewayResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let result = match check_index(index) {
            Ok(()) => self.session.with_device(op).await,
            Err(e) => Err(e),
        };
        finish(operation, result)
    }

    /// Capture a still and download it, all under one ticket.
    #[tracing::instrument(skip(self))]
    pub async fn take_photo(&self, index: i64) -> Outcome<FileRef> {
        let files = self.files.clone();
        self.run("take_photo", index, move |ticket| {
            let device = ticket.device()?;
            let uri = device.take_photo()?;
            if uri.trim().is_empty() {
                return Err(GatewayError::DeviceOperationFailed(
                    "camera reported no file for the photo".to_string(),
                ));
            }
            files.download(device, &uri)
        })
        .await
    }

    pub async fn start_recording(&self, index: i64, request: RecordingRequest) -> Outcome<Ack> {
        let params = match check_index(index).and_then(|_| request.params()) {
            Ok(params) => params,
            Err(e) => return finish("start_recording", Err(e)),
        };
        self.run("start_recording", index, move |ticket| {
            ticket.device()?.start_recording(&params)?;
            Ok(Ack::new(format!("Recording started at {}", params.resolution)))
        })
        .await
    }

    /// Stop recording and download every file the camera produced.
    #[tracing::instrument(skip(self))]
    pub async fn stop_recording(&self, index: i64) -> Outcome<BatchFiles> {
        let files = self.files.clone();
        self.run("stop_recording", index, move |ticket| {
            let device = ticket.device()?;
            let uris = device.stop_recording()?;
            if uris.is_empty() {
                return Err(GatewayError::DeviceOperationFailed(
                    "recording stopped but the camera reported no files".to_string(),
                ));
            }
            Ok(BatchFiles {
                files: files.download_many(device, &uris),
            })
        })
        .await
    }

    pub async fn start_timelapse(&self, index: i64, request: TimelapseRequest) -> Outcome<Ack> {
        let params = match check_index(index).and_then(|_| request.params()) {
            Ok(params) => params,
            Err(e) => return finish("start_timelapse", Err(e)),
        };
        self.run("start_timelapse", index, move |ticket| {
            ticket.device()?.start_timelapse(&params)?;
            Ok(Ack::new(format!(
                "Timelapse started, interval {} ms",
                params.interval_ms
            )))
        })
        .await
    }

    pub async fn stop_timelapse(
        &self,
        index: i64,
        mode: Option<TimelapseMode>,
    ) -> Outcome<BatchFiles> {
        let files = self.files.clone();
        self.run("stop_timelapse", index, move |ticket| {
            let device = ticket.device()?;
            let mode = mode.unwrap_or(TimelapseMode::MobileVideo);
            let uris = device.stop_timelapse(mode)?;
            Ok(BatchFiles {
                files: files.download_many(device, &uris),
            })
        })
        .await
    }

    pub async fn start_live_stream(&self, index: i64, request: LiveStreamRequest) -> Outcome<Ack> {
        let params = match check_index(index).and_then(|_| request.params()) {
            Ok(params) => params,
            Err(e) => return finish("start_live_stream", Err(e)),
        };
        self.run("start_live_stream", index, move |ticket| {
            ticket.device()?.start_live_stream(&params)?;
            Ok(Ack::new("Live stream started"))
        })
        .await
    }

    pub async fn stop_live_stream(&self, index: i64) -> Outcome<Ack> {
        self.run("stop_live_stream", index, move |ticket| {
            ticket.device()?.stop_live_stream()?;
            Ok(Ack::new("Live stream stopped"))
        })
        .await
    }

    pub async fn list_files(&self, index: i64) -> Outcome<FileList> {
        self.run("list_files", index, move |ticket| {
            Ok(FileList {
                files: ticket.device()?.list_files()?,
            })
        })
        .await
    }

    pub async fn delete_file(&self, index: i64, uri: &str) -> Outcome<DeletedFile> {
        let uri = match check_index(index).and_then(|_| require_uri(uri, "fileToDelete")) {
            Ok(uri) => uri,
            Err(e) => return finish("delete_file", Err(e)),
        };
        self.run("delete_file", index, move |ticket| {
            ticket.device()?.delete_file(&uri)?;
            Ok(DeletedFile { deleted_file: uri })
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn download_file(&self, index: i64, uri: &str) -> Outcome<FileRef> {
        let uri = match check_index(index).and_then(|_| require_uri(uri, "fileToDownload")) {
            Ok(uri) => uri,
            Err(e) => return finish("download_file", Err(e)),
        };
        let files = self.files.clone();
        self.run("download_file", index, move |ticket| {
            files.download(ticket.device()?, &uri)
        })
        .await
    }

    pub async fn battery_info(&self, index: i64) -> Outcome<BatteryInfo> {
        self.run("battery_info", index, move |ticket| {
            Ok(BatteryInfo::from(ticket.device()?.battery_status()?))
        })
        .await
    }

    pub async fn storage_info(&self, index: i64) -> Outcome<StorageInfo> {
        self.run("storage_info", index, move |ticket| {
            Ok(StorageInfo::from(ticket.device()?.storage_status()?))
        })
        .await
    }

    pub async fn capture_status(&self, index: i64) -> Outcome<CaptureStatusInfo> {
        self.run("capture_status", index, move |ticket| {
            let code = ticket.device()?.capture_status()?;
            let status = CaptureStatus::from_code(code);
            Ok(CaptureStatusInfo {
                status,
                capturing: status.is_capturing(),
                code,
            })
        })
        .await
    }

    pub async fn exposure_settings(
        &self,
        index: i64,
        mode: Option<FunctionMode>,
    ) -> Outcome<SettingsReading<ExposureSettings>> {
        let settings = self.settings.clone();
        self.run("exposure_settings", index, move |ticket| {
            settings.read::<ExposureRequest>(ticket, mode)
        })
        .await
    }

    /// Merge a partial exposure update onto the current values, write, reload.
    #[tracing::instrument(skip(self))]
    pub async fn set_exposure_settings(
        &self,
        index: i64,
        request: ExposureRequest,
    ) -> Outcome<AppliedSettings<ExposureSettings>> {
        let settings = self.settings.clone();
        self.run("set_exposure_settings", index, move |ticket| {
            settings.reconcile_exposure(ticket, &request)
        })
        .await
    }

    pub async fn capture_settings(
        &self,
        index: i64,
        mode: Option<FunctionMode>,
    ) -> Outcome<SettingsReading<CaptureSettings>> {
        let settings = self.settings.clone();
        self.run("capture_settings", index, move |ticket| {
            settings.read::<CaptureSettingsRequest>(ticket, mode)
        })
        .await
    }

    /// Merge a partial capture-settings update onto the current values, write, reload.
    #[tracing::instrument(skip(self))]
    pub async fn set_capture_settings(
        &self,
        index: i64,
        request: CaptureSettingsRequest,
    ) -> Outcome<AppliedSettings<CaptureSettings>> {
        let settings = self.settings.clone();
        self.run("set_capture_settings", index, move |ticket| {
            settings.reconcile_capture(ticket, &request)
        })
        .await
    }

    pub async fn serial_number(&self, index: i64) -> Outcome<SerialNumber> {
        self.run("serial_number", index, move |ticket| {
            Ok(SerialNumber {
                serial_number: ticket.device()?.serial_number()?,
            })
        })
        .await
    }

    /// Serial numbers seen by the last discovery. Does not touch the camera.
    pub fn serial_numbers(&self) -> Outcome<SerialNumbers> {
        Outcome::success(SerialNumbers {
            serial_numbers: self.session.serial_numbers(),
        })
    }

    pub async fn uuid(&self, index: i64) -> Outcome<DeviceUuid> {
        self.run("uuid", index, move |ticket| {
            Ok(DeviceUuid {
                uuid: ticket.device()?.uuid()?,
            })
        })
        .await
    }

    /// Retry `open` after an error, or reload a Ready session.
    pub async fn reconnect(&self, index: i64) -> Outcome<SessionStatus> {
        let result = match check_index(index) {
            Ok(()) => self.session.reconnect().await,
            Err(e) => Err(e),
        };
        finish("reconnect", result)
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }
}
