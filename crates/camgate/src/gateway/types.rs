//! Request and response payloads for gateway capabilities.

use serde::{Deserialize, Serialize};

use super::status::{CaptureStatus, StorageCardState};
use crate::device::{
    BatteryStatus, LiveStreamParams, PowerSource, RecordParams, StorageStatus, TimelapseMode,
    TimelapseParams, VideoResolution,
};
use crate::error::{GatewayError, GatewayResult};
use crate::files::FileOutcome;

const BYTES_PER_GB: f64 = 1_000_000_000.0;

/// `width`, `height` and `fps` override a resolution only when all three are given.
fn resolution(
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
) -> GatewayResult<Option<VideoResolution>> {
    match (width, height, fps) {
        (None, None, None) => Ok(None),
        (Some(width), Some(height), Some(fps)) => {
            Ok(Some(VideoResolution::new(width, height, fps)))
        }
        _ => Err(GatewayError::invalid_argument(
            "width, height and fps must be given together",
        )),
    }
}

/// Overrides for the default recording parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingRequest {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub bitrate: Option<u32>,
}

impl RecordingRequest {
    pub fn params(&self) -> GatewayResult<RecordParams> {
        let defaults = RecordParams::default();
        Ok(RecordParams {
            resolution: resolution(self.width, self.height, self.fps)?
                .unwrap_or(defaults.resolution),
            bitrate: self.bitrate.unwrap_or(defaults.bitrate),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStreamRequest {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub bitrate: Option<u32>,
    pub enable_audio: Option<bool>,
}

impl LiveStreamRequest {
    pub fn params(&self) -> GatewayResult<LiveStreamParams> {
        let defaults = LiveStreamParams::default();
        Ok(LiveStreamParams {
            resolution: resolution(self.width, self.height, self.fps)?
                .unwrap_or(defaults.resolution),
            bitrate: self.bitrate.unwrap_or(defaults.bitrate),
            enable_audio: self.enable_audio.unwrap_or(defaults.enable_audio),
            ..defaults
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelapseRequest {
    pub mode: Option<TimelapseMode>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    /// Seconds, 0 for unbounded.
    #[serde(rename = "duration")]
    pub duration_s: Option<u32>,
    #[serde(rename = "interval")]
    pub interval_ms: Option<u32>,
    pub accelerate: Option<u32>,
}

impl TimelapseRequest {
    pub fn params(&self) -> GatewayResult<TimelapseParams> {
        let defaults = TimelapseParams::default();
        Ok(TimelapseParams {
            mode: self.mode.unwrap_or(defaults.mode),
            resolution: resolution(self.width, self.height, self.fps)?
                .unwrap_or(defaults.resolution),
            duration_s: self.duration_s.unwrap_or(defaults.duration_s),
            interval_ms: self.interval_ms.unwrap_or(defaults.interval_ms),
            accelerate: self.accelerate.unwrap_or(defaults.accelerate),
        })
    }
}

/// Simple acknowledgement for toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub message: String,
}

impl Ack {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFiles {
    pub files: Vec<FileOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileList {
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedFile {
    pub deleted_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryInfo {
    pub power_source: PowerSource,
    pub battery_level: u32,
    pub battery_scale: u32,
}

impl From<BatteryStatus> for BatteryInfo {
    fn from(status: BatteryStatus) -> Self {
        Self {
            power_source: status.power_source,
            battery_level: status.level,
            battery_scale: status.scale,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub free_space_gb: f64,
    pub total_space_gb: f64,
    pub state: StorageCardState,
}

impl From<StorageStatus> for StorageInfo {
    fn from(status: StorageStatus) -> Self {
        Self {
            free_space_gb: status.free_space as f64 / BYTES_PER_GB,
            total_space_gb: status.total_space as f64 / BYTES_PER_GB,
            state: StorageCardState::from_code(status.card_state),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureStatusInfo {
    pub status: CaptureStatus,
    pub capturing: bool,
    pub code: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialNumber {
    pub serial_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialNumbers {
    pub serial_numbers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceUuid {
    pub uuid: String,
}
