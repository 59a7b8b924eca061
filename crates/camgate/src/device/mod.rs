//! Device capability boundary.
//!
//! The vendor SDK is consumed through two traits: [`DeviceDiscovery`] finds
//! cameras and builds handles, [`DeviceHandle`] exposes the primitive calls on
//! one opened camera. Handles are not thread-safe from the SDK's point of view;
//! the session layer guarantees only one caller touches a handle at a time, so
//! the trait takes `&mut self` everywhere and only requires `Send`.

pub mod sim;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Failure reported by the device layer. The message is passed through verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct DeviceError(pub String);

impl DeviceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type DeviceResult<T> = Result<T, DeviceError>;

/// Download progress callback: `(bytes_transferred, total_bytes)`.
pub type Progress<'a> = &'a mut dyn FnMut(u64, u64);

/// Device-defined operating mode that scopes which settings apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionMode {
    #[serde(alias = "image", alias = "photo")]
    NormalImage,
    #[serde(alias = "video")]
    NormalVideo,
    Timelapse,
    Burst,
    Hdr,
    Interval,
}

impl FunctionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionMode::NormalImage => "normal_image",
            FunctionMode::NormalVideo => "normal_video",
            FunctionMode::Timelapse => "timelapse",
            FunctionMode::Burst => "burst",
            FunctionMode::Hdr => "hdr",
            FunctionMode::Interval => "interval",
        }
    }
}

impl fmt::Display for FunctionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FunctionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal_image" | "image" | "photo" => Ok(FunctionMode::NormalImage),
            "normal_video" | "video" => Ok(FunctionMode::NormalVideo),
            "timelapse" => Ok(FunctionMode::Timelapse),
            "burst" => Ok(FunctionMode::Burst),
            "hdr" => Ok(FunctionMode::Hdr),
            "interval" => Ok(FunctionMode::Interval),
            other => Err(format!("unknown function mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposureMode {
    Auto,
    FullAuto,
    Manual,
    IsoPriority,
    ShutterPriority,
}

impl FromStr for ExposureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ExposureMode::Auto),
            "full_auto" => Ok(ExposureMode::FullAuto),
            "manual" => Ok(ExposureMode::Manual),
            "iso_priority" => Ok(ExposureMode::IsoPriority),
            "shutter_priority" => Ok(ExposureMode::ShutterPriority),
            other => Err(format!("unknown exposure mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WhiteBalance {
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "2700k", alias = "2700K")]
    K2700,
    #[serde(rename = "4000k", alias = "4000K")]
    K4000,
    #[serde(rename = "5000k", alias = "5000K")]
    K5000,
    #[serde(rename = "6500k", alias = "6500K")]
    K6500,
    #[serde(rename = "7500k", alias = "7500K")]
    K7500,
}

impl FromStr for WhiteBalance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(WhiteBalance::Auto),
            "2700k" => Ok(WhiteBalance::K2700),
            "4000k" => Ok(WhiteBalance::K4000),
            "5000k" => Ok(WhiteBalance::K5000),
            "6500k" => Ok(WhiteBalance::K6500),
            "7500k" => Ok(WhiteBalance::K7500),
            other => Err(format!("unknown white balance: {}", other)),
        }
    }
}

/// Exposure settings for one function mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureSettings {
    /// EV bias; the device documents -80..=80 in steps of 1.
    pub bias: i32,
    /// Shutter speed in seconds.
    pub shutter_speed: f64,
    pub iso: u32,
    pub exposure_mode: ExposureMode,
}

/// Image tuning settings for one function mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSettings {
    pub contrast: i32,
    pub saturation: i32,
    pub brightness: i32,
    pub sharpness: i32,
    pub white_balance: WhiteBalance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoResolution {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl VideoResolution {
    pub const RES_3040_3040P24: Self = Self::new(3040, 3040, 24);
    pub const RES_3920_1920P30: Self = Self::new(3920, 1920, 30);
    pub const RES_720_360P30: Self = Self::new(720, 360, 30);

    pub const fn new(width: u32, height: u32, fps: u32) -> Self {
        Self { width, height, fps }
    }
}

impl fmt::Display for VideoResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}p{}", self.width, self.height, self.fps)
    }
}

/// Video capture parameters pushed before recording starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordParams {
    pub resolution: VideoResolution,
    /// Bits per second.
    pub bitrate: u32,
}

impl Default for RecordParams {
    fn default() -> Self {
        Self {
            resolution: VideoResolution::RES_3040_3040P24,
            bitrate: 1024 * 1024 * 10,
        }
    }
}

/// Preview stream parameters. Media bytes flow to an external stream server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveStreamParams {
    pub resolution: VideoResolution,
    pub lrv_resolution: VideoResolution,
    pub bitrate: u32,
    pub enable_audio: bool,
    pub using_lrv: bool,
}

impl Default for LiveStreamParams {
    fn default() -> Self {
        Self {
            resolution: VideoResolution::RES_720_360P30,
            lrv_resolution: VideoResolution::RES_720_360P30,
            bitrate: 1024 * 1024 / 2,
            enable_audio: false,
            using_lrv: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelapseMode {
    #[serde(alias = "video")]
    MobileVideo,
    #[serde(alias = "image")]
    MobileImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelapseParams {
    pub mode: TimelapseMode,
    pub resolution: VideoResolution,
    /// Total duration in seconds, 0 for unbounded.
    pub duration_s: u32,
    pub interval_ms: u32,
    pub accelerate: u32,
}

impl Default for TimelapseParams {
    fn default() -> Self {
        Self {
            mode: TimelapseMode::MobileVideo,
            resolution: VideoResolution::RES_3920_1920P30,
            duration_s: 0,
            interval_ms: 1000,
            accelerate: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerSource {
    Battery,
    Adapter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryStatus {
    pub power_source: PowerSource,
    pub level: u32,
    pub scale: u32,
}

/// Storage report. `card_state` is the raw device code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStatus {
    pub free_space: u64,
    pub total_space: u64,
    pub card_state: u32,
}

/// One camera found by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub serial_number: String,
    pub model: String,
}

/// Primitive operations on one opened camera.
pub trait DeviceHandle: Send {
    fn open(&mut self) -> DeviceResult<()>;
    fn close(&mut self);

    /// Capture a still. Returns the device URI of the new file.
    fn take_photo(&mut self) -> DeviceResult<String>;

    fn start_recording(&mut self, params: &RecordParams) -> DeviceResult<()>;
    /// Returns the device URIs of the recorded files (one per lens on some models).
    fn stop_recording(&mut self) -> DeviceResult<Vec<String>>;

    fn start_timelapse(&mut self, params: &TimelapseParams) -> DeviceResult<()>;
    fn stop_timelapse(&mut self, mode: TimelapseMode) -> DeviceResult<Vec<String>>;

    fn list_files(&mut self) -> DeviceResult<Vec<String>>;
    fn delete_file(&mut self, uri: &str) -> DeviceResult<()>;
    fn download_file(&mut self, uri: &str, local_path: &Path, progress: Progress<'_>)
        -> DeviceResult<()>;

    fn start_live_stream(&mut self, params: &LiveStreamParams) -> DeviceResult<()>;
    fn stop_live_stream(&mut self) -> DeviceResult<()>;

    fn exposure_settings(&mut self, mode: FunctionMode) -> DeviceResult<Option<ExposureSettings>>;
    fn set_exposure_settings(
        &mut self,
        mode: FunctionMode,
        settings: &ExposureSettings,
    ) -> DeviceResult<()>;

    fn capture_settings(&mut self, mode: FunctionMode) -> DeviceResult<Option<CaptureSettings>>;
    fn set_capture_settings(
        &mut self,
        mode: FunctionMode,
        settings: &CaptureSettings,
    ) -> DeviceResult<()>;

    fn battery_status(&mut self) -> DeviceResult<BatteryStatus>;
    fn storage_status(&mut self) -> DeviceResult<StorageStatus>;
    /// Raw capture status code as reported by the firmware.
    fn capture_status(&mut self) -> DeviceResult<u32>;

    fn serial_number(&mut self) -> DeviceResult<String>;
    fn uuid(&mut self) -> DeviceResult<String>;
}

/// Finds cameras and constructs handles for them.
pub trait DeviceDiscovery: Send + Sync {
    fn discover(&self) -> DeviceResult<Vec<DeviceDescriptor>>;
    fn connect(&self, descriptor: &DeviceDescriptor) -> DeviceResult<Box<dyn DeviceHandle>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_mode_parse() {
        assert_eq!("normal_image".parse::<FunctionMode>(), Ok(FunctionMode::NormalImage));
        assert_eq!(" VIDEO ".parse::<FunctionMode>(), Ok(FunctionMode::NormalVideo));
        assert!("slowmo".parse::<FunctionMode>().is_err());
    }

    #[test]
    fn test_white_balance_serde_tags() {
        let json = serde_json::to_string(&WhiteBalance::K4000).unwrap();
        assert_eq!(json, "\"4000k\"");
        assert_eq!("4000K".parse::<WhiteBalance>(), Ok(WhiteBalance::K4000));
        let upper: WhiteBalance = serde_json::from_str("\"6500K\"").unwrap();
        assert_eq!(upper, WhiteBalance::K6500);
    }

    #[test]
    fn test_mode_aliases_deserialize() {
        let mode: FunctionMode = serde_json::from_str("\"photo\"").unwrap();
        assert_eq!(mode, FunctionMode::NormalImage);
        let mode: TimelapseMode = serde_json::from_str("\"image\"").unwrap();
        assert_eq!(mode, TimelapseMode::MobileImage);
    }

    #[test]
    fn test_default_record_params() {
        let params = RecordParams::default();
        assert_eq!(params.resolution.to_string(), "3040x3040p24");
        assert_eq!(params.bitrate, 10 * 1024 * 1024);
    }
}
