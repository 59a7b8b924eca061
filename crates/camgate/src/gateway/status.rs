//! Closed mappings from raw firmware codes to stable tags.
//!
//! Codes the firmware adds later map to `Unknown` rather than failing.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStatus {
    NotCapture,
    NormalCapture,
    TimelapseCapture,
    IntervalShootingCapture,
    SingleShooting,
    HdrShooting,
    SelfTimerShooting,
    BulletTimeCapture,
    SettingsNewValue,
    HdrCapture,
    BurstShooting,
    StaticTimelapseShooting,
    IntervalVideoCapture,
    TimeshiftCapture,
    AebNightShooting,
    SinglePowerPanoShooting,
    HdrPowerPanoShooting,
    SuperNormalCapture,
    LoopRecordingCapture,
    StarlapseShooting,
    Unknown,
}

impl CaptureStatus {
    pub fn from_code(code: u32) -> Self {
        use CaptureStatus::*;
        match code {
            0 => NotCapture,
            1 => NormalCapture,
            2 => TimelapseCapture,
            3 => IntervalShootingCapture,
            4 => SingleShooting,
            5 => HdrShooting,
            6 => SelfTimerShooting,
            7 => BulletTimeCapture,
            8 => SettingsNewValue,
            9 => HdrCapture,
            10 => BurstShooting,
            11 => StaticTimelapseShooting,
            12 => IntervalVideoCapture,
            13 => TimeshiftCapture,
            14 => AebNightShooting,
            15 => SinglePowerPanoShooting,
            16 => HdrPowerPanoShooting,
            17 => SuperNormalCapture,
            18 => LoopRecordingCapture,
            19 => StarlapseShooting,
            _ => Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        use CaptureStatus::*;
        match self {
            NotCapture => "not_capture",
            NormalCapture => "normal_capture",
            TimelapseCapture => "timelapse_capture",
            IntervalShootingCapture => "interval_shooting_capture",
            SingleShooting => "single_shooting",
            HdrShooting => "hdr_shooting",
            SelfTimerShooting => "self_timer_shooting",
            BulletTimeCapture => "bullet_time_capture",
            SettingsNewValue => "settings_new_value",
            HdrCapture => "hdr_capture",
            BurstShooting => "burst_shooting",
            StaticTimelapseShooting => "static_timelapse_shooting",
            IntervalVideoCapture => "interval_video_capture",
            TimeshiftCapture => "timeshift_capture",
            AebNightShooting => "aeb_night_shooting",
            SinglePowerPanoShooting => "single_power_pano_shooting",
            HdrPowerPanoShooting => "hdr_power_pano_shooting",
            SuperNormalCapture => "super_normal_capture",
            LoopRecordingCapture => "loop_recording_capture",
            StarlapseShooting => "starlapse_shooting",
            Unknown => "unknown",
        }
    }

    pub fn is_capturing(&self) -> bool {
        !matches!(self, CaptureStatus::NotCapture | CaptureStatus::Unknown)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageCardState {
    Pass,
    NoCard,
    NoSpace,
    InvalidFormat,
    WriteProtected,
    OtherError,
    Unknown,
}

impl StorageCardState {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => StorageCardState::Pass,
            1 => StorageCardState::NoCard,
            2 => StorageCardState::NoSpace,
            3 => StorageCardState::InvalidFormat,
            4 => StorageCardState::WriteProtected,
            5 => StorageCardState::OtherError,
            _ => StorageCardState::Unknown,
        }
    }
}
