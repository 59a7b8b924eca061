//! Bootstrap configuration - fallback values the device core starts from.
//!
//! Values are kept as plain strings and numbers here; camgate parses them into
//! its own typed enums at startup so this crate stays dependency-light.

use serde::{Deserialize, Serialize};

/// Exposure values used when the device cannot report its current ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureDefaults {
    #[serde(default)]
    pub bias: i32,

    /// Shutter speed in seconds.
    #[serde(default = "ExposureDefaults::default_shutter_speed")]
    pub shutter_speed: f64,

    #[serde(default = "ExposureDefaults::default_iso")]
    pub iso: u32,

    #[serde(default = "ExposureDefaults::default_exposure_mode")]
    pub exposure_mode: String,
}

impl ExposureDefaults {
    fn default_shutter_speed() -> f64 {
        1.0 / 120.0
    }

    fn default_iso() -> u32 {
        800
    }

    fn default_exposure_mode() -> String {
        "auto".to_string()
    }
}

impl Default for ExposureDefaults {
    fn default() -> Self {
        Self {
            bias: 0,
            shutter_speed: Self::default_shutter_speed(),
            iso: Self::default_iso(),
            exposure_mode: Self::default_exposure_mode(),
        }
    }
}

/// Capture (image tuning) values used when the device cannot report its current ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureDefaults {
    #[serde(default = "CaptureDefaults::default_contrast")]
    pub contrast: i32,

    #[serde(default = "CaptureDefaults::default_saturation")]
    pub saturation: i32,

    #[serde(default)]
    pub brightness: i32,

    #[serde(default = "CaptureDefaults::default_sharpness")]
    pub sharpness: i32,

    #[serde(default = "CaptureDefaults::default_white_balance")]
    pub white_balance: String,
}

impl CaptureDefaults {
    fn default_contrast() -> i32 {
        64
    }

    fn default_saturation() -> i32 {
        64
    }

    fn default_sharpness() -> i32 {
        3
    }

    fn default_white_balance() -> String {
        "auto".to_string()
    }
}

impl Default for CaptureDefaults {
    fn default() -> Self {
        Self {
            contrast: Self::default_contrast(),
            saturation: Self::default_saturation(),
            brightness: 0,
            sharpness: Self::default_sharpness(),
            white_balance: Self::default_white_balance(),
        }
    }
}

/// Defaults applied by the settings reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Function mode used when a settings request does not name one.
    #[serde(default = "DefaultsConfig::default_function_mode")]
    pub function_mode: String,

    #[serde(default)]
    pub exposure: ExposureDefaults,

    #[serde(default)]
    pub capture: CaptureDefaults,
}

impl DefaultsConfig {
    fn default_function_mode() -> String {
        "normal_image".to_string()
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            function_mode: Self::default_function_mode(),
            exposure: ExposureDefaults::default(),
            capture: CaptureDefaults::default(),
        }
    }
}

/// Bootstrap section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub defaults: DefaultsConfig,
}
