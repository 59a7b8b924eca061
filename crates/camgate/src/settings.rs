//! Partial settings updates.
//!
//! Callers send only the fields they want to change. Everything else is read
//! back from the camera for the target function mode and merged, so an update
//! to `iso` never resets the shutter speed. Only when the camera cannot report
//! its current values do the configured defaults fill the gaps.
//!
//! A successful write leaves the SDK session stale, so every write is followed
//! by a reload under the same ticket before the caller sees success.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::{info, warn};

use camconf::DefaultsConfig;

use crate::device::{
    CaptureSettings, DeviceHandle, DeviceResult, ExposureMode, ExposureSettings, FunctionMode,
    WhiteBalance,
};
use crate::error::{GatewayError, GatewayResult};
use crate::session::OperationTicket;

/// Fallback values used when the camera cannot report its own.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsDefaults {
    pub function_mode: FunctionMode,
    pub exposure: ExposureSettings,
    pub capture: CaptureSettings,
}

impl Default for SettingsDefaults {
    fn default() -> Self {
        Self {
            function_mode: FunctionMode::NormalImage,
            exposure: ExposureSettings {
                bias: 0,
                shutter_speed: 1.0 / 120.0,
                iso: 800,
                exposure_mode: ExposureMode::Auto,
            },
            capture: CaptureSettings {
                contrast: 64,
                saturation: 64,
                brightness: 0,
                sharpness: 3,
                white_balance: WhiteBalance::Auto,
            },
        }
    }
}

impl SettingsDefaults {
    pub fn from_config(config: &DefaultsConfig) -> Result<Self> {
        Ok(Self {
            function_mode: config
                .function_mode
                .parse()
                .map_err(anyhow::Error::msg)
                .context("bootstrap.defaults.function_mode")?,
            exposure: ExposureSettings {
                bias: config.exposure.bias,
                shutter_speed: config.exposure.shutter_speed,
                iso: config.exposure.iso,
                exposure_mode: config
                    .exposure
                    .exposure_mode
                    .parse()
                    .map_err(anyhow::Error::msg)
                    .context("bootstrap.defaults.exposure.exposure_mode")?,
            },
            capture: CaptureSettings {
                contrast: config.capture.contrast,
                saturation: config.capture.saturation,
                brightness: config.capture.brightness,
                sharpness: config.capture.sharpness,
                white_balance: config
                    .capture
                    .white_balance
                    .parse()
                    .map_err(anyhow::Error::msg)
                    .context("bootstrap.defaults.capture.white_balance")?,
            },
        })
    }
}

/// Where the unset fields of a merge came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsBase {
    Device,
    Defaults,
}

/// Result of merging a request onto a base.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged<V> {
    pub function_mode: FunctionMode,
    pub values: V,
    pub base: SettingsBase,
}

/// What was pushed to the camera.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedSettings<V> {
    pub function_mode: FunctionMode,
    pub applied: V,
    pub base: SettingsBase,
    pub reloaded: bool,
}

/// Current settings for one function mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsReading<V> {
    pub function_mode: FunctionMode,
    pub settings: V,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureRequest {
    pub function_mode: Option<FunctionMode>,
    pub bias: Option<i32>,
    pub shutter_speed: Option<f64>,
    pub iso: Option<u32>,
    pub exposure_mode: Option<ExposureMode>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSettingsRequest {
    pub function_mode: Option<FunctionMode>,
    pub contrast: Option<i32>,
    pub saturation: Option<i32>,
    pub brightness: Option<i32>,
    pub sharpness: Option<i32>,
    pub white_balance: Option<WhiteBalance>,
}

/// A settings family the reconciler knows how to read, merge and write.
pub trait SettingsFamily {
    type Values: Copy + Debug + Send + 'static;

    const NAME: &'static str;

    fn function_mode(&self) -> Option<FunctionMode>;
    fn overlay(&self, base: Self::Values) -> Self::Values;
    fn defaults(defaults: &SettingsDefaults) -> Self::Values;
    fn read(device: &mut dyn DeviceHandle, mode: FunctionMode)
        -> DeviceResult<Option<Self::Values>>;
    fn write(
        device: &mut dyn DeviceHandle,
        mode: FunctionMode,
        values: &Self::Values,
    ) -> DeviceResult<()>;
}

impl SettingsFamily for ExposureRequest {
    type Values = ExposureSettings;

    const NAME: &'static str = "exposure";

    fn function_mode(&self) -> Option<FunctionMode> {
        self.function_mode
    }

    fn overlay(&self, base: ExposureSettings) -> ExposureSettings {
        ExposureSettings {
            bias: self.bias.unwrap_or(base.bias),
            shutter_speed: self.shutter_speed.unwrap_or(base.shutter_speed),
            iso: self.iso.unwrap_or(base.iso),
            exposure_mode: self.exposure_mode.unwrap_or(base.exposure_mode),
        }
    }

    fn defaults(defaults: &SettingsDefaults) -> ExposureSettings {
        defaults.exposure
    }

    fn read(
        device: &mut dyn DeviceHandle,
        mode: FunctionMode,
    ) -> DeviceResult<Option<ExposureSettings>> {
        device.exposure_settings(mode)
    }

    fn write(
        device: &mut dyn DeviceHandle,
        mode: FunctionMode,
        values: &ExposureSettings,
    ) -> DeviceResult<()> {
        device.set_exposure_settings(mode, values)
    }
}

impl SettingsFamily for CaptureSettingsRequest {
    type Values = CaptureSettings;

    const NAME: &'static str = "capture";

    fn function_mode(&self) -> Option<FunctionMode> {
        self.function_mode
    }

    fn overlay(&self, base: CaptureSettings) -> CaptureSettings {
        CaptureSettings {
            contrast: self.contrast.unwrap_or(base.contrast),
            saturation: self.saturation.unwrap_or(base.saturation),
            brightness: self.brightness.unwrap_or(base.brightness),
            sharpness: self.sharpness.unwrap_or(base.sharpness),
            white_balance: self.white_balance.unwrap_or(base.white_balance),
        }
    }

    fn defaults(defaults: &SettingsDefaults) -> CaptureSettings {
        defaults.capture
    }

    fn read(
        device: &mut dyn DeviceHandle,
        mode: FunctionMode,
    ) -> DeviceResult<Option<CaptureSettings>> {
        device.capture_settings(mode)
    }

    fn write(
        device: &mut dyn DeviceHandle,
        mode: FunctionMode,
        values: &CaptureSettings,
    ) -> DeviceResult<()> {
        device.set_capture_settings(mode, values)
    }
}

/// Merges partial requests and pushes the result to the camera.
#[derive(Debug, Clone, Default)]
pub struct SettingsReconciler {
    defaults: SettingsDefaults,
}

impl SettingsReconciler {
    pub fn new(defaults: SettingsDefaults) -> Self {
        Self { defaults }
    }

    /// Merge `request` onto whatever `read` reports for the target mode.
    ///
    /// A failed or empty read falls back to the configured defaults; it never
    /// fails the merge.
    pub fn merge<R, F>(&self, request: &R, read: F) -> Merged<R::Values>
    where
        R: SettingsFamily,
        F: FnOnce(FunctionMode) -> DeviceResult<Option<R::Values>>,
    {
        let function_mode = request.function_mode().unwrap_or(self.defaults.function_mode);
        let (current, base) = match read(function_mode) {
            Ok(Some(current)) => (current, SettingsBase::Device),
            Ok(None) => {
                warn!(
                    family = R::NAME,
                    mode = %function_mode,
                    "camera reported no settings, using defaults"
                );
                (R::defaults(&self.defaults), SettingsBase::Defaults)
            }
            Err(e) => {
                warn!(
                    family = R::NAME,
                    mode = %function_mode,
                    error = %e,
                    "settings read failed, using defaults"
                );
                (R::defaults(&self.defaults), SettingsBase::Defaults)
            }
        };

        Merged {
            function_mode,
            values: request.overlay(current),
            base,
        }
    }

    pub fn merge_exposure<F>(&self, request: &ExposureRequest, read: F) -> Merged<ExposureSettings>
    where
        F: FnOnce(FunctionMode) -> DeviceResult<Option<ExposureSettings>>,
    {
        self.merge(request, read)
    }

    pub fn merge_capture<F>(
        &self,
        request: &CaptureSettingsRequest,
        read: F,
    ) -> Merged<CaptureSettings>
    where
        F: FnOnce(FunctionMode) -> DeviceResult<Option<CaptureSettings>>,
    {
        self.merge(request, read)
    }

    /// Read, merge, write, then reload the session under the held ticket.
    pub fn reconcile<R: SettingsFamily>(
        &self,
        ticket: &mut OperationTicket,
        request: &R,
    ) -> GatewayResult<AppliedSettings<R::Values>> {
        let merged = {
            let device = ticket.device()?;
            self.merge(request, |mode| R::read(device, mode))
        };

        let device = ticket.device()?;
        R::write(device, merged.function_mode, &merged.values)
            .map_err(|e| GatewayError::SettingsRejected(e.to_string()))?;
        info!(
            family = R::NAME,
            mode = %merged.function_mode,
            values = ?merged.values,
            "settings written"
        );

        ticket.reload()?;

        Ok(AppliedSettings {
            function_mode: merged.function_mode,
            applied: merged.values,
            base: merged.base,
            reloaded: true,
        })
    }

    pub fn reconcile_exposure(
        &self,
        ticket: &mut OperationTicket,
        request: &ExposureRequest,
    ) -> GatewayResult<AppliedSettings<ExposureSettings>> {
        self.reconcile(ticket, request)
    }

    pub fn reconcile_capture(
        &self,
        ticket: &mut OperationTicket,
        request: &CaptureSettingsRequest,
    ) -> GatewayResult<AppliedSettings<CaptureSettings>> {
        self.reconcile(ticket, request)
    }

    /// Current settings for `mode` (or the default mode), without merging.
    pub fn read<R: SettingsFamily>(
        &self,
        ticket: &mut OperationTicket,
        mode: Option<FunctionMode>,
    ) -> GatewayResult<SettingsReading<R::Values>> {
        let function_mode = mode.unwrap_or(self.defaults.function_mode);
        let settings = R::read(ticket.device()?, function_mode)?.ok_or_else(|| {
            GatewayError::DeviceOperationFailed(format!(
                "camera reported no {} settings for {}",
                R::NAME,
                function_mode
            ))
        })?;
        Ok(SettingsReading {
            function_mode,
            settings,
        })
    }
}
