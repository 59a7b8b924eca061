//! Scripted camera that records every handle call.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use camgate::device::{
    BatteryStatus, CaptureSettings, DeviceDescriptor, DeviceDiscovery, DeviceError, DeviceHandle,
    DeviceResult, ExposureSettings, FunctionMode, LiveStreamParams, PowerSource, Progress,
    RecordParams, StorageStatus, TimelapseMode, TimelapseParams,
};
use camgate::gateway::{Gateway, GatewayConfig};
use camgate::session::SessionManager;
use camgate::settings::SettingsDefaults;

pub const SERIAL: &str = "SCRIPT01";

#[derive(Debug, Default)]
pub struct Script {
    pub calls: Vec<String>,
    pub fail_connect: bool,
    pub fail_open: bool,
    pub exposure: Option<ExposureSettings>,
    pub capture: Option<CaptureSettings>,
    pub fail_reads: bool,
    pub reject_writes: bool,
    pub pushed_exposure: Vec<(FunctionMode, ExposureSettings)>,
    pub pushed_capture: Vec<(FunctionMode, CaptureSettings)>,
    pub failing_downloads: HashSet<String>,
    pub recorded_files: Vec<String>,
    pub capture_code: u32,
}

#[derive(Clone, Default)]
pub struct ScriptedCamera {
    script: Arc<Mutex<Script>>,
}

impl ScriptedCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<String> {
        self.script().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.script().calls.clear();
    }

    fn log(&self, call: impl Into<String>) {
        self.script().calls.push(call.into());
    }
}

impl DeviceDiscovery for ScriptedCamera {
    fn discover(&self) -> DeviceResult<Vec<DeviceDescriptor>> {
        Ok(vec![DeviceDescriptor {
            serial_number: SERIAL.to_string(),
            model: "Scripted".to_string(),
        }])
    }

    fn connect(&self, descriptor: &DeviceDescriptor) -> DeviceResult<Box<dyn DeviceHandle>> {
        if self.script().fail_connect {
            return Err(DeviceError::new(format!(
                "{} refused the connection",
                descriptor.serial_number
            )));
        }
        Ok(Box::new(self.clone()))
    }
}

impl DeviceHandle for ScriptedCamera {
    fn open(&mut self) -> DeviceResult<()> {
        self.log("open");
        if self.script().fail_open {
            return Err(DeviceError::new("usb handshake timed out"));
        }
        Ok(())
    }

    fn close(&mut self) {
        self.log("close");
    }

    fn take_photo(&mut self) -> DeviceResult<String> {
        self.log("take_photo");
        Ok("/DCIM/Camera01/IMG_0001.insp".to_string())
    }

    fn start_recording(&mut self, _params: &RecordParams) -> DeviceResult<()> {
        self.log("start_recording");
        Ok(())
    }

    fn stop_recording(&mut self) -> DeviceResult<Vec<String>> {
        self.log("stop_recording");
        Ok(self.script().recorded_files.clone())
    }

    fn start_timelapse(&mut self, _params: &TimelapseParams) -> DeviceResult<()> {
        self.log("start_timelapse");
        Ok(())
    }

    fn stop_timelapse(&mut self, _mode: TimelapseMode) -> DeviceResult<Vec<String>> {
        self.log("stop_timelapse");
        Ok(Vec::new())
    }

    fn list_files(&mut self) -> DeviceResult<Vec<String>> {
        self.log("list_files");
        Ok(Vec::new())
    }

    fn delete_file(&mut self, uri: &str) -> DeviceResult<()> {
        self.log(format!("delete_file {}", uri));
        Ok(())
    }

    fn download_file(
        &mut self,
        uri: &str,
        local_path: &Path,
        progress: Progress<'_>,
    ) -> DeviceResult<()> {
        self.log(format!("download_file {}", uri));
        if self.script().failing_downloads.contains(uri) {
            return Err(DeviceError::new(format!("transfer of {} aborted", uri)));
        }
        progress(4, 4);
        std::fs::write(local_path, b"data").map_err(|e| DeviceError::new(e.to_string()))
    }

    fn start_live_stream(&mut self, _params: &LiveStreamParams) -> DeviceResult<()> {
        self.log("start_live_stream");
        Ok(())
    }

    fn stop_live_stream(&mut self) -> DeviceResult<()> {
        self.log("stop_live_stream");
        Ok(())
    }

    fn exposure_settings(&mut self, mode: FunctionMode) -> DeviceResult<Option<ExposureSettings>> {
        self.log(format!("exposure_settings {}", mode));
        let script = self.script();
        if script.fail_reads {
            return Err(DeviceError::new("read failed"));
        }
        Ok(script.exposure)
    }

    fn set_exposure_settings(
        &mut self,
        mode: FunctionMode,
        settings: &ExposureSettings,
    ) -> DeviceResult<()> {
        self.log(format!("set_exposure_settings {}", mode));
        let mut script = self.script();
        if script.reject_writes {
            return Err(DeviceError::new("SetExposureSettings failed"));
        }
        script.pushed_exposure.push((mode, *settings));
        Ok(())
    }

    fn capture_settings(&mut self, mode: FunctionMode) -> DeviceResult<Option<CaptureSettings>> {
        self.log(format!("capture_settings {}", mode));
        let script = self.script();
        if script.fail_reads {
            return Err(DeviceError::new("read failed"));
        }
        Ok(script.capture)
    }

    fn set_capture_settings(
        &mut self,
        mode: FunctionMode,
        settings: &CaptureSettings,
    ) -> DeviceResult<()> {
        self.log(format!("set_capture_settings {}", mode));
        let mut script = self.script();
        if script.reject_writes {
            return Err(DeviceError::new("SetCaptureSettings failed"));
        }
        script.pushed_capture.push((mode, *settings));
        Ok(())
    }

    fn battery_status(&mut self) -> DeviceResult<BatteryStatus> {
        self.log("battery_status");
        Ok(BatteryStatus {
            power_source: PowerSource::Adapter,
            level: 50,
            scale: 100,
        })
    }

    fn storage_status(&mut self) -> DeviceResult<StorageStatus> {
        self.log("storage_status");
        Ok(StorageStatus {
            free_space: 1,
            total_space: 2,
            card_state: 0,
        })
    }

    fn capture_status(&mut self) -> DeviceResult<u32> {
        self.log("capture_status");
        Ok(self.script().capture_code)
    }

    fn serial_number(&mut self) -> DeviceResult<String> {
        self.log("serial_number");
        Ok(SERIAL.to_string())
    }

    fn uuid(&mut self) -> DeviceResult<String> {
        self.log("uuid");
        Ok("00000000-0000-0000-0000-000000000001".to_string())
    }
}

pub fn gateway_config(save_dir: &Path) -> GatewayConfig {
    GatewayConfig {
        save_dir: save_dir.to_path_buf(),
        public_prefix: "http://media.local/media".to_string(),
        defaults: SettingsDefaults::default(),
    }
}

/// Gateway over a scripted camera, session not yet opened.
pub fn scripted_gateway(save_dir: &Path) -> (Gateway, ScriptedCamera) {
    let camera = ScriptedCamera::new();
    let session = Arc::new(SessionManager::new(Arc::new(camera.clone())));
    (Gateway::new(session, gateway_config(save_dir)), camera)
}

/// Gateway over a scripted camera with the session Ready and the call log cleared.
pub async fn ready_gateway(save_dir: &Path) -> (Gateway, ScriptedCamera) {
    let (gateway, camera) = scripted_gateway(save_dir);
    gateway.session().open().await.unwrap();
    camera.clear_calls();
    (gateway, camera)
}
