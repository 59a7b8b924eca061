//! In-memory camera used when no hardware backend is available.
//!
//! `SimulatedCamera` plays the role of both discovery and device: it reports a
//! single descriptor and hands out handles that share one in-memory state, so
//! files taken through one handle survive a reload.

use super::{
    BatteryStatus, CaptureSettings, DeviceDescriptor, DeviceDiscovery, DeviceError, DeviceHandle,
    DeviceResult, ExposureMode, ExposureSettings, FunctionMode, LiveStreamParams, PowerSource,
    Progress, RecordParams, StorageStatus, TimelapseMode, TimelapseParams, WhiteBalance,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const TOTAL_SPACE: u64 = 64 * 1024 * 1024 * 1024;
const CHUNK: usize = 64 * 1024;

#[derive(Debug, Default)]
struct SimState {
    opened: bool,
    files: Vec<(String, Vec<u8>)>,
    counter: u32,
    recording: Option<RecordParams>,
    timelapse: Option<TimelapseParams>,
    streaming: bool,
    exposure: HashMap<FunctionMode, ExposureSettings>,
    capture: HashMap<FunctionMode, CaptureSettings>,
}

impl SimState {
    fn next_name(&mut self, prefix: &str, ext: &str) -> String {
        self.counter += 1;
        format!("/DCIM/Camera01/{}_{:05}.{}", prefix, self.counter, ext)
    }

    fn store(&mut self, uri: String, size: usize) -> String {
        let body = uri.bytes().cycle().take(size).collect();
        self.files.push((uri.clone(), body));
        uri
    }

    fn used_space(&self) -> u64 {
        self.files.iter().map(|(_, b)| b.len() as u64).sum()
    }
}

/// Simulated camera backend.
#[derive(Debug, Clone)]
pub struct SimulatedCamera {
    serial_number: String,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedCamera {
    pub fn new(serial_number: impl Into<String>) -> Self {
        Self {
            serial_number: serial_number.into(),
            state: Arc::new(Mutex::new(SimState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DeviceDiscovery for SimulatedCamera {
    fn discover(&self) -> DeviceResult<Vec<DeviceDescriptor>> {
        Ok(vec![DeviceDescriptor {
            serial_number: self.serial_number.clone(),
            model: "Simulated 360".to_string(),
        }])
    }

    fn connect(&self, descriptor: &DeviceDescriptor) -> DeviceResult<Box<dyn DeviceHandle>> {
        if descriptor.serial_number != self.serial_number {
            return Err(DeviceError::new(format!(
                "no simulated camera with serial {}",
                descriptor.serial_number
            )));
        }
        Ok(Box::new(self.clone()))
    }
}

impl DeviceHandle for SimulatedCamera {
    fn open(&mut self) -> DeviceResult<()> {
        self.lock().opened = true;
        debug!(serial = %self.serial_number, "simulated camera opened");
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.lock();
        state.opened = false;
        state.streaming = false;
    }

    fn take_photo(&mut self) -> DeviceResult<String> {
        let mut state = self.lock();
        let uri = state.next_name("IMG", "insp");
        Ok(state.store(uri, 256 * 1024))
    }

    fn start_recording(&mut self, params: &RecordParams) -> DeviceResult<()> {
        let mut state = self.lock();
        if state.recording.is_some() {
            return Err(DeviceError::new("recording already in progress"));
        }
        state.recording = Some(*params);
        Ok(())
    }

    fn stop_recording(&mut self) -> DeviceResult<Vec<String>> {
        let mut state = self.lock();
        if state.recording.take().is_none() {
            return Err(DeviceError::new("no recording in progress"));
        }
        let front = state.next_name("VID", "insv");
        let back = front.replace("VID_", "VID_B_");
        Ok(vec![state.store(front, 512 * 1024), state.store(back, 512 * 1024)])
    }

    fn start_timelapse(&mut self, params: &TimelapseParams) -> DeviceResult<()> {
        let mut state = self.lock();
        if state.timelapse.is_some() {
            return Err(DeviceError::new("timelapse already in progress"));
        }
        state.timelapse = Some(*params);
        Ok(())
    }

    fn stop_timelapse(&mut self, mode: TimelapseMode) -> DeviceResult<Vec<String>> {
        let mut state = self.lock();
        match state.timelapse.take() {
            Some(params) if params.mode == mode => {
                let uri = state.next_name("LRV", "insv");
                Ok(vec![state.store(uri, 128 * 1024)])
            }
            Some(params) => {
                state.timelapse = Some(params);
                Err(DeviceError::new("timelapse mode mismatch"))
            }
            None => Err(DeviceError::new("no timelapse in progress")),
        }
    }

    fn list_files(&mut self) -> DeviceResult<Vec<String>> {
        Ok(self.lock().files.iter().map(|(uri, _)| uri.clone()).collect())
    }

    fn delete_file(&mut self, uri: &str) -> DeviceResult<()> {
        let mut state = self.lock();
        let before = state.files.len();
        state.files.retain(|(u, _)| u != uri);
        if state.files.len() == before {
            return Err(DeviceError::new(format!("file not found: {}", uri)));
        }
        Ok(())
    }

    fn download_file(
        &mut self,
        uri: &str,
        local_path: &Path,
        progress: Progress<'_>,
    ) -> DeviceResult<()> {
        let body = {
            let state = self.lock();
            state
                .files
                .iter()
                .find(|(u, _)| u == uri)
                .map(|(_, b)| b.clone())
                .ok_or_else(|| DeviceError::new(format!("file not found: {}", uri)))?
        };

        let total = body.len() as u64;
        let mut sent = 0u64;
        for chunk in body.chunks(CHUNK) {
            sent += chunk.len() as u64;
            progress(sent, total);
        }
        std::fs::write(local_path, &body)
            .map_err(|e| DeviceError::new(format!("write {}: {}", local_path.display(), e)))
    }

    fn start_live_stream(&mut self, _params: &LiveStreamParams) -> DeviceResult<()> {
        self.lock().streaming = true;
        Ok(())
    }

    fn stop_live_stream(&mut self) -> DeviceResult<()> {
        self.lock().streaming = false;
        Ok(())
    }

    fn exposure_settings(&mut self, mode: FunctionMode) -> DeviceResult<Option<ExposureSettings>> {
        let current = self.lock().exposure.get(&mode).copied();
        Ok(Some(current.unwrap_or(ExposureSettings {
            bias: 0,
            shutter_speed: 1.0 / 120.0,
            iso: 800,
            exposure_mode: ExposureMode::Auto,
        })))
    }

    fn set_exposure_settings(
        &mut self,
        mode: FunctionMode,
        settings: &ExposureSettings,
    ) -> DeviceResult<()> {
        if !(-80..=80).contains(&settings.bias) {
            return Err(DeviceError::new(format!("bias out of range: {}", settings.bias)));
        }
        self.lock().exposure.insert(mode, *settings);
        Ok(())
    }

    fn capture_settings(&mut self, mode: FunctionMode) -> DeviceResult<Option<CaptureSettings>> {
        let current = self.lock().capture.get(&mode).copied();
        Ok(Some(current.unwrap_or(CaptureSettings {
            contrast: 64,
            saturation: 64,
            brightness: 0,
            sharpness: 3,
            white_balance: WhiteBalance::Auto,
        })))
    }

    fn set_capture_settings(
        &mut self,
        mode: FunctionMode,
        settings: &CaptureSettings,
    ) -> DeviceResult<()> {
        self.lock().capture.insert(mode, *settings);
        Ok(())
    }

    fn battery_status(&mut self) -> DeviceResult<BatteryStatus> {
        Ok(BatteryStatus {
            power_source: PowerSource::Battery,
            level: 87,
            scale: 100,
        })
    }

    fn storage_status(&mut self) -> DeviceResult<StorageStatus> {
        let used = self.lock().used_space();
        Ok(StorageStatus {
            free_space: TOTAL_SPACE.saturating_sub(used),
            total_space: TOTAL_SPACE,
            card_state: 0,
        })
    }

    fn capture_status(&mut self) -> DeviceResult<u32> {
        let state = self.lock();
        Ok(if state.recording.is_some() {
            1
        } else if state.timelapse.is_some() {
            2
        } else {
            0
        })
    }

    fn serial_number(&mut self) -> DeviceResult<String> {
        Ok(self.serial_number.clone())
    }

    fn uuid(&mut self) -> DeviceResult<String> {
        Ok(uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, self.serial_number.as_bytes()).to_string())
    }
}
