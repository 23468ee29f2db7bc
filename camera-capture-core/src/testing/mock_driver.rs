//! Deterministic in-memory camera driver.
//!
//! Stands in for real hardware in unit tests and downstream integration
//! tests: scriptable failures (busy device, rejected configuration, flash
//! write refusal, asynchronous device death) and a call log for asserting
//! ordering invariants such as unlock/relock bracketing.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::error::CameraError;
use crate::models::quality::{CaptureQuality, DeviceCapability, FramerateRange, Resolution};
use crate::traits::camera_driver::{CameraDriver, DeviceHandle, FrameMeta};

/// One recorded handle interaction, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Open,
    Capability,
    Configure(CaptureQuality),
    StartPreview,
    StopPreview,
    Unlock,
    WriteFlash(bool),
    Relock,
    Released,
}

#[derive(Debug)]
struct MockState {
    capability: Mutex<DeviceCapability>,
    busy: AtomicBool,
    reject_configure: AtomicBool,
    refuse_flash_write: AtomicBool,
    die: AtomicBool,
    opens: AtomicUsize,
    calls: Mutex<Vec<MockCall>>,
    frame_interval: Duration,
}

impl MockState {
    fn record(&self, call: MockCall) {
        self.calls.lock().push(call);
    }
}

/// Scriptable driver producing thread-confined [`MockHandle`]s.
#[derive(Debug, Clone)]
pub struct MockDriver {
    state: Arc<MockState>,
}

impl MockDriver {
    pub fn new(capability: DeviceCapability) -> Self {
        Self {
            state: Arc::new(MockState {
                capability: Mutex::new(capability),
                busy: AtomicBool::new(false),
                reject_configure: AtomicBool::new(false),
                refuse_flash_write: AtomicBool::new(false),
                die: AtomicBool::new(false),
                opens: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
                frame_interval: Duration::from_millis(5),
            }),
        }
    }

    /// A small webcam-like capability set with a flash.
    pub fn with_default_capability() -> Self {
        Self::new(DeviceCapability {
            resolutions: vec![Resolution::new(640, 480), Resolution::new(1280, 720)],
            framerate_ranges: vec![FramerateRange::fixed(15), FramerateRange::new(24, 30)],
            has_flash: true,
        })
    }

    pub fn set_capability(&self, capability: DeviceCapability) {
        *self.state.capability.lock() = capability;
    }

    /// Make the next open fail with `DeviceBusy`.
    pub fn set_busy(&self, busy: bool) {
        self.state.busy.store(busy, Ordering::SeqCst);
    }

    /// Make `configure` fail with `ConfigurationRejected`.
    pub fn reject_configure(&self, reject: bool) {
        self.state.reject_configure.store(reject, Ordering::SeqCst);
    }

    /// Make flash writes fail even though the device reports a flash.
    pub fn refuse_flash_write(&self, refuse: bool) {
        self.state.refuse_flash_write.store(refuse, Ordering::SeqCst);
    }

    /// Simulate the media service dying: the next frame pump fails
    /// fatally. One-shot, so a reopened device works again.
    pub fn kill_device(&self) {
        self.state.die.store(true, Ordering::SeqCst);
    }

    /// How many times a handle was successfully opened.
    pub fn opens(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.state.calls.lock().clear();
    }
}

impl CameraDriver for MockDriver {
    type Handle = MockHandle;

    fn open(&self, device_id: &str) -> Result<MockHandle, CameraError> {
        self.state.record(MockCall::Open);
        if self.state.busy.load(Ordering::SeqCst) {
            return Err(CameraError::DeviceBusy(format!(
                "{} is held by another owner",
                device_id
            )));
        }
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        Ok(MockHandle {
            state: Arc::clone(&self.state),
            previewing: false,
            sequence: 0,
            _thread_confined: PhantomData,
        })
    }
}

/// Handle produced by [`MockDriver`].
///
/// Deliberately `!Send` (raw-pointer marker) to prove at compile time that
/// the device host never moves a handle off its worker thread.
#[derive(Debug)]
pub struct MockHandle {
    state: Arc<MockState>,
    previewing: bool,
    sequence: u64,
    _thread_confined: PhantomData<*const ()>,
}

impl DeviceHandle for MockHandle {
    fn capability(&mut self) -> Result<DeviceCapability, CameraError> {
        self.state.record(MockCall::Capability);
        Ok(self.state.capability.lock().clone())
    }

    fn configure(&mut self, quality: &CaptureQuality) -> Result<(), CameraError> {
        self.state.record(MockCall::Configure(*quality));
        if self.state.reject_configure.load(Ordering::SeqCst) {
            return Err(CameraError::ConfigurationRejected(format!(
                "device refused {}",
                quality
            )));
        }
        Ok(())
    }

    fn start_preview(&mut self) -> Result<(), CameraError> {
        self.state.record(MockCall::StartPreview);
        self.previewing = true;
        Ok(())
    }

    fn next_frame(&mut self, buf: &mut [u8]) -> Result<Option<FrameMeta>, CameraError> {
        if self.state.die.swap(false, Ordering::SeqCst) {
            return Err(CameraError::DeviceDied(
                "simulated media service crash".into(),
            ));
        }
        if !self.previewing {
            return Ok(None);
        }
        std::thread::sleep(self.state.frame_interval);
        buf.fill(self.sequence as u8);
        self.sequence += 1;
        Ok(Some(FrameMeta {
            bytes_used: buf.len(),
        }))
    }

    fn stop_preview(&mut self) {
        self.state.record(MockCall::StopPreview);
        self.previewing = false;
    }

    fn unlock(&mut self) -> Result<(), CameraError> {
        self.state.record(MockCall::Unlock);
        Ok(())
    }

    fn relock(&mut self) -> Result<(), CameraError> {
        self.state.record(MockCall::Relock);
        Ok(())
    }

    fn write_flash(&mut self, enabled: bool) -> Result<(), CameraError> {
        self.state.record(MockCall::WriteFlash(enabled));
        if !self.state.capability.lock().has_flash {
            return Err(CameraError::FlashUnsupported);
        }
        if self.state.refuse_flash_write.load(Ordering::SeqCst) {
            return Err(CameraError::Unknown("flash write refused".into()));
        }
        Ok(())
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.state.record(MockCall::Released);
    }
}
