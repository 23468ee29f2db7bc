use crate::models::error::CameraError;
use crate::models::quality::{CaptureQuality, DeviceCapability};

/// Metadata for one captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMeta {
    /// Bytes the device wrote into the preview buffer.
    pub bytes_used: usize,
}

/// Factory for device handles; the platform seam of the core.
///
/// Implemented by:
/// - `V4l2Driver` (Linux, `camera-capture-v4l2`)
/// - `MockDriver` (in-memory, `testing` module)
///
/// The driver itself crosses threads; the handles it produces do not.
pub trait CameraDriver: Send + Sync + 'static {
    type Handle: DeviceHandle;

    /// Open the device exclusively.
    ///
    /// Called from inside the device worker thread; the returned handle
    /// lives and dies on that thread and is therefore not required to be
    /// `Send`. Returns `DeviceBusy` when another owner holds the hardware.
    fn open(&self, device_id: &str) -> Result<Self::Handle, CameraError>;
}

/// An exclusively owned, thread-confined handle to an open camera.
///
/// Every method runs on the device worker thread that created the handle.
/// Dropping the handle releases the hardware.
pub trait DeviceHandle {
    /// Query the capability set. Called fresh on every open; results must
    /// not be cached across handles.
    fn capability(&mut self) -> Result<DeviceCapability, CameraError>;

    /// Apply a negotiated quality. Returns `ConfigurationRejected` if the
    /// device refuses the parameters.
    fn configure(&mut self, quality: &CaptureQuality) -> Result<(), CameraError>;

    /// Start hardware preview delivery.
    fn start_preview(&mut self) -> Result<(), CameraError>;

    /// Fill `buf` with the next captured frame.
    ///
    /// Must return within a bounded time: `Ok(None)` when no frame arrived
    /// inside the pacing window, so the worker can service commands between
    /// frames. A fatal error here means the handle is dead.
    fn next_frame(&mut self, buf: &mut [u8]) -> Result<Option<FrameMeta>, CameraError>;

    /// Stop hardware preview delivery. Idempotent.
    fn stop_preview(&mut self);

    /// Hand the handle to the platform mode required for parameter writes
    /// that conflict with active preview ownership. Backends whose
    /// parameter writes need no such mode keep the default no-op.
    fn unlock(&mut self) -> Result<(), CameraError> {
        Ok(())
    }

    /// Restore normal preview ownership after `unlock`.
    fn relock(&mut self) -> Result<(), CameraError> {
        Ok(())
    }

    /// Write the flash parameter. Returns `FlashUnsupported` when the
    /// device has no controllable flash.
    fn write_flash(&mut self, enabled: bool) -> Result<(), CameraError>;
}
