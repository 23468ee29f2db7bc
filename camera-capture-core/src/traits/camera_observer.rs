use crate::models::error::CameraError;
use crate::models::quality::PreviewFrame;

/// Event observer for camera session notifications.
///
/// Frame and size notifications are delivered on the device worker thread,
/// never on the caller's thread; start/stop outcomes may arrive from either.
/// Implementations must not block significantly — a slow observer delays
/// the next capture callback.
pub trait CameraObserver: Send + Sync {
    /// One captured frame. The buffer is recycled when the callback
    /// returns; copy the data to retain it.
    fn on_preview_frame(&self, frame: &PreviewFrame<'_>);

    /// The negotiated frame size for this open. Fires exactly once per
    /// open, strictly before the first `on_preview_frame`.
    fn on_frame_size_selected(&self, width: u32, height: u32, rotation: i32);

    /// Outcome of a start attempt, or notice of asynchronous device death.
    fn on_camera_started(&self, success: bool, error: Option<&CameraError>);
}
