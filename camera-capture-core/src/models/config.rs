use super::quality::{CaptureQuality, FrameFormat};

/// Configuration for a camera session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraConfig {
    /// Identifier of the device to open, backend-specific
    /// (e.g. `/dev/video0` for V4L2).
    pub device_id: String,

    /// The quality the caller wants. Negotiation replaces it with the
    /// closest quality the device actually supports.
    pub requested: CaptureQuality,

    /// Pixel layout of preview frames (default: NV21).
    pub format: FrameFormat,

    /// Rotation metadata attached to every delivered frame, in degrees
    /// clockwise. The core passes it through untouched.
    pub rotation: i32,

    /// Number of pre-allocated preview buffers handed to the device
    /// (default: 10).
    pub preview_buffers: usize,
}

impl CameraConfig {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.device_id.is_empty() {
            return Err("device id must not be empty".into());
        }
        if self.requested.width == 0 || self.requested.height == 0 {
            return Err(format!(
                "requested resolution must be non-zero, got {}x{}",
                self.requested.width, self.requested.height
            ));
        }
        if self.requested.framerate == 0 {
            return Err("requested framerate must be positive".into());
        }
        if self.preview_buffers == 0 {
            return Err("at least one preview buffer is required".into());
        }
        if !(0..360).contains(&self.rotation) || self.rotation % 90 != 0 {
            return Err(format!("rotation must be 0/90/180/270, got {}", self.rotation));
        }
        Ok(())
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_id: String::new(),
            requested: CaptureQuality::default(),
            format: FrameFormat::Nv21,
            rotation: 0,
            preview_buffers: 10,
        }
    }
}
