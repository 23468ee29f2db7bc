use serde::{Deserialize, Serialize};

/// A supported capture resolution reported by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count, used as a tie-break during negotiation.
    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// An inclusive framerate range supported by a device, in frames per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FramerateRange {
    pub min: u32,
    pub max: u32,
}

impl FramerateRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// A range reporting a single fixed rate.
    pub fn fixed(fps: u32) -> Self {
        Self { min: fps, max: fps }
    }

    pub fn contains(&self, fps: u32) -> bool {
        self.min <= fps && fps <= self.max
    }

    /// Width of the range. Narrower ranges mean less camera auto-adjustment.
    pub fn span(&self) -> u32 {
        self.max.saturating_sub(self.min)
    }

    /// Clamp a requested rate into this range.
    pub fn clamp(&self, fps: u32) -> u32 {
        fps.clamp(self.min, self.max)
    }
}

impl std::fmt::Display for FramerateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{}]", self.min, self.max)
    }
}

/// Target quality for a capture session.
///
/// A *requested* quality and a *resolved* quality are always distinct values;
/// the resolved one is replaced wholesale on each open, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureQuality {
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
    pub bitrate: u32,
}

impl CaptureQuality {
    pub fn new(width: u32, height: u32, framerate: u32, bitrate: u32) -> Self {
        Self {
            width,
            height,
            framerate,
            bitrate,
        }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Width over height, used for the surface aspect-ratio request.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Same quality with the resolution replaced.
    pub fn with_resolution(self, resolution: Resolution) -> Self {
        Self {
            width: resolution.width,
            height: resolution.height,
            ..self
        }
    }

    /// Same quality with the framerate replaced.
    pub fn with_framerate(self, framerate: u32) -> Self {
        Self { framerate, ..self }
    }
}

impl Default for CaptureQuality {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            framerate: 30,
            bitrate: 2_000_000,
        }
    }
}

impl std::fmt::Display for CaptureQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{} @ {}fps, {}bps",
            self.width, self.height, self.framerate, self.bitrate
        )
    }
}

/// Pixel layout of preview frames, and therefore the per-frame buffer footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    /// 4:2:0 planar Y + interleaved VU. 12 bits per pixel.
    Nv21,
    /// 4:2:2 packed. 16 bits per pixel.
    Yuyv,
}

impl FrameFormat {
    /// Bytes needed to hold one frame at the given resolution.
    pub fn bytes_per_frame(&self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self {
            FrameFormat::Nv21 => pixels * 3 / 2,
            FrameFormat::Yuyv => pixels * 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FrameFormat::Nv21 => "nv21",
            FrameFormat::Yuyv => "yuyv",
        }
    }
}

impl std::fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability set reported by an opened device.
///
/// Queried fresh on every open. A different physical camera, or a driver
/// update, may report different capabilities, so these are never cached
/// across device instances.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceCapability {
    pub resolutions: Vec<Resolution>,
    pub framerate_ranges: Vec<FramerateRange>,
    pub has_flash: bool,
}

impl DeviceCapability {
    /// Whether the set is usable for negotiation at all.
    pub fn is_usable(&self) -> bool {
        !self.resolutions.is_empty() && !self.framerate_ranges.is_empty()
    }
}

/// A captured preview frame lent to observers for the duration of one
/// callback. The underlying buffer is recycled once the callback returns;
/// observers must copy the data to retain it.
#[derive(Debug)]
pub struct PreviewFrame<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub rotation: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn quality_compares_by_all_fields() {
        let a = CaptureQuality::new(1920, 1080, 30, 4_000_000);
        let b = CaptureQuality::new(1920, 1080, 30, 4_000_000);
        assert_eq!(a, b);
        assert_ne!(a, a.with_framerate(25));
        assert_ne!(a, a.with_resolution(Resolution::new(1280, 720)));
    }

    #[test]
    fn aspect_ratio() {
        let q = CaptureQuality::new(1920, 1080, 30, 0);
        assert_relative_eq!(q.aspect_ratio(), 16.0 / 9.0, epsilon = 1e-9);
    }

    #[test]
    fn framerate_range_helpers() {
        let r = FramerateRange::new(24, 30);
        assert!(r.contains(24));
        assert!(r.contains(30));
        assert!(!r.contains(31));
        assert_eq!(r.span(), 6);
        assert_eq!(r.clamp(60), 30);
        assert_eq!(r.clamp(10), 24);
        assert_eq!(FramerateRange::fixed(15).span(), 0);
    }

    #[test]
    fn frame_footprints() {
        assert_eq!(FrameFormat::Nv21.bytes_per_frame(640, 480), 640 * 480 * 3 / 2);
        assert_eq!(FrameFormat::Yuyv.bytes_per_frame(640, 480), 640 * 480 * 2);
    }

    #[test]
    fn capability_usability() {
        assert!(!DeviceCapability::default().is_usable());
        let cap = DeviceCapability {
            resolutions: vec![Resolution::new(640, 480)],
            framerate_ranges: vec![FramerateRange::fixed(30)],
            has_flash: false,
        };
        assert!(cap.is_usable());
    }
}
