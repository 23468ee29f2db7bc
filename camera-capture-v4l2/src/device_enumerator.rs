//! Video device enumeration over `/dev/video*`.
//!
//! Lists capture nodes with the card and driver names reported by
//! `VIDIOC_QUERYCAP`. Nodes that exist but cannot be opened (permissions,
//! stale udev entries) are skipped rather than surfaced as errors.

use std::fs;
use std::path::{Path, PathBuf};

use v4l::Device;

use camera_capture_core::models::error::CameraError;

/// One `/dev/video*` capture node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDeviceInfo {
    /// Filesystem path, e.g. `/dev/video0`. Usable as a session `device_id`.
    pub path: PathBuf,
    /// Node index, the `N` in `/dev/videoN`.
    pub index: u32,
    /// Human-readable card name, e.g. "HD Pro Webcam C920".
    pub card: String,
    /// Kernel driver name, e.g. "uvcvideo".
    pub driver: String,
}

/// Video device enumerator over the V4L2 device tree.
pub struct DeviceEnumerator {
    dev_dir: PathBuf,
}

impl DeviceEnumerator {
    pub fn new() -> Self {
        Self {
            dev_dir: PathBuf::from("/dev"),
        }
    }

    /// Enumerate against a different device directory (tests).
    pub fn with_dev_dir(dev_dir: impl Into<PathBuf>) -> Self {
        Self {
            dev_dir: dev_dir.into(),
        }
    }

    /// List openable video capture nodes, ordered by node index.
    pub fn list_devices(&self) -> Result<Vec<VideoDeviceInfo>, CameraError> {
        let entries = fs::read_dir(&self.dev_dir).map_err(|e| {
            CameraError::Unknown(format!("cannot read {}: {}", self.dev_dir.display(), e))
        })?;

        let mut nodes: Vec<(u32, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                let index = video_index(&path)?;
                Some((index, path))
            })
            .collect();
        nodes.sort_by_key(|(index, _)| *index);

        let mut devices = Vec::new();
        for (index, path) in nodes {
            match Self::probe(&path, index) {
                Some(info) => devices.push(info),
                None => log::debug!("skipping unopenable video node {}", path.display()),
            }
        }
        Ok(devices)
    }

    /// The lowest-indexed capture node, if any.
    pub fn default_device(&self) -> Result<Option<VideoDeviceInfo>, CameraError> {
        Ok(self.list_devices()?.into_iter().next())
    }

    fn probe(path: &Path, index: u32) -> Option<VideoDeviceInfo> {
        let device = Device::with_path(path).ok()?;
        let caps = device.query_caps().ok()?;
        Some(VideoDeviceInfo {
            path: path.to_path_buf(),
            index,
            card: caps.card,
            driver: caps.driver,
        })
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

/// The `N` of a `videoN` node name; `None` for anything else.
fn video_index(path: &Path) -> Option<u32> {
    let name = path.file_name()?.to_str()?;
    name.strip_prefix("video")?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_video_nodes() {
        assert_eq!(video_index(Path::new("/dev/video0")), Some(0));
        assert_eq!(video_index(Path::new("/dev/video12")), Some(12));
        assert_eq!(video_index(Path::new("/dev/videoX")), None);
        assert_eq!(video_index(Path::new("/dev/video")), None);
        assert_eq!(video_index(Path::new("/dev/radio0")), None);
        assert_eq!(video_index(Path::new("/dev/vbi0")), None);
    }

    #[test]
    fn empty_dev_dir_lists_nothing() {
        let dir = std::env::temp_dir().join("camera-capture-enum-test");
        let _ = fs::create_dir_all(&dir);
        let enumerator = DeviceEnumerator::with_dev_dir(&dir);
        assert!(enumerator.list_devices().unwrap().is_empty());
        assert_eq!(enumerator.default_device().unwrap(), None);
    }

    #[test]
    fn missing_dev_dir_is_an_error() {
        let enumerator = DeviceEnumerator::with_dev_dir("/nonexistent-dev-dir");
        assert!(enumerator.list_devices().is_err());
    }
}
