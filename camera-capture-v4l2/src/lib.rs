//! # camera-capture-v4l2
//!
//! Linux V4L2 backend for camera-capture-kit.
//!
//! Provides:
//! - `V4l2Driver` / `V4l2Handle` — camera open/configure/preview via the `v4l` crate
//! - `DeviceEnumerator` — `/dev/video*` capture node enumeration
//!
//! ## Platform Requirements
//! - A V4L2 capture device (`uvcvideo` covers virtually all USB webcams)
//! - Read access to the node, typically via the `video` group
//!
//! ## Usage
//! ```ignore
//! use camera_capture_core::{CameraConfig, CameraSession};
//! use camera_capture_v4l2::V4l2Driver;
//! use std::sync::Arc;
//!
//! let driver = Arc::new(V4l2Driver::default());
//! let config = CameraConfig::new("/dev/video0");
//! let session = CameraSession::new(driver, config, surface, settings)?;
//! session.request_start()?;
//! ```

#[cfg(target_os = "linux")]
pub mod device_enumerator;
#[cfg(target_os = "linux")]
pub mod driver;

#[cfg(target_os = "linux")]
pub use device_enumerator::{DeviceEnumerator, VideoDeviceInfo};
#[cfg(target_os = "linux")]
pub use driver::{V4l2Driver, V4l2Handle};
