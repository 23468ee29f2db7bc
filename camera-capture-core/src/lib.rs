//! # camera-capture-core
//!
//! Platform-agnostic camera capture core library.
//!
//! Provides the session lifecycle state machine, capability negotiation,
//! device-thread ownership, and frame fan-out. Platform-specific backends
//! (Linux V4L2) implement the `CameraDriver` trait and plug into the
//! generic `CameraSession`.
//!
//! ## Architecture
//!
//! ```text
//! camera-capture-core (this crate)
//! ├── traits/       ← CameraDriver, CameraObserver, PreviewSurface, SettingsStore
//! ├── models/       ← CameraError, SessionState, CameraConfig, CaptureQuality, etc.
//! ├── processing/   ← quality negotiation, preview buffer pool
//! ├── device/       ← DeviceHost (worker thread owning the handle)
//! ├── session/      ← CameraSession (lifecycle state machine), ObserverRegistry
//! └── testing/      ← MockDriver and fixtures for hardware-free tests
//! ```

pub mod device;
pub mod models;
pub mod processing;
pub mod session;
pub mod testing;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use device::host::DeviceHost;
pub use models::config::CameraConfig;
pub use models::error::CameraError;
pub use models::quality::{
    CaptureQuality, DeviceCapability, FrameFormat, FramerateRange, PreviewFrame, Resolution,
};
pub use models::state::SessionState;
pub use processing::frame_pool::FramePool;
pub use processing::negotiator;
pub use session::camera::CameraSession;
pub use session::observers::{ObserverId, ObserverRegistry};
pub use traits::camera_driver::{CameraDriver, DeviceHandle, FrameMeta};
pub use traits::camera_observer::CameraObserver;
pub use traits::preview_surface::PreviewSurface;
pub use traits::settings_store::{measured_fps_key, MemorySettings, SettingsStore};
