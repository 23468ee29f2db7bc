//! Test doubles for offline use: a scriptable camera driver plus observer
//! and surface fixtures. Shipped unconditionally so downstream crates can
//! integration-test against the session without hardware.

pub mod fixtures;
pub mod mock_driver;

pub use fixtures::{ObserverEvent, RecordingObserver, ScriptedSurface};
pub use mock_driver::{MockCall, MockDriver, MockHandle};
