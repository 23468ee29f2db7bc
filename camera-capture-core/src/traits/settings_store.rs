use std::collections::HashMap;

use parking_lot::Mutex;

use crate::models::quality::{CaptureQuality, FrameFormat};

/// Key-value settings store consulted once per device open.
///
/// Recovers a previously measured framerate for a given
/// (requested fps, format, resolution) tuple. The core only reads;
/// writing measured statistics back is the caller's concern.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<i64>;
    fn set(&self, key: &str, value: i64);
}

/// Key under which a measured framerate is stored for a requested quality.
///
/// Format: `fps.{requested}.{format}.{width}x{height}`.
pub fn measured_fps_key(requested: &CaptureQuality, format: FrameFormat) -> String {
    format!(
        "fps.{}.{}.{}x{}",
        requested.framerate, format, requested.width, requested.height
    )
}

/// In-memory settings store, for tests and callers without persistence.
#[derive(Debug, Default)]
pub struct MemorySettings {
    entries: Mutex<HashMap<String, i64>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<i64> {
        self.entries.lock().get(key).copied()
    }

    fn set(&self, key: &str, value: i64) {
        self.entries.lock().insert(key.to_string(), value);
    }
}
