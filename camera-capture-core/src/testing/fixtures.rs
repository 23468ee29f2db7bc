//! Observer and surface doubles used alongside [`MockDriver`].
//!
//! [`MockDriver`]: super::mock_driver::MockDriver

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::error::CameraError;
use crate::models::quality::PreviewFrame;
use crate::traits::camera_observer::CameraObserver;
use crate::traits::preview_surface::PreviewSurface;

/// One observer notification, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverEvent {
    SizeSelected {
        width: u32,
        height: u32,
        rotation: i32,
    },
    Frame {
        width: u32,
        height: u32,
        bytes: usize,
    },
    Started {
        success: bool,
        error: Option<CameraError>,
    },
}

/// Observer that records every notification it receives.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObserverEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObserverEvent> {
        self.events.lock().clone()
    }

    pub fn frame_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, ObserverEvent::Frame { .. }))
            .count()
    }

    pub fn started_events(&self) -> Vec<ObserverEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, ObserverEvent::Started { .. }))
            .cloned()
            .collect()
    }

    /// Poll until at least `count` frames arrived or `timeout` elapses.
    pub fn wait_for_frames(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.frame_count() >= count {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        self.frame_count() >= count
    }

    /// Poll until a start/death outcome arrived or `timeout` elapses.
    pub fn wait_for_started(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.started_events().len() >= count {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        self.started_events().len() >= count
    }
}

impl CameraObserver for RecordingObserver {
    fn on_preview_frame(&self, frame: &PreviewFrame<'_>) {
        self.events.lock().push(ObserverEvent::Frame {
            width: frame.width,
            height: frame.height,
            bytes: frame.data.len(),
        });
    }

    fn on_frame_size_selected(&self, width: u32, height: u32, rotation: i32) {
        self.events.lock().push(ObserverEvent::SizeSelected {
            width,
            height,
            rotation,
        });
    }

    fn on_camera_started(&self, success: bool, error: Option<&CameraError>) {
        self.events.lock().push(ObserverEvent::Started {
            success,
            error: error.cloned(),
        });
    }
}

/// Surface double whose readiness the test scripts directly.
#[derive(Debug)]
pub struct ScriptedSurface {
    ready: AtomicBool,
    ratios: Mutex<Vec<f64>>,
}

impl ScriptedSurface {
    pub fn new(ready: bool) -> Self {
        Self {
            ready: AtomicBool::new(ready),
            ratios: Mutex::new(Vec::new()),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Every aspect ratio the session requested, in order.
    pub fn requested_ratios(&self) -> Vec<f64> {
        self.ratios.lock().clone()
    }
}

impl PreviewSurface for ScriptedSurface {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn request_aspect_ratio(&self, ratio: f64) {
        self.ratios.lock().push(ratio);
    }
}
