use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::error::CameraError;
use crate::models::quality::PreviewFrame;
use crate::traits::camera_observer::CameraObserver;

/// Token returned by [`ObserverRegistry::add`]; removing an id that was
/// never added is a safe no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(Uuid);

impl ObserverId {
    fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Insertion-ordered set of observer references.
///
/// Holds only weak references: registering an observer does not keep it
/// alive, and entries whose observers were dropped are pruned on the next
/// snapshot. Add/remove may race with delivery; fan-out iterates a
/// snapshot taken under the lock, in registration order.
#[derive(Default)]
pub struct ObserverRegistry {
    entries: Mutex<Vec<(ObserverId, Weak<dyn CameraObserver>)>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, observer: &Arc<dyn CameraObserver>) -> ObserverId {
        let id = ObserverId::fresh();
        self.entries.lock().push((id, Arc::downgrade(observer)));
        id
    }

    pub fn remove(&self, id: ObserverId) {
        self.entries.lock().retain(|(entry_id, _)| *entry_id != id);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Live observers in registration order; prunes dead entries.
    fn snapshot(&self) -> Vec<Arc<dyn CameraObserver>> {
        let mut entries = self.entries.lock();
        let mut alive = Vec::with_capacity(entries.len());
        entries.retain(|(_, weak)| match weak.upgrade() {
            Some(observer) => {
                alive.push(observer);
                true
            }
            None => false,
        });
        alive
    }

    pub fn notify_frame(&self, frame: &PreviewFrame<'_>) {
        for observer in self.snapshot() {
            observer.on_preview_frame(frame);
        }
    }

    pub fn notify_frame_size(&self, width: u32, height: u32, rotation: i32) {
        for observer in self.snapshot() {
            observer.on_frame_size_selected(width, height, rotation);
        }
    }

    pub fn notify_started(&self, success: bool, error: Option<&CameraError>) {
        for observer in self.snapshot() {
            observer.on_camera_started(success, error);
        }
    }
}
