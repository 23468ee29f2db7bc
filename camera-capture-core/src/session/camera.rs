//! Camera session lifecycle.
//!
//! One `CameraSession` per logical capture need. A single session lock
//! serializes every mutating transition (start, stop, flash, destroy, and
//! the surface/error notifications), so concurrent open/close races cannot
//! occur: a stop issued during an in-flight start waits until the start
//! resolves. There is no mid-open cancellation.

use std::sync::{Arc, Weak};
use std::thread;

use parking_lot::Mutex;

use crate::device::host::{DeviceHost, ErrorHook, FrameSink, PreviewPlan};
use crate::models::config::CameraConfig;
use crate::models::error::CameraError;
use crate::models::quality::{CaptureQuality, PreviewFrame};
use crate::models::state::SessionState;
use crate::processing::negotiator;
use crate::session::observers::{ObserverId, ObserverRegistry};
use crate::traits::camera_driver::CameraDriver;
use crate::traits::camera_observer::CameraObserver;
use crate::traits::preview_surface::PreviewSurface;
use crate::traits::settings_store::{measured_fps_key, SettingsStore};

struct SessionInner<D: CameraDriver> {
    state: SessionState,
    host: DeviceHost<D>,
    config: CameraConfig,
    resolved: Option<CaptureQuality>,
    flash_enabled: bool,
    surface_ready: bool,
    pending_start: bool,
}

/// The lifecycle state machine owning exclusive access to one camera.
pub struct CameraSession<D: CameraDriver> {
    surface: Arc<dyn PreviewSurface>,
    settings: Arc<dyn SettingsStore>,
    observers: Arc<ObserverRegistry>,
    inner: Mutex<SessionInner<D>>,
    weak: Weak<CameraSession<D>>,
}

impl<D: CameraDriver> CameraSession<D> {
    pub fn new(
        driver: Arc<D>,
        config: CameraConfig,
        surface: Arc<dyn PreviewSurface>,
        settings: Arc<dyn SettingsStore>,
    ) -> Result<Arc<Self>, CameraError> {
        config.validate().map_err(CameraError::ConfigurationRejected)?;
        let surface_ready = surface.is_ready();
        Ok(Arc::new_cyclic(|weak| Self {
            surface,
            settings,
            observers: Arc::new(ObserverRegistry::new()),
            inner: Mutex::new(SessionInner {
                state: SessionState::Idle,
                host: DeviceHost::new(driver),
                config,
                resolved: None,
                flash_enabled: false,
                surface_ready,
                pending_start: false,
            }),
            weak: weak.clone(),
        }))
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    pub fn requested_quality(&self) -> CaptureQuality {
        self.inner.lock().config.requested
    }

    /// The quality negotiated on the current open, if any.
    pub fn resolved_quality(&self) -> Option<CaptureQuality> {
        self.inner.lock().resolved
    }

    pub fn flash_enabled(&self) -> bool {
        self.inner.lock().flash_enabled
    }

    pub fn add_observer(&self, observer: &Arc<dyn CameraObserver>) -> ObserverId {
        self.observers.add(observer)
    }

    pub fn remove_observer(&self, id: ObserverId) {
        self.observers.remove(id);
    }

    /// Start preview, or record a pending start while the surface is not
    /// ready (deferred, not an error). No-op when already previewing.
    pub fn request_start(&self) -> Result<(), CameraError> {
        let mut inner = self.inner.lock();
        self.start_locked(&mut inner)
    }

    /// Stop preview and release the device. No-op when idle: no observer
    /// notifications, no state change. Also cancels any deferred start.
    pub fn request_stop(&self) {
        let mut inner = self.inner.lock();
        if inner.state.is_destroyed() {
            return;
        }
        inner.pending_start = false;
        self.stop_locked(&mut inner);
    }

    /// The surface became ready. Fires the deferred start, if one was
    /// recorded while waiting on readiness.
    pub fn on_surface_ready(&self) {
        let mut inner = self.inner.lock();
        inner.surface_ready = true;
        if inner.state.is_destroyed() || !inner.pending_start {
            return;
        }
        inner.pending_start = false;
        if let Err(e) = self.start_locked(&mut inner) {
            log::error!("deferred start failed: {}", e);
        }
    }

    /// The surface disappeared, invalidating any in-progress preview:
    /// forces an immediate stop regardless of current state.
    pub fn on_surface_lost(&self) {
        let mut inner = self.inner.lock();
        inner.surface_ready = false;
        inner.pending_start = false;
        if inner.state.is_destroyed() {
            return;
        }
        self.stop_locked(&mut inner);
    }

    /// Asynchronous hardware failure, reported from the worker context.
    ///
    /// Non-fatal errors are logged and swallowed. A fatal error force-stops
    /// the session as its own serialized transition, dispatched on a
    /// dedicated thread: teardown joins the worker, so it must never run on
    /// the worker thread that is delivering this notification.
    pub fn on_device_error(&self, error: CameraError) {
        if !error.is_fatal() {
            log::warn!("non-fatal device error: {}", error);
            return;
        }
        log::error!("fatal device error: {}", error);
        let Some(session) = self.weak.upgrade() else {
            return;
        };
        let spawned = thread::Builder::new()
            .name("camera-emergency-stop".into())
            .spawn(move || session.force_stop(error));
        if let Err(e) = spawned {
            log::error!("could not dispatch emergency stop: {}", e);
        }
    }

    /// Toggle the flash. With no open device, records the state for the
    /// next open. With one, the write runs on the worker under the
    /// transient unlocked mode; preview keeps running either way.
    pub fn set_flash(&self, enabled: bool) -> Result<(), CameraError> {
        let mut inner = self.inner.lock();
        if inner.state.is_destroyed() {
            return Err(CameraError::SessionDestroyed);
        }
        if !inner.host.is_open() {
            inner.flash_enabled = enabled;
            return Ok(());
        }
        match inner.host.set_flash(enabled) {
            Ok(()) => {
                inner.flash_enabled = enabled;
                Ok(())
            }
            Err(e) => {
                inner.flash_enabled = false;
                Err(e)
            }
        }
    }

    /// Retarget the session at another device. Stops any running preview,
    /// resets the flash (the new device's flash state is unknown), and
    /// restarts preview if it was running.
    pub fn switch_device(&self, device_id: impl Into<String>) -> Result<(), CameraError> {
        let mut inner = self.inner.lock();
        if inner.state.is_destroyed() {
            return Err(CameraError::SessionDestroyed);
        }
        let was_previewing = inner.state.is_previewing();
        self.stop_locked(&mut inner);
        inner.config.device_id = device_id.into();
        inner.flash_enabled = false;
        if was_previewing {
            self.start_locked(&mut inner)?;
        }
        Ok(())
    }

    /// Tear the session down for good. Terminal; every later transition is
    /// rejected.
    pub fn destroy(&self) {
        let mut inner = self.inner.lock();
        if inner.state.is_destroyed() {
            return;
        }
        self.stop_locked(&mut inner);
        self.transition(&mut inner, SessionState::Destroyed);
    }

    // --- Transitions (session lock held) ---

    fn start_locked(&self, inner: &mut SessionInner<D>) -> Result<(), CameraError> {
        match inner.state {
            SessionState::Destroyed => return Err(CameraError::SessionDestroyed),
            SessionState::Previewing => return Ok(()),
            _ => {}
        }
        if !(inner.surface_ready && self.surface.is_ready()) {
            log::debug!("surface not ready; deferring start");
            inner.pending_start = true;
            return Ok(());
        }
        inner.pending_start = false;
        self.transition(inner, SessionState::Opening);

        let hook = self.error_hook();
        if let Err(e) = inner.host.open(&inner.config.device_id, hook) {
            // A failed open still left a worker behind; tear it down so
            // the thread cannot leak.
            inner.host.close();
            self.transition(inner, SessionState::Idle);
            self.observers.notify_started(false, Some(&e));
            return Err(e);
        }

        match self.configure_and_start(inner) {
            Ok(()) => {
                self.transition(inner, SessionState::Previewing);
                self.observers.notify_started(true, None);
                Ok(())
            }
            Err(e) => {
                // Never keep a half-open handle.
                inner.host.close();
                self.transition(inner, SessionState::Idle);
                self.observers.notify_started(false, Some(&e));
                Err(e)
            }
        }
    }

    fn configure_and_start(&self, inner: &mut SessionInner<D>) -> Result<(), CameraError> {
        // Capabilities are queried fresh on every open; a different camera
        // or driver may sit behind the same id by now.
        let capability = inner.host.capability()?;
        if !capability.is_usable() {
            return Err(CameraError::ConfigurationRejected(
                "device reported an empty capability set".into(),
            ));
        }
        self.transition(inner, SessionState::Configured);

        // A previously measured rate for this exact request beats the
        // nominal one.
        let mut requested = inner.config.requested;
        let key = measured_fps_key(&requested, inner.config.format);
        if let Some(measured) = self.settings.get(&key) {
            if measured > 0 {
                log::debug!("using measured framerate {} for {}", measured, key);
                requested = requested.with_framerate(measured as u32);
            }
        }

        let resolved = negotiator::resolve(&requested, &capability).ok_or_else(|| {
            CameraError::ConfigurationRejected("capability set unusable".into())
        })?;
        log::info!(
            "negotiated {} from requested {}",
            resolved,
            inner.config.requested
        );
        inner.resolved = Some(resolved);

        // Size notification strictly precedes the first frame of this open.
        self.observers
            .notify_frame_size(resolved.width, resolved.height, inner.config.rotation);
        self.surface.request_aspect_ratio(resolved.aspect_ratio());

        inner.host.configure(resolved)?;

        if inner.flash_enabled {
            // Flash survives close/reopen; re-apply it before frames flow.
            if let Err(e) = inner.host.set_flash(true) {
                log::warn!("could not re-apply flash on open: {}", e);
            }
        }

        let observers = Arc::clone(&self.observers);
        let sink: FrameSink = Arc::new(move |frame: &PreviewFrame<'_>| {
            observers.notify_frame(frame);
        });
        inner.host.start_preview(PreviewPlan {
            sink,
            width: resolved.width,
            height: resolved.height,
            rotation: inner.config.rotation,
            buffer_size: inner
                .config
                .format
                .bytes_per_frame(resolved.width, resolved.height),
            buffer_count: inner.config.preview_buffers,
        })?;
        Ok(())
    }

    fn stop_locked(&self, inner: &mut SessionInner<D>) {
        if !inner.state.holds_device() {
            return;
        }
        self.transition(inner, SessionState::Stopping);
        if let Err(e) = inner.host.stop_preview() {
            // The worker may already be gone after a fatal device error.
            log::debug!("stop preview: {}", e);
        }
        inner.host.close();
        inner.resolved = None;
        self.transition(inner, SessionState::Idle);
    }

    fn force_stop(&self, error: CameraError) {
        let mut inner = self.inner.lock();
        if !inner.state.holds_device() {
            // A caller-initiated stop won the race; nothing left to do.
            return;
        }
        self.stop_locked(&mut inner);
        self.observers.notify_started(false, Some(&error));
    }

    fn transition(&self, inner: &mut SessionInner<D>, next: SessionState) {
        debug_assert!(
            inner.state.can_transition_to(next),
            "illegal session transition {} -> {}",
            inner.state,
            next
        );
        log::debug!("session {} -> {}", inner.state, next);
        inner.state = next;
    }

    fn error_hook(&self) -> ErrorHook {
        let weak = self.weak.clone();
        Arc::new(move |error: CameraError| {
            if let Some(session) = weak.upgrade() {
                session.on_device_error(error);
            }
        })
    }
}
