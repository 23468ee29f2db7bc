//! Exclusive owner of the device handle and its worker thread.
//!
//! The platform ties callback delivery to the thread that opened the
//! device, so the handle is confined to one dedicated worker for its whole
//! life: opened inside it, driven by a command channel, and dropped inside
//! it. `open` blocks the caller on a one-shot handoff until the worker
//! either holds the handle or has recorded the failure; `close` joins the
//! worker, so no callback can arrive after it returns.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;

use crate::models::error::CameraError;
use crate::models::quality::{CaptureQuality, DeviceCapability, PreviewFrame};
use crate::processing::frame_pool::FramePool;
use crate::traits::camera_driver::{CameraDriver, DeviceHandle};

/// Receives each captured frame on the worker thread.
pub type FrameSink = Arc<dyn Fn(&PreviewFrame<'_>) + Send + Sync>;

/// Receives asynchronous device failures on the worker thread.
pub type ErrorHook = Arc<dyn Fn(CameraError) + Send + Sync>;

/// Everything the worker needs to run a preview.
pub struct PreviewPlan {
    pub sink: FrameSink,
    pub width: u32,
    pub height: u32,
    pub rotation: i32,
    pub buffer_size: usize,
    pub buffer_count: usize,
}

enum Command {
    QueryCapability {
        reply: Sender<Result<DeviceCapability, CameraError>>,
    },
    Configure {
        quality: CaptureQuality,
        reply: Sender<Result<(), CameraError>>,
    },
    StartPreview {
        plan: PreviewPlan,
        reply: Sender<Result<(), CameraError>>,
    },
    StopPreview {
        reply: Sender<()>,
    },
    SetFlash {
        enabled: bool,
        reply: Sender<Result<(), CameraError>>,
    },
    Release,
}

/// Owns at most one `camera-device` worker per open/close cycle.
pub struct DeviceHost<D: CameraDriver> {
    driver: Arc<D>,
    worker: Option<WorkerLink>,
}

struct WorkerLink {
    commands: Sender<Command>,
    join: thread::JoinHandle<()>,
}

impl<D: CameraDriver> DeviceHost<D> {
    pub fn new(driver: Arc<D>) -> Self {
        Self {
            driver,
            worker: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.worker.is_some()
    }

    /// Spawn the worker and open the device inside it.
    ///
    /// Blocks until the worker reports. On failure the worker still enters
    /// its command loop — the caller must issue `close()` to tear it down,
    /// exactly as it would after a successful open.
    pub fn open(&mut self, device_id: &str, on_error: ErrorHook) -> Result<(), CameraError> {
        if self.worker.is_some() {
            return Err(CameraError::Unknown(
                "device worker already running".into(),
            ));
        }

        let (ready_tx, ready_rx) = mpsc::channel();
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let driver = Arc::clone(&self.driver);
        let device_id = device_id.to_string();

        let join = thread::Builder::new()
            .name("camera-device".into())
            .spawn(move || {
                // The platform open runs on this thread; every later touch
                // of the handle stays here too.
                let (handle, outcome) = match driver.open(&device_id) {
                    Ok(handle) => (Some(handle), Ok(())),
                    Err(e) => (None, Err(e)),
                };
                let _ = ready_tx.send(outcome);
                worker_loop(handle, cmd_rx, on_error);
            })
            .map_err(|e| CameraError::Unknown(format!("failed to spawn device thread: {}", e)))?;

        self.worker = Some(WorkerLink {
            commands: cmd_tx,
            join,
        });

        match ready_rx.recv() {
            Ok(outcome) => outcome,
            Err(_) => Err(CameraError::DeviceDied(
                "device thread exited before reporting".into(),
            )),
        }
    }

    /// Release the handle inside the worker and join it.
    ///
    /// After this returns no further frame or error callbacks can occur.
    pub fn close(&mut self) {
        if let Some(link) = self.worker.take() {
            let _ = link.commands.send(Command::Release);
            if link.join.join().is_err() {
                log::error!("device worker panicked during teardown");
            }
        }
    }

    pub fn capability(&self) -> Result<DeviceCapability, CameraError> {
        self.request(|reply| Command::QueryCapability { reply })?
    }

    pub fn configure(&self, quality: CaptureQuality) -> Result<(), CameraError> {
        self.request(|reply| Command::Configure { quality, reply })?
    }

    pub fn start_preview(&self, plan: PreviewPlan) -> Result<(), CameraError> {
        self.request(|reply| Command::StartPreview { plan, reply })?
    }

    pub fn stop_preview(&self) -> Result<(), CameraError> {
        self.request(|reply| Command::StopPreview { reply })
    }

    pub fn set_flash(&self, enabled: bool) -> Result<(), CameraError> {
        self.request(|reply| Command::SetFlash { enabled, reply })?
    }

    fn request<T>(&self, build: impl FnOnce(Sender<T>) -> Command) -> Result<T, CameraError> {
        let link = self
            .worker
            .as_ref()
            .ok_or_else(|| CameraError::WorkerGone("device worker not running".into()))?;
        let (reply_tx, reply_rx) = mpsc::channel();
        link.commands
            .send(build(reply_tx))
            .map_err(|_| CameraError::WorkerGone("device worker hung up".into()))?;
        reply_rx
            .recv()
            .map_err(|_| CameraError::WorkerGone("device worker dropped the reply".into()))
    }
}

impl<D: CameraDriver> Drop for DeviceHost<D> {
    fn drop(&mut self) {
        self.close();
    }
}

struct PreviewRun {
    sink: FrameSink,
    pool: FramePool,
    width: u32,
    height: u32,
    rotation: i32,
}

fn worker_loop<H: DeviceHandle>(
    mut handle: Option<H>,
    commands: Receiver<Command>,
    on_error: ErrorHook,
) {
    let mut preview: Option<PreviewRun> = None;

    loop {
        // Between frames, commands take priority over pumping.
        let command = if preview.is_some() {
            match commands.try_recv() {
                Ok(command) => Some(command),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => break,
            }
        } else {
            match commands.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            }
        };

        if let Some(command) = command {
            if matches!(command, Command::Release) {
                break;
            }
            handle_command(&mut handle, &mut preview, command);
            continue;
        }

        let outcome = if let (Some(run), Some(device)) = (preview.as_ref(), handle.as_mut()) {
            pump_frame(device, run)
        } else {
            preview = None;
            continue;
        };
        match outcome {
            Ok(()) => {}
            Err(e) if e.is_fatal() => {
                log::error!("device failed while previewing: {}", e);
                if let Some(device) = handle.as_mut() {
                    device.stop_preview();
                }
                preview = None;
                on_error(e);
            }
            Err(e) => log::warn!("dropped preview frame: {}", e),
        }
    }
    // The handle drops here, on the thread that opened it.
}

fn handle_command<H: DeviceHandle>(
    handle: &mut Option<H>,
    preview: &mut Option<PreviewRun>,
    command: Command,
) {
    match command {
        Command::QueryCapability { reply } => {
            let _ = reply.send(with_handle(handle, |h| h.capability()));
        }
        Command::Configure { quality, reply } => {
            let _ = reply.send(with_handle(handle, |h| h.configure(&quality)));
        }
        Command::StartPreview { plan, reply } => {
            let outcome = with_handle(handle, |h| h.start_preview());
            if outcome.is_ok() {
                *preview = Some(PreviewRun {
                    pool: FramePool::new(plan.buffer_size, plan.buffer_count),
                    sink: plan.sink,
                    width: plan.width,
                    height: plan.height,
                    rotation: plan.rotation,
                });
            }
            let _ = reply.send(outcome);
        }
        Command::StopPreview { reply } => {
            if let Some(device) = handle.as_mut() {
                device.stop_preview();
            }
            *preview = None;
            let _ = reply.send(());
        }
        Command::SetFlash { enabled, reply } => {
            let _ = reply.send(with_handle(handle, |h| write_flash_unlocked(h, enabled)));
        }
        // Release is intercepted by the loop.
        Command::Release => {}
    }
}

fn with_handle<H: DeviceHandle, T>(
    handle: &mut Option<H>,
    op: impl FnOnce(&mut H) -> Result<T, CameraError>,
) -> Result<T, CameraError> {
    match handle.as_mut() {
        Some(device) => op(device),
        None => Err(CameraError::DeviceDied("no device handle on worker".into())),
    }
}

fn pump_frame<H: DeviceHandle>(device: &mut H, run: &PreviewRun) -> Result<(), CameraError> {
    let Some(mut buf) = run.pool.acquire() else {
        log::warn!("preview buffer pool exhausted; dropping frame");
        return Ok(());
    };
    let meta = match device.next_frame(&mut buf)? {
        Some(meta) => meta,
        // Pacing window elapsed without a frame; go service commands.
        None => return Ok(()),
    };
    let used = meta.bytes_used.min(buf.len());
    let frame = PreviewFrame {
        data: &buf[..used],
        width: run.width,
        height: run.height,
        rotation: run.rotation,
    };
    (run.sink)(&frame);
    Ok(())
}

/// Parameter writes happen under the platform's transient unlocked mode;
/// the guard restores locked mode on every exit path, including a failed
/// write.
struct UnlockGuard<'a, H: DeviceHandle> {
    device: &'a mut H,
}

impl<'a, H: DeviceHandle> UnlockGuard<'a, H> {
    fn acquire(device: &'a mut H) -> Result<Self, CameraError> {
        device.unlock()?;
        Ok(Self { device })
    }

    fn write_flash(&mut self, enabled: bool) -> Result<(), CameraError> {
        self.device.write_flash(enabled)
    }
}

impl<H: DeviceHandle> Drop for UnlockGuard<'_, H> {
    fn drop(&mut self) {
        if let Err(e) = self.device.relock() {
            log::error!("failed to relock device after parameter write: {}", e);
        }
    }
}

fn write_flash_unlocked<H: DeviceHandle>(
    device: &mut H,
    enabled: bool,
) -> Result<(), CameraError> {
    let mut guard = UnlockGuard::acquire(device)?;
    guard.write_flash(enabled)
}
