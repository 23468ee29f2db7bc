//! V4L2 camera driver.
//!
//! Implements the core's `CameraDriver`/`DeviceHandle` seam on top of the
//! `v4l` crate: capability discovery via `VIDIOC_ENUM_FRAMESIZES` /
//! `VIDIOC_ENUM_FRAMEINTERVALS`, configuration via `VIDIOC_S_FMT` and
//! `VIDIOC_S_PARM`, and preview via memory-mapped streaming I/O.
//!
//! V4L2 parameter writes need no transient ownership mode, so the handle
//! keeps the default no-op `unlock`/`relock`.

use std::io;

use v4l::buffer::Type;
use v4l::control::{Control, Value};
use v4l::frameinterval::FrameIntervalEnum;
use v4l::framesize::FrameSizeEnum;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::{CaptureStream, Stream};
use v4l::video::capture::Parameters;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC, Fraction};

use camera_capture_core::models::error::CameraError;
use camera_capture_core::models::quality::{
    CaptureQuality, DeviceCapability, FrameFormat, FramerateRange, Resolution,
};
use camera_capture_core::traits::camera_driver::{CameraDriver, DeviceHandle, FrameMeta};

/// Memory-mapped buffers queued with the kernel while streaming.
const STREAM_BUFFERS: u32 = 4;

/// `V4L2_CID_FLASH_LED_MODE` (flash control class).
const CID_FLASH_LED_MODE: u32 = 0x009c_0901;
const FLASH_LED_MODE_NONE: i64 = 0;
/// Torch mode: continuous light, the only mode that makes sense while a
/// preview is running.
const FLASH_LED_MODE_TORCH: i64 = 2;

/// Opens `/dev/video*` devices as thread-confined [`V4l2Handle`]s.
#[derive(Debug, Clone)]
pub struct V4l2Driver {
    format: FrameFormat,
}

impl V4l2Driver {
    /// Driver producing frames in the given pixel layout.
    ///
    /// Must match the format the session sizes its preview buffers with.
    pub fn new(format: FrameFormat) -> Self {
        Self { format }
    }
}

impl Default for V4l2Driver {
    fn default() -> Self {
        // Nearly every UVC webcam supports packed YUYV.
        Self::new(FrameFormat::Yuyv)
    }
}

impl CameraDriver for V4l2Driver {
    type Handle = V4l2Handle;

    fn open(&self, device_id: &str) -> Result<V4l2Handle, CameraError> {
        let device = if let Ok(index) = device_id.parse::<usize>() {
            Device::new(index)
        } else {
            Device::with_path(device_id)
        }
        .map_err(|e| map_open_error(device_id, &e))?;
        log::info!("opened v4l2 device {}", device_id);
        Ok(V4l2Handle {
            device,
            path: device_id.to_string(),
            format: self.format,
            stream: None,
            flash_control: None,
        })
    }
}

/// An open V4L2 device.
///
/// Lives and dies on the device worker thread. The mmap stream shares the
/// device's file descriptor rather than borrowing the handle, so both can
/// sit in the same struct.
pub struct V4l2Handle {
    device: Device,
    path: String,
    format: FrameFormat,
    stream: Option<MmapStream<'static>>,
    /// Flash control id, `Some(None)` once probed and found absent.
    flash_control: Option<Option<u32>>,
}

impl V4l2Handle {
    fn flash_control_id(&mut self) -> Option<u32> {
        if let Some(probed) = self.flash_control {
            return probed;
        }
        let id = self
            .device
            .query_controls()
            .ok()
            .and_then(|controls| {
                controls
                    .iter()
                    .find(|c| c.id == CID_FLASH_LED_MODE)
                    .map(|c| c.id)
            });
        self.flash_control = Some(id);
        id
    }
}

impl DeviceHandle for V4l2Handle {
    fn capability(&mut self) -> Result<DeviceCapability, CameraError> {
        let fourcc = fourcc_of(self.format);
        let sizes = self
            .device
            .enum_framesizes(fourcc)
            .map_err(|e| map_device_error(&self.path, &e))?;

        let mut resolutions: Vec<Resolution> = Vec::new();
        for size in &sizes {
            resolutions.extend(resolutions_of(&size.size));
        }
        resolutions.sort_by_key(|r| (r.pixels(), r.width));
        resolutions.dedup();

        let mut ranges: Vec<FramerateRange> = Vec::new();
        for resolution in &resolutions {
            let intervals = match self.device.enum_frameintervals(
                fourcc,
                resolution.width,
                resolution.height,
            ) {
                Ok(intervals) => intervals,
                Err(e) => {
                    log::debug!("no frame intervals for {} on {}: {}", resolution, self.path, e);
                    continue;
                }
            };
            for interval in &intervals {
                ranges.push(range_of(&interval.interval));
            }
        }
        ranges.sort_by_key(|r| (r.min, r.max));
        ranges.dedup();

        Ok(DeviceCapability {
            resolutions,
            framerate_ranges: ranges,
            has_flash: self.flash_control_id().is_some(),
        })
    }

    fn configure(&mut self, quality: &CaptureQuality) -> Result<(), CameraError> {
        let fourcc = fourcc_of(self.format);
        let wanted = Format::new(quality.width, quality.height, fourcc);
        let actual = self
            .device
            .set_format(&wanted)
            .map_err(|e| CameraError::ConfigurationRejected(format!("set_format: {}", e)))?;
        if actual.width != quality.width || actual.height != quality.height {
            return Err(CameraError::ConfigurationRejected(format!(
                "device adjusted {}x{} to {}x{}",
                quality.width, quality.height, actual.width, actual.height
            )));
        }
        if actual.fourcc != fourcc {
            return Err(CameraError::ConfigurationRejected(format!(
                "device adjusted pixel format {} to {}",
                fourcc, actual.fourcc
            )));
        }

        let params = self
            .device
            .set_params(&Parameters::with_fps(quality.framerate))
            .map_err(|e| CameraError::ConfigurationRejected(format!("set_params: {}", e)))?;
        let actual_fps = fps_of(params.interval);
        if actual_fps != quality.framerate {
            // The rate was negotiated from the device's own intervals, so a
            // rounded value here is driver quirk, not a rejection.
            log::warn!(
                "{}: requested {}fps, driver set {}fps",
                self.path,
                quality.framerate,
                actual_fps
            );
        }
        Ok(())
    }

    fn start_preview(&mut self) -> Result<(), CameraError> {
        let mut stream = MmapStream::with_buffers(&self.device, Type::VideoCapture, STREAM_BUFFERS)
            .map_err(|e| map_device_error(&self.path, &e))?;
        stream
            .start()
            .map_err(|e| map_device_error(&self.path, &e))?;
        self.stream = Some(stream);
        Ok(())
    }

    /// Dequeue the next frame into `buf`.
    ///
    /// `VIDIOC_DQBUF` blocks until a frame is available, which on a running
    /// capture is bounded by the configured frame interval.
    fn next_frame(&mut self, buf: &mut [u8]) -> Result<Option<FrameMeta>, CameraError> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };
        let (data, _meta) = match stream.next() {
            Ok(frame) => frame,
            Err(e) => return Err(map_stream_error(&self.path, &e)),
        };
        let used = data.len().min(buf.len());
        if data.len() > buf.len() {
            log::warn!(
                "{}: frame of {} bytes truncated to {}-byte buffer",
                self.path,
                data.len(),
                buf.len()
            );
        }
        buf[..used].copy_from_slice(&data[..used]);
        Ok(Some(FrameMeta { bytes_used: used }))
    }

    fn stop_preview(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.stop() {
                log::debug!("{}: stream off: {}", self.path, e);
            }
        }
    }

    fn write_flash(&mut self, enabled: bool) -> Result<(), CameraError> {
        let Some(id) = self.flash_control_id() else {
            return Err(CameraError::FlashUnsupported);
        };
        let mode = if enabled {
            FLASH_LED_MODE_TORCH
        } else {
            FLASH_LED_MODE_NONE
        };
        self.device
            .set_control(Control {
                id,
                value: Value::Integer(mode),
            })
            .map_err(|e| CameraError::Unknown(format!("flash led mode: {}", e)))
    }
}

fn fourcc_of(format: FrameFormat) -> FourCC {
    match format {
        FrameFormat::Nv21 => FourCC::new(b"NV21"),
        FrameFormat::Yuyv => FourCC::new(b"YUYV"),
    }
}

/// Frames per second for a frame interval (seconds per frame).
fn fps_of(interval: Fraction) -> u32 {
    if interval.numerator == 0 {
        return 0;
    }
    ((interval.denominator as f64 / interval.numerator as f64).round()) as u32
}

/// Discrete sizes pass through; stepwise ranges collapse to their bounds.
fn resolutions_of(size: &FrameSizeEnum) -> Vec<Resolution> {
    match size {
        FrameSizeEnum::Discrete(d) => vec![Resolution::new(d.width, d.height)],
        FrameSizeEnum::Stepwise(s) => vec![
            Resolution::new(s.min_width, s.min_height),
            Resolution::new(s.max_width, s.max_height),
        ],
    }
}

/// A discrete interval becomes a fixed range; a stepwise interval spans
/// from its slowest to its fastest rate.
fn range_of(interval: &FrameIntervalEnum) -> FramerateRange {
    match interval {
        FrameIntervalEnum::Discrete(f) => FramerateRange::fixed(fps_of(*f)),
        // The longest interval is the lowest rate.
        FrameIntervalEnum::Stepwise(s) => FramerateRange::new(fps_of(s.max), fps_of(s.min)),
    }
}

fn map_open_error(path: &str, e: &io::Error) -> CameraError {
    match e.raw_os_error() {
        Some(libc_errno) if libc_errno == 16 => {
            // EBUSY: exclusive access held elsewhere.
            CameraError::DeviceBusy(format!("{} is held by another owner", path))
        }
        Some(libc_errno) if libc_errno == 13 => CameraError::Unknown(format!(
            "{}: permission denied (is the user in the video group?)",
            path
        )),
        _ => CameraError::Unknown(format!("failed to open {}: {}", path, e)),
    }
}

/// Errors from an already open handle mean the device went away.
fn map_device_error(path: &str, e: &io::Error) -> CameraError {
    CameraError::DeviceDied(format!("{}: {}", path, e))
}

/// Dequeue failures: a vanished device is fatal; anything else is a
/// transient corrupt frame the worker drops and logs.
fn map_stream_error(path: &str, e: &io::Error) -> CameraError {
    match e.raw_os_error() {
        // ENODEV / ENXIO: unplugged or driver gone.
        Some(19) | Some(6) => CameraError::DeviceDied(format!("{}: {}", path, e)),
        _ => CameraError::Unknown(format!("{}: dequeue failed: {}", path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use v4l::framesize::{Discrete, Stepwise};

    #[test]
    fn fourcc_mapping() {
        assert_eq!(fourcc_of(FrameFormat::Nv21), FourCC::new(b"NV21"));
        assert_eq!(fourcc_of(FrameFormat::Yuyv), FourCC::new(b"YUYV"));
    }

    #[test]
    fn fps_from_interval() {
        assert_eq!(fps_of(Fraction::new(1, 30)), 30);
        assert_eq!(fps_of(Fraction::new(1, 15)), 15);
        // 1001/30000s per frame is NTSC 29.97, rounded to 30.
        assert_eq!(fps_of(Fraction::new(1001, 30000)), 30);
        assert_eq!(fps_of(Fraction::new(0, 30)), 0);
    }

    #[test]
    fn discrete_interval_becomes_fixed_range() {
        let range = range_of(&FrameIntervalEnum::Discrete(Fraction::new(1, 25)));
        assert_eq!(range, FramerateRange::fixed(25));
    }

    #[test]
    fn stepwise_interval_spans_slowest_to_fastest() {
        let range = range_of(&FrameIntervalEnum::Stepwise(
            v4l::frameinterval::Stepwise {
                min: Fraction::new(1, 60),
                max: Fraction::new(1, 5),
                step: Fraction::new(1, 60),
            },
        ));
        assert_eq!(range, FramerateRange::new(5, 60));
    }

    #[test]
    fn stepwise_size_collapses_to_bounds() {
        let sizes = resolutions_of(&FrameSizeEnum::Stepwise(Stepwise {
            min_width: 160,
            max_width: 1920,
            step_width: 16,
            min_height: 120,
            max_height: 1080,
            step_height: 16,
        }));
        assert_eq!(
            sizes,
            vec![Resolution::new(160, 120), Resolution::new(1920, 1080)]
        );
        assert_eq!(
            resolutions_of(&FrameSizeEnum::Discrete(Discrete {
                width: 640,
                height: 480
            })),
            vec![Resolution::new(640, 480)]
        );
    }

    #[test]
    fn busy_open_maps_to_device_busy() {
        let e = io::Error::from_raw_os_error(16);
        assert!(matches!(
            map_open_error("/dev/video0", &e),
            CameraError::DeviceBusy(_)
        ));
        let e = io::Error::from_raw_os_error(2);
        assert!(matches!(
            map_open_error("/dev/video0", &e),
            CameraError::Unknown(_)
        ));
    }

    #[test]
    fn vanished_device_is_fatal_mid_stream() {
        let gone = io::Error::from_raw_os_error(19);
        assert!(map_stream_error("/dev/video0", &gone).is_fatal());
        let transient = io::Error::from_raw_os_error(5);
        assert!(!map_stream_error("/dev/video0", &transient).is_fatal());
    }
}
