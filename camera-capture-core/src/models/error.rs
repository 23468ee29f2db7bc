use thiserror::Error;

/// Errors that can occur while managing a camera device.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// Another process or session already holds the device.
    #[error("device busy: {0}")]
    DeviceBusy(String),

    /// The preview surface was absent or not ready when the device was
    /// opened unconditionally. This is a programming error in the caller;
    /// `request_start` itself defers instead of failing.
    #[error("invalid surface: {0}")]
    InvalidSurface(String),

    /// The device refused the negotiated parameters.
    #[error("configuration rejected: {0}")]
    ConfigurationRejected(String),

    /// The device reported an asynchronous fatal failure (e.g. the media
    /// service backing it crashed, or the hardware was unplugged).
    #[error("device died: {0}")]
    DeviceDied(String),

    /// The device has no controllable flash.
    #[error("flash not supported by this device")]
    FlashUnsupported,

    /// The session was destroyed; no further transitions are possible.
    #[error("session destroyed")]
    SessionDestroyed,

    /// The device worker thread is gone; the command could not be delivered.
    #[error("device worker gone: {0}")]
    WorkerGone(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl CameraError {
    /// Whether this error invalidates the open device handle.
    ///
    /// Fatal errors force-stop the session; non-fatal ones are logged and
    /// leave the preview running.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CameraError::DeviceDied(_) | CameraError::WorkerGone(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatality_classification() {
        assert!(CameraError::DeviceDied("server died".into()).is_fatal());
        assert!(CameraError::WorkerGone("hung up".into()).is_fatal());
        assert!(!CameraError::FlashUnsupported.is_fatal());
        assert!(!CameraError::DeviceBusy("in use".into()).is_fatal());
        assert!(!CameraError::ConfigurationRejected("bad fps".into()).is_fatal());
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            CameraError::FlashUnsupported.to_string(),
            "flash not supported by this device"
        );
        assert_eq!(
            CameraError::DeviceBusy("held by pid 42".into()).to_string(),
            "device busy: held by pid 42"
        );
    }
}
