//! Capture device collaborator.
//!
//! The engine never talks to an audio driver directly. Instead, the host
//! supplies an [`AudioBackend`] which opens and closes the capture device,
//! and wires the device's callback to [`Voice::read_audio_data`].
//!
//! [`Voice::read_audio_data`]: crate::Voice::read_audio_data

use crate::error::DeviceError;

/// Format the capture device was actually opened with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CaptureFormat {
    /// Interleaved channel count of delivered audio.
    pub channels: u16,
}

/// Opens and closes the microphone on behalf of the engine.
pub trait AudioBackend: Send + Sync {
    /// Opens the named capture device, or the default device for `None`.
    ///
    /// `channels` is the layout the encoder would prefer; the device may
    /// choose otherwise and report this in the returned format. Audio must
    /// be 16-bit little-endian PCM at [`SAMPLE_RATE_RAW`].
    ///
    /// [`SAMPLE_RATE_RAW`]: crate::constants::SAMPLE_RATE_RAW
    fn open_capture(
        &self,
        device_name: Option<&str>,
        channels: u16,
    ) -> Result<CaptureFormat, DeviceError>;

    /// Stops the capture device.
    ///
    /// After this returns the backend must not start new calls into
    /// [`Voice::read_audio_data`], though a call already in flight may
    /// still complete.
    ///
    /// [`Voice::read_audio_data`]: crate::Voice::read_audio_data
    fn close_capture(&self);
}

/// A backend with no devices, for headless use.
///
/// Every open succeeds with the requested layout and no audio is ever
/// delivered unless the host calls [`Voice::read_audio_data`] itself.
///
/// [`Voice::read_audio_data`]: crate::Voice::read_audio_data
#[derive(Clone, Copy, Debug, Default)]
pub struct NullBackend;

impl AudioBackend for NullBackend {
    fn open_capture(
        &self,
        _device_name: Option<&str>,
        channels: u16,
    ) -> Result<CaptureFormat, DeviceError> {
        Ok(CaptureFormat { channels })
    }

    fn close_capture(&self) {}
}
