//! Microphone capture for murmur.
//!
//! Capture is modeled as a backend that asynchronously opens the
//! microphone and hands back a handle to the live stream. Stopping the
//! handle releases the device with the stop itself; the buffered chunks
//! are then concatenated into a [`Clip`].

mod capture;

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
pub use capture::MicBackend;
use thiserror::Error;

/// Errors that can occur while opening or running a capture session.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The platform refused access to the input device.
    #[error("microphone permission denied")]
    PermissionDenied,

    /// No usable input device is present.
    #[error("no microphone found")]
    DeviceNotFound,

    /// Any other capture failure.
    #[error("capture failed: {0}")]
    Capture(String),
}

/// Result type for capture operations.
pub type Result<T> = std::result::Result<T, CaptureError>;

/// MIME type of finalized clips. Capture chunks are written into a single
/// in-memory WAV.
pub const CLIP_MIME: &str = "audio/wav";

/// A finalized audio recording: the concatenated capture chunks tagged
/// with the MIME type they were encoded as.
#[derive(Debug, Clone)]
pub struct Clip {
    data: Vec<u8>,
    mime: &'static str,
}

impl Clip {
    /// Wrap finalized WAV bytes.
    pub fn wav(data: Vec<u8>) -> Self {
        Self {
            data,
            mime: CLIP_MIME,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Suggested file name for handing the clip onward, e.g.
    /// `recording_1700000000000.wav`.
    pub fn file_name(&self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        format!("recording_{millis}.wav")
    }
}

/// A live capture session.
///
/// Finishing the handle releases the input device before the buffered
/// chunks are finalized; dropping it without finishing releases the
/// device and discards the buffer.
pub trait CaptureHandle: Send {
    /// Stop capturing and concatenate the buffered chunks into a clip.
    fn finish(self: Box<Self>) -> Result<Clip>;
}

/// Factory for capture sessions. Opening may suspend while the platform
/// resolves device access.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Request the input device and start capturing.
    async fn open(&self) -> Result<Box<dyn CaptureHandle>>;
}
