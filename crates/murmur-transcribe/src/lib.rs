//! Transcription backend client for murmur.
//!
//! This crate provides a trait-based abstraction over the external
//! transcription/PDF service, with an HTTP implementation speaking the
//! backend's multipart and JSON endpoints.

mod http;

use async_trait::async_trait;
pub use http::{BackendClient, BackendConfig};
use murmur_core::Segment;
use thiserror::Error;

/// Errors that can occur during a backend round trip.
#[derive(Debug, Error)]
pub enum TranscribeError {
    /// The upload could not be constructed (bad MIME type or metadata);
    /// nothing was sent.
    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    /// The backend could not be reached at all. The message names the
    /// secure-page/plain-HTTP pitfall when the configured URL makes that
    /// the likely cause.
    #[error("{0}")]
    NetworkUnreachable(String),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {body}")]
    BackendRejected { status: u16, body: String },

    /// The response body did not carry a usable segment list.
    #[error("malformed backend response: {0}")]
    MalformedResponse(String),
}

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, TranscribeError>;

/// Trait for transcription backends.
///
/// Implement this trait to add new backends (other transcription
/// services, a local model, a test double).
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe one audio/video upload into timed segments.
    ///
    /// `file_name` and `mime` describe the uploaded bytes. Segments come
    /// back in the order the backend produced them and are never
    /// re-sorted. The call suspends until the backend responds or fails;
    /// nothing is retried.
    async fn transcribe(
        &self,
        data: Vec<u8>,
        file_name: &str,
        mime: &str,
    ) -> Result<Vec<Segment>>;

    /// Render the given text into a PDF and return the raw document bytes.
    async fn generate_pdf(&self, text: &str) -> Result<Vec<u8>>;

    /// Returns the name of this backend for logging/debugging.
    fn name(&self) -> &str;
}
