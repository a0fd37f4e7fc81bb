//! Upload pipeline: client-side validation and the backend round trip.
//!
//! One `submit` call is one upload. The pipeline performs no queueing, no
//! retry, and no cancellation; preventing overlapping submissions is the
//! caller's job, and two in-flight uploads append their segments in
//! completion order.

use std::path::Path;
use std::sync::Arc;

use murmur_audio::Clip;
use murmur_core::Segment;
use murmur_transcribe::{TranscribeError, Transcriber};
use thiserror::Error;
use tracing::info;

/// Errors surfaced by a submission before or during the backend round
/// trip.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Rejected client-side before any network call.
    #[error("unsupported file type {mime:?}: upload an audio or video file")]
    InvalidFileType { mime: String },

    #[error(transparent)]
    Transcribe(#[from] TranscribeError),
}

/// One submission source: a finalized recording or a user-selected file.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub mime: String,
    pub data: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            data,
        }
    }

    /// Wrap a finalized recording.
    pub fn from_clip(clip: Clip) -> Self {
        let file_name = clip.file_name();
        let mime = clip.mime().to_string();
        Self::new(file_name, mime, clip.into_data())
    }

    /// Read a user-selected file, deriving the MIME type from its
    /// extension. Unknown extensions fail the MIME gate in [`submit`]
    /// rather than here.
    ///
    /// [`submit`]: TranscriptionPipeline::submit
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let mime = mime_for_path(path).to_string();
        Ok(Self::new(file_name, mime, data))
    }
}

/// Only audio and video uploads are accepted; checked before any network
/// call.
pub fn is_supported_mime(mime: &str) -> bool {
    mime.starts_with("audio/") || mime.starts_with("video/")
}

/// MIME type for a file path, by extension. Unknown extensions map to
/// `application/octet-stream`, which the MIME gate rejects.
pub fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "ogg" | "oga" => "audio/ogg",
        "flac" => "audio/flac",
        "opus" => "audio/opus",
        "weba" => "audio/webm",
        "webm" => "video/webm",
        "mp4" => "video/mp4",
        "mpeg" | "mpg" => "video/mpeg",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        _ => "application/octet-stream",
    }
}

/// Uploads one source at a time to the transcription backend.
pub struct TranscriptionPipeline {
    backend: Arc<dyn Transcriber>,
}

impl TranscriptionPipeline {
    pub fn new(backend: Arc<dyn Transcriber>) -> Self {
        Self { backend }
    }

    /// Validate and upload one source, returning the new segments.
    ///
    /// Suspends until the backend responds. The response is fully parsed
    /// before anything is returned, so a malformed reply can never leak
    /// partial segments to the caller.
    pub async fn submit(&self, upload: Upload) -> Result<Vec<Segment>, SubmitError> {
        if !is_supported_mime(&upload.mime) {
            return Err(SubmitError::InvalidFileType { mime: upload.mime });
        }

        info!(
            file_name = %upload.file_name,
            mime = %upload.mime,
            bytes = upload.data.len(),
            backend = self.backend.name(),
            "audio submitted"
        );

        let segments = self
            .backend
            .transcribe(upload.data, &upload.file_name, &upload.mime)
            .await?;

        info!(segments = segments.len(), "transcription completed");
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct FakeBackend {
        calls: AtomicUsize,
        segments: Vec<Segment>,
    }

    impl FakeBackend {
        fn returning(segments: Vec<Segment>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                segments,
            }
        }
    }

    #[async_trait]
    impl Transcriber for FakeBackend {
        async fn transcribe(
            &self,
            _data: Vec<u8>,
            _file_name: &str,
            _mime: &str,
        ) -> Result<Vec<Segment>, TranscribeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.segments.clone())
        }

        async fn generate_pdf(&self, _text: &str) -> Result<Vec<u8>, TranscribeError> {
            unimplemented!("not used by these tests")
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn seg(start: f64, end: f64, text: &str) -> Segment {
        Segment {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_mime_gate_accepts_audio_and_video_only() {
        assert!(is_supported_mime("audio/wav"));
        assert!(is_supported_mime("audio/mpeg"));
        assert!(is_supported_mime("video/mp4"));
        assert!(!is_supported_mime("text/plain"));
        assert!(!is_supported_mime("application/octet-stream"));
        assert!(!is_supported_mime(""));
    }

    #[test]
    fn test_mime_for_path_common_extensions() {
        assert_eq!(mime_for_path(&PathBuf::from("talk.MP3")), "audio/mpeg");
        assert_eq!(mime_for_path(&PathBuf::from("talk.wav")), "audio/wav");
        assert_eq!(mime_for_path(&PathBuf::from("clip.webm")), "video/webm");
        assert_eq!(
            mime_for_path(&PathBuf::from("notes.txt")),
            "application/octet-stream"
        );
        assert_eq!(
            mime_for_path(&PathBuf::from("no_extension")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_upload_from_clip_keeps_mime_and_naming() {
        let upload = Upload::from_clip(Clip::wav(vec![7, 8]));
        assert_eq!(upload.mime, "audio/wav");
        assert!(upload.file_name.starts_with("recording_"));
        assert!(upload.file_name.ends_with(".wav"));
        assert_eq!(upload.data, vec![7, 8]);
    }

    #[tokio::test]
    async fn test_submit_returns_backend_segments() {
        let pipeline = TranscriptionPipeline::new(Arc::new(FakeBackend::returning(vec![seg(
            0.0, 1.0, "Hi",
        )])));
        let segments = pipeline
            .submit(Upload::new("a.wav", "audio/wav", vec![0]))
            .await
            .unwrap();
        assert_eq!(segments, vec![seg(0.0, 1.0, "Hi")]);
    }

    #[tokio::test]
    async fn test_submit_rejects_unsupported_mime_before_upload() {
        let backend = Arc::new(FakeBackend::returning(Vec::new()));
        let pipeline = TranscriptionPipeline::new(backend.clone());

        let err = pipeline
            .submit(Upload::new("notes.txt", "text/plain", vec![0]))
            .await
            .unwrap_err();

        assert!(matches!(err, SubmitError::InvalidFileType { .. }));
        assert!(err.to_string().contains("audio or video"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }
}
