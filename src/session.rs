//! Session controller: owns the transcript and the single-slot error
//! state, and funnels every operation failure into it.
//!
//! All mutation goes through the named operations below; the UI layer
//! only ever reads through the accessors. No failure escapes an
//! operation: each one is caught at its boundary and rendered into the
//! error slot, and nothing is retried automatically.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use murmur_audio::{CaptureBackend, Clip};
use murmur_core::{CaptureState, Segment, Transcript};
use murmur_transcribe::Transcriber;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::captions;
use crate::clipboard::ClipboardSink;
use crate::export::{ExportKind, ExportSink};
use crate::pipeline::{TranscriptionPipeline, Upload};
use crate::record::RecordingSession;
use crate::speech::SpeechSynth;

struct State {
    transcript: Transcript,
    error: Option<String>,
}

/// One user-facing recording/transcription session.
pub struct Session {
    recorder: RecordingSession,
    pipeline: TranscriptionPipeline,
    backend: Arc<dyn Transcriber>,
    sink: Box<dyn ExportSink>,
    clipboard: Mutex<Box<dyn ClipboardSink>>,
    speech: Mutex<Box<dyn SpeechSynth>>,
    state: Mutex<State>,
}

impl Session {
    pub fn new(
        capture: Arc<dyn CaptureBackend>,
        backend: Arc<dyn Transcriber>,
        sink: Box<dyn ExportSink>,
        clipboard: Box<dyn ClipboardSink>,
        speech: Box<dyn SpeechSynth>,
    ) -> Self {
        Self {
            recorder: RecordingSession::new(capture),
            pipeline: TranscriptionPipeline::new(backend.clone()),
            backend,
            sink,
            clipboard: Mutex::new(clipboard),
            speech: Mutex::new(speech),
            state: Mutex::new(State {
                transcript: Transcript::new(),
                error: None,
            }),
        }
    }

    // ---- read accessors ----

    /// Flattened transcript text.
    pub fn transcript_text(&self) -> String {
        self.state.lock().transcript.text().to_string()
    }

    /// Accumulated segments, in arrival order.
    pub fn segments(&self) -> Vec<Segment> {
        self.state.lock().transcript.segments().to_vec()
    }

    /// The active error message, if any.
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    /// Observable capture state.
    pub fn capture_state(&self) -> CaptureState {
        self.recorder.state()
    }

    // ---- recording ----

    /// Start recording from the microphone. Clears any stale error
    /// first; a capture failure lands in the error slot.
    pub async fn start_recording(&self) {
        self.state.lock().error = None;
        if let Err(e) = self.recorder.start().await {
            self.set_error(e.to_string());
        }
    }

    /// Stop recording and submit the finalized clip for transcription.
    pub async fn stop_and_transcribe(&self) {
        if let Some(clip) = self.stop_recording() {
            self.transcribe_clip(clip).await;
        }
    }

    /// Stop recording, returning the finalized clip without submitting
    /// it. The device is released with this call.
    pub fn stop_recording(&self) -> Option<Clip> {
        match self.recorder.stop() {
            Ok(clip) => clip,
            Err(e) => {
                self.set_error(e.to_string());
                None
            }
        }
    }

    // ---- transcription ----

    /// Submit a finalized recording.
    pub async fn transcribe_clip(&self, clip: Clip) {
        self.transcribe_upload(Upload::from_clip(clip)).await;
    }

    /// Read and submit a user-selected file.
    pub async fn transcribe_file(&self, path: &Path) {
        match Upload::from_path(path) {
            Ok(upload) => self.transcribe_upload(upload).await,
            Err(e) => self.set_error(format!("failed to read {}: {e}", path.display())),
        }
    }

    /// Submit one upload and append its segments to the transcript.
    ///
    /// The transcript is only touched after a fully parsed response: a
    /// rejected or malformed reply leaves prior state exactly as it was.
    pub async fn transcribe_upload(&self, upload: Upload) {
        self.state.lock().error = None;
        match self.pipeline.submit(upload).await {
            Ok(segments) => {
                self.state.lock().transcript.append(segments);
            }
            Err(e) => self.set_error(e.to_string()),
        }
    }

    // ---- glue actions ----

    /// Hand the flattened text verbatim to the clipboard.
    pub fn copy_transcript(&self) {
        let text = self.transcript_text();
        if let Err(e) = self.clipboard.lock().set_text(&text) {
            self.set_error(format!("failed to copy to clipboard: {e}"));
        }
    }

    /// Toggle speech synthesis: cancel the in-progress utterance, or
    /// start speaking the flattened text.
    pub fn speak_transcript(&self) {
        let text = self.transcript_text();
        let mut speech = self.speech.lock();
        if speech.is_speaking() {
            speech.cancel();
        } else {
            speech.speak(&text);
        }
    }

    /// Cancel speech, then reset the transcript and the error slot.
    pub fn clear(&self) {
        self.speech.lock().cancel();
        let mut state = self.state.lock();
        state.transcript.clear();
        state.error = None;
    }

    /// Clear the error slot alone.
    pub fn dismiss_error(&self) {
        self.state.lock().error = None;
    }

    /// Replace the flattened text without touching the segment list;
    /// caption exports keep reflecting the original transcription.
    pub fn edit_text(&self, text: impl Into<String>) {
        self.state.lock().transcript.set_text(text);
    }

    // ---- export ----

    /// Generate the requested format and save it through the sink.
    /// Returns the saved path, or `None` on failure (recorded in the
    /// error slot).
    pub fn export(&self, kind: ExportKind) -> Option<PathBuf> {
        let content = {
            let state = self.state.lock();
            match kind {
                ExportKind::Srt => captions::generate_srt(state.transcript.segments()),
                ExportKind::Vtt => captions::generate_vtt(state.transcript.segments()),
                ExportKind::Timestamped => {
                    captions::generate_timestamped_text(state.transcript.segments())
                }
                ExportKind::PlainText => state.transcript.text().to_string(),
            }
        };
        match self
            .sink
            .save(&kind.file_name(), kind.mime(), content.as_bytes())
        {
            Ok(path) => Some(path),
            Err(e) => {
                self.set_error(e.to_string());
                None
            }
        }
    }

    /// Render the flattened text to PDF through the backend and save the
    /// returned bytes verbatim.
    pub async fn export_pdf(&self) -> Option<PathBuf> {
        let text = self.transcript_text();
        if text.is_empty() {
            debug!("no transcript text; skipping PDF export");
            return None;
        }
        let bytes = match self.backend.generate_pdf(&text).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.set_error(format!("failed to generate PDF: {e}"));
                return None;
            }
        };
        match self
            .sink
            .save("transcription.pdf", "application/pdf", &bytes)
        {
            Ok(path) => Some(path),
            Err(e) => {
                self.set_error(e.to_string());
                None
            }
        }
    }

    fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(error = %message, "session error");
        self.state.lock().error = Some(message);
    }
}
