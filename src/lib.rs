// Re-export from sub-crates
pub use murmur_audio::{CLIP_MIME, CaptureBackend, CaptureError, CaptureHandle, Clip, MicBackend};
pub use murmur_core::{
    APP_NAME, APP_NAME_PRETTY, BACKEND_URL_ENV, CaptureState, Config, ConfigManager,
    DEFAULT_BACKEND_URL, DEFAULT_LOG_LEVEL, Segment, Transcript,
};
pub use murmur_transcribe::{BackendClient, BackendConfig, TranscribeError, Transcriber};

// App-specific modules
pub mod captions;
pub mod clipboard;
pub mod export;
pub mod pipeline;
pub mod record;
pub mod session;
pub mod speech;

// Version from this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
