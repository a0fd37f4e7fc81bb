//! Export sinks and file naming for generated transcripts.

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::info;

/// A failed local save, rendered into the session error slot.
#[derive(Debug, Error)]
#[error("export failed: {0}")]
pub struct ExportError(pub String);

/// The caption/text export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Srt,
    Vtt,
    Timestamped,
    PlainText,
}

impl ExportKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportKind::Srt => "srt",
            ExportKind::Vtt => "vtt",
            ExportKind::Timestamped | ExportKind::PlainText => "txt",
        }
    }

    /// MIME type handed to the sink. Timestamped text shares the plain
    /// text type.
    pub fn mime(&self) -> &'static str {
        match self {
            ExportKind::Vtt => "text/vtt",
            ExportKind::Srt | ExportKind::Timestamped | ExportKind::PlainText => "text/plain",
        }
    }

    /// Export file name, `transcription_<unix-ms>.<ext>`.
    pub fn file_name(&self) -> String {
        format!("transcription_{}.{}", unix_millis(), self.extension())
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Destination for generated files. Implementations perform the local
/// save.
pub trait ExportSink: Send + Sync {
    /// Persist `content` under `file_name` with the given MIME type and
    /// return where it ended up.
    fn save(&self, file_name: &str, mime: &str, content: &[u8]) -> Result<PathBuf, ExportError>;
}

/// Sink writing into a fixed directory, created on first use.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The platform download directory, falling back to the working
    /// directory when the platform exposes none.
    pub fn downloads() -> Self {
        Self::new(dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")))
    }
}

impl ExportSink for DirectorySink {
    fn save(&self, file_name: &str, mime: &str, content: &[u8]) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| ExportError(format!("failed to create {:?}: {e}", self.dir)))?;
        let path = self.dir.join(file_name);
        fs::write(&path, content)
            .map_err(|e| ExportError(format!("failed to write {:?}: {e}", path)))?;
        info!(path = ?path, mime, bytes = content.len(), "export saved");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_and_mime_table() {
        assert_eq!(ExportKind::Srt.extension(), "srt");
        assert_eq!(ExportKind::Vtt.extension(), "vtt");
        assert_eq!(ExportKind::Timestamped.extension(), "txt");
        assert_eq!(ExportKind::PlainText.extension(), "txt");

        assert_eq!(ExportKind::Srt.mime(), "text/plain");
        assert_eq!(ExportKind::Vtt.mime(), "text/vtt");
        assert_eq!(ExportKind::Timestamped.mime(), "text/plain");
        assert_eq!(ExportKind::PlainText.mime(), "text/plain");
    }

    #[test]
    fn test_file_name_shape() {
        let name = ExportKind::Srt.file_name();
        assert!(name.starts_with("transcription_"));
        assert!(name.ends_with(".srt"));
        let stamp = &name["transcription_".len()..name.len() - ".srt".len()];
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_directory_sink_writes_content() {
        let temp = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(temp.path());

        let path = sink.save("out.srt", "text/plain", b"1\n").unwrap();
        assert_eq!(fs::read(path).unwrap(), b"1\n");
    }

    #[test]
    fn test_directory_sink_creates_missing_directory() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("exports").join("today");
        let sink = DirectorySink::new(&nested);

        let path = sink.save("out.txt", "text/plain", b"hello").unwrap();
        assert!(path.starts_with(&nested));
        assert_eq!(fs::read(path).unwrap(), b"hello");
    }
}
