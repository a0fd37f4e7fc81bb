//! HTTP client for the transcription/PDF backend.

use async_trait::async_trait;
use murmur_core::Segment;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Result, TranscribeError, Transcriber};

const TRANSCRIBE_PATH: &str = "/transcribe";
const PDF_PATH: &str = "/generate-pdf";

/// Configuration for the backend client.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL all endpoint paths are joined onto.
    pub base_url: String,
}

impl BackendConfig {
    /// Create a new backend config for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// HTTP transcription backend client.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    config: BackendConfig,
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    segments: Vec<Segment>,
}

#[derive(Debug, Serialize)]
struct PdfRequest<'a> {
    text: &'a str,
}

impl BackendClient {
    /// Create a new client with the given configuration.
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Create a client from just a base URL.
    pub fn from_base_url(base_url: impl Into<String>) -> Self {
        Self::new(BackendConfig::new(base_url))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn unreachable(&self, err: &reqwest::Error) -> TranscribeError {
        TranscribeError::NetworkUnreachable(unreachable_message(&self.config.base_url, err))
    }
}

#[async_trait]
impl Transcriber for BackendClient {
    async fn transcribe(
        &self,
        data: Vec<u8>,
        file_name: &str,
        mime: &str,
    ) -> Result<Vec<Segment>> {
        debug!(
            audio_bytes = data.len(),
            file_name,
            mime,
            "Sending transcription request to backend"
        );

        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name.to_owned())
            .mime_str(mime)
            .map_err(|e| TranscribeError::InvalidUpload(format!("MIME type {mime:?}: {e}")))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint(TRANSCRIBE_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.unreachable(&e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TranscribeError::BackendRejected { status, body });
        }

        let parsed: TranscribeResponse = response
            .json()
            .await
            .map_err(|e| TranscribeError::MalformedResponse(e.to_string()))?;

        debug!(segments = parsed.segments.len(), "transcription received");
        Ok(parsed.segments)
    }

    async fn generate_pdf(&self, text: &str) -> Result<Vec<u8>> {
        debug!(chars = text.len(), "Sending PDF request to backend");

        let response = self
            .client
            .post(self.endpoint(PDF_PATH))
            .json(&PdfRequest { text })
            .send()
            .await
            .map_err(|e| self.unreachable(&e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TranscribeError::BackendRejected { status, body });
        }

        let bytes = response.bytes().await.map_err(|e| self.unreachable(&e))?;
        Ok(bytes.to_vec())
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Human-facing message for a request that never reached the backend.
///
/// Secure pages can only call plain-HTTP backends on localhost, which is
/// the most common way a local deployment breaks; the message names that
/// cause whenever the configured URL makes it plausible.
fn unreachable_message(base_url: &str, err: &reqwest::Error) -> String {
    if is_insecure_remote(base_url) {
        format!(
            "Could not reach the backend at {base_url}: {err}. Plain-HTTP backends are only \
             reachable from a secure page when they run on localhost; use a localhost address \
             or serve the backend over HTTPS."
        )
    } else {
        format!("Could not reach the backend at {base_url}: {err}")
    }
}

/// True when the URL is plain HTTP on a host other than local loopback.
fn is_insecure_remote(base_url: &str) -> bool {
    let Some(rest) = base_url.strip_prefix("http://") else {
        return false;
    };
    let authority = rest.split('/').next().unwrap_or_default();
    let host = if let Some(v6) = authority.strip_prefix('[') {
        v6.split(']').next().unwrap_or_default()
    } else {
        authority.split(':').next().unwrap_or_default()
    };
    !matches!(host, "localhost" | "127.0.0.1" | "::1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let config = BackendConfig::new("http://127.0.0.1:8001/");
        assert_eq!(config.base_url, "http://127.0.0.1:8001");

        let client = BackendClient::new(config);
        assert_eq!(
            client.endpoint(TRANSCRIBE_PATH),
            "http://127.0.0.1:8001/transcribe"
        );
        assert_eq!(
            client.endpoint(PDF_PATH),
            "http://127.0.0.1:8001/generate-pdf"
        );
    }

    #[test]
    fn test_insecure_remote_detection() {
        assert!(is_insecure_remote("http://192.168.1.20:8001"));
        assert!(is_insecure_remote("http://my-server.lan"));
        assert!(!is_insecure_remote("http://localhost:8001"));
        assert!(!is_insecure_remote("http://127.0.0.1:8001"));
        assert!(!is_insecure_remote("http://[::1]:8001"));
        assert!(!is_insecure_remote("https://transcribe.example.com"));
    }

    #[test]
    fn test_response_requires_segment_list() {
        let ok: TranscribeResponse =
            serde_json::from_str(r#"{"segments": [{"start": 0.0, "end": 1.0, "text": "Hi"}]}"#)
                .unwrap();
        assert_eq!(ok.segments.len(), 1);

        assert!(serde_json::from_str::<TranscribeResponse>(r#"{"text": "Hi"}"#).is_err());
        assert!(
            serde_json::from_str::<TranscribeResponse>(r#"{"segments": [{"start": 0.0}]}"#)
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_classified() {
        // Port 1 on loopback refuses connections immediately.
        let client = BackendClient::from_base_url("http://127.0.0.1:1");
        let err = client
            .transcribe(vec![0u8; 4], "recording.wav", "audio/wav")
            .await
            .unwrap_err();
        match err {
            TranscribeError::NetworkUnreachable(message) => {
                assert!(message.contains("http://127.0.0.1:1"));
            }
            other => panic!("expected NetworkUnreachable, got {other:?}"),
        }
    }

    #[test]
    fn test_unreachable_message_names_the_mixed_content_pitfall() {
        let client = BackendClient::from_base_url("http://10.1.2.3:8001");
        let config_url = &client.config.base_url;
        assert!(unreachable_message(config_url, &fake_error()).contains("localhost"));
    }

    // reqwest errors cannot be constructed directly; produce one by
    // parsing an invalid URL through the builder.
    fn fake_error() -> reqwest::Error {
        reqwest::Client::new().get("http://").build().unwrap_err()
    }
}
