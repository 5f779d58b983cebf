//! Ollama oracle backend.
//!
//! Talks to the native `/api/generate` endpoint with streaming disabled.
//! In JSON mode the request carries `"format": "json"` so the server
//! constrains sampling to a single JSON value.

use async_trait::async_trait;
use curator_core::error::BackendError;
use curator_core::oracle::{OracleBackend, OutputMode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default local Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default model.
pub const DEFAULT_OLLAMA_MODEL: &str = "gemma3";

pub struct OllamaBackend {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Local server with the default model.
    pub fn local() -> Self {
        Self::new(DEFAULT_OLLAMA_URL, DEFAULT_OLLAMA_MODEL)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn map_send_error(e: reqwest::Error, timeout: Duration) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout(format!("no response after {}s", timeout.as_secs()))
        } else {
            BackendError::Transport(e.to_string())
        }
    }

    /// Extract the generated text from a response body.
    ///
    /// A body that is not JSON at all is returned verbatim.
    fn extract_text(body: String) -> Result<String, BackendError> {
        match serde_json::from_str::<GenerateResponse>(&body) {
            Ok(GenerateResponse { response: Some(text) }) => Ok(text),
            Ok(GenerateResponse { response: None }) => Err(BackendError::InvalidResponse(
                "response body has no 'response' field".into(),
            )),
            Err(_) => Ok(body),
        }
    }
}

#[async_trait]
impl OracleBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(
        &self,
        prompt: &str,
        mode: OutputMode,
        timeout: Duration,
    ) -> Result<String, BackendError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: match mode {
                OutputMode::Json => Some("json"),
                OutputMode::Text => None,
            },
        };

        debug!(model = %self.model, ?mode, prompt_len = prompt.len(), "Sending generate request");

        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::map_send_error(e, timeout))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Ollama returned error");
            return Err(BackendError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| Self::map_send_error(e, timeout))?;

        Self::extract_text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one canned HTTP response; returns the base URL and a
    /// handle yielding the raw request text.
    async fn serve_once(status: &str, body: &str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 64 * 1024];
            let mut request = Vec::new();
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let content_length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + content_length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });

        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn json_mode_returns_response_field() {
        let (url, server) = serve_once("200 OK", r#"{"model":"gemma3","response":"{\"action\":\"noop\"}","done":true}"#).await;
        let backend = OllamaBackend::new(url, "gemma3");

        let text = backend
            .generate("decide", OutputMode::Json, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(text, r#"{"action":"noop"}"#);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/generate"));
        assert!(request.contains(r#""format":"json""#));
        assert!(request.contains(r#""stream":false"#));
    }

    #[tokio::test]
    async fn text_mode_omits_format() {
        let (url, server) = serve_once("200 OK", r#"{"response":"free text"}"#).await;
        let backend = OllamaBackend::new(url, "gemma3");

        let text = backend
            .generate("explain", OutputMode::Text, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(text, "free text");
        assert!(!server.await.unwrap().contains("\"format\""));
    }

    #[tokio::test]
    async fn non_json_body_is_returned_raw() {
        let (url, _server) = serve_once("200 OK", "plain words").await;
        let backend = OllamaBackend::new(url, "gemma3");
        let text = backend
            .generate("x", OutputMode::Json, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(text, "plain words");
    }

    #[tokio::test]
    async fn error_status_maps_to_api_error() {
        let (url, _server) = serve_once("404 Not Found", r#"{"error":"model 'gemma3' not found"}"#).await;
        let backend = OllamaBackend::new(url, "gemma3");
        let err = backend
            .generate("x", OutputMode::Json, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::ApiError { status_code: 404, .. }));
        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn missing_response_field_is_invalid() {
        let (url, _server) = serve_once("200 OK", r#"{"done":true}"#).await;
        let backend = OllamaBackend::new(url, "gemma3");
        let err = backend
            .generate("x", OutputMode::Json, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_transport() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = OllamaBackend::new(format!("http://{addr}"), "gemma3");
        let err = backend
            .generate("x", OutputMode::Json, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.is_transport(), "expected transport error, got {err:?}");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let backend = OllamaBackend::new("http://localhost:11434/", "llama3");
        assert_eq!(backend.base_url, "http://localhost:11434");
        assert_eq!(backend.model(), "llama3");
    }
}
