//! Inference Client - Ollama Connector
//!
//! The command loop and the browser talk to the model through
//! [`InferenceClient`]. The production implementation speaks the Ollama
//! HTTP API; tests substitute scripted clients.

use crate::types::ShellConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("request timed out")]
    Timeout,

    #[error("service unreachable: {0}")]
    Unreachable(String),

    #[error("service returned HTTP {0}")]
    Status(u16),

    #[error("unreadable reply: {0}")]
    Reply(String),
}

impl From<reqwest::Error> for InferenceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            InferenceError::Timeout
        } else if let Some(status) = e.status() {
            InferenceError::Status(status.as_u16())
        } else if e.is_decode() || e.is_body() {
            InferenceError::Reply(e.to_string())
        } else {
            InferenceError::Unreachable(e.to_string())
        }
    }
}

/// Text-in, text-out model access.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// One completion for `prompt` under `system`.
    async fn infer(&self, prompt: &str, system: &str) -> Result<String, InferenceError>;

    /// Connectivity check; returns the models the service has installed.
    async fn list_models(&self) -> Result<Vec<String>, InferenceError>;

    /// Configured model name
    fn model(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagsModel>,
}

#[derive(Debug, Deserialize)]
struct TagsModel {
    name: String,
}

/// Ollama `/api/generate` client with JSON-constrained output
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(config: &ShellConfig) -> Result<Self> {
        Self::with_timeout(
            &config.ollama_url,
            &config.model,
            Duration::from_secs(config.inference_timeout_secs),
        )
    }

    pub fn with_timeout(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl InferenceClient for OllamaClient {
    async fn infer(&self, prompt: &str, system: &str) -> Result<String, InferenceError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            stream: false,
            format: "json",
        };

        log::debug!("Inference request ({} chars) to {}", prompt.len(), self.base_url);

        let resp = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(InferenceError::Status(resp.status().as_u16()));
        }

        let body: GenerateResponse = resp.json().await?;
        log::debug!("Inference reply: {} chars", body.response.len());
        Ok(body.response)
    }

    async fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        let resp = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(InferenceError::Status(resp.status().as_u16()));
        }

        let tags: TagsResponse = resp.json().await?;
        Ok(tags
            .models
            .into_iter()
            .map(|m| m.name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({
                "model": "gemma3:12b",
                "prompt": "list my files",
                "system": "be a kernel",
                "format": "json",
                "stream": false,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "gemma3:12b",
                "response": "{\"action\":\"list_files\"}",
                "done": true,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OllamaClient::with_timeout(&server.uri(), "gemma3:12b", Duration::from_secs(5)).unwrap();

        let reply = client.infer("list my files", "be a kernel").await.unwrap();
        assert_eq!(reply, r#"{"action":"list_files"}"#);
    }

    #[tokio::test]
    async fn test_generate_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "response": "late" }))
                    .set_delay(Duration::from_millis(1500)),
            )
            .mount(&server)
            .await;

        let client = OllamaClient::with_timeout(&server.uri(), "m", Duration::from_millis(200)).unwrap();

        let err = client.infer("hi", "").await.unwrap_err();
        assert!(matches!(err, InferenceError::Timeout), "got {err:?}");
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = OllamaClient::with_timeout(&server.uri(), "m", Duration::from_secs(5)).unwrap();

        let err = client.infer("hi", "").await.unwrap_err();
        assert!(matches!(err, InferenceError::Status(500)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_unreadable_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = OllamaClient::with_timeout(&server.uri(), "m", Duration::from_secs(5)).unwrap();

        let err = client.infer("hi", "").await.unwrap_err();
        assert!(matches!(err, InferenceError::Reply(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_unreachable() {
        let client = OllamaClient::with_timeout("http://127.0.0.1:1", "m", Duration::from_secs(2)).unwrap();

        let err = client.list_models().await.unwrap_err();
        assert!(matches!(err, InferenceError::Unreachable(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_list_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{ "name": "gemma3:12b" }, { "name": "llama3:8b" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            OllamaClient::with_timeout(&format!("{}/", server.uri()), "gemma3:12b", Duration::from_secs(5)).unwrap();

        let models = client.list_models().await.unwrap();
        assert_eq!(models, vec!["gemma3:12b", "llama3:8b"]);
    }
}
