//! Google Gemini streaming backend.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::{Value, json};
use termfolio_core::{BackendError, ChatBackend, FragmentStream, Role, Turn};

use crate::sse::SseDecoder;

/// Default Gemini API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default limit on a whole streamed reply.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Gemini backend settings.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Limit on one whole request, streamed body included.
    pub request_timeout: Duration,
}

impl GeminiConfig {
    /// Settings for the default model and endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

/// Chat backend calling `streamGenerateContent` with server-sent events.
pub struct GeminiBackend {
    client: Client,
    config: GeminiConfig,
}

impl GeminiBackend {
    /// Create a backend.
    ///
    /// # Errors
    /// Returns error if the key is empty or the HTTP client cannot be built.
    pub fn new(config: GeminiConfig) -> Result<Self, BackendError> {
        if config.api_key.trim().is_empty() {
            return Err(BackendError::Unavailable("empty API key".to_string()));
        }
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| BackendError::Request(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

/// Build the request body for a prompt and its prior turns.
#[must_use]
pub fn request_body(system_prompt: Option<&str>, history: &[Turn], prompt: &str) -> Value {
    let mut contents: Vec<Value> = history
        .iter()
        .map(|turn| {
            let role = match turn.role {
                Role::User => "user",
                Role::Model => "model",
            };
            json!({ "role": role, "parts": [{ "text": turn.text }] })
        })
        .collect();
    contents.push(json!({ "role": "user", "parts": [{ "text": prompt }] }));

    let mut body = json!({ "contents": contents });
    if let Some(system) = system_prompt.filter(|s| !s.is_empty()) {
        body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
    }
    body
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    async fn stream_reply(
        &self,
        system_prompt: Option<&str>,
        history: &[Turn],
        prompt: &str,
    ) -> Result<FragmentStream, BackendError> {
        let body = request_body(system_prompt, history, prompt);

        tracing::debug!(
            model = %self.config.model,
            turns = history.len(),
            "Sending Gemini streaming request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let state = (response.bytes_stream().boxed(), SseDecoder::new(), false);
        let fragments = futures::stream::unfold(state, |(mut bytes, mut decoder, done)| async move {
            if done {
                return None;
            }
            let (batch, done): (Vec<Result<String, BackendError>>, bool) = match bytes.next().await {
                Some(Ok(chunk)) => (decoder.push(&chunk).into_iter().map(Ok).collect(), false),
                Some(Err(e)) => (vec![Err(BackendError::Stream(e.to_string()))], true),
                None => (decoder.finish().into_iter().map(Ok).collect(), true),
            };
            Some((batch, (bytes, decoder, done)))
        })
        .flat_map(futures::stream::iter);

        Ok(fragments.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_orders_history_before_prompt() {
        let history = vec![Turn::user("hi"), Turn::model("hello")];
        let body = request_body(Some("be brief"), &history, "projects?");

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "projects?");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
    }

    #[test]
    fn test_request_body_without_system_prompt() {
        let body = request_body(None, &[], "hi");
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_empty_key_is_rejected() {
        assert!(matches!(
            GeminiBackend::new(GeminiConfig::new("  ")),
            Err(BackendError::Unavailable(_))
        ));
    }

    #[test]
    fn test_endpoint_uses_model() {
        let mut config = GeminiConfig::new("k");
        config.base_url = "http://localhost:9/v1/".to_string();
        config.model = "m".to_string();
        let backend = GeminiBackend::new(config).unwrap();
        assert_eq!(
            backend.endpoint(),
            "http://localhost:9/v1/models/m:streamGenerateContent?alt=sse"
        );
    }

    #[tokio::test]
    async fn test_stalled_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and hold the connection without ever answering.
        let _server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
            drop(socket);
        });

        let mut config = GeminiConfig::new("k");
        config.base_url = format!("http://{addr}");
        config.request_timeout = Duration::from_millis(200);
        let backend = GeminiBackend::new(config).unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            backend.stream_reply(None, &[], "hi"),
        )
        .await
        .expect("request outlived its timeout");
        assert!(matches!(result, Err(BackendError::Request(_))));
    }
}
