//! Ollama chat client.
//!
//! Tries the native `/api/chat` endpoint first. Older Ollama builds answer
//! 404 there, in which case the messages are flattened into a single prompt
//! and sent to `/api/generate` instead.

use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};

use super::http::{read_error, send_error};
use crate::error::BackendError;
use crate::message::{to_prompt, ChatMessage};

const NAME: &str = "ollama";

pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String, BackendError> {
        let url = format!("{}/api/chat", self.base_url);
        tracing::debug!(%url, model, messages = messages.len(), "ollama chat request");
        let started = Instant::now();

        let resp = self
            .http
            .post(&url)
            .json(&json!({ "model": model, "messages": messages, "stream": false }))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| send_error(NAME, e, started))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::info!("ollama /api/chat not found, falling back to /api/generate");
            return self.generate(model, messages).await;
        }
        if !resp.status().is_success() {
            return Err(read_error(NAME, resp).await);
        }

        let body: ChatResponse = resp.json().await.map_err(|e| BackendError::Payload {
            backend: NAME,
            detail: e.to_string(),
        })?;
        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            len = body.message.content.len(),
            "ollama chat response"
        );
        Ok(body.message.content)
    }

    async fn generate(&self, model: &str, messages: &[ChatMessage]) -> Result<String, BackendError> {
        let url = format!("{}/api/generate", self.base_url);
        let started = Instant::now();

        let resp = self
            .http
            .post(&url)
            .json(&json!({ "model": model, "prompt": to_prompt(messages), "stream": false }))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| send_error(NAME, e, started))?;

        if !resp.status().is_success() {
            return Err(read_error(NAME, resp).await);
        }

        let body: GenerateResponse = resp.json().await.map_err(|e| BackendError::Payload {
            backend: NAME,
            detail: e.to_string(),
        })?;
        Ok(body.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OllamaClient {
        OllamaClient::new(server.uri(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn returns_chat_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({"model": "llama3.2:3b", "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {"role": "assistant", "content": "{\"action\":\"finish\"}"}
            })))
            .mount(&server)
            .await;

        let text = client(&server)
            .chat("llama3.2:3b", &[ChatMessage::user("hi")])
            .await
            .unwrap();
        assert_eq!(text, "{\"action\":\"finish\"}");
    }

    #[tokio::test]
    async fn falls_back_to_generate_on_404() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({"prompt": "USER:\nhi\n\nASSISTANT:\n"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "legacy"})))
            .expect(1)
            .mount(&server)
            .await;

        let text = client(&server)
            .chat("m", &[ChatMessage::user("hi")])
            .await
            .unwrap();
        assert_eq!(text, "legacy");
    }

    #[tokio::test]
    async fn error_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let err = client(&server)
            .chat("m", &[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        match err {
            BackendError::Status { status, body, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body, "model not loaded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn malformed_payload_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"done": true})))
            .mount(&server)
            .await;

        let err = client(&server)
            .chat("m", &[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Payload { backend: "ollama", .. }));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(2))
                    .set_body_json(json!({"message": {"content": "late"}})),
            )
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri(), Duration::from_millis(100));
        let err = client
            .chat("m", &[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Timeout { .. }));
    }
}
