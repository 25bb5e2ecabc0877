//! GroqCloud client (OpenAI-compatible `chat/completions`).

use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};

use super::http::{read_error, send_error};
use crate::error::BackendError;
use crate::message::ChatMessage;

const NAME: &str = "groq";

pub struct GroqClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl GroqClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
        }
    }

    pub async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String, BackendError> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(%url, model, messages = messages.len(), "groq chat request");
        let started = Instant::now();

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": model, "messages": messages, "stream": false }))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| send_error(NAME, e, started))?;

        if !resp.status().is_success() {
            return Err(read_error(NAME, resp).await);
        }

        let body: CompletionResponse = resp.json().await.map_err(|e| BackendError::Payload {
            backend: NAME,
            detail: e.to_string(),
        })?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| BackendError::Payload {
                backend: NAME,
                detail: "response missing 'choices'".to_string(),
            })?;

        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            len = content.len(),
            "groq chat response"
        );
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn sends_bearer_and_reads_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/chat/completions"))
            .and(header("authorization", "Bearer gsk-test"))
            .and(body_partial_json(json!({
                "model": "llama-3.1-8b-instant",
                "messages": [{"role": "system", "content": "rules"}, {"role": "user", "content": "goal"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "plan"}}]
            })))
            .mount(&server)
            .await;

        let client = GroqClient::new(
            format!("{}/openai/v1/", server.uri()),
            "gsk-test",
            Duration::from_secs(5),
        );
        let text = client
            .chat(
                "llama-3.1-8b-instant",
                &[ChatMessage::system("rules"), ChatMessage::user("goal")],
            )
            .await
            .unwrap();
        assert_eq!(text, "plan");
    }

    #[tokio::test]
    async fn bad_request_surfaces_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"error":{"message":"bad model"}}"#),
            )
            .mount(&server)
            .await;

        let client = GroqClient::new(server.uri(), "k", Duration::from_secs(5));
        let err = client.chat("nope", &[ChatMessage::user("x")]).await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 400, .. }));
        assert!(err.to_string().contains("bad model"));
    }

    #[tokio::test]
    async fn missing_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = GroqClient::new(server.uri(), "k", Duration::from_secs(5));
        let err = client.chat("m", &[ChatMessage::user("x")]).await.unwrap_err();
        match err {
            BackendError::Payload { detail, .. } => assert!(detail.contains("choices")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
