// OpenAI-compatible chat/embeddings provider over HTTP.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use futures_util::StreamExt;

use crate::errors::LlmError;

use super::provider::LlmProvider;
use super::types::ChatRequest;

#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: Option<String>,
    chat_model: String,
    embedding_model: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        chat_model: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            chat_model: chat_model.into(),
            embedding_model: embedding_model.into(),
            client: Client::new(),
        }
    }

    fn request(&self, url: &str, body: Value) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }

    /// Completion request body shared by the blocking and streaming paths.
    fn chat_body(&self, request: &ChatRequest, stream: bool) -> Value {
        let mut body = json!({
            "model": self.chat_model,
            "messages": request.messages,
            "stream": stream,
        });
        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(m) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(m));
            }
        }
        body
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

fn transport_error(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Unavailable(err.to_string())
    }
}

fn status_error(status: StatusCode, body: &str) -> LlmError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        LlmError::RateLimited
    } else {
        LlmError::Unavailable(format!("{status}: {body}"))
    }
}

/// Extract the delta text from one SSE line, if it carries any.
fn sse_delta(line: &str) -> Option<String> {
    let data = line.trim().strip_prefix("data: ")?;
    if data == "[DONE]" {
        return None;
    }
    let json: Value = serde_json::from_str(data).ok()?;
    json["choices"][0]["delta"]["content"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.chat_body(&request, false);

        let res = self
            .request(&url, body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        let payload: ChatResponse = res
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("chat decode failed: {e}")))?;

        payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("chat response had no choices".to_string()))
    }

    async fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> Result<mpsc::Receiver<Result<String, LlmError>>, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.chat_body(&request, true);

        let res = self
            .request(&url, body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        let (tx, rx) = mpsc::channel(32);
        let mut stream = res.bytes_stream();

        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(bytes) => {
                        let text = String::from_utf8_lossy(&bytes);
                        for line in text.lines() {
                            if line.trim() == "data: [DONE]" {
                                return;
                            }
                            if let Some(content) = sse_delta(line) {
                                if tx.send(Ok(content)).await.is_err() {
                                    return;
                                }
                            }
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(Err(transport_error(err))).await;
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.embedding_model,
            "input": inputs,
        });

        let res = self
            .request(&url, body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        let payload: EmbeddingsResponse = res
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("embeddings decode failed: {e}")))?;

        Ok(payload.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ChatMessage;

    #[test]
    fn rate_limit_status_maps_to_rate_limited() {
        let err = status_error(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(matches!(err, LlmError::RateLimited));
    }

    #[test]
    fn server_error_status_maps_to_unavailable() {
        let err = status_error(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(err, LlmError::Unavailable(_)));
    }

    #[test]
    fn chat_response_decodes_first_choice() {
        let payload: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "hello"}}]}"#,
        )
        .unwrap();
        assert_eq!(payload.choices[0].message.content, "hello");
    }

    #[test]
    fn malformed_chat_response_fails_decode() {
        let result: Result<ChatResponse, _> =
            serde_json::from_str(r#"{"choices": [{"text": "hello"}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let provider = OpenAiProvider::new("http://localhost:1234/", None, "m", "e");
        assert_eq!(provider.base_url, "http://localhost:1234");
    }

    #[test]
    fn chat_body_shared_by_both_paths() {
        let provider = OpenAiProvider::new("http://localhost:1234", None, "gpt-4o", "e");
        let request = ChatRequest::new(vec![ChatMessage::user("q")]).deterministic();

        let blocking = provider.chat_body(&request, false);
        let streaming = provider.chat_body(&request, true);

        assert_eq!(blocking["stream"], json!(false));
        assert_eq!(streaming["stream"], json!(true));
        assert_eq!(blocking["model"], streaming["model"]);
        assert_eq!(blocking["messages"], streaming["messages"]);
        assert_eq!(blocking["temperature"], json!(0.0));
    }

    #[test]
    fn sse_delta_extracts_content() {
        let line = r#"data: {"choices": [{"delta": {"content": "Spr"}}]}"#;
        assert_eq!(sse_delta(line), Some("Spr".to_string()));
    }

    #[test]
    fn sse_delta_skips_done_empty_and_noise() {
        assert_eq!(sse_delta("data: [DONE]"), None);
        assert_eq!(sse_delta(""), None);
        assert_eq!(sse_delta(": keep-alive"), None);
        assert_eq!(
            sse_delta(r#"data: {"choices": [{"delta": {"content": ""}}]}"#),
            None
        );
        assert_eq!(sse_delta(r#"data: {"choices": [{"delta": {}}]}"#), None);
    }
}
