// Pre/post-processing hooks
// One core workflow parameterized by optional transforms replaces the
// copy-pasted pipeline variants (with/without translation, voice input).
// A transcribe-in hook receives already-recognized text; speech
// recognition itself is not this crate's concern.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::LlmError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};

/// A text-to-text step applied outside the graph, before the query
/// enters it or after the accepted answer leaves it.
#[async_trait]
pub trait Transform: Send + Sync {
    async fn apply(&self, text: &str) -> Result<String, LlmError>;
}

/// Ordered hook sets for one workflow instance.
#[derive(Default)]
pub struct Hooks {
    pre_query: Vec<Box<dyn Transform>>,
    post_answer: Vec<Box<dyn Transform>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applied to the query, in registration order, before the graph runs.
    pub fn pre_query(mut self, transform: Box<dyn Transform>) -> Self {
        self.pre_query.push(transform);
        self
    }

    /// Applied to the accepted answer, in registration order.
    pub fn post_answer(mut self, transform: Box<dyn Transform>) -> Self {
        self.post_answer.push(transform);
        self
    }

    pub(crate) async fn apply_pre(&self, text: &str) -> Result<String, LlmError> {
        let mut current = text.to_string();
        for transform in &self.pre_query {
            current = transform.apply(&current).await?;
        }
        Ok(current)
    }

    pub(crate) async fn apply_post(&self, text: &str) -> Result<String, LlmError> {
        let mut current = text.to_string();
        for transform in &self.post_answer {
            current = transform.apply(&current).await?;
        }
        Ok(current)
    }
}

/// LLM-backed translation transform, usable on either side of the graph.
pub struct TranslateTransform {
    llm: Arc<dyn LlmProvider>,
    target_language: String,
}

impl TranslateTransform {
    pub fn new(llm: Arc<dyn LlmProvider>, target_language: impl Into<String>) -> Self {
        Self {
            llm,
            target_language: target_language.into(),
        }
    }
}

#[async_trait]
impl Transform for TranslateTransform {
    async fn apply(&self, text: &str) -> Result<String, LlmError> {
        let prompt = format!(
            "Translate the following text into {}. Return only the translation.\n\n{text}",
            self.target_language
        );
        let response = self
            .llm
            .chat(ChatRequest::new(vec![ChatMessage::user(prompt)]).deterministic())
            .await?;
        Ok(response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Suffix(&'static str);

    #[async_trait]
    impl Transform for Suffix {
        async fn apply(&self, text: &str) -> Result<String, LlmError> {
            Ok(format!("{text}{}", self.0))
        }
    }

    struct Failing;

    #[async_trait]
    impl Transform for Failing {
        async fn apply(&self, _text: &str) -> Result<String, LlmError> {
            Err(LlmError::Timeout)
        }
    }

    #[tokio::test]
    async fn empty_hooks_pass_text_through() {
        let hooks = Hooks::new();
        assert_eq!(hooks.apply_pre("q").await.unwrap(), "q");
        assert_eq!(hooks.apply_post("a").await.unwrap(), "a");
    }

    #[tokio::test]
    async fn transforms_apply_in_registration_order() {
        let hooks = Hooks::new()
            .pre_query(Box::new(Suffix("-1")))
            .pre_query(Box::new(Suffix("-2")));
        assert_eq!(hooks.apply_pre("q").await.unwrap(), "q-1-2");
    }

    #[tokio::test]
    async fn failing_transform_propagates() {
        let hooks = Hooks::new().post_answer(Box::new(Failing));
        assert!(matches!(
            hooks.apply_post("a").await,
            Err(LlmError::Timeout)
        ));
    }
}
