// Typed decode of gate classifier output.
//
// Every gate asks the model for a JSON object `{"score": 0 or 1}` and
// decodes it through serde. A response that does not match the schema is
// an `InvalidResponse` error and aborts the workflow; the gates never
// guess a verdict from malformed output.

use serde::Deserialize;

use crate::errors::LlmError;

use super::provider::LlmProvider;
use super::types::{ChatMessage, ChatRequest};

const SCORE_INSTRUCTION: &str =
    "Respond with a JSON object of the form {\"score\": 1} or {\"score\": 0} and nothing else.";

#[derive(Debug, Deserialize)]
struct GradeResponse {
    score: u8,
}

/// Run a binary grading prompt against the provider.
///
/// Returns `true` for score 1, `false` for score 0. Sampling is pinned
/// to temperature 0 so repeated gradings of the same input are stable.
pub async fn grade(llm: &dyn LlmProvider, prompt: String) -> Result<bool, LlmError> {
    let request = ChatRequest::new(vec![
        ChatMessage::system(SCORE_INSTRUCTION),
        ChatMessage::user(prompt),
    ])
    .deterministic()
    .with_max_tokens(16);

    let raw = llm.chat(request).await?;
    decode_score(&raw)
}

fn decode_score(raw: &str) -> Result<bool, LlmError> {
    let body = strip_code_fences(raw);
    let parsed: GradeResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::InvalidResponse(format!("grade decode failed: {e}: {raw:?}")))?;
    match parsed.score {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(LlmError::InvalidResponse(format!(
            "grade score out of range: {other}"
        ))),
    }
}

/// Models occasionally wrap JSON in a markdown code fence; tolerate that.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_scores() {
        assert!(decode_score("{\"score\": 1}").unwrap());
        assert!(!decode_score("{\"score\": 0}").unwrap());
    }

    #[test]
    fn decodes_fenced_scores() {
        assert!(decode_score("```json\n{\"score\": 1}\n```").unwrap());
        assert!(!decode_score("```\n{\"score\": 0}\n```").unwrap());
    }

    #[test]
    fn rejects_out_of_range_score() {
        let err = decode_score("{\"score\": 2}").unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[test]
    fn rejects_prose() {
        let err = decode_score("The documents look relevant to me.").unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[test]
    fn rejects_missing_field() {
        let err = decode_score("{\"verdict\": \"relevant\"}").unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }
}
