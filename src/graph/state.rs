// Workflow state
// QueryState and verdict types for the self-correcting RAG graph

use serde::{Deserialize, Serialize};

use crate::retrieval::Document;

/// Why the workflow stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    /// Answer passed both the grounding and helpfulness gates.
    Answered,
    /// The relevance gate found no usable documents.
    NoRelevantContext,
    /// A domain retry loop hit its configured bound.
    RetriesExhausted,
    /// The caller-supplied timeout elapsed mid-run.
    TimedOut,
}

impl TerminalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalReason::Answered => "answered",
            TerminalReason::NoRelevantContext => "no_relevant_context",
            TerminalReason::RetriesExhausted => "retries_exhausted",
            TerminalReason::TimedOut => "timed_out",
        }
    }
}

/// Relevance gate verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelevanceVerdict {
    Relevant,
    Irrelevant,
}

/// Hallucination gate verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundingVerdict {
    Grounded,
    Hallucinated,
}

/// Helpfulness gate verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpfulnessVerdict {
    Helpful,
    Unhelpful,
}

/// The single state record flowing through the graph.
///
/// Created fresh per end-user query, mutated in place by nodes, and
/// discarded once a terminal is reached. `context` and `answer` always
/// hold the most recent collaborator results; retries overwrite, never
/// merge.
#[derive(Debug, Clone)]
pub struct QueryState {
    pub session_id: String,
    /// Current question. Mutated only by the rewrite node.
    pub query: String,
    /// Passages from the most recent retrieve call.
    pub context: Vec<Document>,
    /// Answer from the most recent generate call.
    pub answer: Option<String>,
    /// Generate calls in the current retrieval cycle. Reset by retrieve.
    pub generation_attempts: u32,
    /// Rewrite calls over the whole run. Never reset.
    pub rewrite_attempts: u32,
    /// Set by whichever node reaches a terminal.
    pub terminal: Option<TerminalReason>,
}

impl QueryState {
    pub fn new(session_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            query: query.into(),
            context: Vec::new(),
            answer: None,
            generation_attempts: 0,
            rewrite_attempts: 0,
            terminal: None,
        }
    }

    /// Context passages as plain text, metadata stripped.
    pub fn context_text(&self) -> Vec<&str> {
        self.context.iter().map(|doc| doc.content.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_starts_empty() {
        let state = QueryState::new("s-1", "what is a bean factory?");
        assert_eq!(state.session_id, "s-1");
        assert_eq!(state.query, "what is a bean factory?");
        assert!(state.context.is_empty());
        assert!(state.answer.is_none());
        assert_eq!(state.generation_attempts, 0);
        assert_eq!(state.rewrite_attempts, 0);
        assert!(state.terminal.is_none());
    }

    #[test]
    fn context_text_strips_metadata() {
        let mut state = QueryState::new("s", "q");
        state.context = vec![
            Document::new("first").with_metadata("score", serde_json::json!(0.9)),
            Document::new("second"),
        ];
        assert_eq!(state.context_text(), vec!["first", "second"]);
    }

    #[test]
    fn terminal_reason_labels() {
        assert_eq!(TerminalReason::Answered.as_str(), "answered");
        assert_eq!(
            TerminalReason::NoRelevantContext.as_str(),
            "no_relevant_context"
        );
        assert_eq!(TerminalReason::RetriesExhausted.as_str(), "retries_exhausted");
        assert_eq!(TerminalReason::TimedOut.as_str(), "timed_out");
    }

    #[test]
    fn terminal_reason_serializes_snake_case() {
        let json = serde_json::to_string(&TerminalReason::NoRelevantContext).unwrap();
        assert_eq!(json, "\"no_relevant_context\"");
    }
}
