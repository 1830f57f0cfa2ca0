use serde::Serialize;

use crate::storage::jsonl::now_ms;
use crate::synthesis::extractor::{PromptKind, SessionState, Transition};

/// One line of the synthesis trace: what a single model call led to.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub attempt: u32,

    pub transition: Transition,

    /// Prompt that was sent on this attempt.
    pub prompt_kind: PromptKind,
    /// Session id that was sent on this attempt.
    pub session: String,

    pub missing_ids: Vec<String>,
    pub error: Option<String>,
}

impl TraceEvent {
    pub fn now(attempt: u32, transition: Transition) -> Self {
        Self {
            timestamp_ms: now_ms(),
            attempt,
            transition,
            prompt_kind: PromptKind::Original,
            session: String::new(),
            missing_ids: vec![],
            error: None,
        }
    }

    pub fn with_prompt_kind(mut self, kind: PromptKind) -> Self {
        self.prompt_kind = kind;
        self
    }

    pub fn with_session(mut self, session: &SessionState) -> Self {
        self.session = session.id().to_string();
        self
    }

    pub fn with_missing(mut self, ids: &[String]) -> Self {
        self.missing_ids = ids.to_vec();
        self
    }

    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }
}
