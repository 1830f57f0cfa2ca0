use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::ReplyError;
use crate::synthesis::chat::ChatBackend;
use crate::synthesis::chat_model::{ChatRequest, ChatResponse};
use crate::trace::logger::TraceLogger;
use crate::trace::trace::TraceEvent;

/// Field values keyed by combined resource id.
pub type FieldValues = BTreeMap<String, String>;

/// Session id returned alongside an empty map when every attempt failed.
pub const FAILURE_SENTINEL: &str = "attempts exhausted, no test input extracted";

/// Conversation state carried between model calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing sent yet.
    Fresh,
    /// The server answered; keep talking in its session.
    Continuing(String),
    /// The last call failed; start over in a new session.
    Reset,
}

impl SessionState {
    /// Id to send with the next request. Empty starts a new session.
    pub fn id(&self) -> &str {
        match self {
            SessionState::Continuing(id) => id,
            SessionState::Fresh | SessionState::Reset => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Original,
    Retry,
}

/// Where one response moved the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    ConnectionFailed,
    MalformedOrIncomplete,
    Valid,
}

/// Classification of a single response.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    ConnectionFailed,
    Malformed {
        session_id: String,
        error: ReplyError,
    },
    Valid {
        session_id: String,
        values: FieldValues,
    },
}

impl Verdict {
    pub fn transition(&self) -> Transition {
        match self {
            Verdict::ConnectionFailed => Transition::ConnectionFailed,
            Verdict::Malformed { .. } => Transition::MalformedOrIncomplete,
            Verdict::Valid { .. } => Transition::Valid,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Valid {
        session_id: String,
        values: FieldValues,
    },
    Exhausted {
        attempts: u32,
    },
}

impl ExtractionOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ExtractionOutcome::Valid { .. })
    }

    /// `(session_id, values)`; exhaustion yields the sentinel and an empty map.
    pub fn into_parts(self) -> (String, FieldValues) {
        match self {
            ExtractionOutcome::Valid { session_id, values } => (session_id, values),
            ExtractionOutcome::Exhausted { .. } => (FAILURE_SENTINEL.to_string(), FieldValues::new()),
        }
    }

    pub fn into_values(self) -> FieldValues {
        self.into_parts().1
    }
}

/// Body of the first ```` ```json ```` block: everything up to the next
/// ```` ``` ```` (or the end of the text), trimmed.
pub fn extract_fenced_json(text: &str) -> Option<&str> {
    let (_, rest) = text.split_once("```json")?;
    let body = rest.split_once("```").map_or(rest, |(body, _)| body);
    Some(body.trim())
}

/// Pull field values out of a model reply and check every required id is present.
/// Extra keys are kept; non-string values are stringified.
pub fn parse_reply(reply: &str, required_ids: &[String]) -> Result<FieldValues, ReplyError> {
    let block = extract_fenced_json(reply).ok_or(ReplyError::NoFencedBlock)?;
    let parsed: serde_json::Value =
        serde_json::from_str(block).map_err(|e| ReplyError::InvalidJson(e.to_string()))?;
    let object = match parsed {
        serde_json::Value::Object(map) => map,
        _ => return Err(ReplyError::NotAnObject),
    };

    let missing: Vec<String> = required_ids
        .iter()
        .filter(|id| !object.contains_key(id.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(ReplyError::MissingIds(missing));
    }

    Ok(object
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}

/// Classify one backend response.
pub fn judge_response(response: Option<&ChatResponse>, required_ids: &[String]) -> Verdict {
    let Some(response) = response.filter(|r| r.success) else {
        return Verdict::ConnectionFailed;
    };
    let Some(data) = &response.data else {
        return Verdict::Malformed {
            session_id: String::new(),
            error: ReplyError::NoFencedBlock,
        };
    };

    match parse_reply(&data.chat, required_ids) {
        Ok(values) => Verdict::Valid {
            session_id: data.id.clone(),
            values,
        },
        Err(error) => Verdict::Malformed {
            session_id: data.id.clone(),
            error,
        },
    }
}

/// Asks the model for field values until a complete reply arrives or the
/// attempt budget runs out.
pub struct InputSynthesizer<'a> {
    backend: &'a dyn ChatBackend,
    model_type: String,
    max_attempts: u32,
    trace: Option<&'a TraceLogger>,
}

impl<'a> InputSynthesizer<'a> {
    pub fn new(backend: &'a dyn ChatBackend, model_type: &str, max_attempts: u32) -> Self {
        Self {
            backend,
            model_type: model_type.to_string(),
            max_attempts,
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: &'a TraceLogger) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Run the exchange. Makes at most `max_attempts` backend calls.
    pub fn synthesize(
        &self,
        prompt: &str,
        retry_prompt: &str,
        required_ids: &[String],
    ) -> ExtractionOutcome {
        let mut session = SessionState::Fresh;
        let mut kind = PromptKind::Original;

        for attempt in 1..=self.max_attempts {
            let message = match kind {
                PromptKind::Original => prompt,
                PromptKind::Retry => retry_prompt,
            };
            let request = ChatRequest {
                model_type: self.model_type.clone(),
                session_id: session.id().to_string(),
                message: message.to_string(),
            };

            let response = self.backend.chat(&request);
            let verdict = judge_response(response.as_ref(), required_ids);
            self.record(attempt, &verdict, kind, &session);

            match verdict {
                Verdict::Valid { session_id, values } => {
                    info!(attempt, fields = values.len(), "test input extracted");
                    return ExtractionOutcome::Valid { session_id, values };
                }
                Verdict::ConnectionFailed => {
                    warn!(attempt, max = self.max_attempts, "model connection failed, resetting session");
                    session = SessionState::Reset;
                    kind = PromptKind::Original;
                }
                Verdict::Malformed { session_id, error } => {
                    warn!(attempt, max = self.max_attempts, error = %error, "reply unusable, asking again");
                    session = SessionState::Continuing(session_id);
                    kind = PromptKind::Retry;
                }
            }
        }

        warn!(attempts = self.max_attempts, "attempt budget exhausted, nothing to inject");
        ExtractionOutcome::Exhausted {
            attempts: self.max_attempts,
        }
    }

    fn record(&self, attempt: u32, verdict: &Verdict, kind: PromptKind, session: &SessionState) {
        let Some(trace) = self.trace else {
            return;
        };

        let mut event = TraceEvent::now(attempt, verdict.transition())
            .with_prompt_kind(kind)
            .with_session(session);
        if let Verdict::Malformed { error, .. } = verdict {
            if let ReplyError::MissingIds(ids) = error {
                event = event.with_missing(ids);
            }
            event = event.with_error(error);
        }
        trace.log(&event);
    }
}
