use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, warn};

use crate::synthesis::chat_model::{ChatRequest, ChatResponse};

/// A conversational model endpoint.
///
/// `None` means the call produced no usable response at all (transport
/// error, timeout, non-2xx status, undecodable body). The extraction state
/// machine treats it the same as `success: false`.
pub trait ChatBackend {
    fn chat(&self, request: &ChatRequest) -> Option<ChatResponse>;
}

// ============================================================================
// HTTP Backend
// ============================================================================

pub struct HttpChatBackend {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl HttpChatBackend {
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        verify_ssl: bool,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!verify_ssl)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

impl ChatBackend for HttpChatBackend {
    fn chat(&self, request: &ChatRequest) -> Option<ChatResponse> {
        debug!(
            url = %self.base_url,
            session = %request.session_id,
            chars = request.message.len(),
            "sending chat request"
        );

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .and_then(|r| r.error_for_status())
            .inspect_err(|e| warn!(error = %e, "chat request failed"))
            .ok()?;

        response
            .json::<ChatResponse>()
            .inspect_err(|e| warn!(error = %e, "chat response could not be decoded"))
            .ok()
    }
}

// ============================================================================
// Scripted Backend (for testing without a model server)
// ============================================================================

/// Replays canned responses in order and records every request.
/// Once the script runs out every call returns `None`.
#[derive(Default)]
pub struct ScriptedChatBackend {
    script: RefCell<VecDeque<Option<ChatResponse>>>,
    requests: RefCell<Vec<ChatRequest>>,
}

impl ScriptedChatBackend {
    pub fn new(script: impl IntoIterator<Item = Option<ChatResponse>>) -> Self {
        Self {
            script: RefCell::new(script.into_iter().collect()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl ChatBackend for ScriptedChatBackend {
    fn chat(&self, request: &ChatRequest) -> Option<ChatResponse> {
        self.requests.borrow_mut().push(request.clone());
        self.script.borrow_mut().pop_front().flatten()
    }
}
