//! Test doubles shared by the interview module tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::LlmError;
use crate::llm::{Choice, GenerationRequest, GenerationResponse, LlmProvider, Message, Usage};

/// Mock LLM provider that replays canned replies in order.
///
/// Once the script runs out every call fails with a request error.
pub(crate) struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    pub(crate) fn replying<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err("connection refused".to_string())])),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<GenerationRequest> {
        self.requests
            .lock()
            .expect("lock not poisoned")
            .last()
            .cloned()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .expect("lock not poisoned")
            .push(request);

        let reply = self
            .replies
            .lock()
            .expect("lock not poisoned")
            .pop_front()
            .unwrap_or_else(|| Err("script exhausted".to_string()));

        let content = reply.map_err(LlmError::RequestFailed)?;
        Ok(completion(content))
    }
}

/// Mock provider that holds every call until the test releases it.
pub(crate) struct GatedLlm {
    reply: String,
    started: Notify,
    release: Notify,
}

impl GatedLlm {
    pub(crate) fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            started: Notify::new(),
            release: Notify::new(),
        }
    }

    /// Resolves once a call is waiting on the gate.
    pub(crate) async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub(crate) fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl LlmProvider for GatedLlm {
    async fn generate(&self, _request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(completion(self.reply.clone()))
    }
}

fn completion(content: String) -> GenerationResponse {
    GenerationResponse {
        id: "mock-id".to_string(),
        model: "mock-model".to_string(),
        choices: vec![Choice {
            index: 0,
            message: Message::assistant(content),
            finish_reason: "stop".to_string(),
        }],
        usage: Usage {
            prompt_tokens: 100,
            completion_tokens: 50,
            total_tokens: 150,
        },
    }
}
