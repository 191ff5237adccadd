//! Test doubles shared by the agent unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse, TokenUsage};
use super::progress::{ProgressEvent, ProgressSink};
use super::provider::LlmProvider;
use super::researcher::{ResearchRequest, Researcher};
use crate::error::AgentError;

fn usage() -> TokenUsage {
    TokenUsage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    }
}

/// Provider that replays canned responses in order.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(responses.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        next.map_or_else(
            || {
                Err(AgentError::ApiRequest {
                    message: "script exhausted".to_string(),
                    status: None,
                })
            },
            |content| {
                Ok(ChatResponse {
                    content,
                    usage: usage(),
                    finish_reason: Some("stop".to_string()),
                })
            },
        )
    }
}

type Responder = dyn Fn(&ChatRequest) -> Result<String, AgentError> + Send + Sync;

/// Provider that answers with a closure, for concurrent callers.
pub struct FnProvider {
    respond: Box<Responder>,
    calls: AtomicUsize,
}

impl FnProvider {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&ChatRequest) -> Result<String, AgentError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for FnProvider {
    fn name(&self) -> &'static str {
        "fn"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let content = (self.respond)(request)?;
        Ok(ChatResponse {
            content,
            usage: usage(),
            finish_reason: Some("stop".to_string()),
        })
    }
}

/// Sink that keeps every event.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.event_type).collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Researcher that echoes the query, or fails for topics containing "fail".
#[derive(Default)]
pub struct EchoResearcher {
    calls: AtomicUsize,
}

impl EchoResearcher {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Researcher for EchoResearcher {
    async fn conduct(&self, request: &ResearchRequest) -> Result<String, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.query.contains("fail") {
            return Err(AgentError::ApiRequest {
                message: format!("no sources for {}", request.query),
                status: Some(503),
            });
        }
        Ok(format!("## {}\n\nFindings about {}.", request.query, request.query))
    }
}
