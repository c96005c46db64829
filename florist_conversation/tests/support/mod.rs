//! In-memory collaborators for driving the conversation service in tests.

#![allow(dead_code)]

use async_trait::async_trait;
use florist_core::{
    ChatMessage, IntentClassifier, IntentResult, LLMProvider, LLMResponse, Outbox, Speaker,
    Transcript, UserId, UserProfile, UserRegistry,
};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::Notify;

/// Returns scripted results by exact text, `unknown` otherwise.
#[derive(Default)]
pub struct ScriptedClassifier {
    results: HashMap<String, IntentResult>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedClassifier {
    pub fn with(mut self, text: &str, result: IntentResult) -> Self {
        self.results.insert(text.to_string(), result);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl IntentClassifier for ScriptedClassifier {
    async fn classify(&self, _sender: &str, text: &str) -> IntentResult {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(text.to_string());
        }
        self.results
            .get(text)
            .cloned()
            .unwrap_or_else(IntentResult::unknown)
    }
}

/// Never returns a classification.
pub struct HungClassifier;

#[async_trait]
impl IntentClassifier for HungClassifier {
    async fn classify(&self, _sender: &str, _text: &str) -> IntentResult {
        std::future::pending().await
    }
}

/// Answers every request with a fixed reply, or fails when `reply` is `None`.
pub struct FixedProvider {
    reply: Option<String>,
    pub requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl FixedProvider {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LLMProvider for FixedProvider {
    async fn chat(&self, messages: &[ChatMessage], _model: &str) -> anyhow::Result<LLMResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }
        match &self.reply {
            Some(content) => Ok(LLMResponse {
                content: content.clone(),
                usage: None,
            }),
            None => Err(anyhow::anyhow!("connection refused")),
        }
    }

    fn get_default_model(&self) -> &'static str {
        "fixed"
    }
}

/// Blocks inside `chat` until released, so tests can act while a message is in flight.
#[derive(Default)]
pub struct GatedProvider {
    pub entered: Notify,
    pub release: Notify,
}

#[async_trait]
impl LLMProvider for GatedProvider {
    async fn chat(&self, _messages: &[ChatMessage], _model: &str) -> anyhow::Result<LLMResponse> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(LLMResponse {
            content: "gated reply".to_string(),
            usage: None,
        })
    }

    fn get_default_model(&self) -> &'static str {
        "gated"
    }
}

/// Never answers.
pub struct HungProvider;

#[async_trait]
impl LLMProvider for HungProvider {
    async fn chat(&self, _messages: &[ChatMessage], _model: &str) -> anyhow::Result<LLMResponse> {
        std::future::pending().await
    }

    fn get_default_model(&self) -> &'static str {
        "hung"
    }
}

/// Panics on every request.
pub struct PanickingProvider;

#[async_trait]
impl LLMProvider for PanickingProvider {
    async fn chat(&self, _messages: &[ChatMessage], _model: &str) -> anyhow::Result<LLMResponse> {
        panic!("provider bug")
    }

    fn get_default_model(&self) -> &'static str {
        "panicking"
    }
}

/// Collects everything sent, optionally failing every send.
#[derive(Default)]
pub struct RecordingOutbox {
    pub sent: Mutex<Vec<(UserId, String)>>,
    pub fail: bool,
}

impl RecordingOutbox {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .map(|s| s.iter().map(|(_, t)| t.clone()).collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

#[async_trait]
impl Outbox for RecordingOutbox {
    async fn send(&self, user: UserId, text: &str) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("chat not found");
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((user, text.to_string()));
        }
        Ok(())
    }
}

/// Accepts sends that never complete.
pub struct HungOutbox;

#[async_trait]
impl Outbox for HungOutbox {
    async fn send(&self, _user: UserId, _text: &str) -> anyhow::Result<()> {
        std::future::pending().await
    }
}

#[derive(Default)]
pub struct CountingRegistry {
    pub touches: Mutex<Vec<UserProfile>>,
}

impl CountingRegistry {
    pub fn count(&self) -> usize {
        self.touches.lock().map(|t| t.len()).unwrap_or(0)
    }
}

#[async_trait]
impl UserRegistry for CountingRegistry {
    async fn touch(&self, profile: &UserProfile) -> anyhow::Result<()> {
        if let Ok(mut touches) = self.touches.lock() {
            touches.push(profile.clone());
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTranscript {
    pub lines: Mutex<Vec<(UserId, Speaker, String)>>,
}

#[async_trait]
impl Transcript for MemoryTranscript {
    async fn record(&self, user: UserId, speaker: Speaker, text: &str) -> anyhow::Result<()> {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((user, speaker, text.to_string()));
        }
        Ok(())
    }
}
