//! Deterministic providers for tests

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::{CompletionRequest, LlmProvider, TokenStream};

/// Bag-of-words embedder: every lowercase word is hashed into one of
/// `dimensions` buckets, so texts sharing words score higher
pub struct HashEmbedder {
    dimensions: usize,
    calls: AtomicUsize,
    fail: bool,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    /// Embedder whose every call fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(64)
        }
    }

    /// Number of `embed` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            // FNV-1a
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0xcbf29ce484222325u64, |h, b| {
                    (h ^ b as u64).wrapping_mul(0x100000001b3)
                });
            vector[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::provider("embedding backend unavailable"));
        }
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn model(&self) -> &str {
        "hash-embedder"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// How the scripted LLM behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmScript {
    /// Echo the last message back, word by word
    Echo,
    /// Fail before any token
    FailUpfront,
    /// Emit this many echoed tokens, then fail
    FailAfter(usize),
}

/// LLM that echoes its prompt and records every request
pub struct ScriptedLlm {
    script: LlmScript,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn echo() -> Self {
        Self::new(LlmScript::Echo)
    }

    pub fn new(script: LlmScript) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests seen so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    fn record(&self, request: &CompletionRequest) -> Vec<String> {
        self.requests.lock().push(request.clone());
        request
            .messages
            .last()
            .map(|m| m.content.split_inclusive(' ').map(str::to_string).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let tokens = self.record(request);
        match self.script {
            LlmScript::Echo => Ok(tokens.concat()),
            _ => Err(Error::completion("quota exceeded")),
        }
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> Result<TokenStream> {
        let tokens = self.record(request);
        match self.script {
            LlmScript::Echo => Ok(futures::stream::iter(tokens.into_iter().map(Ok)).boxed()),
            LlmScript::FailUpfront => Err(Error::completion("quota exceeded")),
            LlmScript::FailAfter(n) => {
                let items: Vec<Result<String>> = tokens
                    .into_iter()
                    .take(n)
                    .map(Ok)
                    .chain(std::iter::once(Err(Error::completion("connection reset"))))
                    .collect();
                Ok(futures::stream::iter(items).boxed())
            }
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
