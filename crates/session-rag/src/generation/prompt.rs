//! Prompt templates for answer generation

use crate::providers::ChatMessage;
use crate::retrieval::SearchHit;

const RAG_SYSTEM_PROMPT: &str = "You are a precise, concise assistant. You may be given optional context extracted from user documents.
Use the context ONLY if it is relevant and helpful. If the context is irrelevant or not needed, ignore it and answer normally.
When lists are appropriate, format them clearly. Cite relevant document snippets briefly when helpful.";

const CHAT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Be concise, friendly, and helpful.";

/// Prompt builder for RAG and plain chat
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join retrieved chunk texts with a blank line, in ranking order
    pub fn build_context(hits: &[SearchHit]) -> String {
        hits.iter()
            .map(|hit| hit.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Messages for a retrieval-augmented answer; `context` may be empty
    pub fn rag_messages(question: &str, context: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(RAG_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Question: {question}\n\nOptional Context (may be empty or irrelevant):\n{context}"
            )),
        ]
    }

    /// Messages for a plain chat answer
    pub fn chat_messages(query: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(CHAT_SYSTEM_PROMPT),
            ChatMessage::user(query),
        ]
    }
}
