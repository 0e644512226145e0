//! Answer generation: prompts and responders

pub mod prompt;
pub mod responder;

pub use prompt::PromptBuilder;
pub use responder::{collect_tokens, PlainResponder, RagResponder, RetrievedContext};
