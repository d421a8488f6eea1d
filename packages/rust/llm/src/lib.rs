//! Text-generation collaborator for the mermagen pipeline.
//!
//! Provides the [`TextGenerator`] trait the pipeline stages call through,
//! the [`OpenAiClient`] implementation backed by the chat-completions API,
//! and the fixed [`PromptTemplates`] used by the detect/generate/autofix
//! stages.

pub mod client;
pub mod prompts;

pub use client::{OpenAiClient, TextGenerator};
pub use prompts::PromptTemplates;
