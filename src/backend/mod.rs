//! LLM backend abstraction for ferret.
//!
//! The agent only needs one thing from a language model: send an ordered list
//! of `{role, content}` messages, get text back. [`ChatBackend`] is that
//! contract; [`Backend`] implements it for Ollama, Groq, OpenAI and Anthropic
//! via enum dispatch. Backends never retry; the caller decides what a failure
//! means.

mod client;
mod groq;
mod http;
mod kind;
mod ollama;
mod resolve;

pub use client::Backend;
pub use resolve::resolve_backend;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::message::ChatMessage;

/// Uniform "send messages, get text" contract.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Completes the chat. Applies a bounded timeout; never retries.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, BackendError>;

    /// Short label for logs and CLI headers, e.g. `ollama/llama3.2:3b`.
    fn describe(&self) -> String;
}
