//! OpenAI-compatible provider
//!
//! Any endpoint speaking the `chat/completions` protocol works here; the
//! base URL comes from configuration.

pub mod chat;
pub mod client;
pub mod types;

pub use chat::OpenAIChatProvider;
pub use client::OpenAIClient;
