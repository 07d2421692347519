//! Wire types for the two protocol families the gateway speaks.
//!
//! `gemini` is the upstream-native generate-content API (also accepted inbound),
//! `openai` is the chat-completions shape accepted from OpenAI-compatible callers.
//! Every struct that mirrors an upstream object keeps unknown fields in an `extra`
//! map so native requests and responses survive a decode/encode cycle.

pub mod gemini;
pub mod openai;
pub mod sse;

pub type JsonObject = serde_json::Map<String, serde_json::Value>;
