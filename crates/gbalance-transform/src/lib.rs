//! Protocol translation for the gateway.
//!
//! Every inbound request converges on the Gemini generate-content body
//! (`GenerateContentRequestBody`), the canonical request shape. Responses and
//! streams are translated back into whichever protocol the caller spoke.

pub mod error;
pub mod generate_content;
pub mod ids;
pub mod list_models;
pub mod model;
pub mod stream;

pub use error::TranslateError;
pub use generate_content::{from_native, from_openai, to_native, to_openai};
pub use list_models::{native_listing, openai_listing};
pub use model::{Capability, ModelDescriptor, ModelResolver};
pub use stream::{StreamEvent, StreamFraming, StreamTranscoder};
