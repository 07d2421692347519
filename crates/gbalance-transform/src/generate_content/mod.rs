pub mod gemini;
pub mod openai_chat_completions2gemini;

pub use gemini::request::from_native;
pub use gemini::response::to_native;
pub use openai_chat_completions2gemini::request::from_openai;
pub use openai_chat_completions2gemini::response::to_openai;
