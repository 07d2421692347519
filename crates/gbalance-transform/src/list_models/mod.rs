pub mod gemini;
pub mod openai2gemini;

pub use gemini::response::native_listing;
pub use openai2gemini::response::openai_listing;
