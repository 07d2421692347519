use gbalance_protocol::gemini::generate_content::GenerateContentRequestBody;

use crate::TranslateError;

/// Native bodies are already canonical; only the routed model is authoritative,
/// so a `model` field in the body is dropped.
pub fn from_native(
    mut body: GenerateContentRequestBody,
) -> Result<GenerateContentRequestBody, TranslateError> {
    if body.contents.is_empty() {
        return Err(TranslateError::MissingContent(
            "contents must not be empty".to_string(),
        ));
    }
    body.extra.remove("model");
    Ok(body)
}
