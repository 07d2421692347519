use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::JsonObject;
use crate::gemini::generate_content::types::{Candidate, UsageMetadata};

/// A complete generate-content response, and also the payload of every
/// `data:` record of a `streamGenerateContent?alt=sse` stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<Candidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl GenerateContentResponse {
    /// Text of the first answer part of the first candidate. Thought
    /// summaries (`thought: true`) are skipped.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .filter(|part| part.thought != Some(true))
            .find_map(|part| part.text.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_text_takes_first_text_part() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"inlineData": {"mimeType": "image/png", "data": "AAAA"}},
                    {"text": "answer"},
                    {"text": "more"}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 3, "totalTokenCount": 5}
        }))
        .unwrap();

        assert_eq!(response.first_text(), Some("answer"));
        let usage = response.usage_metadata.unwrap();
        assert_eq!(usage.prompt_token_count, Some(3));
        assert_eq!(usage.candidates_token_count, None);
    }

    #[test]
    fn first_text_skips_thought_summaries() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"role": "model", "parts": [
                {"text": "Let me think about greetings...", "thought": true},
                {"text": "Hello!"}
            ]}}]
        }))
        .unwrap();
        assert_eq!(response.first_text(), Some("Hello!"));

        let only_thoughts: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "hmm", "thought": true}]}}]
        }))
        .unwrap();
        assert_eq!(only_thoughts.first_text(), None);
    }

    #[test]
    fn first_text_absent_without_candidates() {
        assert_eq!(GenerateContentResponse::default().first_text(), None);
    }
}
