use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::JsonObject;
use crate::gemini::generate_content::types::{Content, GenerationConfig, SafetySetting, Tool};

/// Body of `models/{model}:generateContent` and `:streamGenerateContent`.
///
/// This is also the gateway's canonical request: both inbound protocols are
/// translated into it before dispatch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequestBody {
    #[serde(default)]
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "tool_config")]
    pub tool_config: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "safety_settings")]
    pub safety_settings: Option<Vec<SafetySetting>>,
    /// System instruction (text-only Content).
    #[serde(skip_serializing_if = "Option::is_none", alias = "system_instruction")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "generation_config")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "cached_content")]
    pub cached_content: Option<String>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl GenerateContentRequestBody {
    pub fn generation_config_mut(&mut self) -> &mut GenerationConfig {
        self.generation_config.get_or_insert_with(GenerationConfig::default)
    }

    pub fn tools_mut(&mut self) -> &mut Vec<Tool> {
        self.tools.get_or_insert_with(Vec::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_snake_case_and_keeps_unknown_fields() {
        let body: GenerateContentRequestBody = serde_json::from_value(json!({
            "contents": [{"role": "user", "parts": [{"text": "hi"}]}],
            "system_instruction": {"parts": [{"text": "be brief"}]},
            "labels": {"team": "a"}
        }))
        .unwrap();

        assert_eq!(body.contents.len(), 1);
        assert!(body.system_instruction.is_some());
        assert_eq!(body.extra.get("labels"), Some(&json!({"team": "a"})));

        let encoded = serde_json::to_value(&body).unwrap();
        assert_eq!(encoded["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(encoded["labels"]["team"], "a");
        assert!(encoded.get("tools").is_none());
    }
}
