use gbalance_protocol::gemini::generate_content::{GenerateContentResponse, UsageMetadata};
use gbalance_protocol::openai::create_chat_completions::CreateChatCompletionResponse;
use gbalance_protocol::openai::create_chat_completions::response::{
    ChatCompletionChoice, ChatCompletionObjectType,
};
use gbalance_protocol::openai::create_chat_completions::types::{
    ChatCompletionFinishReason, ChatCompletionResponseMessage, ChatCompletionResponseRole,
    CompletionUsage,
};

use crate::ids::{next_completion_id, unix_timestamp};

/// Convert a complete Gemini response into an OpenAI chat completion.
///
/// Upstream finish reasons are not mapped: a completed response always
/// reports `stop`.
pub fn to_openai(response: &GenerateContentResponse, model: &str) -> CreateChatCompletionResponse {
    CreateChatCompletionResponse {
        id: next_completion_id(),
        object: ChatCompletionObjectType::ChatCompletion,
        created: unix_timestamp(),
        model: model.to_string(),
        choices: vec![ChatCompletionChoice {
            index: 0,
            message: ChatCompletionResponseMessage {
                role: ChatCompletionResponseRole::Assistant,
                content: response.first_text().unwrap_or_default().to_string(),
            },
            finish_reason: ChatCompletionFinishReason::Stop,
        }],
        usage: response
            .usage_metadata
            .as_ref()
            .map(map_usage)
            .unwrap_or_default(),
    }
}

fn map_usage(usage: &UsageMetadata) -> CompletionUsage {
    CompletionUsage {
        prompt_tokens: usage.prompt_token_count.unwrap_or(0),
        completion_tokens: usage.candidates_token_count.unwrap_or(0),
        total_tokens: usage.total_token_count.unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn upstream(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn first_text_becomes_message_content() {
        let response = upstream(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello!"}, {"text": "ignored"}]},
                "finishReason": "MAX_TOKENS"
            }],
            "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 2, "totalTokenCount": 6}
        }));

        let completion = to_openai(&response, "gemini-1.5-flash");
        let encoded = serde_json::to_value(&completion).unwrap();
        assert_eq!(encoded["object"], "chat.completion");
        assert_eq!(encoded["model"], "gemini-1.5-flash");
        assert_eq!(encoded["choices"][0]["message"]["role"], "assistant");
        assert_eq!(encoded["choices"][0]["message"]["content"], "Hello!");
        assert_eq!(encoded["choices"][0]["finish_reason"], "stop");
        assert_eq!(
            encoded["usage"],
            json!({"prompt_tokens": 4, "completion_tokens": 2, "total_tokens": 6})
        );
        assert!(completion.id.starts_with("chatcmpl-"));
        assert!(completion.created > 0);
    }

    #[test]
    fn thought_summary_is_not_the_answer() {
        let response = upstream(json!({
            "candidates": [{"content": {"role": "model", "parts": [
                {"text": "Let me think about greetings...", "thought": true},
                {"text": "Hello!"}
            ]}}]
        }));
        let completion = to_openai(&response, "gemini-2.5-pro");
        assert_eq!(completion.choices[0].message.content, "Hello!");
    }

    #[test]
    fn missing_fields_default() {
        let completion = to_openai(&upstream(json!({})), "m");
        assert_eq!(completion.choices[0].message.content, "");
        assert_eq!(completion.usage, CompletionUsage::default());
    }

    #[test]
    fn ids_differ_between_responses() {
        let response = upstream(json!({}));
        assert_ne!(to_openai(&response, "m").id, to_openai(&response, "m").id);
    }
}
