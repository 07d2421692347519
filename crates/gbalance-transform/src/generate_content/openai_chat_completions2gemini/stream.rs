use gbalance_protocol::openai::create_chat_completions::CreateChatCompletionStreamResponse;
use gbalance_protocol::openai::create_chat_completions::stream::{
    ChatCompletionChunkObjectType, ChatCompletionStreamChoice,
};
use gbalance_protocol::openai::create_chat_completions::types::{
    ChatCompletionFinishReason, ChatCompletionStreamResponseDelta,
};

use crate::ids::{next_completion_id, unix_timestamp};

/// Builds the chunks of one OpenAI stream. Every chunk shares the id and
/// creation time fixed at construction.
#[derive(Debug, Clone)]
pub struct OpenAIChunkBuilder {
    id: String,
    created: i64,
    model: String,
}

impl OpenAIChunkBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: next_completion_id(),
            created: unix_timestamp(),
            model: model.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn delta(&self, text: impl Into<String>) -> CreateChatCompletionStreamResponse {
        self.chunk(
            ChatCompletionStreamResponseDelta {
                role: None,
                content: Some(text.into()),
            },
            None,
        )
    }

    /// Empty delta carrying `finish_reason: "stop"`.
    pub fn finish(&self) -> CreateChatCompletionStreamResponse {
        self.chunk(
            ChatCompletionStreamResponseDelta::default(),
            Some(ChatCompletionFinishReason::Stop),
        )
    }

    fn chunk(
        &self,
        delta: ChatCompletionStreamResponseDelta,
        finish_reason: Option<ChatCompletionFinishReason>,
    ) -> CreateChatCompletionStreamResponse {
        CreateChatCompletionStreamResponse {
            id: self.id.clone(),
            object: ChatCompletionChunkObjectType::ChatCompletionChunk,
            created: self.created,
            model: self.model.clone(),
            choices: vec![ChatCompletionStreamChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        }
    }
}
