use gbalance_protocol::gemini::generate_content::{
    Content, ContentRole, GenerateContentRequestBody, GenerationConfig, Part,
};
use gbalance_protocol::openai::create_chat_completions::CreateChatCompletionRequestBody;
use gbalance_protocol::openai::create_chat_completions::types::{
    ChatCompletionContentPart, ChatCompletionMessageContent, ChatCompletionRequestMessage,
};

use crate::TranslateError;

/// Convert an OpenAI chat-completions request into the canonical Gemini body.
///
/// The first system (or developer) message becomes `systemInstruction`; later
/// ones are dropped. Turn order is preserved.
pub fn from_openai(
    body: CreateChatCompletionRequestBody,
) -> Result<GenerateContentRequestBody, TranslateError> {
    let generation_config = map_generation_config(&body);

    let mut system_instruction = None;
    let mut contents = Vec::with_capacity(body.messages.len());

    for (index, message) in body.messages.into_iter().enumerate() {
        let role = message.role.clone();
        let parts = map_parts(message, index)?;
        match role.as_str() {
            "system" | "developer" => {
                if system_instruction.is_none() {
                    system_instruction = Some(Content { parts, role: None });
                }
            }
            "user" => contents.push(Content {
                parts,
                role: Some(ContentRole::User),
            }),
            "assistant" => contents.push(Content {
                parts,
                role: Some(ContentRole::Model),
            }),
            other => {
                return Err(TranslateError::MissingContent(format!(
                    "messages[{index}]: unsupported role {other:?}"
                )));
            }
        }
    }

    if contents.is_empty() {
        return Err(TranslateError::MissingContent(
            "messages must contain at least one user or assistant message".to_string(),
        ));
    }

    Ok(GenerateContentRequestBody {
        contents,
        system_instruction,
        generation_config,
        ..GenerateContentRequestBody::default()
    })
}

fn map_parts(
    message: ChatCompletionRequestMessage,
    index: usize,
) -> Result<Vec<Part>, TranslateError> {
    let missing = || TranslateError::MissingContent(format!("messages[{index}] has no text content"));

    let parts = match message.content {
        None => return Err(missing()),
        Some(ChatCompletionMessageContent::Text(text)) => {
            if text.is_empty() {
                return Err(missing());
            }
            vec![Part::text(text)]
        }
        Some(ChatCompletionMessageContent::Parts(items)) => {
            let mut texts = Vec::new();
            let mut media = Vec::new();
            for item in items {
                match item {
                    ChatCompletionContentPart::Text { text } => texts.push(text),
                    ChatCompletionContentPart::ImageUrl { image_url } => {
                        if let Some(part) = inline_image(&image_url.url) {
                            media.push(part);
                        }
                    }
                    ChatCompletionContentPart::Unsupported => {}
                }
            }
            let text = texts.join("\n");
            let mut parts = Vec::with_capacity(media.len() + 1);
            if !text.is_empty() {
                parts.push(Part::text(text));
            }
            parts.extend(media);
            parts
        }
    };

    if parts.is_empty() {
        return Err(missing());
    }
    Ok(parts)
}

/// `data:<mime>;base64,<data>` becomes inline data. Remote URLs are not fetched.
fn inline_image(url: &str) -> Option<Part> {
    let rest = url.strip_prefix("data:")?;
    let (meta, data) = rest.split_once(',')?;
    let mime_type = meta.strip_suffix(";base64")?;
    if mime_type.is_empty() || data.is_empty() {
        return None;
    }
    Some(Part::inline_data(mime_type, data))
}

fn map_generation_config(body: &CreateChatCompletionRequestBody) -> Option<GenerationConfig> {
    let config = GenerationConfig {
        temperature: body.temperature,
        top_p: body.top_p,
        top_k: body.top_k,
        max_output_tokens: body.max_tokens.or(body.max_completion_tokens),
        candidate_count: body.n,
        stop_sequences: body.stop.clone().map(|stop| stop.into_vec()),
        ..GenerationConfig::default()
    };
    if config == GenerationConfig::default() {
        None
    } else {
        Some(config)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn body(value: serde_json::Value) -> CreateChatCompletionRequestBody {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn hoists_system_message() {
        let canonical = from_openai(body(json!({
            "model": "gemini-1.5-flash",
            "messages": [
                {"role": "system", "content": "S"},
                {"role": "user", "content": "U"}
            ]
        })))
        .unwrap();

        let system = canonical.system_instruction.unwrap();
        assert_eq!(system.parts[0].text.as_deref(), Some("S"));
        assert_eq!(canonical.contents.len(), 1);
        assert_eq!(canonical.contents[0].role, Some(ContentRole::User));
        assert_eq!(canonical.contents[0].parts[0].text.as_deref(), Some("U"));
        assert!(canonical.generation_config.is_none());
    }

    #[test]
    fn maps_roles_and_keeps_order() {
        let canonical = from_openai(body(json!({
            "model": "m",
            "messages": [
                {"role": "user", "content": "1"},
                {"role": "assistant", "content": "2"},
                {"role": "system", "content": "late system"},
                {"role": "user", "content": "3"}
            ]
        })))
        .unwrap();

        let roles: Vec<_> = canonical.contents.iter().map(|c| c.role).collect();
        assert_eq!(
            roles,
            vec![
                Some(ContentRole::User),
                Some(ContentRole::Model),
                Some(ContentRole::User)
            ]
        );
        let texts: Vec<_> = canonical
            .contents
            .iter()
            .map(|c| c.parts[0].text.clone().unwrap())
            .collect();
        assert_eq!(texts, vec!["1", "2", "3"]);
        assert_eq!(
            canonical.system_instruction.unwrap().parts[0].text.as_deref(),
            Some("late system")
        );
    }

    #[test]
    fn maps_sampling_fields() {
        let canonical = from_openai(body(json!({
            "model": "m",
            "messages": [{"role": "user", "content": "hi"}],
            "temperature": 0.5,
            "max_tokens": 128,
            "max_completion_tokens": 64,
            "top_p": 0.9,
            "top_k": 40,
            "stop": "END",
            "n": 2,
            "presence_penalty": 1.0
        })))
        .unwrap();

        let encoded = serde_json::to_value(&canonical).unwrap();
        assert_eq!(
            encoded["generationConfig"],
            json!({
                "temperature": 0.5,
                "topP": 0.9,
                "topK": 40,
                "maxOutputTokens": 128,
                "candidateCount": 2,
                "stopSequences": ["END"]
            })
        );
    }

    #[test]
    fn max_completion_tokens_is_fallback() {
        let canonical = from_openai(body(json!({
            "model": "m",
            "messages": [{"role": "user", "content": "hi"}],
            "max_completion_tokens": 64
        })))
        .unwrap();
        assert_eq!(canonical.generation_config.unwrap().max_output_tokens, Some(64));
    }

    #[test]
    fn content_parts_with_inline_image() {
        let canonical = from_openai(body(json!({
            "model": "m",
            "messages": [{"role": "user", "content": [
                {"type": "text", "text": "what is"},
                {"type": "image_url", "image_url": {"url": "data:image/png;base64,iVBORw0"}},
                {"type": "text", "text": "this?"},
                {"type": "input_audio", "input_audio": {"data": "x", "format": "wav"}}
            ]}]
        })))
        .unwrap();

        let parts = &canonical.contents[0].parts;
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].text.as_deref(), Some("what is\nthis?"));
        let blob = parts[1].inline_data.as_ref().unwrap();
        assert_eq!(blob.mime_type, "image/png");
        assert_eq!(blob.data, "iVBORw0");
    }

    #[test]
    fn developer_counts_as_system() {
        let canonical = from_openai(body(json!({
            "model": "m",
            "messages": [
                {"role": "developer", "content": "D"},
                {"role": "user", "content": "U"}
            ]
        })))
        .unwrap();
        assert_eq!(
            canonical.system_instruction.unwrap().parts[0].text.as_deref(),
            Some("D")
        );
    }

    #[test]
    fn missing_content_is_rejected() {
        for messages in [
            json!([{"role": "user"}]),
            json!([{"role": "user", "content": ""}]),
            json!([{"role": "user", "content": [{"type": "image_url", "image_url": {"url": "https://x/y.png"}}]}]),
            json!([{"role": "tool", "content": "x"}]),
            json!([{"role": "system", "content": "only system"}]),
        ] {
            let err = from_openai(body(json!({"model": "m", "messages": messages}))).unwrap_err();
            assert!(matches!(err, TranslateError::MissingContent(_)));
        }
    }
}
