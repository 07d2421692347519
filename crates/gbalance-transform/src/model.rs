use std::collections::BTreeSet;

use gbalance_common::GatewayConfig;
use gbalance_protocol::gemini::generate_content::{
    GenerateContentRequestBody, Modality, ThinkingConfig, Tool,
};

pub const SEARCH_SUFFIX: &str = "-search";
pub const IMAGE_SUFFIX: &str = "-image";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    Search,
    Image,
    Thinking,
}

/// A caller model id split into the upstream base id and the features its
/// suffix (or allow-list membership) turns on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub base_id: String,
    pub capabilities: BTreeSet<Capability>,
}

impl ModelDescriptor {
    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Decodes suffixed model ids and writes the request fragments they imply.
#[derive(Debug, Clone, Copy)]
pub struct ModelResolver<'a> {
    config: &'a GatewayConfig,
}

impl<'a> ModelResolver<'a> {
    pub fn new(config: &'a GatewayConfig) -> Self {
        Self { config }
    }

    /// Strips at most one suffix; `-search` is checked before `-image`.
    pub fn resolve(&self, raw_id: &str) -> ModelDescriptor {
        let raw_id = raw_id.strip_prefix("models/").unwrap_or(raw_id);
        let mut capabilities = BTreeSet::new();

        let base_id = if let Some(base) = raw_id.strip_suffix(SEARCH_SUFFIX) {
            capabilities.insert(Capability::Search);
            base
        } else if let Some(base) = raw_id.strip_suffix(IMAGE_SUFFIX) {
            capabilities.insert(Capability::Image);
            base
        } else {
            raw_id
        };

        if self.config.models.is_thinking(base_id) {
            capabilities.insert(Capability::Thinking);
        }

        ModelDescriptor {
            base_id: base_id.to_string(),
            capabilities,
        }
    }

    pub fn apply_capabilities(
        &self,
        descriptor: &ModelDescriptor,
        request: &mut GenerateContentRequestBody,
    ) {
        if descriptor.has(Capability::Search) {
            push_tool_once(request, Tool::google_search(), |tool| {
                tool.google_search.is_some()
            });
        }

        if descriptor.has(Capability::Image) {
            request.generation_config_mut().response_modalities =
                Some(vec![Modality::Text, Modality::Image]);
        }

        if descriptor.has(Capability::Thinking) {
            let budget = self
                .config
                .thinking_budget_map
                .get(&descriptor.base_id)
                .copied();
            let show_thoughts = self.config.show_thinking_process;
            let generation_config = request.generation_config_mut();
            if generation_config.thinking_config.is_none() {
                generation_config.thinking_config = Some(ThinkingConfig {
                    include_thoughts: Some(show_thoughts),
                    thinking_budget: budget,
                    ..ThinkingConfig::default()
                });
            }
        }
    }

    /// Configured safety settings and tool markers. Image requests get no
    /// tools: the upstream rejects tools alongside image output.
    pub fn apply_policy(&self, descriptor: &ModelDescriptor, request: &mut GenerateContentRequestBody) {
        if request.safety_settings.is_none() && !self.config.safety_settings.is_empty() {
            request.safety_settings = Some(self.config.safety_settings.clone());
        }

        if descriptor.has(Capability::Image) {
            return;
        }
        if self.config.code_execution_enabled {
            push_tool_once(request, Tool::code_execution(), |tool| {
                tool.code_execution.is_some()
            });
        }
        if self.config.url_context_enabled {
            push_tool_once(request, Tool::url_context(), |tool| tool.url_context.is_some());
        }
    }

    /// Capabilities first, then configured policy.
    pub fn prepare(&self, descriptor: &ModelDescriptor, request: &mut GenerateContentRequestBody) {
        self.apply_capabilities(descriptor, request);
        self.apply_policy(descriptor, request);
    }

    /// Ids of the derived entries a listed base model gets, search first.
    pub fn derived_ids(&self, base_id: &str) -> Vec<(Capability, String)> {
        let mut derived = Vec::new();
        if self.config.models.is_search(base_id) {
            derived.push((Capability::Search, format!("{base_id}{SEARCH_SUFFIX}")));
        }
        if self.config.models.is_image(base_id) {
            derived.push((Capability::Image, format!("{base_id}{IMAGE_SUFFIX}")));
        }
        derived
    }

    pub fn is_listed(&self, base_id: &str) -> bool {
        !self.config.models.is_filtered(base_id)
    }
}

fn push_tool_once(
    request: &mut GenerateContentRequestBody,
    tool: Tool,
    present: impl Fn(&Tool) -> bool,
) {
    let tools = request.tools_mut();
    if !tools.iter().any(present) {
        tools.push(tool);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use gbalance_common::{ConfigPatch, GatewayConfig};
    use gbalance_protocol::gemini::generate_content::{Content, SafetySetting};

    use super::*;

    fn config() -> GatewayConfig {
        ConfigPatch {
            search_models: Some(vec!["gemini-2.0-flash".to_string()]),
            image_models: Some(vec!["gemini-2.0-flash".to_string()]),
            thinking_models: Some(vec!["gemini-2.5-pro".to_string()]),
            thinking_budget_map: Some(HashMap::from([("gemini-2.5-pro".to_string(), 2048)])),
            ..ConfigPatch::default()
        }
        .into_config()
        .unwrap()
    }

    fn request() -> GenerateContentRequestBody {
        GenerateContentRequestBody {
            contents: vec![Content::text(None, "hi")],
            ..GenerateContentRequestBody::default()
        }
    }

    #[test]
    fn strips_search_suffix() {
        let config = config();
        let descriptor = ModelResolver::new(&config).resolve("gemini-2.0-flash-search");
        assert_eq!(descriptor.base_id, "gemini-2.0-flash");
        assert_eq!(descriptor.capabilities, BTreeSet::from([Capability::Search]));
    }

    #[test]
    fn strips_image_suffix() {
        let config = config();
        let descriptor = ModelResolver::new(&config).resolve("models/gemini-2.0-flash-image");
        assert_eq!(descriptor.base_id, "gemini-2.0-flash");
        assert_eq!(descriptor.capabilities, BTreeSet::from([Capability::Image]));
    }

    #[test]
    fn strips_only_one_suffix_with_search_first() {
        let config = config();
        let resolver = ModelResolver::new(&config);
        let descriptor = resolver.resolve("x-image-search");
        assert_eq!(descriptor.base_id, "x-image");
        assert_eq!(descriptor.capabilities, BTreeSet::from([Capability::Search]));

        let plain = resolver.resolve("gemini-1.5-flash");
        assert_eq!(plain.base_id, "gemini-1.5-flash");
        assert!(plain.capabilities.is_empty());
    }

    #[test]
    fn search_adds_tool_once() {
        let config = config();
        let resolver = ModelResolver::new(&config);
        let descriptor = resolver.resolve("gemini-2.0-flash-search");
        let mut body = request();
        body.tools = Some(vec![Tool::google_search()]);
        resolver.apply_capabilities(&descriptor, &mut body);
        assert_eq!(body.tools, Some(vec![Tool::google_search()]));

        let mut fresh = request();
        resolver.apply_capabilities(&descriptor, &mut fresh);
        assert_eq!(fresh.tools, Some(vec![Tool::google_search()]));
    }

    #[test]
    fn image_sets_modalities() {
        let config = config();
        let resolver = ModelResolver::new(&config);
        let descriptor = resolver.resolve("gemini-2.0-flash-image");
        let mut body = request();
        resolver.apply_capabilities(&descriptor, &mut body);
        let encoded = serde_json::to_value(&body).unwrap();
        assert_eq!(
            encoded["generationConfig"]["responseModalities"],
            serde_json::json!(["Text", "Image"])
        );
        assert!(body.tools.is_none());
    }

    #[test]
    fn thinking_uses_budget_map_and_keeps_caller_config() {
        let config = config();
        let resolver = ModelResolver::new(&config);
        let descriptor = resolver.resolve("gemini-2.5-pro");
        assert!(descriptor.has(Capability::Thinking));

        let mut body = request();
        resolver.apply_capabilities(&descriptor, &mut body);
        let thinking = body
            .generation_config
            .as_ref()
            .and_then(|config| config.thinking_config.clone())
            .unwrap();
        assert_eq!(thinking.thinking_budget, Some(2048));
        assert_eq!(thinking.include_thoughts, Some(true));

        let mut caller = request();
        caller.generation_config_mut().thinking_config = Some(ThinkingConfig {
            thinking_budget: Some(0),
            ..ThinkingConfig::default()
        });
        resolver.apply_capabilities(&descriptor, &mut caller);
        let kept = caller.generation_config.unwrap().thinking_config.unwrap();
        assert_eq!(kept.thinking_budget, Some(0));
        assert_eq!(kept.include_thoughts, None);
    }

    #[test]
    fn policy_adds_safety_and_tools_except_for_image() {
        let mut config = config();
        config.code_execution_enabled = true;
        config.url_context_enabled = true;
        config.safety_settings = vec![SafetySetting {
            category: "HARM_CATEGORY_HARASSMENT".to_string(),
            threshold: "BLOCK_NONE".to_string(),
        }];
        let resolver = ModelResolver::new(&config);

        let text = resolver.resolve("gemini-2.0-flash-search");
        let mut body = request();
        resolver.prepare(&text, &mut body);
        resolver.prepare(&text, &mut body);
        assert_eq!(
            body.tools,
            Some(vec![
                Tool::google_search(),
                Tool::code_execution(),
                Tool::url_context()
            ])
        );
        assert_eq!(body.safety_settings.as_ref().map(Vec::len), Some(1));

        let image = resolver.resolve("gemini-2.0-flash-image");
        let mut image_body = request();
        resolver.prepare(&image, &mut image_body);
        assert!(image_body.tools.is_none());
        assert!(image_body.safety_settings.is_some());
    }

    #[test]
    fn caller_safety_settings_win() {
        let mut config = config();
        config.safety_settings = vec![SafetySetting {
            category: "HARM_CATEGORY_HARASSMENT".to_string(),
            threshold: "BLOCK_NONE".to_string(),
        }];
        let resolver = ModelResolver::new(&config);
        let descriptor = resolver.resolve("gemini-1.5-flash");
        let mut body = request();
        body.safety_settings = Some(Vec::new());
        resolver.apply_policy(&descriptor, &mut body);
        assert_eq!(body.safety_settings, Some(Vec::new()));
    }
}
