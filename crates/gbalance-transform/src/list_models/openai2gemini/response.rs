use gbalance_protocol::gemini::list_models::ListModelsResponse as GeminiListModelsResponse;
use gbalance_protocol::openai::list_models::{
    ListModelsResponse, ListObjectType, Model, ModelObjectType,
};

use crate::ids::unix_timestamp;
use crate::model::ModelResolver;

const OWNED_BY: &str = "google";

/// Rewrite an upstream listing into the OpenAI shape. Each base model is
/// followed directly by its derived entries, and every entry's `root` is the
/// upstream name of its base (`models/<base>`).
pub fn openai_listing(
    resolver: &ModelResolver<'_>,
    upstream: &GeminiListModelsResponse,
) -> ListModelsResponse {
    let created = unix_timestamp();
    let mut data = Vec::new();
    for model in &upstream.models {
        let id = model.id();
        if !resolver.is_listed(id) {
            continue;
        }
        data.push(entry(id, &model.name, created));
        for (_, derived) in resolver.derived_ids(id) {
            data.push(entry(&derived, &model.name, created));
        }
    }
    ListModelsResponse {
        object: ListObjectType::List,
        data,
    }
}

fn entry(id: &str, root: &str, created: i64) -> Model {
    Model {
        id: id.to_string(),
        object: ModelObjectType::Model,
        created,
        owned_by: OWNED_BY.to_string(),
        permission: Vec::new(),
        root: Some(root.to_string()),
        parent: None,
    }
}
