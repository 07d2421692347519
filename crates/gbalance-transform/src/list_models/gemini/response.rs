use gbalance_protocol::gemini::list_models::ListModelsResponse;
use gbalance_protocol::gemini::types::Model;

use crate::model::{Capability, ModelResolver};

/// Rewrite an upstream listing for native callers: filtered ids are removed,
/// then derived `-search`/`-image` copies are appended after every base entry.
pub fn native_listing(
    resolver: &ModelResolver<'_>,
    upstream: ListModelsResponse,
) -> ListModelsResponse {
    let ListModelsResponse {
        models,
        next_page_token,
        extra,
    } = upstream;

    let base: Vec<Model> = models
        .into_iter()
        .filter(|model| resolver.is_listed(model.id()))
        .collect();

    let mut derived = Vec::new();
    for model in &base {
        for (capability, id) in resolver.derived_ids(model.id()) {
            derived.push(derived_entry(model, capability, &id));
        }
    }

    let mut models = base;
    models.extend(derived);
    ListModelsResponse {
        models,
        next_page_token,
        extra,
    }
}

fn derived_entry(base: &Model, capability: Capability, id: &str) -> Model {
    let label = match capability {
        Capability::Search => "For Search",
        Capability::Image => "For Image",
        Capability::Thinking => "For Thinking",
    };
    let display = base.display_name.as_deref().unwrap_or(base.id());
    Model {
        name: format!("models/{id}"),
        display_name: Some(format!("{display} {label}")),
        extra: base.extra.clone(),
    }
}

#[cfg(test)]
mod tests {
    use gbalance_common::ConfigPatch;
    use serde_json::json;

    use super::*;

    #[test]
    fn filters_then_appends_derived_entries() {
        let config = ConfigPatch {
            search_models: Some(vec!["a".to_string(), "b".to_string()]),
            image_models: Some(vec!["a".to_string()]),
            filtered_models: Some(vec!["c".to_string()]),
            ..ConfigPatch::default()
        }
        .into_config()
        .unwrap();
        let resolver = ModelResolver::new(&config);
        let upstream: ListModelsResponse = serde_json::from_value(json!({
            "models": [
                {"name": "models/a", "displayName": "Alpha", "inputTokenLimit": 1000},
                {"name": "models/b"},
                {"name": "models/c", "displayName": "Hidden"}
            ]
        }))
        .unwrap();

        let listing = native_listing(&resolver, upstream);
        let names: Vec<_> = listing.models.iter().map(|model| model.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "models/a",
                "models/b",
                "models/a-search",
                "models/a-image",
                "models/b-search"
            ]
        );

        let encoded = serde_json::to_value(&listing).unwrap();
        assert_eq!(encoded["models"][2]["displayName"], "Alpha For Search");
        assert_eq!(encoded["models"][2]["inputTokenLimit"], 1000);
        assert_eq!(encoded["models"][3]["displayName"], "Alpha For Image");
        assert_eq!(encoded["models"][4]["displayName"], "b For Search");
    }
}
