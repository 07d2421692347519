use serde::{Deserialize, Serialize};

use crate::JsonObject;

/// An upstream model listing entry. Only the fields the gateway rewrites are typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Format: models/{model}.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl Model {
    /// The bare model id (`gemini-1.5-flash` for `models/gemini-1.5-flash`).
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(self.name.as_str())
    }
}
