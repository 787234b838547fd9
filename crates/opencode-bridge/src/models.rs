//! Static model registry for `GET /v1/models`.

use crate::types::{ModelCard, ModelList};

pub const OWNER: &str = "opencode";

/// Every request is served by the single configured backing model, so that
/// is the only model advertised.
pub fn list_models(model: &str, created: i64) -> ModelList {
    ModelList {
        object: "list".to_string(),
        data: vec![ModelCard {
            id: model.to_string(),
            object: "model".to_string(),
            created,
            owned_by: OWNER.to_string(),
        }],
    }
}
