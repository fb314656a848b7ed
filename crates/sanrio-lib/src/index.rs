//! Character index mapping and startup index management.

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::Result;
use crate::store::DocumentStore;

/// Name of the index holding character documents.
pub const DEFAULT_CHARACTER_INDEX: &str = "sanrio_characters";

/// Fixed field mapping for character documents.
///
/// `name` and `description` are analyzed text; `franchise`, `species` and
/// `tags` are exact-match keywords.
pub fn character_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "name": {"type": "text", "analyzer": "standard"},
                "franchise": {"type": "keyword"},
                "species": {"type": "keyword"},
                "debut_year": {"type": "integer"},
                "tags": {"type": "keyword"},
                "description": {"type": "text"}
            }
        }
    })
}

/// Create `index` with [`character_mapping`] unless it already exists.
///
/// Returns `true` when the index was created by this call.
pub async fn ensure_index(store: &dyn DocumentStore, index: &str) -> Result<bool> {
    if store.index_exists(index).await? {
        debug!(index = %index, "index already exists");
        return Ok(false);
    }

    store.create_index(index, &character_mapping()).await?;
    info!(index = %index, "created character index");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;

    #[test]
    fn test_mapping_field_types() {
        let mapping = character_mapping();
        let props = &mapping["mappings"]["properties"];
        assert_eq!(props["name"]["type"], "text");
        assert_eq!(props["description"]["type"], "text");
        assert_eq!(props["franchise"]["type"], "keyword");
        assert_eq!(props["species"]["type"], "keyword");
        assert_eq!(props["tags"]["type"], "keyword");
        assert_eq!(props["debut_year"]["type"], "integer");
    }

    #[tokio::test]
    async fn test_ensure_index_is_idempotent() {
        let store = InMemoryStore::new();

        assert!(ensure_index(&store, DEFAULT_CHARACTER_INDEX).await.unwrap());
        assert!(!ensure_index(&store, DEFAULT_CHARACTER_INDEX).await.unwrap());
        assert!(store.index_exists(DEFAULT_CHARACTER_INDEX).await.unwrap());
        assert_eq!(
            store.index_body(DEFAULT_CHARACTER_INDEX),
            Some(character_mapping())
        );
    }
}
