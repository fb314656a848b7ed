//! Response bodies for the character endpoints.

use serde::{Deserialize, Serialize};

use sanrio_lib::character::StoredCharacter;

/// Body returned after a successful delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedResponse {
    /// Always `"deleted"`.
    pub result: String,
    pub id: String,
}

impl DeletedResponse {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            result: "deleted".to_string(),
            id: id.into(),
        }
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Matches across all pages.
    pub total: u64,
    pub page: u32,
    pub size: u32,
    pub hits: Vec<StoredCharacter>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sanrio_lib::{Character, CharacterCreate};
    use serde_json::json;

    #[test]
    fn test_deleted_serialization() {
        let json = serde_json::to_value(DeletedResponse::new("abc")).unwrap();
        assert_eq!(json, json!({"result": "deleted", "id": "abc"}));
    }

    #[test]
    fn test_search_hits_are_flat() {
        let response = SearchResponse {
            total: 1,
            page: 1,
            size: 10,
            hits: vec![Character::new("id-1", CharacterCreate::named("Kuromi")).into()],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["hits"][0]["id"], "id-1");
        assert_eq!(json["hits"][0]["name"], "Kuromi");
        assert!(json["hits"][0].get("fields").is_none());
    }
}
