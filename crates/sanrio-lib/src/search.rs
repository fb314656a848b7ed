//! Search parameters and query construction.
//!
//! [`build_search_body`] is a pure translation from caller parameters to the
//! store's query DSL; it never talks to the store itself.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

use crate::character::{Validate, ValidationErrors};

/// Fields searched by the free-text query, with `name` boosted 3x.
pub const TEXT_FIELDS: [&str; 2] = ["name^3", "description"];

/// Query parameters accepted by the search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,

    #[serde(default)]
    pub franchise: Option<String>,

    #[serde(default)]
    pub species: Option<String>,

    /// Comma-separated tag list; matches records carrying any of them.
    #[serde(default)]
    pub tags: Option<String>,

    #[serde(default = "default_page")]
    pub page: u32,

    #[serde(default = "default_size")]
    pub size: u32,

    #[serde(default, deserialize_with = "flexible_bool")]
    pub fuzzy: bool,
}

fn default_page() -> u32 {
    1
}

fn default_size() -> u32 {
    10
}

/// Accepts `true`/`false` in any case as well as `1`/`0`.
fn flexible_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "fuzzy must be a boolean, got '{}'",
            other
        ))),
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            q: None,
            franchise: None,
            species: None,
            tags: None,
            page: default_page(),
            size: default_size(),
            fuzzy: false,
        }
    }
}

impl SearchParams {
    /// Offset of the first hit on the requested page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.size)
    }

    /// Tag filter values, or `None` when no usable tag was supplied.
    pub fn tag_list(&self) -> Option<Vec<String>> {
        let tags = parse_tags(present(&self.tags)?);
        if tags.is_empty() {
            None
        } else {
            Some(tags)
        }
    }

    /// The filter values as logged with `search_executed`.
    pub fn filters_json(&self) -> Value {
        json!({
            "franchise": self.franchise,
            "species": self.species,
            "tags": self.tags,
        })
    }
}

impl Validate for SearchParams {
    fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.page < 1 {
            errors.push("page", "page must be greater than or equal to 1");
        }
        errors.into_result()
    }
}

/// Split a comma-separated tag list, trimming entries and dropping blanks.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Empty strings count as absent, like an omitted parameter.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Build the search request body for `params`.
///
/// Each supplied condition becomes one `bool.must` clause; with no
/// conditions the query matches every document.
pub fn build_search_body(params: &SearchParams) -> Value {
    let mut must = Vec::new();

    if let Some(q) = present(&params.q) {
        let mut multi_match = Map::new();
        multi_match.insert("query".into(), json!(q));
        multi_match.insert("fields".into(), json!(TEXT_FIELDS));
        if params.fuzzy {
            multi_match.insert("fuzziness".into(), json!("AUTO"));
        }
        must.push(json!({ "multi_match": multi_match }));
    }

    if let Some(franchise) = present(&params.franchise) {
        must.push(json!({"term": {"franchise": franchise}}));
    }
    if let Some(species) = present(&params.species) {
        must.push(json!({"term": {"species": species}}));
    }
    if let Some(tags) = params.tag_list() {
        must.push(json!({"terms": {"tags": tags}}));
    }

    let query = if must.is_empty() {
        json!({"match_all": {}})
    } else {
        json!({"bool": {"must": must}})
    };

    json!({
        "from": params.offset(),
        "size": params.size,
        "query": query,
    })
}
