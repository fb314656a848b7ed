//! In-memory [`DocumentStore`] for tests.
//!
//! Evaluates the subset of the query DSL that [`build_search_body`] emits
//! (`match_all`, `bool.must` over `multi_match`, `term` and `terms`, plus
//! `from`/`size`). Hits come back in insertion order; there is no scoring.
//!
//! [`build_search_body`]: crate::search::build_search_body

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::store::{DocumentStore, SearchHits, StoreInfo, StoredDocument};

#[derive(Debug, Default)]
struct IndexData {
    body: Option<Value>,
    docs: Vec<(String, Value)>,
}

/// Thread-safe in-memory document store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    indices: Mutex<HashMap<String, IndexData>>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a 503 store response.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// The body `index` was explicitly created with, if any.
    pub fn index_body(&self, index: &str) -> Option<Value> {
        self.lock().get(index).and_then(|data| data.body.clone())
    }

    /// Number of documents currently stored in `index`.
    pub fn document_count(&self, index: &str) -> usize {
        self.lock().get(index).map_or(0, |data| data.docs.len())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, IndexData>> {
        // A poisoned lock only means another test thread panicked mid-write.
        self.indices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::StoreResponse {
                status: 503,
                body: "store unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn info(&self) -> Result<StoreInfo> {
        self.check_available()?;
        Ok(StoreInfo {
            cluster_name: "in-memory".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        self.check_available()?;
        Ok(self.lock().contains_key(index))
    }

    async fn create_index(&self, index: &str, body: &Value) -> Result<()> {
        self.check_available()?;
        let mut indices = self.lock();
        if indices.contains_key(index) {
            return Err(Error::StoreResponse {
                status: 400,
                body: format!("resource_already_exists_exception: {}", index),
            });
        }
        indices.insert(
            index.to_string(),
            IndexData {
                body: Some(body.clone()),
                docs: Vec::new(),
            },
        );
        Ok(())
    }

    async fn index_document(
        &self,
        index: &str,
        id: Option<&str>,
        document: &Value,
    ) -> Result<String> {
        self.check_available()?;
        let mut indices = self.lock();
        let data = indices.entry(index.to_string()).or_default();
        let id = id
            .map(String::from)
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

        match data.docs.iter_mut().find(|(doc_id, _)| *doc_id == id) {
            Some((_, existing)) => *existing = document.clone(),
            None => data.docs.push((id.clone(), document.clone())),
        }
        Ok(id)
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Value> {
        self.check_available()?;
        self.lock()
            .get(index)
            .and_then(|data| data.docs.iter().find(|(doc_id, _)| doc_id == id))
            .map(|(_, doc)| doc.clone())
            .ok_or_else(|| Error::DocumentNotFound {
                index: index.to_string(),
                id: id.to_string(),
            })
    }

    async fn delete_document(&self, index: &str, id: &str) -> Result<()> {
        self.check_available()?;
        let mut indices = self.lock();
        let removed = indices.get_mut(index).and_then(|data| {
            let pos = data.docs.iter().position(|(doc_id, _)| doc_id == id)?;
            Some(data.docs.remove(pos))
        });
        removed.map(|_| ()).ok_or_else(|| Error::DocumentNotFound {
            index: index.to_string(),
            id: id.to_string(),
        })
    }

    async fn search(&self, index: &str, body: &Value) -> Result<SearchHits> {
        self.check_available()?;
        let indices = self.lock();
        let Some(data) = indices.get(index) else {
            return Err(Error::StoreResponse {
                status: 404,
                body: format!("index_not_found_exception: {}", index),
            });
        };

        let query = body.get("query").cloned().unwrap_or(Value::Null);
        let matching: Vec<&(String, Value)> = data
            .docs
            .iter()
            .filter(|(_, doc)| matches_query(&query, doc))
            .collect();

        let from = body.get("from").and_then(Value::as_u64).unwrap_or(0) as usize;
        let size = body.get("size").and_then(Value::as_u64).unwrap_or(10) as usize;

        Ok(SearchHits {
            total: matching.len() as u64,
            hits: matching
                .into_iter()
                .skip(from)
                .take(size)
                .map(|(id, doc)| StoredDocument {
                    id: id.clone(),
                    source: doc.clone(),
                })
                .collect(),
        })
    }
}

fn matches_query(query: &Value, doc: &Value) -> bool {
    if query.is_null() || query.get("match_all").is_some() {
        return true;
    }
    if let Some(must) = query.pointer("/bool/must").and_then(Value::as_array) {
        return must.iter().all(|clause| matches_query(clause, doc));
    }
    if let Some(term) = query.get("term").and_then(Value::as_object) {
        return term
            .iter()
            .all(|(field, expected)| field_values(doc, field).any(|v| v == expected));
    }
    if let Some(terms) = query.get("terms").and_then(Value::as_object) {
        return terms.iter().all(|(field, expected)| {
            let expected = expected.as_array().map(Vec::as_slice).unwrap_or_default();
            field_values(doc, field).any(|v| expected.contains(v))
        });
    }
    if let Some(multi) = query.get("multi_match") {
        return matches_multi_match(multi, doc);
    }
    false
}

/// Scalar values of `field`, flattening arrays.
fn field_values<'a>(doc: &'a Value, field: &str) -> Box<dyn Iterator<Item = &'a Value> + 'a> {
    match doc.get(field) {
        Some(Value::Array(items)) => Box::new(items.iter()),
        Some(Value::Null) | None => Box::new(std::iter::empty()),
        Some(value) => Box::new(std::iter::once(value)),
    }
}

fn matches_multi_match(clause: &Value, doc: &Value) -> bool {
    let query_tokens = tokenize(clause.get("query").and_then(Value::as_str).unwrap_or(""));
    let fuzzy = clause.get("fuzziness").is_some();
    let fields = clause
        .get("fields")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    fields
        .iter()
        .filter_map(Value::as_str)
        .map(|f| f.split('^').next().unwrap_or(f))
        .flat_map(|field| field_values(doc, field))
        .filter_map(Value::as_str)
        .flat_map(tokenize)
        .any(|doc_token| {
            query_tokens.iter().any(|q| {
                if fuzzy {
                    strsim::levenshtein(q, &doc_token) <= auto_fuzziness(q)
                } else {
                    *q == doc_token
                }
            })
        })
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Edit distance allowed by `"fuzziness": "AUTO"` for a term of this length.
fn auto_fuzziness(term: &str) -> usize {
    match term.chars().count() {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}
