//! Sanrio characters library entry points.
//!
//! This crate owns everything about character records that is independent of
//! the HTTP layer: the create payload and its validation rules, the index
//! mapping, search query construction, and the [`DocumentStore`] collaborator
//! with its Elasticsearch implementation. Services and the CLI should only
//! depend on the items exported here instead of talking to the store directly.

#![deny(warnings)]

pub mod character;
pub mod elastic;
pub mod error;
pub mod index;
pub mod net;
pub mod search;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub use character::{
    Character, CharacterCreate, FieldError, StoredCharacter, Validate, ValidationErrors,
    DEBUT_YEAR_MAX, DEBUT_YEAR_MIN, DEFAULT_FRANCHISE,
};
pub use elastic::{ElasticClient, RetryPolicy, DEFAULT_ELASTICSEARCH_HOST};
pub use error::{Error, Result};
pub use index::{character_mapping, ensure_index, DEFAULT_CHARACTER_INDEX};
pub use net::check_port;
pub use search::{build_search_body, parse_tags, SearchParams};
pub use store::{DocumentStore, SearchHits, StoreInfo, StoredDocument};

#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryStore;
