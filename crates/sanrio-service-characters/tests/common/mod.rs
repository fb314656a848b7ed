//! Shared helpers for the characters service integration tests.
//!
//! Every test drives the same router `main` serves, backed by an in-memory
//! store and a temp-file event log.

#![allow(dead_code)]

use axum_test::TestServer;
use serde_json::{json, Value};

use sanrio_service_characters::{build_router, DEFAULT_METRICS_PATH};
use sanrio_service_shared::test_utils::TestContext;
use sanrio_service_shared::ServiceConfig;

/// A running test server plus the context it was built from.
pub struct TestApp {
    pub ctx: TestContext,
    pub server: TestServer,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::from_context(TestContext::new().await)
    }

    pub async fn with_config(config: ServiceConfig) -> Self {
        Self::from_context(TestContext::with_config(config).await)
    }

    fn from_context(ctx: TestContext) -> Self {
        let router = build_router(ctx.state.clone(), DEFAULT_METRICS_PATH);
        let server = TestServer::new(router).expect("build test server");
        Self { ctx, server }
    }

    /// Create a character and return the response body.
    pub async fn create(&self, payload: Value) -> Value {
        let response = self.server.post("/characters").json(&payload).await;
        assert_eq!(response.status_code(), 201, "create failed: {}", response.text());
        response.json::<Value>()
    }
}

pub fn cinnamoroll() -> Value {
    json!({
        "name": "Cinnamoroll",
        "species": "Puppy",
        "debut_year": 2001,
        "tags": ["cute", "fluffy"],
        "description": "A white puppy with long ears that enable him to fly."
    })
}

pub fn hello_kitty() -> Value {
    json!({
        "name": "Hello Kitty",
        "franchise": "Sanrio",
        "species": "Cat",
        "debut_year": 1974,
        "tags": ["cute", "classic"],
        "description": "A sweet cat with a bow."
    })
}

pub fn kuromi() -> Value {
    json!({
        "name": "Kuromi",
        "species": "Rabbit",
        "debut_year": 2005,
        "tags": ["punk", "mischievous"],
        "description": "My Melody's rival with a black jester hood."
    })
}
