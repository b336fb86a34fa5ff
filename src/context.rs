//! Per-request context handed to the engine, and the test hooks around it.

use std::sync::Arc;

use serde_json::{Map, Value};

/// Context key the shared fixtures are published under.
pub const CUSTOM_VALUE_KEY: &str = "custom_value";
pub const CUSTOM_VALUE: &str = "a value from context";

/// Replaces the engine's HTTP-shaped result before it is serialized.
pub type ResultOverride = Arc<dyn Fn(&async_graphql::Response) -> Value + Send + Sync>;

/// String-keyed context the view builds for every operation. Resolvers read
/// it with `ctx.data::<RequestContext>()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    values: Map<String, Value>,
}

impl RequestContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    #[must_use]
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}

/// Add the shared test fixtures to an engine-built context.
///
/// Every adapter calls this after building its own context and before
/// execution. Keys the engine already set are kept unless they collide with
/// a fixture key.
#[must_use]
pub fn inject_shared_context(context: RequestContext) -> RequestContext {
    context.with(CUSTOM_VALUE_KEY, CUSTOM_VALUE)
}
