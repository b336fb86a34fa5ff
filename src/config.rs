//! Client options and environment-driven defaults.

use std::sync::Arc;
use std::time::Duration;

use async_graphql::{ObjectType, SchemaBuilder, SubscriptionType};

use crate::context::ResultOverride;
use crate::protocol::ConnectionDiagnostics;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:0";
pub const DEFAULT_CONNECTION_INIT_WAIT_MS: u64 = 60_000;

/// Process-level settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Address test servers bind to. Port 0 picks a free port per server.
    pub bind_addr: String,
    /// How long a `graphql-transport-ws` connection may stay un-initialised.
    pub connection_init_wait: Duration,
    /// Keep-alive interval for `graphql-ws`. `None` disables keep-alive.
    pub keep_alive: Option<Duration>,
}

impl HarnessConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `HARNESS_BIND_ADDR`: default `127.0.0.1:0`
    /// - `HARNESS_CONNECTION_INIT_WAIT_MS`: default 60000
    /// - `HARNESS_KEEP_ALIVE_MS`: unset or 0 disables keep-alive
    #[must_use]
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("HARNESS_BIND_ADDR")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned());
        let connection_init_wait = Duration::from_millis(env_parse(
            "HARNESS_CONNECTION_INIT_WAIT_MS",
            DEFAULT_CONNECTION_INIT_WAIT_MS,
        ));
        let keep_alive = Some(env_parse("HARNESS_KEEP_ALIVE_MS", 0_u64))
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);

        Self { bind_addr, connection_init_wait, keep_alive }
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Engine settings forwarded to the schema builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaConfig {
    pub limit_depth: Option<usize>,
    pub limit_complexity: Option<usize>,
    pub disable_introspection: bool,
}

impl SchemaConfig {
    /// Apply these settings to an async-graphql schema builder.
    #[must_use]
    pub fn apply<Q, M, S>(&self, mut builder: SchemaBuilder<Q, M, S>) -> SchemaBuilder<Q, M, S>
    where
        Q: ObjectType + 'static,
        M: ObjectType + 'static,
        S: SubscriptionType + 'static,
    {
        if let Some(depth) = self.limit_depth {
            builder = builder.limit_depth(depth);
        }
        if let Some(complexity) = self.limit_complexity {
            builder = builder.limit_complexity(complexity);
        }
        if self.disable_introspection {
            builder = builder.disable_introspection();
        }
        builder
    }
}

/// Called with a connection's diagnostics when its protocol handler starts.
pub type ConnectionHook = Arc<dyn Fn(Arc<ConnectionDiagnostics>) + Send + Sync>;

/// Options every adapter accepts at construction.
#[derive(Clone)]
pub struct ClientOptions {
    /// Serve GraphiQL on `GET /graphql` for browsers.
    pub graphiql: bool,
    /// Accept queries sent as GET query strings.
    pub allow_queries_via_get: bool,
    /// Replaces the serialized engine result when set.
    pub result_override: Option<ResultOverride>,
    pub schema_config: SchemaConfig,
    pub connection_init_wait: Duration,
    pub keep_alive: Option<Duration>,
    /// Lets tests capture live handler diagnostics.
    pub on_connection: Option<ConnectionHook>,
    pub bind_addr: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        let config = HarnessConfig::from_env();
        Self {
            graphiql: true,
            allow_queries_via_get: true,
            result_override: None,
            schema_config: SchemaConfig::default(),
            connection_init_wait: config.connection_init_wait,
            keep_alive: config.keep_alive,
            on_connection: None,
            bind_addr: config.bind_addr,
        }
    }
}

/// Install a test-friendly `tracing` subscriber. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
