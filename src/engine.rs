//! Type-erased handle to the GraphQL engine under test.

use std::sync::Arc;

use async_graphql::{Executor, Request, Response};
use futures::future::BoxFuture;
use futures::stream::BoxStream;

trait DynExecutor: Send + Sync {
    fn execute(&self, request: Request) -> BoxFuture<'static, Response>;
    fn execute_stream(&self, request: Request) -> BoxStream<'static, Response>;
}

impl<E: Executor> DynExecutor for E {
    fn execute(&self, request: Request) -> BoxFuture<'static, Response> {
        let executor = self.clone();
        Box::pin(async move { Executor::execute(&executor, request).await })
    }

    fn execute_stream(&self, request: Request) -> BoxStream<'static, Response> {
        Executor::execute_stream(self, request, None)
    }
}

/// Shared engine instance. Cloning shares the same schema.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<dyn DynExecutor>,
}

impl Engine {
    pub fn new<E: Executor>(executor: E) -> Self {
        Self { inner: Arc::new(executor) }
    }

    /// Run one query or mutation.
    pub async fn execute(&self, request: Request) -> Response {
        self.inner.execute(request).await
    }

    /// Run an operation as a stream. Queries and mutations yield once.
    #[must_use]
    pub fn execute_stream(&self, request: Request) -> BoxStream<'static, Response> {
        self.inner.execute_stream(request)
    }
}
