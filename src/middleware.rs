//! Tower middleware that makes request attributes available to the
//! [`Handler`](crate::handler::Handler).
//!
//! Wrap your HTTP service with [`RequestContextLayer`] (or [`wrap`]) and log
//! from within the request's task; records then carry `httpRequest` and,
//! when a project is known, the trace fields.
//!
//! ```ignore
//! use tower::ServiceBuilder;
//! use tracing_cloud_logging::middleware::RequestContextLayer;
//!
//! let service = ServiceBuilder::new()
//!     .layer(RequestContextLayer::new())
//!     .service(my_handler);
//! ```

use crate::request::RequestContext;
use http::Request;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::task::futures::TaskLocalFuture;
use tower::{Layer, Service};

/// Wrap `inner` so that every request it serves carries a [`RequestContext`].
pub fn wrap<S>(inner: S) -> RequestContextService<S> {
    RequestContextService { inner }
}

/// Tower layer producing [`RequestContextService`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestContextLayer;

impl RequestContextLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestContextLayer {
    type Service = RequestContextService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        wrap(inner)
    }
}

/// Service that computes the [`RequestContext`] of each request once, stores
/// it in the request extensions as `Arc<RequestContext>`, and runs the inner
/// service inside the context's task-local scope.
#[derive(Clone, Debug)]
pub struct RequestContextService<S> {
    inner: S,
}

impl<S, B> Service<Request<B>> for RequestContextService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = TaskLocalFuture<Arc<RequestContext>, S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let ctx = Arc::new(RequestContext::from_request(&req));
        req.extensions_mut().insert(Arc::clone(&ctx));

        // Cover logging done synchronously in `call` as well as in the future.
        let inner = &mut self.inner;
        let future = Arc::clone(&ctx).sync_scope(|| inner.call(req));
        ctx.scope(future)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use tower::{service_fn, ServiceExt};

    #[tokio::test]
    async fn context_reaches_inner_service() {
        let svc = wrap(service_fn(|req: Request<()>| async move {
            let current = RequestContext::current().expect("task-local context");
            let stored = req
                .extensions()
                .get::<Arc<RequestContext>>()
                .cloned()
                .expect("extension");
            assert!(Arc::ptr_eq(&current, &stored));
            Ok::<_, Infallible>(current.trace_id().to_string())
        }));

        let req = Request::get("/")
            .header("X-Cloud-Trace-Context", "abc/123;o=1")
            .body(())
            .unwrap();
        assert_eq!(svc.oneshot(req).await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn context_ends_with_request() {
        let svc = RequestContextLayer::new()
            .layer(service_fn(|_: Request<()>| async { Ok::<_, Infallible>(()) }));
        svc.oneshot(Request::get("/").body(()).unwrap()).await.unwrap();
        assert!(RequestContext::current().is_none());
    }
}
