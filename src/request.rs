//! Per-request attributes derived from inbound HTTP requests.

use crate::attr::{group_value, optional_strings, Attr, Value};
use crate::rewrite::{HTTP_REQUEST_KEY, SPAN_ID_KEY, TRACE_KEY};
use http::header::{REFERER, USER_AGENT};
use http::{HeaderMap, Request};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::futures::TaskLocalFuture;

/// Header carrying the trace context on Google Cloud, formatted as
/// `TRACE_ID/SPAN_ID;o=OPTIONS`. See
/// <https://cloud.google.com/trace/docs/trace-context#legacy-http-header>.
pub const TRACE_CONTEXT_HEADER: &str = "x-cloud-trace-context";

tokio::task_local! {
    static CURRENT: Arc<RequestContext>;
}

/// Logging context of one HTTP request.
///
/// Built once when the request enters the service and never modified
/// afterwards. It reaches the [`Handler`](crate::handler::Handler) either
/// explicitly or through the task-local scope installed by
/// [`RequestContextService`](crate::middleware::RequestContextService).
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    http_request: Value,
    trace_id: String,
    span_id: String,
}

impl RequestContext {
    /// Extract the `httpRequest` group and the raw trace and span IDs.
    ///
    /// The remote address is taken from a [`SocketAddr`] request extension,
    /// if the server inserted one.
    pub fn from_request<B>(req: &Request<B>) -> Self {
        let headers = req.headers();
        let url = req.uri().to_string();
        let remote_ip = req
            .extensions()
            .get::<SocketAddr>()
            .map(ToString::to_string)
            .unwrap_or_default();
        let protocol = format!("{:?}", req.version());

        // https://cloud.google.com/logging/docs/reference/v2/rest/v2/LogEntry#HttpRequest
        let http_request = group_value([
            ("requestMethod", req.method().as_str()),
            ("requestUrl", url.as_str()),
            ("userAgent", header_str(headers, USER_AGENT.as_str())),
            ("remoteIp", remote_ip.as_str()),
            ("referer", header_str(headers, REFERER.as_str())),
            ("protocol", protocol.as_str()),
        ]);
        let (trace_id, span_id) = parse_trace_header(header_str(headers, TRACE_CONTEXT_HEADER));

        RequestContext {
            http_request,
            trace_id: trace_id.to_string(),
            span_id: span_id.to_string(),
        }
    }

    /// The `httpRequest` group value.
    pub fn http_request(&self) -> &Value {
        &self.http_request
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn span_id(&self) -> &str {
        &self.span_id
    }

    /// Attributes to attach to each record logged for this request.
    pub fn attrs(&self, project_id: &str) -> Vec<Attr> {
        let mut attrs = vec![Attr::new(HTTP_REQUEST_KEY, self.http_request.clone())];
        attrs.extend(trace_attrs(project_id, &self.trace_id, &self.span_id));
        attrs
    }

    /// Context of the request currently being served on this task, if any.
    pub fn current() -> Option<Arc<RequestContext>> {
        CURRENT.try_with(Arc::clone).ok()
    }

    /// Run `fut` with `self` as the current request context.
    pub fn scope<F: Future>(self: Arc<Self>, fut: F) -> TaskLocalFuture<Arc<RequestContext>, F> {
        CURRENT.scope(self, fut)
    }

    /// Run `f` synchronously with `self` as the current request context.
    pub fn sync_scope<R>(self: Arc<Self>, f: impl FnOnce() -> R) -> R {
        CURRENT.sync_scope(self, f)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Split an `X-Cloud-Trace-Context` value into trace and span ID.
///
/// Options after the first `;` are ignored. The trace ID ends at the first
/// `/`; a value without `/` has no span ID.
pub fn parse_trace_header(value: &str) -> (&str, &str) {
    let (ids, _) = value.split_once(';').unwrap_or((value, ""));
    ids.split_once('/').unwrap_or((ids, ""))
}

/// Trace attributes in the format Cloud Logging correlates with Cloud Trace.
///
/// Without a project ID the trace can't be expressed as a resource name, so
/// nothing is returned; the same goes for an empty trace ID.
pub fn trace_attrs(project_id: &str, trace_id: &str, span_id: &str) -> Vec<Attr> {
    if project_id.is_empty() || trace_id.is_empty() {
        return Vec::new();
    }
    let trace = format!("projects/{}/traces/{}", project_id, trace_id);
    optional_strings([(TRACE_KEY, trace.as_str()), (SPAN_ID_KEY, span_id)])
}
