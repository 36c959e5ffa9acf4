//! W3C Trace Context propagation for calls to the case API.
//!
//! See: https://www.w3.org/TR/trace-context/

use opentelemetry::trace::TraceContextExt;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Header name for W3C traceparent
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Header name for W3C tracestate
pub const TRACESTATE_HEADER: &str = "tracestate";

/// Header name for request correlation ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Headers correlating one API call: the current span's trace context plus
/// the call's request id.
///
/// A call replayed after a token refresh reuses its request id, so both
/// attempts show up under the same id in backend logs.
pub fn correlation_headers(request_id: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let context = Span::current().context();
    let span_context = context.span().span_context().clone();
    if span_context.is_valid() {
        // version-trace_id-span_id-trace_flags
        let traceparent = format!(
            "00-{}-{}-{:02x}",
            span_context.trace_id(),
            span_context.span_id(),
            span_context.trace_flags().to_u8()
        );
        if let Ok(value) = HeaderValue::from_str(&traceparent) {
            headers.insert(TRACEPARENT_HEADER, value);
        }

        let tracestate = span_context.trace_state().header();
        if !tracestate.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&tracestate) {
                headers.insert(TRACESTATE_HEADER, value);
            }
        }
    }

    if let Ok(value) = HeaderValue::from_str(request_id) {
        headers.insert(REQUEST_ID_HEADER, value);
    }

    headers
}
