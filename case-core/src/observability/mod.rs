pub mod logging;
pub mod metrics;
pub mod trace_context;

pub use logging::{init_tracing, shutdown_tracing};
pub use trace_context::{correlation_headers, REQUEST_ID_HEADER, TRACEPARENT_HEADER};
