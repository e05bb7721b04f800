//! Alert sinks for operational failures.

mod tracing_sink;

pub use tracing_sink::TracingAuditAlertSink;
