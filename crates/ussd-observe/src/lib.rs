//! Observability setup for the USSD service: structured logging and optional
//! OpenTelemetry trace export.

pub mod tracing_setup;
