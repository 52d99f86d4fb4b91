//! adscope: Ad Lifecycle Tracing and Session Metrics
//!
//! Traces each ad from request to its terminal event as a transaction with
//! child spans, aggregates session-level ad metrics, and routes both to
//! pluggable telemetry sinks.

pub mod cli;
pub mod config;
pub mod error;
pub mod instrumentation;
pub mod lifecycle;
pub mod logging;
pub mod metrics;
pub mod telemetry;
