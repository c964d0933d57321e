//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured logging via `tracing`, initialized once in `main`
//! - Metric updates are cheap counters; recording without an installed
//!   recorder is a no-op, so library code can emit unconditionally

pub mod metrics;
