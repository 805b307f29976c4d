//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Router, Navigation, ResolvableCache produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, gauges, histograms via `metrics`)
//!
//! Consumers:
//!     → stderr (fmt layer, filtered by RUST_LOG or the configured level)
//!     → whatever recorder the embedding application installs
//! ```
//!
//! # Design Decisions
//! - Library code only emits; installing a subscriber or recorder is the
//!   binary's job
//! - Without an installed recorder every metric call is a no-op

pub mod logging;
pub mod metrics;
