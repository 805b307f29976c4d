//! Metrics collection.
//!
//! # Metrics
//! - `navigator_resolutions_total` (counter): settled resolutions by route type
//! - `navigator_resolution_seconds` (histogram): time until a route settled
//! - `navigator_cache_hits_total` / `navigator_cache_misses_total` (counter)
//! - `navigator_cache_entries` (gauge): resolvable cache size
//! - `navigator_superseded_snapshots_total` (counter): snapshots dropped
//!   because a newer navigation started
//! - `navigator_crawled_paths_total` (counter): paths visited by crawls
//!
//! # Design Decisions
//! - Plain functions over the `metrics` macros so call sites stay one line
//! - Labels kept to the route type to bound cardinality

use std::time::Instant;

use metrics::{counter, gauge, histogram};

use crate::route::RouteType;

pub fn record_resolution(route_type: RouteType, started: Instant) {
    counter!("navigator_resolutions_total", "type" => route_type.as_str()).increment(1);
    histogram!("navigator_resolution_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_cache_hit() {
    counter!("navigator_cache_hits_total").increment(1);
}

pub fn record_cache_miss() {
    counter!("navigator_cache_misses_total").increment(1);
}

pub fn record_cache_size(entries: usize) {
    gauge!("navigator_cache_entries").set(entries as f64);
}

pub fn record_superseded_snapshot() {
    counter!("navigator_superseded_snapshots_total").increment(1);
}

pub fn record_crawled_path() {
    counter!("navigator_crawled_paths_total").increment(1);
}
