//! Route snapshots and crawl output.
//!
//! # Data Flow
//! ```text
//! Step (chunks so far, pending?)
//!     → reducer.rs (fold chunks, derive route type)
//!     → Route snapshot
//!
//! Crawl:
//!     every reachable path → settled Route
//!     → maps.rs (SiteMap, RouteMap)
//! ```

pub mod maps;
pub mod reducer;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RouteError;
use crate::routing::chunk::{Chunk, HeadTag};

pub use maps::{RouteMap, RouteSummary, SiteMap};
pub use reducer::{default_route_reducer, RouteReducer};

/// Where a route is in its resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteType {
    Ready,
    Redirect,
    Busy,
    Error,
}

impl RouteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteType::Ready => "ready",
            RouteType::Redirect => "redirect",
            RouteType::Busy => "busy",
            RouteType::Error => "error",
        }
    }
}

/// Folded view of every chunk applicable to a request at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    #[serde(rename = "type")]
    pub route_type: RouteType,
    /// The requested path.
    pub url: String,
    pub title: Option<String>,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub context: Map<String, Value>,
    /// `Null` when no data chunk contributed.
    pub data: Value,
    pub head: Vec<HeadTag>,
    pub view: Option<String>,
    pub redirect_to: Option<String>,
    pub error: Option<RouteError>,
    /// Chunks that contributed, in traversal order.
    pub chunks: Vec<Chunk>,
}

impl Route {
    /// True once no further snapshot will follow for this request.
    pub fn is_settled(&self) -> bool {
        self.route_type != RouteType::Busy
    }
}
