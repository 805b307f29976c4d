//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a site.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::navigation::NavigationConfig;
use crate::routing::chunk::HeadTag;
use crate::routing::router::RouterConfig;

/// Root configuration for a site.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SiteConfig {
    /// Resolution engine settings.
    pub engine: EngineConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,

    /// Declarative route tree mounted at the basename.
    pub routes: Vec<RouteConfig>,
}

/// Resolution engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path the route tree is mounted below.
    pub basename: String,

    /// Maximum number of memoized resolvable computations.
    pub cache_capacity: usize,

    /// Follow internal redirects during navigation.
    pub follow_redirects: bool,

    /// Redirect hops followed per navigation.
    pub max_redirects: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            basename: "/".to_string(),
            cache_capacity: 256,
            follow_redirects: true,
            max_redirects: 8,
        }
    }
}

impl EngineConfig {
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            basename: self.basename.clone(),
            cache_capacity: self.cache_capacity,
        }
    }

    pub fn navigation_config(&self) -> NavigationConfig {
        NavigationConfig {
            follow_redirects: self.follow_redirects,
            max_redirects: self.max_redirects,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Level used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// One node of the route tree.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Pattern relative to the parent, e.g. "/docs" or "/users/:id".
    pub path: String,

    pub title: Option<String>,

    /// Explicit status code.
    pub status: Option<u16>,

    /// View reference handed to the renderer.
    pub view: Option<String>,

    /// Redirect target, relative to this route when not absolute.
    pub redirect: Option<String>,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub head: Vec<HeadTag>,

    /// Context merged for this route and its children.
    #[serde(default)]
    pub context: Map<String, Value>,

    pub data: Option<Value>,

    /// Child routes mounted below this one.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

impl RouteConfig {
    /// True when this route would contribute at least one chunk.
    pub fn has_content(&self) -> bool {
        self.title.is_some()
            || self.status.is_some()
            || self.view.is_some()
            || self.redirect.is_some()
            || self.data.is_some()
            || !self.headers.is_empty()
            || !self.head.is_empty()
            || !self.context.is_empty()
            || !self.routes.is_empty()
    }
}
