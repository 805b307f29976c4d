//! Crawl output.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::route::{Route, RouteType};

/// Every reachable path with its settled route, plus the redirects followed on the way.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SiteMap {
    pub routes: BTreeMap<String, Route>,
    /// Source path to the destination its redirect chain ends at.
    pub redirects: BTreeMap<String, String>,
}

impl SiteMap {
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Paths whose route settled on an error.
    pub fn errors(&self) -> impl Iterator<Item = (&str, &Route)> {
        self.routes
            .iter()
            .filter(|(_, route)| route.route_type == RouteType::Error)
            .map(|(path, route)| (path.as_str(), route))
    }
}

/// Metadata-only view of a route, as produced by a `Head` crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
    #[serde(rename = "type")]
    pub route_type: RouteType,
    pub title: Option<String>,
    pub status: u16,
    pub redirect_to: Option<String>,
}

impl From<&Route> for RouteSummary {
    fn from(route: &Route) -> Self {
        Self {
            route_type: route.route_type,
            title: route.title.clone(),
            status: route.status,
            redirect_to: route.redirect_to.clone(),
        }
    }
}

/// Reachable paths with their metadata.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RouteMap {
    pub routes: BTreeMap<String, RouteSummary>,
    pub redirects: BTreeMap<String, String>,
}

impl From<&SiteMap> for RouteMap {
    fn from(site_map: &SiteMap) -> Self {
        Self {
            routes: site_map
                .routes
                .iter()
                .map(|(path, route)| (path.clone(), RouteSummary::from(route)))
                .collect(),
            redirects: site_map.redirects.clone(),
        }
    }
}
