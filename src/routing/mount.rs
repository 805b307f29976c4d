//! Path-prefix mounting of child matchers.
//!
//! # Responsibilities
//! - Match the remaining path against declared patterns
//! - Capture `:param` segments
//! - Derive the child request and delegate to the child matcher
//!
//! # Design Decisions
//! - Most specific pattern wins: more segments first, then more literal
//!   segments, then declaration order
//! - A pattern only matches a longer path when its child can consume the
//!   rest (it is itself a mount or wraps one); leaves need an exact match
//! - An unmatched path yields a NOT_FOUND error chunk, never a panic

use std::collections::BTreeMap;
use std::fmt;

use futures_util::future::{self, BoxFuture, FutureExt};

use crate::error::RouteError;
use crate::resolvable::Env;
use crate::routing::chunk::Chunk;
use crate::routing::matcher::Matcher;
use crate::routing::request::{normalize_path, NaviRequest};
use crate::routing::step::Step;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

struct MountRoute {
    pattern: String,
    segments: Vec<Segment>,
    matcher: Matcher,
}

impl MountRoute {
    fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    fn is_static(&self) -> bool {
        self.segments.iter().all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Captured params if this route matches `segments`.
    fn matches(&self, segments: &[&str]) -> Option<BTreeMap<String, String>> {
        if self.segments.len() > segments.len() {
            return None;
        }
        if self.segments.len() < segments.len() && !self.matcher.accepts_nested() {
            return None;
        }

        let mut params = BTreeMap::new();
        for (expected, actual) in self.segments.iter().zip(segments) {
            match expected {
                Segment::Literal(literal) if literal == actual => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), (*actual).to_string());
                }
            }
        }
        Some(params)
    }
}

/// Patterns mapped to child matchers.
pub struct Mount {
    routes: Vec<MountRoute>,
}

impl Mount {
    /// Build a mount from `(pattern, matcher)` pairs.
    pub fn new<P>(routes: impl IntoIterator<Item = (P, Matcher)>) -> Self
    where
        P: Into<String>,
    {
        let mut routes: Vec<MountRoute> = routes
            .into_iter()
            .map(|(pattern, matcher)| {
                let pattern = normalize_path(&pattern.into());
                let segments = parse_pattern(&pattern);
                MountRoute {
                    pattern,
                    segments,
                    matcher,
                }
            })
            .collect();

        // Stable sort keeps declaration order among equally specific patterns
        routes.sort_by(|a, b| {
            b.segments
                .len()
                .cmp(&a.segments.len())
                .then_with(|| b.literal_count().cmp(&a.literal_count()))
        });
        Self { routes }
    }

    /// Declared patterns, most specific first.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.pattern.as_str())
    }

    /// Pick the child for `request`, returning the derived child request.
    pub fn find(&self, request: &NaviRequest) -> Option<(&Matcher, NaviRequest)> {
        let segments = request.segments();
        self.routes.iter().find_map(|route| {
            route.matches(&segments).map(|params| {
                let child = request.consume(route.segments.len(), params);
                (&route.matcher, child)
            })
        })
    }

    pub fn evaluate(&self, request: &NaviRequest, env: &Env) -> Step {
        match self.find(request) {
            Some((matcher, child)) => matcher.evaluate(&child, env),
            None => {
                tracing::debug!(
                    url = %request.pathname(),
                    remaining = %request.path,
                    "No mount pattern matched"
                );
                Step::done(vec![Chunk::error(
                    request,
                    RouteError::NotFound {
                        url: request.pathname(),
                    },
                )])
            }
        }
    }

    /// Enumerate every path reachable through static patterns.
    pub fn enumerate(&self, request: &NaviRequest, env: &Env) -> BoxFuture<'static, Vec<String>> {
        if !request.path.is_empty() {
            return match self.find(request) {
                Some((matcher, child)) => matcher.enumerate(&child, env),
                None => future::ready(Vec::new()).boxed(),
            };
        }

        let mut children = Vec::with_capacity(self.routes.len());
        for route in &self.routes {
            if !route.is_static() {
                tracing::trace!(pattern = %route.pattern, "Skipping parameterized pattern");
                continue;
            }
            let literals: Vec<&str> = route
                .segments
                .iter()
                .filter_map(|s| match s {
                    Segment::Literal(literal) => Some(literal.as_str()),
                    Segment::Param(_) => None,
                })
                .collect();
            children.push(route.matcher.enumerate(&request.descend(&literals), env));
        }

        async move { future::join_all(children).await.into_iter().flatten().collect() }.boxed()
    }
}

impl fmt::Debug for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.routes.iter().map(|r| (&r.pattern, &r.matcher)))
            .finish()
    }
}

fn parse_pattern(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix(':') {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Literal(s.to_string()),
        })
        .collect()
}
