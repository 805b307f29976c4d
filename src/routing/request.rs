//! Request descriptor threaded through matchers.
//!
//! # Responsibilities
//! - Split a raw location into path segments and query parameters
//! - Track which part of the path has been consumed by mounts
//! - Carry the ambient context value down the matcher tree
//!
//! # Design Decisions
//! - Immutable: mounts derive a child request instead of editing the parent
//! - Paths are normalized (no empty segments, no trailing slash)
//! - The context is behind an `Arc` so deriving requests stays cheap

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How much of a route the caller needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Full resolution, including data.
    #[default]
    Get,
    /// Metadata only; lazy data and views are skipped.
    Head,
}

/// A single resolution attempt for one location.
#[derive(Debug, Clone)]
pub struct NaviRequest {
    /// Requested method.
    pub method: Method,
    /// Path consumed by enclosing mounts, without trailing slash ("" at the root).
    pub mount_path: String,
    /// Remaining unmatched path ("" when fully consumed).
    pub path: String,
    /// Parameters captured from `:name` mount segments.
    pub params: BTreeMap<String, String>,
    /// Decoded query parameters.
    pub query: BTreeMap<String, String>,
    /// Ambient context supplied by the caller.
    pub context: Arc<Value>,
    /// The location exactly as it was requested.
    pub original_url: String,
}

impl NaviRequest {
    /// Parse a location such as `/docs/intro?lang=en#top`.
    pub fn parse(url: &str, context: Value) -> Self {
        let without_fragment = url.split('#').next().unwrap_or_default();
        let (path, query) = match without_fragment.split_once('?') {
            Some((path, query)) => (path, query),
            None => (without_fragment, ""),
        };

        let query = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();

        let path = normalize_path(path);
        Self {
            method: Method::Get,
            mount_path: String::new(),
            path: if path == "/" { String::new() } else { path },
            params: BTreeMap::new(),
            query,
            context: Arc::new(context),
            original_url: url.to_string(),
        }
    }

    /// Same request with another method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// The path matched so far, always starting with `/`.
    pub fn matched_url(&self) -> String {
        if self.mount_path.is_empty() {
            "/".to_string()
        } else {
            self.mount_path.clone()
        }
    }

    /// Full normalized path (consumed + remaining), without the query.
    pub fn pathname(&self) -> String {
        let joined = format!("{}{}", self.mount_path, self.path);
        if joined.is_empty() {
            "/".to_string()
        } else {
            joined
        }
    }

    /// Query string re-encoded in key order ("" when there is none).
    pub fn search(&self) -> String {
        if self.query.is_empty() {
            return String::new();
        }
        let encoded: String = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("?{encoded}")
    }

    /// Remaining path split into segments.
    pub fn segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Derive a child request that consumed `count` more segments.
    pub fn consume(&self, count: usize, params: BTreeMap<String, String>) -> Self {
        let segments = self.segments();
        let count = count.min(segments.len());

        let mut mount_path = self.mount_path.clone();
        for segment in &segments[..count] {
            mount_path.push('/');
            mount_path.push_str(segment);
        }
        let rest = &segments[count..];
        let path = if rest.is_empty() {
            String::new()
        } else {
            format!("/{}", rest.join("/"))
        };

        let mut merged = self.params.clone();
        merged.extend(params);

        Self {
            method: self.method,
            mount_path,
            path,
            params: merged,
            query: self.query.clone(),
            context: Arc::clone(&self.context),
            original_url: self.original_url.clone(),
        }
    }

    /// Derive a request located at `segments` below the current mount point.
    ///
    /// Used when enumerating paths, where nothing remains to be consumed.
    pub fn descend(&self, segments: &[&str]) -> Self {
        let mut mount_path = self.mount_path.clone();
        for segment in segments {
            mount_path.push('/');
            mount_path.push_str(segment);
        }
        Self {
            mount_path,
            ..self.clone()
        }
    }

    /// Strip a base path, returning `None` when the request lies outside it.
    pub fn rebase(&self, basename: &str) -> Option<Self> {
        let base: Vec<&str> = basename.split('/').filter(|s| !s.is_empty()).collect();
        let segments = self.segments();
        if segments.len() < base.len() || segments[..base.len()] != base[..] {
            return None;
        }
        Some(self.consume(base.len(), BTreeMap::new()))
    }

    /// Same request with `extra` shallow-merged over the current context.
    pub fn with_merged_context(&self, extra: &Map<String, Value>) -> Self {
        let mut context = match self.context.as_ref() {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        for (key, value) in extra {
            context.insert(key.clone(), value.clone());
        }
        Self {
            context: Arc::new(Value::Object(context)),
            ..self.clone()
        }
    }
}

/// Collapse duplicate slashes and drop any trailing slash.
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Resolve `target` against `base`. Absolute targets and full URLs pass through.
pub fn resolve_target(base: &str, target: &str) -> String {
    if target.starts_with('/') || target.contains("://") {
        return target.to_string();
    }
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for part in target.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

/// True when `target` points outside the application.
pub fn is_external(target: &str) -> bool {
    target.contains("://") || target.starts_with("//")
}
