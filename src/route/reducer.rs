//! Folding chunks into a `Route`.
//!
//! # Fold Rules
//! - title, status, view: last chunk wins
//! - context, headers: merged, later keys override earlier ones
//! - data: shallow merge of objects, unless a chunk replaces wholesale
//! - head: tags accumulate in traversal order
//! - redirect, error: stop the fold; data and view are dropped
//!
//! # Route Type
//! ```text
//! still pending            → Busy
//! settled on a redirect    → Redirect
//! settled on an error      → Error
//! settled otherwise        → Ready
//! ```
//!
//! # Design Decisions
//! - Pure function of its inputs, so re-running it yields the same route
//! - A terminal chunk seen while earlier members are still pending keeps the
//!   route Busy: an earlier member may still end the fold first

use serde_json::Value;

use crate::error::RouteError;
use crate::route::{Route, RouteType};
use crate::routing::chunk::{Chunk, ChunkKind};

/// Signature of a route reducer.
pub type RouteReducer = fn(url: &str, chunks: &[Chunk], pending: bool) -> Route;

/// Fold `chunks` produced for `url` into a route.
pub fn default_route_reducer(url: &str, chunks: &[Chunk], pending: bool) -> Route {
    let mut route = Route {
        route_type: RouteType::Ready,
        url: url.to_string(),
        title: None,
        status: 200,
        headers: Default::default(),
        context: Default::default(),
        data: Value::Null,
        head: Vec::new(),
        view: None,
        redirect_to: None,
        error: None,
        chunks: Vec::with_capacity(chunks.len()),
    };
    let mut explicit_status = None;

    for chunk in chunks {
        match &chunk.kind {
            ChunkKind::Context { value } => {
                for (key, value) in value {
                    route.context.insert(key.clone(), value.clone());
                }
            }
            ChunkKind::Headers { headers } => {
                route.headers.extend(headers.clone());
            }
            ChunkKind::Status { status } => explicit_status = Some(*status),
            ChunkKind::Data { value, replace } => merge_data(&mut route.data, value, *replace),
            ChunkKind::Title { title } => route.title = Some(title.clone()),
            ChunkKind::Head { tags } => route.head.extend(tags.iter().cloned()),
            ChunkKind::View { view } => route.view = Some(view.clone()),
            ChunkKind::Redirect { to } => route.redirect_to = Some(to.clone()),
            ChunkKind::Error { error } => route.error = Some(error.clone()),
        }
        route.chunks.push(chunk.clone());
        if chunk.is_terminal() {
            break;
        }
    }

    route.route_type = if pending {
        RouteType::Busy
    } else if route.error.is_some() {
        RouteType::Error
    } else if route.redirect_to.is_some() {
        RouteType::Redirect
    } else {
        RouteType::Ready
    };

    if matches!(route.route_type, RouteType::Redirect | RouteType::Error) {
        route.data = Value::Null;
        route.view = None;
        route
            .chunks
            .retain(|c| !matches!(c.kind, ChunkKind::Data { .. } | ChunkKind::View { .. }));
    }

    route.status = match (route.route_type, &route.error) {
        (RouteType::Error, Some(error)) => error.status(),
        (RouteType::Redirect, _) => explicit_status.filter(|s| (300..400).contains(s)).unwrap_or(302),
        _ => explicit_status.unwrap_or(200),
    };
    route
}

/// Fold a settled-or-pending chunk list, flagging traversals that produced nothing.
pub(crate) fn snapshot(
    reducer: RouteReducer,
    url: &str,
    mut chunks: Vec<Chunk>,
    pending: bool,
) -> Route {
    if chunks.is_empty() && !pending {
        tracing::warn!(url, "Resolution settled without any chunk");
        chunks.push(Chunk {
            url: url.to_string(),
            kind: ChunkKind::Error {
                error: RouteError::ContractViolation {
                    url: url.to_string(),
                },
            },
        });
    }
    reducer(url, &chunks, pending)
}

fn merge_data(current: &mut Value, incoming: &Value, replace: bool) {
    match (current, incoming) {
        (Value::Object(existing), Value::Object(fields)) if !replace => {
            for (key, value) in fields {
                existing.insert(key.clone(), value.clone());
            }
        }
        (current, incoming) => *current = incoming.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::chunk::HeadTag;
    use crate::routing::request::NaviRequest;
    use serde_json::{json, Map};
    use std::collections::BTreeMap;

    fn chunk(kind: ChunkKind) -> Chunk {
        Chunk::new(&NaviRequest::parse("/", Value::Null), kind)
    }

    fn headers(pairs: &[(&str, &str)]) -> ChunkKind {
        ChunkKind::Headers {
            headers: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_last_wins_and_merges() {
        let mut outer_ctx = Map::new();
        outer_ctx.insert("theme".into(), json!("dark"));
        outer_ctx.insert("lang".into(), json!("en"));
        let mut inner_ctx = Map::new();
        inner_ctx.insert("lang".into(), json!("fr"));

        let chunks = vec![
            chunk(ChunkKind::Title { title: "Site".into() }),
            chunk(ChunkKind::Context { value: outer_ctx }),
            chunk(headers(&[("cache-control", "no-store"), ("x-a", "1")])),
            chunk(ChunkKind::Data { value: json!({"a": 1, "b": 1}), replace: false }),
            chunk(ChunkKind::Title { title: "Page".into() }),
            chunk(ChunkKind::Context { value: inner_ctx }),
            chunk(headers(&[("x-a", "2")])),
            chunk(ChunkKind::Data { value: json!({"b": 2}), replace: false }),
            chunk(ChunkKind::Status { status: 201 }),
            chunk(ChunkKind::View { view: "page".into() }),
        ];

        let route = default_route_reducer("/page", &chunks, false);
        assert_eq!(route.route_type, RouteType::Ready);
        assert_eq!(route.title.as_deref(), Some("Page"));
        assert_eq!(route.status, 201);
        assert_eq!(route.context["theme"], "dark");
        assert_eq!(route.context["lang"], "fr");
        assert_eq!(route.headers["cache-control"], "no-store");
        assert_eq!(route.headers["x-a"], "2");
        assert_eq!(route.data, json!({"a": 1, "b": 2}));
        assert_eq!(route.view.as_deref(), Some("page"));
        assert_eq!(route.chunks.len(), chunks.len());
    }

    #[test]
    fn test_replace_data() {
        let chunks = vec![
            chunk(ChunkKind::Data { value: json!({"a": 1}), replace: false }),
            chunk(ChunkKind::Data { value: json!({"b": 2}), replace: true }),
        ];
        let route = default_route_reducer("/", &chunks, false);
        assert_eq!(route.data, json!({"b": 2}));
    }

    #[test]
    fn test_redirect_short_circuits() {
        let chunks = vec![
            chunk(ChunkKind::Data { value: json!({"a": 1}), replace: false }),
            chunk(ChunkKind::Redirect { to: "/login".into() }),
            chunk(ChunkKind::View { view: "ignored".into() }),
        ];
        let route = default_route_reducer("/account", &chunks, false);
        assert_eq!(route.route_type, RouteType::Redirect);
        assert_eq!(route.redirect_to.as_deref(), Some("/login"));
        assert_eq!(route.status, 302);
        assert_eq!(route.data, Value::Null);
        assert!(route.view.is_none());
        assert!(route
            .chunks
            .iter()
            .all(|c| !matches!(c.kind, ChunkKind::Data { .. } | ChunkKind::View { .. })));
    }

    #[test]
    fn test_error_short_circuits() {
        let chunks = vec![
            chunk(ChunkKind::Title { title: "Kept".into() }),
            chunk(ChunkKind::Error { error: RouteError::NotFound { url: "/x".into() } }),
            chunk(ChunkKind::Title { title: "Ignored".into() }),
        ];
        let route = default_route_reducer("/x", &chunks, false);
        assert_eq!(route.route_type, RouteType::Error);
        assert_eq!(route.status, 404);
        assert_eq!(route.title.as_deref(), Some("Kept"));
        assert_eq!(route.chunks.len(), 2);
    }

    #[test]
    fn test_pending_is_busy() {
        let chunks = vec![chunk(ChunkKind::Title { title: "Loading".into() })];
        let route = default_route_reducer("/", &chunks, true);
        assert_eq!(route.route_type, RouteType::Busy);
        assert!(!route.is_settled());

        let route = default_route_reducer("/", &[], true);
        assert_eq!(route.route_type, RouteType::Busy);
    }

    #[test]
    fn test_fold_is_idempotent() {
        let chunks = vec![
            chunk(ChunkKind::Head { tags: vec![HeadTag::new("meta").attr("name", "a")] }),
            chunk(ChunkKind::Head { tags: vec![HeadTag::new("link").attr("rel", "icon")] }),
            chunk(ChunkKind::Data { value: json!([1, 2]), replace: false }),
        ];
        let first = default_route_reducer("/", &chunks, false);
        let second = default_route_reducer("/", &chunks, false);
        assert_eq!(first, second);
        assert_eq!(first.head.len(), 2);
        assert_eq!(first.data, json!([1, 2]));
    }

    #[test]
    fn test_empty_settled_snapshot_is_contract_violation() {
        let route = snapshot(default_route_reducer, "/void", Vec::new(), false);
        assert_eq!(route.route_type, RouteType::Error);
        assert_eq!(
            route.error,
            Some(RouteError::ContractViolation { url: "/void".into() })
        );
    }
}
