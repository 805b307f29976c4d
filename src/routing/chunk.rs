//! Chunk model: immutable units of partial route information.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RouteError;
use crate::routing::request::NaviRequest;

/// A tag destined for the document head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadTag {
    /// Element name, e.g. `meta` or `link`.
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl HeadTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            content: None,
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// Kind-specific payload of a chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChunkKind {
    Context { value: Map<String, Value> },
    Headers { headers: BTreeMap<String, String> },
    Status { status: u16 },
    /// `replace` discards data contributed by earlier chunks instead of merging.
    Data { value: Value, replace: bool },
    Title { title: String },
    Head { tags: Vec<HeadTag> },
    View { view: String },
    Redirect { to: String },
    Error { error: RouteError },
}

impl ChunkKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChunkKind::Context { .. } => "context",
            ChunkKind::Headers { .. } => "headers",
            ChunkKind::Status { .. } => "status",
            ChunkKind::Data { .. } => "data",
            ChunkKind::Title { .. } => "title",
            ChunkKind::Head { .. } => "head",
            ChunkKind::View { .. } => "view",
            ChunkKind::Redirect { .. } => "redirect",
            ChunkKind::Error { .. } => "error",
        }
    }
}

/// One unit of route information, tagged with the url it was produced for.
///
/// Only the matched url of the producing request is kept; its params, query
/// and context are not carried.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    /// Matched url of the request that produced this chunk.
    pub url: String,
    #[serde(flatten)]
    pub kind: ChunkKind,
}

impl Chunk {
    pub fn new(request: &NaviRequest, kind: ChunkKind) -> Self {
        Self {
            url: request.matched_url(),
            kind,
        }
    }

    pub fn error(request: &NaviRequest, error: RouteError) -> Self {
        Self::new(request, ChunkKind::Error { error })
    }

    /// Redirect and error chunks end the branch that produced them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            ChunkKind::Redirect { .. } | ChunkKind::Error { .. }
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, ChunkKind::Error { .. })
    }
}
