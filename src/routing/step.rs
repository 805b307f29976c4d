//! Resumable chunk production.
//!
//! # States
//! - Pending: chunks available now plus a continuation for the next step
//! - Done: final chunks, nothing further will arrive
//!
//! # State Transitions
//! ```text
//! Pending(chunks, next) → next.await → Pending(..) | Done(..)
//! ```
//!
//! # Design Decisions
//! - Every step carries the full chunk list known so far, not a delta, so a
//!   snapshot can be folded from any single step
//! - Continuations are plain boxed futures; dropping one is how a caller
//!   stops listening
//! - Sequences join member steps and advance whichever member settles first

use std::collections::BTreeSet;
use std::fmt;

use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{FuturesUnordered, StreamExt};

use crate::routing::chunk::Chunk;

/// Future yielding the next step of a resolution.
pub type Continuation = BoxFuture<'static, Step>;

/// Chunks available now, and how to get more.
pub struct Step {
    pub chunks: Vec<Chunk>,
    pub next: Option<Continuation>,
}

impl Step {
    /// A step with nothing further to wait for.
    pub fn done(chunks: Vec<Chunk>) -> Self {
        Self { chunks, next: None }
    }

    pub fn pending(chunks: Vec<Chunk>, next: Continuation) -> Self {
        Self {
            chunks,
            next: Some(next),
        }
    }

    /// A finished step without chunks.
    pub fn empty() -> Self {
        Self::done(Vec::new())
    }

    pub fn is_pending(&self) -> bool {
        self.next.is_some()
    }

    pub fn has_terminal_chunk(&self) -> bool {
        self.chunks.iter().any(Chunk::is_terminal)
    }

    /// Settled without chunks, or settled on an error.
    pub fn is_rejected(&self) -> bool {
        !self.is_pending() && (self.chunks.is_empty() || self.chunks.iter().any(Chunk::is_error))
    }

    /// Drive continuations until the final step.
    pub async fn settle(mut self) -> Vec<Chunk> {
        while let Some(next) = self.next.take() {
            self = next.await;
        }
        self.chunks
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("chunks", &self.chunks)
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// Join member steps of a sequence in order.
///
/// Chunks are concatenated member by member and cut after the first
/// terminal chunk. Members after that cut no longer matter, so their
/// continuations are dropped.
pub fn join(steps: Vec<Step>) -> Step {
    let mut joined = Joined {
        parts: Vec::with_capacity(steps.len()),
        waiting: BTreeSet::new(),
        pending: FuturesUnordered::new(),
    };
    for (index, step) in steps.into_iter().enumerate() {
        joined.insert(index, step);
    }
    joined.into_step()
}

struct Joined {
    parts: Vec<Vec<Chunk>>,
    waiting: BTreeSet<usize>,
    pending: FuturesUnordered<BoxFuture<'static, (usize, Step)>>,
}

impl Joined {
    fn insert(&mut self, index: usize, step: Step) {
        if index == self.parts.len() {
            self.parts.push(step.chunks);
        } else {
            self.parts[index] = step.chunks;
        }
        if let Some(next) = step.next {
            self.waiting.insert(index);
            self.pending.push(next.map(move |step| (index, step)).boxed());
        }
    }

    fn into_step(mut self) -> Step {
        let cutoff = self
            .parts
            .iter()
            .position(|part| part.iter().any(Chunk::is_terminal));

        let mut chunks = Vec::new();
        for part in &self.parts[..cutoff.map_or(self.parts.len(), |c| c + 1)] {
            for chunk in part {
                chunks.push(chunk.clone());
                if chunk.is_terminal() {
                    break;
                }
            }
        }

        let relevant = match cutoff {
            Some(cutoff) => self.waiting.iter().any(|&index| index < cutoff),
            None => !self.waiting.is_empty(),
        };
        if !relevant {
            return Step::done(chunks);
        }

        Step::pending(
            chunks,
            async move {
                match self.pending.next().await {
                    Some((index, step)) => {
                        self.waiting.remove(&index);
                        self.insert(index, step);
                    }
                    None => self.waiting.clear(),
                }
                self.into_step()
            }
            .boxed(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::chunk::ChunkKind;
    use crate::routing::request::NaviRequest;
    use serde_json::Value;
    use tokio::sync::oneshot;

    fn title(text: &str) -> Chunk {
        let req = NaviRequest::parse("/", Value::Null);
        Chunk::new(&req, ChunkKind::Title { title: text.into() })
    }

    fn redirect(to: &str) -> Chunk {
        let req = NaviRequest::parse("/", Value::Null);
        Chunk::new(&req, ChunkKind::Redirect { to: to.into() })
    }

    fn titles(chunks: &[Chunk]) -> Vec<String> {
        chunks
            .iter()
            .filter_map(|c| match &c.kind {
                ChunkKind::Title { title } => Some(title.clone()),
                _ => None,
            })
            .collect()
    }

    fn later(rx: oneshot::Receiver<Vec<Chunk>>) -> Continuation {
        async move { Step::done(rx.await.unwrap_or_default()) }.boxed()
    }

    #[test]
    fn test_join_concatenates_in_order() {
        let step = join(vec![
            Step::done(vec![title("a")]),
            Step::done(vec![title("b"), title("c")]),
        ]);
        assert!(!step.is_pending());
        assert_eq!(titles(&step.chunks), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_join_cuts_after_terminal_chunk() {
        let (_tx, rx) = oneshot::channel();
        let step = join(vec![
            Step::done(vec![title("a"), redirect("/login"), title("ignored")]),
            Step::pending(vec![title("b")], later(rx)),
        ]);
        // The pending member sits after the redirect, so nothing is left to wait for
        assert!(!step.is_pending());
        assert_eq!(step.chunks.len(), 2);
        assert!(step.chunks[1].is_terminal());
    }

    #[tokio::test]
    async fn test_join_keeps_order_when_early_member_settles_late() {
        let (tx, rx) = oneshot::channel();
        let step = join(vec![
            Step::pending(vec![], later(rx)),
            Step::done(vec![title("leaf")]),
        ]);
        assert!(step.is_pending());
        assert_eq!(titles(&step.chunks), vec!["leaf"]);

        tx.send(vec![title("layout")]).unwrap();
        let chunks = step.settle().await;
        assert_eq!(titles(&chunks), vec!["layout", "leaf"]);
    }

    #[test]
    fn test_rejected() {
        assert!(Step::empty().is_rejected());
        assert!(!Step::done(vec![title("a")]).is_rejected());
        let (_tx, rx) = oneshot::channel();
        assert!(!Step::pending(vec![], later(rx)).is_rejected());
    }
}
