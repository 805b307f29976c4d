//! Matcher composition.
//!
//! # Responsibilities
//! - Evaluate a request into a `Step` of chunks
//! - Sequence matchers (`compose`), mount sub-trees, try alternatives
//! - Enumerate statically reachable paths for crawling
//!
//! # Design Decisions
//! - One enum with four shapes; dispatch is a `match`, not a runtime tag
//! - Evaluation is synchronous; only resolvables suspend
//! - Alternation is strictly in order: a later alternative is evaluated
//!   only once every earlier one has been rejected
//! - An alternative's chunks surface only once it can no longer be
//!   rejected, unless it is the last one

use std::fmt;
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt};

use crate::resolvable::Env;
use crate::routing::chunk::ChunkKind;
use crate::routing::mount::Mount;
use crate::routing::request::NaviRequest;
use crate::routing::step::{join, Step};

/// A unit producing chunks directly, such as a title or a lazily loaded view.
pub trait Producer: Send + Sync + fmt::Debug {
    /// Chunks for `request`, now and later.
    fn produce(&self, request: &NaviRequest, env: &Env) -> Step;

    /// Whether this producer can handle a request with unconsumed path.
    fn accepts_nested(&self) -> bool {
        false
    }

    /// Paths reachable through this producer.
    fn enumerate(&self, request: &NaviRequest, _env: &Env) -> BoxFuture<'static, Vec<String>> {
        future::ready(leaf_paths(request)).boxed()
    }
}

/// A composable routing rule.
#[derive(Clone)]
pub enum Matcher {
    /// Produces chunks itself.
    Terminal(Arc<dyn Producer>),
    /// Members evaluated left to right, outermost first.
    Sequence(Arc<[Matcher]>),
    /// Delegates to the child whose pattern matches the path.
    Mount(Arc<Mount>),
    /// First alternative that is not rejected wins.
    Alternation(Arc<[Matcher]>),
}

impl Matcher {
    pub fn terminal(producer: impl Producer + 'static) -> Self {
        Matcher::Terminal(Arc::new(producer))
    }

    /// Stack matchers; the leftmost is the outermost.
    pub fn compose(matchers: impl IntoIterator<Item = Matcher>) -> Self {
        let mut matchers: Vec<Matcher> = matchers.into_iter().collect();
        if matchers.len() == 1 {
            return matchers.remove(0);
        }
        Matcher::Sequence(matchers.into())
    }

    pub fn mount(mount: Mount) -> Self {
        Matcher::Mount(Arc::new(mount))
    }

    /// Try `matchers` in declared order.
    pub fn alternation(matchers: impl IntoIterator<Item = Matcher>) -> Self {
        Matcher::Alternation(matchers.into_iter().collect::<Vec<_>>().into())
    }

    /// Evaluate against `request`.
    pub fn evaluate(&self, request: &NaviRequest, env: &Env) -> Step {
        match self {
            Matcher::Terminal(producer) => producer.produce(request, env),
            Matcher::Sequence(members) => evaluate_sequence(members, request, env),
            Matcher::Mount(mount) => mount.evaluate(request, env),
            Matcher::Alternation(options) => {
                alternate(Arc::clone(options), 0, request.clone(), env.clone())
            }
        }
    }

    /// Whether this matcher consumes path below its own mount point.
    pub fn accepts_nested(&self) -> bool {
        match self {
            Matcher::Terminal(producer) => producer.accepts_nested(),
            Matcher::Sequence(members) => members.iter().any(Matcher::accepts_nested),
            Matcher::Mount(_) => true,
            Matcher::Alternation(options) => options.iter().any(Matcher::accepts_nested),
        }
    }

    /// Every statically reachable path below `request`, unsorted.
    pub fn enumerate(&self, request: &NaviRequest, env: &Env) -> BoxFuture<'static, Vec<String>> {
        match self {
            Matcher::Terminal(producer) => producer.enumerate(request, env),
            Matcher::Sequence(members) => match members.iter().find(|m| m.accepts_nested()) {
                Some(nested) => nested.enumerate(request, env),
                None => future::ready(leaf_paths(request)).boxed(),
            },
            Matcher::Mount(mount) => mount.enumerate(request, env),
            Matcher::Alternation(options) => {
                let all: Vec<_> = options.iter().map(|m| m.enumerate(request, env)).collect();
                async move {
                    let mut paths: Vec<String> =
                        future::join_all(all).await.into_iter().flatten().collect();
                    paths.sort();
                    paths.dedup();
                    paths
                }
                .boxed()
            }
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Terminal(producer) => f.debug_tuple("Terminal").field(producer).finish(),
            Matcher::Sequence(members) => f.debug_tuple("Sequence").field(members).finish(),
            Matcher::Mount(mount) => f.debug_tuple("Mount").field(mount).finish(),
            Matcher::Alternation(options) => f.debug_tuple("Alternation").field(options).finish(),
        }
    }
}

/// The request's own url when nothing is left to match, otherwise nothing.
pub(crate) fn leaf_paths(request: &NaviRequest) -> Vec<String> {
    if request.path.is_empty() {
        vec![request.matched_url()]
    } else {
        Vec::new()
    }
}

/// Evaluate members in order, forwarding synchronously known context.
fn evaluate_sequence(members: &[Matcher], request: &NaviRequest, env: &Env) -> Step {
    let mut steps = Vec::with_capacity(members.len());
    let mut request = request.clone();

    for member in members {
        let step = member.evaluate(&request, env);
        let settled_terminal = !step.is_pending() && step.has_terminal_chunk();

        for chunk in &step.chunks {
            if let ChunkKind::Context { value } = &chunk.kind {
                request = request.with_merged_context(value);
            }
        }

        steps.push(step);
        if settled_terminal {
            // Nothing after a settled redirect or error can contribute
            break;
        }
    }
    join(steps)
}

fn alternate(options: Arc<[Matcher]>, index: usize, request: NaviRequest, env: Env) -> Step {
    match options.get(index) {
        Some(option) => {
            let step = option.evaluate(&request, &env);
            settle_alternative(options, index, request, env, step)
        }
        None => Step::empty(),
    }
}

fn settle_alternative(
    options: Arc<[Matcher]>,
    index: usize,
    request: NaviRequest,
    env: Env,
    step: Step,
) -> Step {
    if step.is_rejected() && index + 1 < options.len() {
        tracing::debug!(
            url = %request.pathname(),
            alternative = index,
            "Alternative rejected, trying next"
        );
        return alternate(options, index + 1, request, env);
    }

    let Step { chunks, next } = step;
    // Hidden while a later alternative could still replace them
    let may_fall_through = index + 1 < options.len();
    match next {
        None => Step::done(chunks),
        Some(next) => Step::pending(
            if may_fall_through { Vec::new() } else { chunks },
            async move {
                let step = next.await;
                settle_alternative(options, index, request, env, step)
            }
            .boxed(),
        ),
    }
}
