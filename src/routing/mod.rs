//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Location (path, query, context)
//!     → request.rs (NaviRequest)
//!     → router.rs (basename, root matcher)
//!     → matcher.rs (sequence / mount / alternation)
//!         → mount.rs (prefix match, child request)
//!         → builders.rs (terminal producers, resolvables)
//!     → step.rs (chunks now + continuation)
//!     → route::reducer (Route snapshot)
//!
//! Crawl:
//!     roots → Matcher::enumerate (static patterns only)
//!     → resolve each path, follow redirects
//!     → SiteMap
//! ```
//!
//! # Design Decisions
//! - Matchers are built once and immutable afterwards
//! - Evaluation is synchronous up to the first resolvable that is not ready
//! - Deterministic: the same request against the same cache yields the same chunks

pub mod builders;
pub mod chunk;
pub mod matcher;
pub mod mount;
pub mod request;
pub mod router;
pub mod step;

pub use chunk::{Chunk, ChunkKind, HeadTag};
pub use matcher::{Matcher, Producer};
pub use mount::Mount;
pub use request::{Method, NaviRequest};
pub use router::{Router, RouterConfig};
pub use step::Step;
