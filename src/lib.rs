//! Asynchronous route resolution for navigable sites.
//!
//! Matchers are composed into a tree (`compose`, `mount`, alternation), a
//! [`Router`] folds what they produce into [`Route`] snapshots, and a
//! [`Navigation`] keeps the latest snapshot for a changing location.

pub mod config;
pub mod error;
pub mod navigation;
pub mod observability;
pub mod resolvable;
pub mod route;
pub mod routing;

pub use config::SiteConfig;
pub use error::{ResolveError, RouteError, RouterError, RouterResult};
pub use navigation::{Navigation, NavigationConfig, NavigationState, Subscription};
pub use resolvable::{Env, Resolvable};
pub use route::{Route, RouteMap, RouteType, SiteMap};
pub use routing::{builders, Matcher, Mount, NaviRequest, Router, RouterConfig};
