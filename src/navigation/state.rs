//! Navigation state machine.
//!
//! # States
//! - NotStarted: no location requested yet
//! - Busy: a resolution for the current location is in flight
//! - Steady: the current location settled on a ready or redirect route
//! - Errored: the current location settled on an error route
//!
//! # State Transitions
//! ```text
//! NotStarted → Busy: first location requested
//! Busy → Steady | Errored: the fold reaches a terminal route (exactly once)
//! Steady | Errored → Busy: location or context changes, or a refresh
//! Busy → Busy: superseded by a newer location before settling
//! ```
//!
//! # Design Decisions
//! - A followed redirect keeps the navigation Busy until its destination settles
//! - Transitions are logged for observability

use serde::Serialize;

use crate::route::{Route, RouteType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationState {
    #[default]
    NotStarted,
    Busy,
    Steady,
    Errored,
}

impl NavigationState {
    /// State reached once `route` is the terminal route for the location.
    pub fn settled_on(route: &Route) -> Self {
        match route.route_type {
            RouteType::Error => NavigationState::Errored,
            RouteType::Busy => NavigationState::Busy,
            RouteType::Ready | RouteType::Redirect => NavigationState::Steady,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, NavigationState::Steady | NavigationState::Errored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::default_route_reducer;

    #[test]
    fn test_settled_on() {
        let ready = default_route_reducer("/", &[], false);
        assert_eq!(NavigationState::settled_on(&ready), NavigationState::Steady);

        let busy = default_route_reducer("/", &[], true);
        assert_eq!(NavigationState::settled_on(&busy), NavigationState::Busy);
        assert!(!NavigationState::Busy.is_settled());
        assert!(NavigationState::Errored.is_settled());
    }
}
