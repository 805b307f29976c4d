//! Navigation subsystem.
//!
//! # Data Flow
//! ```text
//! goto(url) / set_context / refresh
//!     → controller.rs (new generation, Router::start)
//!     → first snapshot, published before goto returns
//!     → spawned task awaits continuations
//!         → each step folded into a snapshot
//!         → observable.rs (delivered only while the generation is current)
//!     → state.rs (Busy → Steady | Errored)
//! ```
//!
//! # Design Decisions
//! - Subscribers see one totally ordered snapshot sequence per navigation
//! - Stale resolutions are ignored at delivery time, never cancelled mid-flight

pub mod controller;
pub mod observable;
pub mod state;

pub use controller::{Navigation, NavigationConfig};
pub use observable::{Publisher, Subscription};
pub use state::NavigationState;
