//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! site file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SiteConfig (validated, immutable)
//!     → build.rs (route tree → Matcher, engine section → Router)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod build;
pub mod loader;
pub mod schema;
pub mod validation;

pub use build::{build_matcher, build_router};
pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{EngineConfig, ObservabilityConfig, RouteConfig, SiteConfig};
pub use validation::{validate_config, ValidationError};
