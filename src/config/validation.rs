//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check route patterns (leading slash, named params, no duplicate siblings)
//! - Reject routes that cannot resolve (empty leaves, redirects with content)
//! - Validate value ranges (status codes, cache capacity)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SiteConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::{RouteConfig, SiteConfig};
use crate::routing::request::normalize_path;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem, located by config path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Where the problem is, e.g. `engine.cache_capacity` or `routes /docs/intro`.
    pub location: String,
    pub message: String,
}

impl ValidationError {
    fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

pub fn validate_config(config: &SiteConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.engine.cache_capacity == 0 {
        errors.push(ValidationError::new(
            "engine.cache_capacity",
            "must be greater than 0",
        ));
    }
    if !config.engine.basename.starts_with('/') {
        errors.push(ValidationError::new(
            "engine.basename",
            format!("'{}' must start with '/'", config.engine.basename),
        ));
    }
    if !LOG_LEVELS.contains(&config.observability.log_level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    validate_routes(&config.routes, "", &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_routes(routes: &[RouteConfig], parent: &str, errors: &mut Vec<ValidationError>) {
    let mut siblings = HashSet::new();

    for route in routes {
        let location = if parent.is_empty() {
            format!("routes {}", route.path)
        } else {
            format!("routes {}/{}", parent, route.path.trim_start_matches('/'))
        };

        if !route.path.starts_with('/') {
            errors.push(ValidationError::new(&location, "path must start with '/'"));
        }
        if route.path.split('/').any(|segment| segment == ":") {
            errors.push(ValidationError::new(&location, "path parameter without a name"));
        }
        if !siblings.insert(normalize_path(&route.path)) {
            errors.push(ValidationError::new(&location, "duplicate path among siblings"));
        }
        if route.redirect.is_some() && route.view.is_some() {
            errors.push(ValidationError::new(&location, "redirect cannot be combined with a view"));
        }
        if route.redirect.is_some() && !route.routes.is_empty() {
            errors.push(ValidationError::new(&location, "redirect cannot have child routes"));
        }
        if !route.has_content() {
            errors.push(ValidationError::new(&location, "route produces no content"));
        }
        if let Some(status) = route.status {
            if !(100..=599).contains(&status) {
                errors.push(ValidationError::new(
                    &location,
                    format!("status {status} is outside 100-599"),
                ));
            }
        }

        let nested = format!("{}{}", parent, normalize_path(&route.path));
        validate_routes(&route.routes, nested.trim_end_matches('/'), errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(path: &str) -> RouteConfig {
        RouteConfig {
            path: path.to_string(),
            title: Some("Page".to_string()),
            ..RouteConfig::default()
        }
    }

    #[test]
    fn test_valid_config() {
        let config = SiteConfig {
            routes: vec![route("/"), route("/about"), route("/users/:id")],
            ..SiteConfig::default()
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let mut redirect = route("/old");
        redirect.redirect = Some("/new".into());
        redirect.view = Some("old".into());
        redirect.routes = vec![route("/child")];

        let mut bad_status = route("/teapot");
        bad_status.status = Some(999);

        let config = SiteConfig {
            routes: vec![
                route("/a"),
                route("/a/"),
                route("/users/:"),
                RouteConfig {
                    path: "/empty".into(),
                    ..RouteConfig::default()
                },
                redirect,
                bad_status,
            ],
            ..SiteConfig::default()
        };
        let errors = validate_config(&config).unwrap_err();
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "routes /a/: duplicate path among siblings",
                "routes /users/:: path parameter without a name",
                "routes /empty: route produces no content",
                "routes /old: redirect cannot be combined with a view",
                "routes /old: redirect cannot have child routes",
                "routes /teapot: status 999 is outside 100-599",
            ]
        );
    }

    #[test]
    fn test_nested_location() {
        let mut docs = route("/docs");
        docs.routes = vec![route("intro")];
        let config = SiteConfig {
            routes: vec![docs],
            ..SiteConfig::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].location, "routes /docs/intro");
    }

    #[test]
    fn test_engine_checks() {
        let mut config = SiteConfig::default();
        config.engine.basename = "app".into();
        config.observability.log_level = "loud".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
