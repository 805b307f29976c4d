//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::SiteConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot read site config: {}", e),
            ConfigError::Parse(e) => write!(f, "invalid site config: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "site config rejected: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

/// Load and validate a site from a TOML file.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config = parse_config(&content)?;
    tracing::debug!(
        path = %path.display(),
        routes = config.routes.len(),
        "Site config loaded"
    );
    Ok(config)
}

/// Parse and validate a site from TOML text.
pub fn parse_config(content: &str) -> Result<SiteConfig, ConfigError> {
    let config: SiteConfig = toml::from_str(content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config = parse_config(
            r#"
            [[routes]]
            path = "/"
            title = "Home"
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.basename, "/");
        assert_eq!(config.engine.cache_capacity, 256);
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.routes[0].title.as_deref(), Some("Home"));
    }

    #[test]
    fn test_parse_nested_routes_and_data() {
        let config = parse_config(
            r#"
            [engine]
            basename = "/app"
            max_redirects = 2

            [[routes]]
            path = "/docs"
            title = "Docs"
            context = { section = "docs" }

            [[routes.routes]]
            path = "/"
            view = "docs-index"
            data = { pages = 2, tags = ["a", "b"] }

            [[routes.routes.head]]
            tag = "meta"
            attributes = { name = "description" }
            content = "Docs index"
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.basename, "/app");
        assert_eq!(config.engine.max_redirects, 2);
        let docs = &config.routes[0];
        assert_eq!(docs.context["section"], "docs");
        let index = &docs.routes[0];
        assert_eq!(index.data.as_ref().unwrap()["tags"][1], "b");
        assert_eq!(index.head[0].content.as_deref(), Some("Docs index"));
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("routes = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("invalid site config"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_validation_errors_are_reported() {
        let err = parse_config(
            r#"
            [engine]
            cache_capacity = 0

            [[routes]]
            path = "about"
            "#,
        )
        .unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 3),
            other => panic!("expected validation errors, got {other}"),
        }
    }
}
