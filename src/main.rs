//! Navigator command line.
//!
//! # Architecture Overview
//!
//! ```text
//!     site.toml
//!         │
//!         ▼
//!   ┌───────────┐    ┌──────────────┐    ┌───────────────┐
//!   │  config   │───▶│ build_router │───▶│    Router     │
//!   │ loader +  │    │ (route tree  │    │ resolve/crawl │
//!   │ validation│    │  → Matcher)  │    └───────┬───────┘
//!   └───────────┘    └──────────────┘            │
//!                                                ▼
//!                                     JSON on stdout (Route,
//!                                     SiteMap or RouteMap)
//! ```
//!
//! Logs go to stderr so the output can be piped.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

use navigator::config::{build_router, load_config};
use navigator::observability::logging;

#[derive(Parser)]
#[command(name = "navigator")]
#[command(about = "Resolve and crawl a declarative site", long_about = None)]
struct Cli {
    /// Site configuration file.
    #[arg(short, long, default_value = "site.toml")]
    config: PathBuf,

    /// Log level when RUST_LOG is unset (overrides the config file).
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one location and print the settled route
    Resolve {
        url: String,
        /// Ambient context as a JSON value
        #[arg(long)]
        context: Option<String>,
    },
    /// Crawl every reachable path and print the site map
    Crawl {
        /// Paths to start from (default: the configured basename)
        roots: Vec<String>,
    },
    /// Crawl without data and print route metadata
    Routes {
        /// Paths to start from (default: the configured basename)
        roots: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "navigator failed");
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli.config)?;
    logging::init(cli.log_level.as_deref().unwrap_or(&config.observability.log_level));

    tracing::info!(
        config = %cli.config.display(),
        basename = %config.engine.basename,
        routes = config.routes.len(),
        "Site loaded"
    );

    let router = build_router(&config);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            Commands::Resolve { url, context } => {
                let context = match context {
                    Some(raw) => serde_json::from_str(&raw)?,
                    None => Value::Null,
                };
                print_json(&router.resolve(&url, context).await)
            }
            Commands::Crawl { roots } => {
                print_json(&router.crawl(&crawl_roots(roots, &config.engine.basename)).await?)
            }
            Commands::Routes { roots } => {
                print_json(&router.route_map(&crawl_roots(roots, &config.engine.basename)).await?)
            }
        }
    })
}

/// Roots given on the command line, or the site's basename.
fn crawl_roots(roots: Vec<String>, basename: &str) -> Vec<String> {
    if roots.is_empty() {
        vec![basename.to_string()]
    } else {
        roots
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawl_defaults_to_basename() {
        let cli = Cli::parse_from(["navigator", "crawl"]);
        let Commands::Crawl { roots } = cli.command else {
            panic!("expected crawl");
        };
        assert_eq!(crawl_roots(roots, "/site"), vec!["/site"]);

        let cli = Cli::parse_from(["navigator", "routes", "/site/docs"]);
        let Commands::Routes { roots } = cli.command else {
            panic!("expected routes");
        };
        assert_eq!(crawl_roots(roots, "/site"), vec!["/site/docs"]);
    }
}
