//! Turning a validated site config into a matcher tree.
//!
//! Each route becomes a sequence, outermost first:
//! ```text
//! context → headers → status → title → head → data → view | redirect | mount(children)
//! ```

use crate::config::schema::{RouteConfig, SiteConfig};
use crate::routing::builders;
use crate::routing::matcher::Matcher;
use crate::routing::mount::Mount;
use crate::routing::router::Router;

/// Mount `routes` as siblings.
pub fn build_matcher(routes: &[RouteConfig]) -> Matcher {
    Matcher::mount(Mount::new(
        routes
            .iter()
            .map(|route| (route.path.clone(), build_route(route))),
    ))
}

/// A router for `config`, honouring its engine section.
pub fn build_router(config: &SiteConfig) -> Router {
    Router::with_config(build_matcher(&config.routes), config.engine.router_config())
}

fn build_route(route: &RouteConfig) -> Matcher {
    let mut members = Vec::new();

    if !route.context.is_empty() {
        members.push(builders::context(route.context.clone()));
    }
    if !route.headers.is_empty() {
        members.push(builders::headers(route.headers.clone()));
    }
    if let Some(status) = route.status {
        members.push(builders::status(status));
    }
    if let Some(title) = &route.title {
        members.push(builders::title(title.clone()));
    }
    if !route.head.is_empty() {
        members.push(builders::head(route.head.clone()));
    }
    if let Some(data) = &route.data {
        members.push(builders::data(data.clone()));
    }
    if let Some(view) = &route.view {
        members.push(builders::view(view.clone()));
    }
    if let Some(to) = &route.redirect {
        members.push(builders::redirect(to.clone()));
    }
    if !route.routes.is_empty() {
        members.push(build_matcher(&route.routes));
    }

    Matcher::compose(members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_config;
    use crate::route::RouteType;
    use serde_json::{json, Value};

    const SITE: &str = r#"
        [[routes]]
        path = "/"
        title = "Home"
        view = "home"

        [[routes]]
        path = "/docs"
        title = "Docs"
        context = { section = "docs" }
        headers = { "cache-control" = "max-age=60" }

        [[routes.routes]]
        path = "/"
        view = "docs-index"

        [[routes.routes]]
        path = "/intro"
        title = "Intro"
        data = { words = 120 }

        [[routes.routes]]
        path = "/start"
        redirect = "../intro"
    "#;

    #[tokio::test]
    async fn test_built_tree_resolves() {
        let config = parse_config(SITE).unwrap();
        let router = build_router(&config);

        let route = router.resolve("/docs/intro", Value::Null).await;
        assert_eq!(route.route_type, RouteType::Ready);
        assert_eq!(route.title.as_deref(), Some("Intro"));
        assert_eq!(route.context["section"], "docs");
        assert_eq!(route.headers["cache-control"], "max-age=60");
        assert_eq!(route.data, json!({"words": 120}));

        let route = router.resolve("/docs", Value::Null).await;
        assert_eq!(route.title.as_deref(), Some("Docs"));
        assert_eq!(route.view.as_deref(), Some("docs-index"));
    }

    #[tokio::test]
    async fn test_relative_redirect_from_config() {
        let config = parse_config(SITE).unwrap();
        let router = build_router(&config);
        let route = router.resolve("/docs/start", Value::Null).await;
        assert_eq!(route.route_type, RouteType::Redirect);
        assert_eq!(route.redirect_to.as_deref(), Some("/docs/intro"));
    }

    #[tokio::test]
    async fn test_crawl_built_tree() {
        let config = parse_config(SITE).unwrap();
        let router = build_router(&config);
        let site_map = router.crawl(&["/"]).await.unwrap();
        assert_eq!(
            site_map.paths().collect::<Vec<_>>(),
            vec!["/", "/docs", "/docs/intro", "/docs/start"]
        );
        assert_eq!(
            site_map.redirects.get("/docs/start").map(String::as_str),
            Some("/docs/intro")
        );
    }
}
