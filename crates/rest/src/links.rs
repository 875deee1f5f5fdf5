//! Link generation for records and search pages.
//!
//! All links are absolute URLs rooted at the configured base URL. Item links
//! are looked up in a [`RouteTable`] shared by every endpoint, so a record of
//! one endpoint can link to (or redirect to) an item served by another.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;

use pidrest_persistence::types::PidRef;
use serde::Serialize;
use url::Url;

use crate::extractors::PaginationCursor;

/// Placeholder for the identifier value in item routes.
pub const PID_VALUE_PLACEHOLDER: &str = "{pid_value}";

/// Placeholders accepted in additional link templates.
pub const TEMPLATE_PLACEHOLDERS: [&str; 4] = ["scheme", "host", "pid_type", "pid_value"];

/// Named links of a record, serialized as a JSON object.
pub type Links = BTreeMap<String, String>;

/// Maps PID types to item routes and builds absolute URLs.
#[derive(Debug, Clone)]
pub struct RouteTable {
    base_url: Url,
    item_routes: HashMap<String, String>,
}

impl RouteTable {
    /// Creates an empty table rooted at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        let mut base_url = Url::parse(base_url)?;
        base_url.set_query(None);
        base_url.set_fragment(None);
        Ok(Self {
            base_url,
            item_routes: HashMap::new(),
        })
    }

    /// Registers the item route of a PID type.
    pub fn insert(&mut self, pid_type: impl Into<String>, item_route: impl Into<String>) {
        self.item_routes.insert(pid_type.into(), item_route.into());
    }

    /// Returns the item route of a PID type, if any endpoint serves it.
    pub fn item_route(&self, pid_type: &str) -> Option<&str> {
        self.item_routes.get(pid_type).map(String::as_str)
    }

    /// Returns the absolute item URL of an identifier.
    pub fn item_url(&self, pid: &PidRef) -> Option<String> {
        let route = self.item_route(&pid.pid_type)?;
        Some(self.url(route, Some(&pid.pid_value), &[]))
    }

    /// Returns the absolute URL of `route` with the given query.
    ///
    /// Each path segment is percent-encoded; the `{pid_value}` segment is
    /// replaced by `pid_value` when given.
    pub fn url(&self, route: &str, pid_value: Option<&str>, query: &[(String, String)]) -> String {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            for segment in route.split('/').skip(1) {
                match pid_value {
                    Some(value) if segment == PID_VALUE_PLACEHOLDER => segments.push(value),
                    _ => segments.push(segment),
                };
            }
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url.into()
    }

    /// Scheme of the base URL.
    pub fn scheme(&self) -> &str {
        self.base_url.scheme()
    }

    /// Host of the base URL, with the port when it is not the default.
    pub fn host(&self) -> String {
        let host = self.base_url.host_str().unwrap_or_default();
        match self.base_url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }
}

/// Input of a [`LinksFactory`].
#[derive(Debug, Clone, Copy)]
pub struct LinkContext<'a> {
    /// Identifier the links are built for.
    pub pid: &'a PidRef,
    /// Shared route table.
    pub routes: &'a RouteTable,
    /// Endpoint-configured link templates.
    pub additional_links: &'a BTreeMap<String, String>,
}

/// Builds the `links` object of a record.
pub trait LinksFactory: Send + Sync + Debug {
    /// Returns the links of the record identified by `ctx.pid`.
    fn links(&self, ctx: &LinkContext<'_>) -> Links;
}

/// `self` plus the endpoint's additional link templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLinksFactory;

impl LinksFactory for DefaultLinksFactory {
    fn links(&self, ctx: &LinkContext<'_>) -> Links {
        let mut links = Links::new();
        if let Some(url) = ctx.routes.item_url(ctx.pid) {
            links.insert("self".to_string(), url);
        }
        for (name, template) in ctx.additional_links {
            links.insert(name.clone(), expand_template(template, ctx.routes, ctx.pid));
        }
        links
    }
}

/// Fills the placeholders of a link template.
pub fn expand_template(template: &str, routes: &RouteTable, pid: &PidRef) -> String {
    template
        .replace("{scheme}", routes.scheme())
        .replace("{host}", &routes.host())
        .replace("{pid_type}", &pid.pid_type)
        .replace("{pid_value}", &pid.pid_value)
}

/// Checks that a template only uses known placeholders.
pub fn validate_template(template: &str) -> Result<(), String> {
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            return Err(format!("unterminated placeholder in '{}'", template));
        };
        let name = &rest[start + 1..start + len];
        if !TEMPLATE_PLACEHOLDERS.contains(&name) {
            return Err(format!(
                "unknown placeholder '{{{}}}' (expected one of: {})",
                name,
                TEMPLATE_PLACEHOLDERS.join(", ")
            ));
        }
        rest = &rest[start + len + 1..];
    }
    if rest.contains('}') {
        return Err(format!("unbalanced '}}' in '{}'", template));
    }
    Ok(())
}

/// Formats named links as a `Link` header value.
pub fn link_header<'a>(links: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    links
        .into_iter()
        .map(|(rel, url)| format!("<{}>; rel=\"{}\"", url, rel))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Navigation links of a search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchLinks {
    /// The page itself.
    #[serde(rename = "self")]
    pub self_link: String,
    /// The previous page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    /// The next page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl SearchLinks {
    /// Formats the links as a `Link` header value.
    pub fn to_link_header(&self) -> String {
        let links = [
            Some(("self", self.self_link.as_str())),
            self.prev.as_deref().map(|url| ("prev", url)),
            self.next.as_deref().map(|url| ("next", url)),
        ];
        link_header(links.into_iter().flatten())
    }
}

/// Builds the `self`, `prev` and `next` links of a search page.
///
/// Pagination parameters come first, followed by `url_args` in the given
/// order, so following a link reissues the same search.
pub fn build_links(
    routes: &RouteTable,
    list_route: &str,
    cursor: &PaginationCursor,
    url_args: &[(String, String)],
    total: usize,
    max_result_window: usize,
) -> SearchLinks {
    let page_url = |cursor: &PaginationCursor| {
        let mut query = cursor.query_pairs();
        query.extend(url_args.iter().cloned());
        routes.url(list_route, None, &query)
    };

    SearchLinks {
        self_link: page_url(cursor),
        prev: cursor.prev().map(|prev| page_url(&prev)),
        next: cursor
            .next(total, max_result_window)
            .map(|next| page_url(&next)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routes() -> RouteTable {
        let mut routes = RouteTable::new("http://localhost:5000").unwrap();
        routes.insert("recid", "/records/{pid_value}");
        routes
    }

    #[test]
    fn test_item_url() {
        let url = routes().item_url(&PidRef::new("recid", "1")).unwrap();
        assert_eq!(url, "http://localhost:5000/records/1");
        assert!(routes().item_url(&PidRef::new("doi", "1")).is_none());
    }

    #[test]
    fn test_item_url_encodes_value() {
        let url = routes().item_url(&PidRef::new("recid", "a/b c")).unwrap();
        assert_eq!(url, "http://localhost:5000/records/a%2Fb%20c");
    }

    #[test]
    fn test_url_keeps_base_path_and_trailing_slash() {
        let routes = RouteTable::new("https://example.org/api/").unwrap();
        let url = routes.url(
            "/records/",
            None,
            &[("q".to_string(), "title:back".to_string())],
        );
        assert_eq!(url, "https://example.org/api/records/?q=title%3Aback");
    }

    #[test]
    fn test_default_links_factory() {
        let routes = routes();
        let additional = BTreeMap::from([(
            "html".to_string(),
            "{scheme}://{host}/{pid_type}/{pid_value}.html".to_string(),
        )]);
        let pid = PidRef::new("recid", "7");
        let links = DefaultLinksFactory.links(&LinkContext {
            pid: &pid,
            routes: &routes,
            additional_links: &additional,
        });
        assert_eq!(links["self"], "http://localhost:5000/records/7");
        assert_eq!(links["html"], "http://localhost:5000/recid/7.html");
    }

    #[test]
    fn test_validate_template() {
        assert!(validate_template("{scheme}://{host}/x/{pid_value}").is_ok());
        assert!(validate_template("/x/{id}").unwrap_err().contains("unknown"));
        assert!(validate_template("/x/{pid_value").is_err());
        assert!(validate_template("/x/pid_value}").is_err());
    }

    #[test]
    fn test_link_header() {
        let links = SearchLinks {
            self_link: "http://h/r/?page=2&size=1".to_string(),
            prev: Some("http://h/r/?page=1&size=1".to_string()),
            next: None,
        };
        assert_eq!(
            links.to_link_header(),
            "<http://h/r/?page=2&size=1>; rel=\"self\", <http://h/r/?page=1&size=1>; rel=\"prev\""
        );
    }

    #[test]
    fn test_build_links_page_mode() {
        let routes = routes();
        let cursor = PaginationCursor::page(1, 2);
        let args = vec![("q".to_string(), "back".to_string())];

        let links = build_links(&routes, "/records/", &cursor, &args, 4, 10_000);
        assert_eq!(
            links.self_link,
            "http://localhost:5000/records/?page=1&size=2&q=back"
        );
        assert!(links.prev.is_none());
        assert_eq!(
            links.next.as_deref(),
            Some("http://localhost:5000/records/?page=2&size=2&q=back")
        );

        let last = build_links(&routes, "/records/", &PaginationCursor::page(2, 2), &args, 4, 10_000);
        assert!(last.next.is_none());
        assert_eq!(last.prev.as_deref(), Some(links.self_link.as_str()));
    }

    #[test]
    fn test_build_links_window_caps_next() {
        let links = build_links(&routes(), "/records/", &PaginationCursor::page(1, 2), &[], 100, 2);
        assert!(links.next.is_none());
    }

    #[test]
    fn test_build_links_offset_mode() {
        let links = build_links(
            &routes(),
            "/records/",
            &PaginationCursor::offset(2, 2),
            &[],
            10,
            10_000,
        );
        assert_eq!(
            links.prev.as_deref(),
            Some("http://localhost:5000/records/?from=1&size=2")
        );
        assert_eq!(
            links.next.as_deref(),
            Some("http://localhost:5000/records/?from=4&size=2")
        );
    }
}
