//! Endpoint configuration.
//!
//! An endpoint serves one PID type under a list route and an item route.
//! Endpoints are declared as raw JSON maps (usually loaded from the
//! endpoints file) and validated eagerly into [`EndpointConfig`]: every
//! component name is resolved against the [`ComponentRegistry`] at startup,
//! never per request.
//!
//! # Example
//!
//! ```json
//! {
//!   "recid": {
//!     "pid_type": "recid",
//!     "pid_minter": "recid",
//!     "pid_fetcher": "recid",
//!     "list_route": "/records/",
//!     "item_route": "/records/{pid_value}",
//!     "record_serializers": {"application/json": "json_v1"},
//!     "search_serializers": {"application/json": "json_v1"},
//!     "read_permission_factory_imp": null,
//!     "create_permission_factory_imp": "authenticated_user"
//!   }
//! }
//! ```

mod registry;
mod search_config;

pub use registry::ComponentRegistry;
pub use search_config::{
    DefaultSort, FacetFilter, FacetsConfig, SortOption, SortOrder, SuggesterConfig,
};

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use pidrest_persistence::core::{PidFetcher, PidMinter};
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, info};

use crate::links::{LinksFactory, PID_VALUE_PLACEHOLDER, validate_template};
use crate::middleware::content_type::is_media_type;
use crate::permissions::{Action, PermissionFactory};
use crate::serializers::{RecordLoader, RecordSerializer, SearchSerializer};

/// Default maximum number of reachable search hits.
pub const DEFAULT_MAX_RESULT_WINDOW: usize = 10_000;

/// Default media type of responses.
pub const DEFAULT_MEDIA_TYPE: &str = "application/json";

/// Default search index.
pub const DEFAULT_SEARCH_INDEX: &str = "records";

const KNOWN_KEYS: &[&str] = &[
    "pid_type",
    "list_route",
    "item_route",
    "record_serializers",
    "search_serializers",
    "record_loaders",
    "pid_minter",
    "pid_fetcher",
    "search_index",
    "max_result_window",
    "default_media_type",
    "links_factory_imp",
    "additional_links",
    "create_permission_factory_imp",
    "read_permission_factory_imp",
    "update_permission_factory_imp",
    "delete_permission_factory_imp",
    "list_permission_factory_imp",
    "use_options_view",
    "use_memento",
    "suggesters",
    "sort_options",
    "default_sort",
    "facets",
];

/// Startup configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An endpoint definition is invalid.
    #[error("invalid configuration for endpoint '{endpoint}' ({key}): {message}")]
    InvalidEndpointConfig {
        /// Endpoint name.
        endpoint: String,
        /// Offending key.
        key: String,
        /// What is wrong.
        message: String,
    },

    /// The endpoints file could not be read.
    #[error("cannot load endpoints file {path}: {message}")]
    EndpointsFile {
        /// File path.
        path: String,
        /// What went wrong.
        message: String,
    },

    /// The base URL of generated links is invalid.
    #[error("invalid base URL '{url}': {message}")]
    InvalidBaseUrl {
        /// Configured URL.
        url: String,
        /// Parse error.
        message: String,
    },
}

/// A validated endpoint.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    name: String,
    pid_type: String,
    list_route: String,
    item_route: String,
    record_serializers: BTreeMap<String, Arc<dyn RecordSerializer>>,
    search_serializers: BTreeMap<String, Arc<dyn SearchSerializer>>,
    record_loaders: BTreeMap<String, Arc<dyn RecordLoader>>,
    minter: Arc<dyn PidMinter>,
    fetcher: Arc<dyn PidFetcher>,
    search_index: String,
    max_result_window: usize,
    default_media_type: String,
    links_factory: Arc<dyn LinksFactory>,
    additional_links: BTreeMap<String, String>,
    permissions: HashMap<Action, Arc<dyn PermissionFactory>>,
    use_options_view: bool,
    use_memento: bool,
    suggesters: BTreeMap<String, SuggesterConfig>,
    sort_options: BTreeMap<String, SortOption>,
    default_sort: DefaultSort,
    facets: FacetsConfig,
}

/// Reads typed values out of a raw endpoint map.
struct RawEndpoint<'a> {
    name: &'a str,
    raw: &'a Map<String, Value>,
}

impl<'a> RawEndpoint<'a> {
    fn error(&self, key: &str, message: impl Into<String>) -> ConfigError {
        ConfigError::InvalidEndpointConfig {
            endpoint: self.name.to_string(),
            key: key.to_string(),
            message: message.into(),
        }
    }

    fn optional_str(&self, key: &str) -> Result<Option<&'a str>, ConfigError> {
        match self.raw.get(key) {
            None => Ok(None),
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s.as_str())),
            Some(_) => Err(self.error(key, "expected a non-empty string")),
        }
    }

    fn required_str(&self, key: &str) -> Result<&'a str, ConfigError> {
        self.optional_str(key)?
            .ok_or_else(|| self.error(key, "missing required key"))
    }

    fn str_table(&self, key: &str) -> Result<Option<Vec<(&'a str, &'a str)>>, ConfigError> {
        let Some(value) = self.raw.get(key) else {
            return Ok(None);
        };
        let Value::Object(table) = value else {
            return Err(self.error(key, "expected an object"));
        };
        table
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => Ok((k.as_str(), s.as_str())),
                _ => Err(self.error(key, format!("value of '{}' must be a string", k))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    fn object(&self, key: &str) -> Result<Option<&'a Map<String, Value>>, ConfigError> {
        match self.raw.get(key) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(_) => Err(self.error(key, "expected an object")),
        }
    }

    /// Resolves a media type table against a registry lookup.
    fn media_table<T: ?Sized>(
        &self,
        key: &str,
        entries: Vec<(&str, &str)>,
        lookup: impl Fn(&str) -> Option<Arc<T>>,
    ) -> Result<BTreeMap<String, Arc<T>>, ConfigError> {
        if entries.is_empty() {
            return Err(self.error(key, "at least one media type is required"));
        }
        let mut table = BTreeMap::new();
        for (media_type, name) in entries {
            if !is_media_type(media_type) {
                return Err(self.error(key, format!("'{}' is not a media type", media_type)));
            }
            let component = lookup(name)
                .ok_or_else(|| self.error(key, format!("unknown component '{}'", name)))?;
            table.insert(media_type.to_ascii_lowercase(), component);
        }
        Ok(table)
    }

    fn permission(&self, action: Action, registry: &ComponentRegistry) -> Result<Option<Arc<dyn PermissionFactory>>, ConfigError> {
        let key = action.config_key();
        match self.raw.get(key) {
            None => Ok(registry.default_permission(action)),
            Some(Value::Null) => Ok(None),
            Some(Value::String(name)) => registry
                .permission_factory(name)
                .map(Some)
                .ok_or_else(|| self.error(key, format!("unknown permission factory '{}'", name))),
            Some(_) => Err(self.error(key, "expected a factory name or null")),
        }
    }
}

fn validate_route(route: &str, item: bool) -> Result<(), String> {
    if !route.starts_with('/') {
        return Err("must start with '/'".to_string());
    }
    let placeholders = route.matches('{').count();
    if route.matches('}').count() != placeholders {
        return Err("unbalanced braces".to_string());
    }
    if !item {
        return match placeholders {
            0 => Ok(()),
            _ => Err("must not contain placeholders".to_string()),
        };
    }
    let segments = route.split('/').filter(|s| *s == PID_VALUE_PLACEHOLDER).count();
    if placeholders != 1 || segments != 1 {
        return Err(format!(
            "must contain {} as a whole path segment and no other placeholder",
            PID_VALUE_PLACEHOLDER
        ));
    }
    Ok(())
}

impl EndpointConfig {
    /// Validates a raw endpoint definition.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidEndpointConfig` naming the first offending key.
    pub fn build(
        name: &str,
        raw: &Map<String, Value>,
        registry: &ComponentRegistry,
    ) -> Result<Self, ConfigError> {
        let reader = RawEndpoint { name, raw };

        if let Some(unknown) = raw.keys().find(|k| !KNOWN_KEYS.contains(&k.as_str())) {
            return Err(reader.error(unknown, "unknown key"));
        }

        let pid_type = reader.required_str("pid_type")?;
        let list_route = reader.required_str("list_route")?;
        validate_route(list_route, false).map_err(|m| reader.error("list_route", m))?;
        let item_route = reader.required_str("item_route")?;
        validate_route(item_route, true).map_err(|m| reader.error("item_route", m))?;

        let record_serializers = reader.media_table(
            "record_serializers",
            reader
                .str_table("record_serializers")?
                .ok_or_else(|| reader.error("record_serializers", "missing required key"))?,
            |n| registry.record_serializer(n),
        )?;
        let search_serializers = reader.media_table(
            "search_serializers",
            reader
                .str_table("search_serializers")?
                .ok_or_else(|| reader.error("search_serializers", "missing required key"))?,
            |n| registry.search_serializer(n),
        )?;
        let record_loaders = reader.media_table(
            "record_loaders",
            reader
                .str_table("record_loaders")?
                .unwrap_or_else(|| vec![(DEFAULT_MEDIA_TYPE, "json_v1")]),
            |n| registry.loader(n),
        )?;

        let minter_name = reader.optional_str("pid_minter")?.unwrap_or("recid");
        let minter = registry
            .minter(minter_name)
            .ok_or_else(|| reader.error("pid_minter", format!("unknown minter '{}'", minter_name)))?;
        let fetcher_name = reader.optional_str("pid_fetcher")?.unwrap_or("recid");
        let fetcher = registry.fetcher(fetcher_name).ok_or_else(|| {
            reader.error("pid_fetcher", format!("unknown fetcher '{}'", fetcher_name))
        })?;
        if minter.pid_type() != pid_type {
            return Err(reader.error(
                "pid_minter",
                format!("minter '{}' mints '{}' identifiers", minter_name, minter.pid_type()),
            ));
        }
        if fetcher.pid_type() != pid_type {
            return Err(reader.error(
                "pid_fetcher",
                format!("fetcher '{}' returns '{}' identifiers", fetcher_name, fetcher.pid_type()),
            ));
        }

        let search_index = reader
            .optional_str("search_index")?
            .unwrap_or(DEFAULT_SEARCH_INDEX);

        let max_result_window = match raw.get("max_result_window") {
            None => DEFAULT_MAX_RESULT_WINDOW,
            Some(value) => value
                .as_u64()
                .filter(|n| *n > 0)
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| reader.error("max_result_window", "expected a positive integer"))?,
        };

        let default_media_type = reader
            .optional_str("default_media_type")?
            .unwrap_or(DEFAULT_MEDIA_TYPE)
            .to_ascii_lowercase();
        if !record_serializers.contains_key(&default_media_type)
            || !search_serializers.contains_key(&default_media_type)
        {
            return Err(reader.error(
                "default_media_type",
                format!(
                    "'{}' must be served by both record and search serializers",
                    default_media_type
                ),
            ));
        }

        let links_name = reader.optional_str("links_factory_imp")?.unwrap_or("default");
        let links_factory = registry.links_factory(links_name).ok_or_else(|| {
            reader.error("links_factory_imp", format!("unknown links factory '{}'", links_name))
        })?;

        let mut additional_links = BTreeMap::new();
        for (link, template) in reader.str_table("additional_links")?.unwrap_or_default() {
            validate_template(template).map_err(|m| reader.error("additional_links", m))?;
            additional_links.insert(link.to_string(), template.to_string());
        }

        let mut permissions = HashMap::new();
        for action in Action::ALL {
            if let Some(factory) = reader.permission(action, registry)? {
                permissions.insert(action, factory);
            }
        }

        let use_options_view = match raw.get("use_options_view") {
            None => true,
            Some(Value::Bool(enabled)) => *enabled,
            Some(_) => return Err(reader.error("use_options_view", "expected a boolean")),
        };
        let use_memento = match raw.get("use_memento") {
            None => false,
            Some(Value::Bool(enabled)) => *enabled,
            Some(_) => return Err(reader.error("use_memento", "expected a boolean")),
        };

        let mut suggesters = BTreeMap::new();
        for (suggester, value) in reader.object("suggesters")?.into_iter().flatten() {
            let config = SuggesterConfig::from_value(value)
                .map_err(|m| reader.error("suggesters", format!("{}: {}", suggester, m)))?;
            suggesters.insert(suggester.clone(), config);
        }

        let mut sort_options = BTreeMap::new();
        for (key, value) in reader.object("sort_options")?.into_iter().flatten() {
            let option: SortOption = serde_json::from_value(value.clone())
                .map_err(|e| reader.error("sort_options", format!("{}: {}", key, e)))?;
            if option.fields.is_empty() {
                return Err(reader.error("sort_options", format!("{}: no sort fields", key)));
            }
            sort_options.insert(key.clone(), option);
        }

        let default_sort: DefaultSort = match raw.get("default_sort") {
            None => DefaultSort::default(),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| reader.error("default_sort", e.to_string()))?,
        };
        for key in [&default_sort.query, &default_sort.noquery].into_iter().flatten() {
            let option = key.strip_prefix('-').unwrap_or(key.as_str());
            if !sort_options.contains_key(option) {
                return Err(reader.error("default_sort", format!("unknown sort option '{}'", option)));
            }
        }

        let facets = match raw.get("facets") {
            None => FacetsConfig::default(),
            Some(value) => FacetsConfig::from_value(value).map_err(|m| reader.error("facets", m))?,
        };

        debug!(endpoint = name, pid_type, list_route, item_route, "Validated endpoint");

        Ok(Self {
            name: name.to_string(),
            pid_type: pid_type.to_string(),
            list_route: list_route.to_string(),
            item_route: item_route.to_string(),
            record_serializers,
            search_serializers,
            record_loaders,
            minter,
            fetcher,
            search_index: search_index.to_string(),
            max_result_window,
            default_media_type,
            links_factory,
            additional_links,
            permissions,
            use_options_view,
            use_memento,
            suggesters,
            sort_options,
            default_sort,
            facets,
        })
    }

    /// Endpoint name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// PID type served.
    pub fn pid_type(&self) -> &str {
        &self.pid_type
    }

    /// Collection route.
    pub fn list_route(&self) -> &str {
        &self.list_route
    }

    /// Item route, containing `{pid_value}`.
    pub fn item_route(&self) -> &str {
        &self.item_route
    }

    /// Route of the options view.
    pub fn options_route(&self) -> String {
        format!("{}_options", self.list_route)
    }

    /// Route of the suggest view.
    pub fn suggest_route(&self) -> String {
        format!("{}_suggest", self.list_route)
    }

    /// Every route this endpoint registers.
    pub fn routes(&self) -> Vec<String> {
        let mut routes = vec![self.list_route.clone(), self.item_route.clone()];
        if self.use_options_view {
            routes.push(self.options_route());
        }
        if !self.suggesters.is_empty() {
            routes.push(self.suggest_route());
        }
        routes
    }

    /// Record serializers by media type.
    pub fn record_serializers(&self) -> &BTreeMap<String, Arc<dyn RecordSerializer>> {
        &self.record_serializers
    }

    /// Search serializers by media type.
    pub fn search_serializers(&self) -> &BTreeMap<String, Arc<dyn SearchSerializer>> {
        &self.search_serializers
    }

    /// Loaders by media type.
    pub fn record_loaders(&self) -> &BTreeMap<String, Arc<dyn RecordLoader>> {
        &self.record_loaders
    }

    /// Media types items can be served as, sorted.
    pub fn item_media_types(&self) -> Vec<&str> {
        self.record_serializers.keys().map(String::as_str).collect()
    }

    /// Media types search pages can be served as, sorted.
    pub fn search_media_types(&self) -> Vec<&str> {
        self.search_serializers.keys().map(String::as_str).collect()
    }

    /// Minter of new identifiers.
    pub fn minter(&self) -> &dyn PidMinter {
        self.minter.as_ref()
    }

    /// Fetcher recovering identifiers from search hits.
    pub fn fetcher(&self) -> &dyn PidFetcher {
        self.fetcher.as_ref()
    }

    /// Search index records are stored in.
    pub fn search_index(&self) -> &str {
        &self.search_index
    }

    /// Maximum number of reachable search hits.
    pub fn max_result_window(&self) -> usize {
        self.max_result_window
    }

    /// Media type used when the client expresses no preference.
    pub fn default_media_type(&self) -> &str {
        &self.default_media_type
    }

    /// Links factory.
    pub fn links_factory(&self) -> &dyn LinksFactory {
        self.links_factory.as_ref()
    }

    /// Additional link templates.
    pub fn additional_links(&self) -> &BTreeMap<String, String> {
        &self.additional_links
    }

    /// Permission factory of an action; `None` allows everything.
    pub fn permission(&self, action: Action) -> Option<&dyn PermissionFactory> {
        self.permissions.get(&action).map(|f| f.as_ref())
    }

    /// Whether the options view is registered.
    pub fn use_options_view(&self) -> bool {
        self.use_options_view
    }

    /// Whether item reads honour `Accept-Datetime`.
    pub fn use_memento(&self) -> bool {
        self.use_memento
    }

    /// Completion suggesters by name.
    pub fn suggesters(&self) -> &BTreeMap<String, SuggesterConfig> {
        &self.suggesters
    }

    /// Sort options by key.
    pub fn sort_options(&self) -> &BTreeMap<String, SortOption> {
        &self.sort_options
    }

    /// Sort applied without a `sort` parameter.
    pub fn default_sort(&self) -> &DefaultSort {
        &self.default_sort
    }

    /// Facet configuration.
    pub fn facets(&self) -> &FacetsConfig {
        &self.facets
    }
}

/// Validates a set of raw endpoints.
///
/// Endpoints are built in name order. Two endpoints may not serve the same
/// PID type or register the same route.
pub fn build_endpoints(
    raw_endpoints: &Map<String, Value>,
    registry: &ComponentRegistry,
) -> Result<Vec<Arc<EndpointConfig>>, ConfigError> {
    let mut endpoints: Vec<Arc<EndpointConfig>> = Vec::new();
    let mut pid_types: HashMap<String, String> = HashMap::new();
    let mut routes: HashMap<String, String> = HashMap::new();

    for (name, raw) in raw_endpoints {
        let Value::Object(raw) = raw else {
            return Err(ConfigError::InvalidEndpointConfig {
                endpoint: name.clone(),
                key: name.clone(),
                message: "endpoint definition must be an object".to_string(),
            });
        };
        let endpoint = EndpointConfig::build(name, raw, registry)?;

        if let Some(other) = pid_types.insert(endpoint.pid_type.clone(), name.clone()) {
            return Err(ConfigError::InvalidEndpointConfig {
                endpoint: name.clone(),
                key: "pid_type".to_string(),
                message: format!("pid_type '{}' is already served by '{}'", endpoint.pid_type, other),
            });
        }
        for route in endpoint.routes() {
            if let Some(other) = routes.insert(route.clone(), name.clone()) {
                return Err(ConfigError::InvalidEndpointConfig {
                    endpoint: name.clone(),
                    key: "list_route".to_string(),
                    message: format!("route '{}' is already registered by '{}'", route, other),
                });
            }
        }
        endpoints.push(Arc::new(endpoint));
    }

    info!(count = endpoints.len(), "Built endpoints");
    Ok(endpoints)
}

/// The built-in `recid` endpoint.
pub fn default_endpoints() -> Map<String, Value> {
    let definition = json!({
        "recid": {
            "pid_type": "recid",
            "pid_minter": "recid",
            "pid_fetcher": "recid",
            "search_index": DEFAULT_SEARCH_INDEX,
            "list_route": "/records/",
            "item_route": "/records/{pid_value}",
            "record_serializers": {DEFAULT_MEDIA_TYPE: "json_v1"},
            "search_serializers": {DEFAULT_MEDIA_TYPE: "json_v1"},
            "default_media_type": DEFAULT_MEDIA_TYPE,
            "max_result_window": DEFAULT_MAX_RESULT_WINDOW,
        }
    });
    match definition {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Reads raw endpoint definitions from a JSON file.
pub fn load_endpoints_file(path: &Path) -> Result<Map<String, Value>, ConfigError> {
    let file_error = |message: String| ConfigError::EndpointsFile {
        path: path.display().to_string(),
        message,
    };
    let contents = std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
    match serde_json::from_str(&contents).map_err(|e| file_error(e.to_string()))? {
        Value::Object(map) => Ok(map),
        _ => Err(file_error("expected a JSON object of endpoints".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pidrest_persistence::core::{RecidFetcher, RecidMinter};
    use std::io::Write;

    fn raw(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn recid() -> Value {
        default_endpoints()["recid"].clone()
    }

    fn with(mut endpoint: Value, key: &str, value: Value) -> Value {
        endpoint[key] = value;
        endpoint
    }

    fn build(endpoint: Value) -> Result<EndpointConfig, ConfigError> {
        EndpointConfig::build("recid", &raw(endpoint), &ComponentRegistry::with_defaults())
    }

    fn failing_key(endpoint: Value) -> String {
        match build(endpoint).unwrap_err() {
            ConfigError::InvalidEndpointConfig { key, .. } => key,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_default_endpoint() {
        let endpoint = build(recid()).unwrap();
        assert_eq!(endpoint.pid_type(), "recid");
        assert_eq!(endpoint.list_route(), "/records/");
        assert_eq!(endpoint.options_route(), "/records/_options");
        assert_eq!(endpoint.max_result_window(), 10_000);
        assert_eq!(endpoint.item_media_types(), vec!["application/json"]);
        assert!(endpoint.record_loaders().contains_key("application/json"));
        assert!(endpoint.use_options_view());
        assert!(!endpoint.use_memento());
        assert!(endpoint.permission(Action::Create).is_none());
        assert_eq!(endpoint.routes().len(), 3);
    }

    #[test]
    fn test_unknown_key() {
        assert_eq!(failing_key(with(recid(), "pid_typo", json!("x"))), "pid_typo");
    }

    #[test]
    fn test_missing_required_key() {
        let mut endpoint = recid();
        endpoint.as_object_mut().unwrap().remove("pid_type");
        assert_eq!(failing_key(endpoint), "pid_type");
    }

    #[test]
    fn test_invalid_routes() {
        assert_eq!(failing_key(with(recid(), "list_route", json!("records"))), "list_route");
        assert_eq!(failing_key(with(recid(), "item_route", json!("/records/{id}"))), "item_route");
        assert_eq!(
            failing_key(with(recid(), "item_route", json!("/records/x{pid_value}"))),
            "item_route"
        );
        assert_eq!(failing_key(with(recid(), "item_route", json!("/records/"))), "item_route");
    }

    #[test]
    fn test_unresolvable_names() {
        assert_eq!(
            failing_key(with(recid(), "record_serializers", json!({"application/json": "nope"}))),
            "record_serializers"
        );
        assert_eq!(failing_key(with(recid(), "pid_minter", json!("doi"))), "pid_minter");
        assert_eq!(
            failing_key(with(recid(), "read_permission_factory_imp", json!("nope"))),
            "read_permission_factory_imp"
        );
        assert_eq!(failing_key(with(recid(), "record_serializers", json!({}))), "record_serializers");
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(failing_key(with(recid(), "max_result_window", json!(0))), "max_result_window");
        assert_eq!(
            failing_key(with(recid(), "default_media_type", json!("text/csv"))),
            "default_media_type"
        );
        assert_eq!(failing_key(with(recid(), "use_options_view", json!("yes"))), "use_options_view");
        assert_eq!(failing_key(with(recid(), "use_memento", json!(1))), "use_memento");
        assert_eq!(
            failing_key(with(recid(), "additional_links", json!({"html": "/x/{id}"}))),
            "additional_links"
        );
        assert_eq!(
            failing_key(with(recid(), "default_sort", json!({"noquery": "year"}))),
            "default_sort"
        );
    }

    #[test]
    fn test_permissions() {
        let registry = ComponentRegistry::with_defaults()
            .with_default_permission(Action::Delete, registry_factory("deny_all"));
        let endpoint = raw(with(
            with(recid(), "create_permission_factory_imp", json!("authenticated_user")),
            "delete_permission_factory_imp",
            Value::Null,
        ));
        let built = EndpointConfig::build("recid", &endpoint, &registry).unwrap();
        assert!(built.permission(Action::Create).is_some());
        assert!(built.permission(Action::Delete).is_none());

        let inherited = EndpointConfig::build("recid", &raw(recid()), &registry).unwrap();
        assert!(inherited.permission(Action::Delete).is_some());
    }

    fn registry_factory(name: &str) -> Option<Arc<dyn PermissionFactory>> {
        ComponentRegistry::with_defaults().permission_factory(name)
    }

    #[test]
    fn test_search_settings() {
        let endpoint = with(
            with(
                with(
                    recid(),
                    "sort_options",
                    json!({"year": {"title": "Year", "fields": ["year"], "order": 2}}),
                ),
                "default_sort",
                json!({"noquery": "-year"}),
            ),
            "suggesters",
            json!({"title": {"completion": {"field": "suggest_title"}}}),
        );
        let built = build(endpoint).unwrap();
        assert_eq!(built.sort_options()["year"].order, 2);
        assert_eq!(built.default_sort().for_request(false), Some("-year"));
        assert!(built.routes().contains(&"/records/_suggest".to_string()));
    }

    #[test]
    fn test_duplicate_pid_type() {
        let mut raw_endpoints = default_endpoints();
        raw_endpoints.insert(
            "other".to_string(),
            with(
                with(recid(), "list_route", json!("/other/")),
                "item_route",
                json!("/other/{pid_value}"),
            ),
        );
        let err = build_endpoints(&raw_endpoints, &ComponentRegistry::with_defaults()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpointConfig { key, .. } if key == "pid_type"));
    }

    fn doi_registry() -> ComponentRegistry {
        ComponentRegistry::with_defaults()
            .with_minter("doi", Arc::new(RecidMinter::new("doi", "doi")))
            .with_fetcher("doi", Arc::new(RecidFetcher::new("doi", "doi")))
    }

    fn doi(endpoint: Value) -> Value {
        let endpoint = with(endpoint, "pid_type", json!("doi"));
        let endpoint = with(endpoint, "pid_minter", json!("doi"));
        with(endpoint, "pid_fetcher", json!("doi"))
    }

    #[test]
    fn test_minter_must_match_pid_type() {
        let endpoint = with(recid(), "pid_type", json!("doi"));
        assert_eq!(failing_key(endpoint.clone()), "pid_minter");

        let endpoint = with(endpoint, "pid_minter", json!("doi"));
        let err = EndpointConfig::build("doi", &raw(endpoint.clone()), &doi_registry()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpointConfig { key, .. } if key == "pid_fetcher"));

        let endpoint = with(endpoint, "pid_fetcher", json!("doi"));
        let built = EndpointConfig::build("doi", &raw(endpoint), &doi_registry()).unwrap();
        assert_eq!(built.minter().pid_type(), "doi");
        assert_eq!(built.fetcher().pid_type(), "doi");
    }

    #[test]
    fn test_duplicate_route() {
        let mut raw_endpoints = default_endpoints();
        raw_endpoints.insert("other".to_string(), doi(recid()));
        let err = build_endpoints(&raw_endpoints, &doi_registry()).unwrap_err();
        assert!(err.to_string().contains("already registered"));
    }

    #[test]
    fn test_endpoint_must_be_object() {
        let raw_endpoints = raw(json!({"recid": "nope"}));
        assert!(build_endpoints(&raw_endpoints, &ComponentRegistry::with_defaults()).is_err());
    }

    #[test]
    fn test_load_endpoints_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", Value::Object(default_endpoints())).unwrap();
        let loaded = load_endpoints_file(file.path()).unwrap();
        assert!(loaded.contains_key("recid"));

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, "[]").unwrap();
        assert!(matches!(
            load_endpoints_file(bad.path()),
            Err(ConfigError::EndpointsFile { .. })
        ));
    }
}
