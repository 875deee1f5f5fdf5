//! Named components endpoints are assembled from.
//!
//! Endpoint definitions refer to serializers, loaders, minters, fetchers,
//! permission factories and links factories by name. The registry maps
//! those names to implementations and is read-only once endpoints are
//! built.
//!
//! | Kind | Built-in names |
//! |------|----------------|
//! | record / search serializer | `json_v1` |
//! | loader | `json_v1` |
//! | minter / fetcher | `recid` |
//! | permission factory | `allow_all`, `deny_all`, `authenticated_user`, `record_owner`, `admin_role` |
//! | links factory | `default` |

use std::collections::HashMap;
use std::sync::Arc;

use pidrest_persistence::core::{PidFetcher, PidMinter, RecidFetcher, RecidMinter};

use crate::links::{DefaultLinksFactory, LinksFactory};
use crate::permissions::{
    Action, AdminRole, AllowAll, AuthenticatedUser, DenyAll, PermissionFactory, RecordOwner,
};
use crate::serializers::{
    JsonV1Loader, JsonV1Serializer, RecordLoader, RecordSerializer, SearchSerializer,
};

/// Registry of named endpoint components.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    record_serializers: HashMap<String, Arc<dyn RecordSerializer>>,
    search_serializers: HashMap<String, Arc<dyn SearchSerializer>>,
    loaders: HashMap<String, Arc<dyn RecordLoader>>,
    minters: HashMap<String, Arc<dyn PidMinter>>,
    fetchers: HashMap<String, Arc<dyn PidFetcher>>,
    permission_factories: HashMap<String, Arc<dyn PermissionFactory>>,
    links_factories: HashMap<String, Arc<dyn LinksFactory>>,
    default_permissions: HashMap<Action, Arc<dyn PermissionFactory>>,
}

impl ComponentRegistry {
    /// Creates a registry holding the built-in components.
    ///
    /// No default permission factory is set, so every action is allowed
    /// unless an endpoint names a factory.
    pub fn with_defaults() -> Self {
        let json_v1 = Arc::new(JsonV1Serializer);
        Self::default()
            .with_record_serializer("json_v1", json_v1.clone())
            .with_search_serializer("json_v1", json_v1)
            .with_loader("json_v1", Arc::new(JsonV1Loader))
            .with_minter("recid", Arc::new(RecidMinter::default()))
            .with_fetcher("recid", Arc::new(RecidFetcher::default()))
            .with_permission_factory("allow_all", Arc::new(AllowAll))
            .with_permission_factory("deny_all", Arc::new(DenyAll))
            .with_permission_factory("authenticated_user", Arc::new(AuthenticatedUser))
            .with_permission_factory("record_owner", Arc::new(RecordOwner))
            .with_permission_factory("admin_role", Arc::new(AdminRole))
            .with_links_factory("default", Arc::new(DefaultLinksFactory))
    }

    /// Registers a record serializer.
    pub fn with_record_serializer(
        mut self,
        name: impl Into<String>,
        serializer: Arc<dyn RecordSerializer>,
    ) -> Self {
        self.record_serializers.insert(name.into(), serializer);
        self
    }

    /// Registers a search serializer.
    pub fn with_search_serializer(
        mut self,
        name: impl Into<String>,
        serializer: Arc<dyn SearchSerializer>,
    ) -> Self {
        self.search_serializers.insert(name.into(), serializer);
        self
    }

    /// Registers a loader.
    pub fn with_loader(mut self, name: impl Into<String>, loader: Arc<dyn RecordLoader>) -> Self {
        self.loaders.insert(name.into(), loader);
        self
    }

    /// Registers a minter.
    pub fn with_minter(mut self, name: impl Into<String>, minter: Arc<dyn PidMinter>) -> Self {
        self.minters.insert(name.into(), minter);
        self
    }

    /// Registers a fetcher.
    pub fn with_fetcher(mut self, name: impl Into<String>, fetcher: Arc<dyn PidFetcher>) -> Self {
        self.fetchers.insert(name.into(), fetcher);
        self
    }

    /// Registers a permission factory.
    pub fn with_permission_factory(
        mut self,
        name: impl Into<String>,
        factory: Arc<dyn PermissionFactory>,
    ) -> Self {
        self.permission_factories.insert(name.into(), factory);
        self
    }

    /// Registers a links factory.
    pub fn with_links_factory(
        mut self,
        name: impl Into<String>,
        factory: Arc<dyn LinksFactory>,
    ) -> Self {
        self.links_factories.insert(name.into(), factory);
        self
    }

    /// Sets the factory used by endpoints that do not configure `action`.
    pub fn with_default_permission(
        mut self,
        action: Action,
        factory: Option<Arc<dyn PermissionFactory>>,
    ) -> Self {
        match factory {
            Some(factory) => self.default_permissions.insert(action, factory),
            None => self.default_permissions.remove(&action),
        };
        self
    }

    /// Looks up a record serializer.
    pub fn record_serializer(&self, name: &str) -> Option<Arc<dyn RecordSerializer>> {
        self.record_serializers.get(name).cloned()
    }

    /// Looks up a search serializer.
    pub fn search_serializer(&self, name: &str) -> Option<Arc<dyn SearchSerializer>> {
        self.search_serializers.get(name).cloned()
    }

    /// Looks up a loader.
    pub fn loader(&self, name: &str) -> Option<Arc<dyn RecordLoader>> {
        self.loaders.get(name).cloned()
    }

    /// Looks up a minter.
    pub fn minter(&self, name: &str) -> Option<Arc<dyn PidMinter>> {
        self.minters.get(name).cloned()
    }

    /// Looks up a fetcher.
    pub fn fetcher(&self, name: &str) -> Option<Arc<dyn PidFetcher>> {
        self.fetchers.get(name).cloned()
    }

    /// Looks up a permission factory.
    pub fn permission_factory(&self, name: &str) -> Option<Arc<dyn PermissionFactory>> {
        self.permission_factories.get(name).cloned()
    }

    /// Looks up a links factory.
    pub fn links_factory(&self, name: &str) -> Option<Arc<dyn LinksFactory>> {
        self.links_factories.get(name).cloned()
    }

    /// The default factory of an action.
    pub fn default_permission(&self, action: Action) -> Option<Arc<dyn PermissionFactory>> {
        self.default_permissions.get(&action).cloned()
    }
}
