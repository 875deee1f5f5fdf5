//! Permission checks.
//!
//! Each endpoint action is guarded by an optional [`PermissionFactory`].
//! The factory is asked for a [`Permission`] per check; a missing factory
//! allows everything. A denied anonymous caller gets 401, a denied
//! authenticated caller 403.

use std::fmt::Debug;

use pidrest_persistence::types::StoredRecord;
use serde_json::Value;
use tracing::debug;

use crate::error::{RestError, RestResult};
use crate::extractors::Identity;

/// Document field listing the user ids that own a record.
pub const OWNERS_FIELD: &str = "owners";

/// Role granted everything by [`AdminRole`].
pub const ADMIN_ROLE: &str = "admin";

/// Guarded endpoint actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// `POST {list_route}`.
    Create,
    /// `GET {item_route}`.
    Read,
    /// `PUT` / `PATCH {item_route}`.
    Update,
    /// `DELETE {item_route}`.
    Delete,
    /// `GET {list_route}`.
    List,
}

impl Action {
    /// Every action.
    pub const ALL: [Action; 5] = [
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
        Action::List,
    ];

    /// Endpoint configuration key naming the action's factory.
    pub fn config_key(&self) -> &'static str {
        match self {
            Action::Create => "create_permission_factory_imp",
            Action::Read => "read_permission_factory_imp",
            Action::Update => "update_permission_factory_imp",
            Action::Delete => "delete_permission_factory_imp",
            Action::List => "list_permission_factory_imp",
        }
    }
}

/// What a permission is checked against.
#[derive(Debug, Clone, Copy)]
pub enum PermissionTarget<'a> {
    /// The collection, before any body is read.
    Collection,
    /// A document about to be stored.
    Candidate(&'a Value),
    /// An existing record.
    Record(&'a StoredRecord),
}

impl<'a> PermissionTarget<'a> {
    /// The document under check, if any.
    pub fn document(self) -> Option<&'a Value> {
        match self {
            PermissionTarget::Collection => None,
            PermissionTarget::Candidate(doc) => Some(doc),
            PermissionTarget::Record(record) => Some(record.payload()),
        }
    }
}

/// The outcome of a permission factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permission {
    allowed: bool,
}

impl Permission {
    /// A granting permission.
    pub fn allow() -> Self {
        Self { allowed: true }
    }

    /// A refusing permission.
    pub fn deny() -> Self {
        Self { allowed: false }
    }

    /// Whether the action may proceed.
    pub fn can(&self) -> bool {
        self.allowed
    }
}

impl From<bool> for Permission {
    fn from(allowed: bool) -> Self {
        Self { allowed }
    }
}

/// Produces permissions for an identity and a target.
pub trait PermissionFactory: Send + Sync + Debug {
    /// Builds the permission for `identity` acting on `target`.
    fn create(&self, identity: &Identity, target: &PermissionTarget<'_>) -> Permission;
}

/// Checks a permission, mapping a refusal to 401 or 403.
pub fn check_permission(
    factory: Option<&dyn PermissionFactory>,
    identity: &Identity,
    target: PermissionTarget<'_>,
) -> RestResult<()> {
    let Some(factory) = factory else {
        return Ok(());
    };
    if factory.create(identity, &target).can() {
        return Ok(());
    }

    debug!(
        user = identity.user_id().unwrap_or("anonymous"),
        factory = ?factory,
        "Permission denied"
    );
    if identity.is_authenticated() {
        Err(RestError::Forbidden)
    } else {
        Err(RestError::Unauthorized)
    }
}

/// Grants everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionFactory for AllowAll {
    fn create(&self, _identity: &Identity, _target: &PermissionTarget<'_>) -> Permission {
        Permission::allow()
    }
}

/// Refuses everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl PermissionFactory for DenyAll {
    fn create(&self, _identity: &Identity, _target: &PermissionTarget<'_>) -> Permission {
        Permission::deny()
    }
}

/// Grants any authenticated caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticatedUser;

impl PermissionFactory for AuthenticatedUser {
    fn create(&self, identity: &Identity, _target: &PermissionTarget<'_>) -> Permission {
        identity.is_authenticated().into()
    }
}

/// Grants callers listed in the document's `owners` array.
///
/// At collection level any authenticated caller passes; ownership is
/// checked once a document is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordOwner;

impl PermissionFactory for RecordOwner {
    fn create(&self, identity: &Identity, target: &PermissionTarget<'_>) -> Permission {
        let Some(user_id) = identity.user_id() else {
            return Permission::deny();
        };
        let Some(document) = target.document() else {
            return Permission::allow();
        };
        document
            .get(OWNERS_FIELD)
            .and_then(Value::as_array)
            .is_some_and(|owners| owners.iter().any(|owner| owner_matches(owner, user_id)))
            .into()
    }
}

fn owner_matches(owner: &Value, user_id: &str) -> bool {
    match owner {
        Value::String(s) => s == user_id,
        Value::Number(n) => n.to_string() == user_id,
        _ => false,
    }
}

/// Grants callers holding the `admin` role.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminRole;

impl PermissionFactory for AdminRole {
    fn create(&self, identity: &Identity, _target: &PermissionTarget<'_>) -> Permission {
        identity.has_role(ADMIN_ROLE).into()
    }
}
