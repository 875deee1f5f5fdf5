//! Persistent identifier types.
//!
//! A [`PersistentIdentifier`] is a stable external name (e.g. `recid:12`)
//! that is bound to a stored record, not yet bound, tombstoned, or pointing
//! at another identifier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Object type used for records.
pub const RECORD_OBJECT_TYPE: &str = "rec";

/// Lifecycle state of a persistent identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PidStatus {
    /// Allocated but nothing is registered under it yet.
    Reserved,
    /// Bound to an object.
    Registered,
    /// Tombstoned. Terminal.
    Deleted,
    /// Points at another identifier.
    Redirected,
}

impl PidStatus {
    /// Single-character code used in storage.
    pub fn code(&self) -> &'static str {
        match self {
            PidStatus::Reserved => "K",
            PidStatus::Registered => "R",
            PidStatus::Deleted => "D",
            PidStatus::Redirected => "M",
        }
    }

    /// Parses a storage code produced by [`PidStatus::code`].
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "K" => Some(PidStatus::Reserved),
            "R" => Some(PidStatus::Registered),
            "D" => Some(PidStatus::Deleted),
            "M" => Some(PidStatus::Redirected),
            _ => None,
        }
    }

    /// Returns whether moving from `self` to `next` is allowed.
    ///
    /// Deletion is monotonic: nothing leaves `Deleted`.
    pub fn can_transition_to(&self, next: PidStatus) -> bool {
        !matches!(self, PidStatus::Deleted) || next == PidStatus::Deleted
    }
}

impl fmt::Display for PidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PidStatus::Reserved => "RESERVED",
            PidStatus::Registered => "REGISTERED",
            PidStatus::Deleted => "DELETED",
            PidStatus::Redirected => "REDIRECTED",
        };
        f.write_str(name)
    }
}

impl FromStr for PidStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RESERVED" => Ok(PidStatus::Reserved),
            "REGISTERED" => Ok(PidStatus::Registered),
            "DELETED" => Ok(PidStatus::Deleted),
            "REDIRECTED" => Ok(PidStatus::Redirected),
            other => Err(format!("unknown pid status: {}", other)),
        }
    }
}

/// A `(pid_type, pid_value)` pair naming an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PidRef {
    /// Identifier scheme, e.g. `recid` or `doi`.
    pub pid_type: String,
    /// Value, unique within the scheme.
    pub pid_value: String,
}

impl PidRef {
    /// Creates a new reference.
    pub fn new(pid_type: impl Into<String>, pid_value: impl Into<String>) -> Self {
        Self {
            pid_type: pid_type.into(),
            pid_value: pid_value.into(),
        }
    }
}

impl fmt::Display for PidRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pid_type, self.pid_value)
    }
}

/// A persistent identifier as stored in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentIdentifier {
    pid_type: String,
    pid_value: String,
    status: PidStatus,
    object_type: Option<String>,
    object_uuid: Option<Uuid>,
    redirect: Option<PidRef>,
}

impl PersistentIdentifier {
    /// Creates a registered identifier bound to a record.
    pub fn registered(
        pid_type: impl Into<String>,
        pid_value: impl Into<String>,
        object_uuid: Uuid,
    ) -> Self {
        Self {
            pid_type: pid_type.into(),
            pid_value: pid_value.into(),
            status: PidStatus::Registered,
            object_type: Some(RECORD_OBJECT_TYPE.to_string()),
            object_uuid: Some(object_uuid),
            redirect: None,
        }
    }

    /// Creates a reserved identifier with no object.
    pub fn reserved(pid_type: impl Into<String>, pid_value: impl Into<String>) -> Self {
        Self {
            pid_type: pid_type.into(),
            pid_value: pid_value.into(),
            status: PidStatus::Reserved,
            object_type: None,
            object_uuid: None,
            redirect: None,
        }
    }

    /// Creates an identifier from stored columns.
    pub fn from_storage(
        pid_type: impl Into<String>,
        pid_value: impl Into<String>,
        status: PidStatus,
        object_type: Option<String>,
        object_uuid: Option<Uuid>,
        redirect: Option<PidRef>,
    ) -> Self {
        Self {
            pid_type: pid_type.into(),
            pid_value: pid_value.into(),
            status,
            object_type,
            object_uuid,
            redirect,
        }
    }

    /// Returns a copy with a different status.
    pub fn with_status(mut self, status: PidStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns a copy with an object binding of an explicit type.
    pub fn with_object(mut self, object_type: impl Into<String>, object_uuid: Uuid) -> Self {
        self.object_type = Some(object_type.into());
        self.object_uuid = Some(object_uuid);
        self
    }

    /// Returns a copy with the object binding removed.
    pub fn without_object(mut self) -> Self {
        self.object_type = None;
        self.object_uuid = None;
        self
    }

    /// Returns the identifier scheme.
    pub fn pid_type(&self) -> &str {
        &self.pid_type
    }

    /// Returns the identifier value.
    pub fn pid_value(&self) -> &str {
        &self.pid_value
    }

    /// Returns the lifecycle state.
    pub fn status(&self) -> PidStatus {
        self.status
    }

    /// Returns the bound object type, if any.
    pub fn object_type(&self) -> Option<&str> {
        self.object_type.as_deref()
    }

    /// Returns the bound object id, if any.
    pub fn object_uuid(&self) -> Option<Uuid> {
        self.object_uuid
    }

    /// Returns the redirect target, if any.
    pub fn redirect(&self) -> Option<&PidRef> {
        self.redirect.as_ref()
    }

    /// Returns the `(pid_type, pid_value)` pair.
    pub fn to_ref(&self) -> PidRef {
        PidRef::new(&self.pid_type, &self.pid_value)
    }

    /// Returns true if the identifier is bound and resolvable.
    pub fn is_registered(&self) -> bool {
        self.status == PidStatus::Registered
    }

    /// Returns true if the identifier has been tombstoned.
    pub fn is_deleted(&self) -> bool {
        self.status == PidStatus::Deleted
    }

    /// Returns true if the identifier points elsewhere.
    pub fn is_redirected(&self) -> bool {
        self.status == PidStatus::Redirected
    }
}

impl fmt::Display for PersistentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pid_type, self.pid_value)
    }
}
