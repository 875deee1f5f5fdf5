//! PID minters and fetchers.
//!
//! A [`PidMinter`] allocates a new identifier for a record being created and
//! binds it inside the creating transaction. A [`PidFetcher`] recovers the
//! identifier from a stored document, which is how search hits are turned
//! back into addressable records.

use std::fmt::Debug;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::Transaction;
use crate::error::{PidError, StorageResult};
use crate::types::{PersistentIdentifier, PidRef};

/// PID type used by the record-id minter.
pub const RECID_PID_TYPE: &str = "recid";

/// Document field the record-id minter writes the value into.
pub const RECID_FIELD: &str = "control_number";

/// Allocates and binds identifiers for new records.
#[async_trait]
pub trait PidMinter: Send + Sync + Debug {
    /// PID type of the identifiers this minter allocates.
    fn pid_type(&self) -> &str;

    /// Mints an identifier for `object_uuid`.
    ///
    /// The minter may write the identifier into `data`.
    async fn mint(
        &self,
        tx: &mut dyn Transaction,
        object_uuid: Uuid,
        data: &mut Value,
    ) -> StorageResult<PersistentIdentifier>;

    /// Carries the minted field from `previous` into a replacement document.
    ///
    /// Called on every update so clients can neither drop nor rewrite the
    /// identifier a record was minted with.
    fn preserve(&self, _previous: &Value, _next: &mut Value) {}
}

/// Recovers the identifier of a stored document.
pub trait PidFetcher: Send + Sync + Debug {
    /// PID type of the identifiers this fetcher returns.
    fn pid_type(&self) -> &str;

    /// Returns the identifier stored in `data`.
    fn fetch(&self, object_uuid: Uuid, data: &Value) -> StorageResult<PidRef>;
}

/// Sequential integer identifiers of type `recid`.
#[derive(Debug, Clone)]
pub struct RecidMinter {
    pid_type: String,
    field: String,
}

impl Default for RecidMinter {
    fn default() -> Self {
        Self {
            pid_type: RECID_PID_TYPE.to_string(),
            field: RECID_FIELD.to_string(),
        }
    }
}

impl RecidMinter {
    /// Creates a minter for a custom pid type, writing into `field`.
    pub fn new(pid_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            pid_type: pid_type.into(),
            field: field.into(),
        }
    }
}

#[async_trait]
impl PidMinter for RecidMinter {
    fn pid_type(&self) -> &str {
        &self.pid_type
    }

    async fn mint(
        &self,
        tx: &mut dyn Transaction,
        object_uuid: Uuid,
        data: &mut Value,
    ) -> StorageResult<PersistentIdentifier> {
        let Some(object) = data.as_object_mut() else {
            return Err(PidError::MissingValue {
                field: self.field.clone(),
                object_uuid,
            }
            .into());
        };
        if object.contains_key(&self.field) {
            return Err(PidError::PresetValue {
                minter: self.pid_type.clone(),
                field: self.field.clone(),
            }
            .into());
        }

        let value = tx.next_sequence_value(&self.pid_type).await?.to_string();
        let pid = PersistentIdentifier::registered(&self.pid_type, &value, object_uuid);
        tx.create_pid(&pid).await?;
        object.insert(self.field.clone(), Value::String(value));

        tracing::debug!(pid = %pid, object_uuid = %object_uuid, "Minted persistent identifier");
        Ok(pid)
    }

    fn preserve(&self, previous: &Value, next: &mut Value) {
        let (Some(value), Some(object)) = (previous.get(&self.field), next.as_object_mut()) else {
            return;
        };
        object.insert(self.field.clone(), value.clone());
    }
}

/// Reads `recid` identifiers back out of `control_number`.
#[derive(Debug, Clone)]
pub struct RecidFetcher {
    pid_type: String,
    field: String,
}

impl Default for RecidFetcher {
    fn default() -> Self {
        Self {
            pid_type: RECID_PID_TYPE.to_string(),
            field: RECID_FIELD.to_string(),
        }
    }
}

impl RecidFetcher {
    /// Creates a fetcher for a custom pid type, reading `field`.
    pub fn new(pid_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            pid_type: pid_type.into(),
            field: field.into(),
        }
    }
}

impl PidFetcher for RecidFetcher {
    fn pid_type(&self) -> &str {
        &self.pid_type
    }

    fn fetch(&self, object_uuid: Uuid, data: &Value) -> StorageResult<PidRef> {
        let value = match data.get(&self.field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(PidError::MissingValue {
                    field: self.field.clone(),
                    object_uuid,
                }
                .into());
            }
        };
        Ok(PidRef::new(&self.pid_type, value))
    }
}
