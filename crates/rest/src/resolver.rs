//! PID resolution.
//!
//! Every item request starts by turning the `{pid_value}` path segment into
//! a live record. The outcome is total: each identifier state maps to
//! exactly one [`ResolveError`] variant or to a [`ResolvedPid`].
//!
//! | State | Outcome |
//! |-------|---------|
//! | absent | `NotFound` |
//! | RESERVED | `Unregistered` |
//! | DELETED | `Deleted` |
//! | REDIRECTED | `Redirected`, or `RedirectTargetUnroutable` / `ResolveFailed` |
//! | REGISTERED, no record object | `MissingObject` |
//! | REGISTERED | the record, or `ResolveFailed` |

use std::sync::Arc;

use pidrest_persistence::core::{PidRegistry, RecordStorage};
use pidrest_persistence::types::{
    PersistentIdentifier, PidRef, PidStatus, RECORD_OBJECT_TYPE, StoredRecord,
};
use thiserror::Error;
use tracing::error;

use crate::links::RouteTable;

/// A registered identifier together with its record.
#[derive(Debug, Clone)]
pub struct ResolvedPid {
    /// The identifier.
    pub pid: PersistentIdentifier,
    /// The record it is bound to.
    pub record: StoredRecord,
}

/// Why an identifier did not resolve to a record.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No identifier with this value.
    #[error("{pid} does not exist")]
    NotFound {
        /// Requested identifier.
        pid: PidRef,
    },

    /// The identifier is only reserved.
    #[error("{pid} is not registered")]
    Unregistered {
        /// Requested identifier.
        pid: PidRef,
    },

    /// The identifier was deleted.
    #[error("{pid} has been deleted")]
    Deleted {
        /// Requested identifier.
        pid: PidRef,
    },

    /// The identifier points elsewhere.
    #[error("{pid} redirects to {destination}")]
    Redirected {
        /// Requested identifier.
        pid: PidRef,
        /// Redirect target.
        destination: PidRef,
        /// Absolute item URL of the target.
        location: String,
    },

    /// The redirect target belongs to no endpoint.
    #[error("{pid} redirects to {destination}, which no endpoint serves")]
    RedirectTargetUnroutable {
        /// Requested identifier.
        pid: PidRef,
        /// Redirect target.
        destination: PidRef,
    },

    /// The identifier is registered without a record.
    #[error("no object assigned to {pid}")]
    MissingObject {
        /// Requested identifier.
        pid: PidRef,
    },

    /// The registry or record store failed.
    #[error("{pid} could not be resolved: {reason}")]
    ResolveFailed {
        /// Requested identifier.
        pid: PidRef,
        /// Underlying cause, for the log only.
        reason: String,
    },
}

/// Resolves identifiers of one PID type to records.
#[derive(Debug, Clone)]
pub struct PidResolver {
    pid_type: String,
    object_type: String,
    routes: Arc<RouteTable>,
}

impl PidResolver {
    /// Creates a resolver for `pid_type` bound to record objects.
    pub fn new(pid_type: impl Into<String>, routes: Arc<RouteTable>) -> Self {
        Self {
            pid_type: pid_type.into(),
            object_type: RECORD_OBJECT_TYPE.to_string(),
            routes,
        }
    }

    /// The PID type this resolver serves.
    pub fn pid_type(&self) -> &str {
        &self.pid_type
    }

    /// Resolves `pid_value` against the registry and the record store.
    ///
    /// Read-only; redirects are followed one hop.
    pub async fn resolve<S>(&self, store: &S, pid_value: &str) -> Result<ResolvedPid, ResolveError>
    where
        S: PidRegistry + RecordStorage + ?Sized,
    {
        let requested = PidRef::new(&self.pid_type, pid_value);
        let pid = match store.get_pid(&self.pid_type, pid_value).await {
            Ok(Some(pid)) => pid,
            Ok(None) => return Err(ResolveError::NotFound { pid: requested }),
            Err(e) => return Err(failed(requested, e.to_string())),
        };

        match pid.status() {
            PidStatus::Reserved => Err(ResolveError::Unregistered { pid: requested }),
            PidStatus::Deleted => Err(ResolveError::Deleted { pid: requested }),
            PidStatus::Redirected => self.follow_redirect(store, &pid).await,
            PidStatus::Registered => self.fetch_object(store, pid).await,
        }
    }

    async fn follow_redirect<S>(
        &self,
        store: &S,
        pid: &PersistentIdentifier,
    ) -> Result<ResolvedPid, ResolveError>
    where
        S: PidRegistry + RecordStorage + ?Sized,
    {
        let Some(target) = pid.redirect() else {
            return Err(failed(pid.to_ref(), "redirect without target".to_string()));
        };
        let destination = match store.get_pid(&target.pid_type, &target.pid_value).await {
            Ok(Some(destination)) => destination.to_ref(),
            Ok(None) => {
                return Err(failed(pid.to_ref(), format!("redirect target {} is missing", target)));
            }
            Err(e) => return Err(failed(pid.to_ref(), e.to_string())),
        };

        match self.routes.item_url(&destination) {
            Some(location) => Err(ResolveError::Redirected {
                pid: pid.to_ref(),
                destination,
                location,
            }),
            None => {
                error!(pid = %pid, destination = %destination, "Redirect target has no endpoint");
                Err(ResolveError::RedirectTargetUnroutable {
                    pid: pid.to_ref(),
                    destination,
                })
            }
        }
    }

    async fn fetch_object<S>(
        &self,
        store: &S,
        pid: PersistentIdentifier,
    ) -> Result<ResolvedPid, ResolveError>
    where
        S: PidRegistry + RecordStorage + ?Sized,
    {
        let object_uuid = match (pid.object_type(), pid.object_uuid()) {
            (Some(object_type), Some(uuid)) if object_type == self.object_type => uuid,
            _ => {
                error!(pid = %pid, object_type = ?pid.object_type(), "No record bound to identifier");
                return Err(ResolveError::MissingObject { pid: pid.to_ref() });
            }
        };

        let record = store
            .read_record(object_uuid)
            .await
            .map_err(|e| failed(pid.to_ref(), e.to_string()))?;
        if record.is_deleted() {
            return Err(ResolveError::Deleted { pid: pid.to_ref() });
        }

        Ok(ResolvedPid { pid, record })
    }
}

fn failed(pid: PidRef, reason: String) -> ResolveError {
    error!(pid = %pid, reason = %reason, "PID could not be resolved");
    ResolveError::ResolveFailed { pid, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pidrest_persistence::error::{BackendError, RecordError, StorageError, StorageResult};
    use serde_json::json;
    use std::collections::HashMap;
    use uuid::Uuid;

    /// Registry and record store backed by plain maps.
    #[derive(Default)]
    struct MockStore {
        pids: HashMap<(String, String), PersistentIdentifier>,
        records: HashMap<Uuid, StoredRecord>,
        broken: bool,
    }

    impl MockStore {
        fn with_pid(mut self, pid: PersistentIdentifier) -> Self {
            self.pids
                .insert((pid.pid_type().to_string(), pid.pid_value().to_string()), pid);
            self
        }

        fn with_record(mut self, record: StoredRecord) -> Self {
            self.records.insert(record.id(), record);
            self
        }
    }

    #[async_trait]
    impl PidRegistry for MockStore {
        async fn get_pid(
            &self,
            pid_type: &str,
            pid_value: &str,
        ) -> StorageResult<Option<PersistentIdentifier>> {
            if self.broken {
                return Err(StorageError::Backend(BackendError::PoolExhausted {
                    backend_name: "mock".to_string(),
                }));
            }
            Ok(self
                .pids
                .get(&(pid_type.to_string(), pid_value.to_string()))
                .cloned())
        }

        async fn pids_for_object(&self, _object_uuid: Uuid) -> StorageResult<Vec<PersistentIdentifier>> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl RecordStorage for MockStore {
        fn backend_name(&self) -> &'static str {
            "mock"
        }

        async fn read_record(&self, id: Uuid) -> StorageResult<StoredRecord> {
            self.records
                .get(&id)
                .cloned()
                .ok_or(StorageError::Record(RecordError::NotFound { id }))
        }

        async fn record_revisions(&self, id: Uuid) -> StorageResult<Vec<StoredRecord>> {
            Ok(self.records.get(&id).cloned().into_iter().collect())
        }
    }

    fn resolver() -> PidResolver {
        let mut routes = RouteTable::new("http://localhost").unwrap();
        routes.insert("recid", "/records/{pid_value}");
        PidResolver::new("recid", Arc::new(routes))
    }

    fn redirected(value: &str, target: PidRef) -> PersistentIdentifier {
        PersistentIdentifier::from_storage("recid", value, PidStatus::Redirected, None, None, Some(target))
    }

    #[tokio::test]
    async fn test_registered_resolves_to_record() {
        let id = Uuid::new_v4();
        let store = MockStore::default()
            .with_pid(PersistentIdentifier::registered("recid", "1", id))
            .with_record(StoredRecord::new(id, "records", json!({"title": "Back to the Future"})));

        let resolved = resolver().resolve(&store, "1").await.unwrap();
        assert_eq!(resolved.pid.pid_value(), "1");
        assert_eq!(resolved.record.payload()["title"], "Back to the Future");
    }

    #[tokio::test]
    async fn test_absent_reserved_and_deleted() {
        let store = MockStore::default()
            .with_pid(PersistentIdentifier::reserved("recid", "2"))
            .with_pid(PersistentIdentifier::reserved("recid", "3").with_status(PidStatus::Deleted));

        let r = resolver();
        assert!(matches!(r.resolve(&store, "1").await, Err(ResolveError::NotFound { .. })));
        assert!(matches!(r.resolve(&store, "2").await, Err(ResolveError::Unregistered { .. })));
        assert!(matches!(r.resolve(&store, "3").await, Err(ResolveError::Deleted { .. })));
    }

    #[tokio::test]
    async fn test_redirect_builds_location() {
        let store = MockStore::default()
            .with_pid(PersistentIdentifier::registered("recid", "1", Uuid::new_v4()))
            .with_pid(redirected("2", PidRef::new("recid", "1")));

        match resolver().resolve(&store, "2").await {
            Err(ResolveError::Redirected { location, destination, .. }) => {
                assert_eq!(location, "http://localhost/records/1");
                assert_eq!(destination, PidRef::new("recid", "1"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_redirect_to_unserved_type() {
        let store = MockStore::default()
            .with_pid(PersistentIdentifier::registered("doi", "10.1/x", Uuid::new_v4()))
            .with_pid(redirected("2", PidRef::new("doi", "10.1/x")));

        assert!(matches!(
            resolver().resolve(&store, "2").await,
            Err(ResolveError::RedirectTargetUnroutable { .. })
        ));
    }

    #[tokio::test]
    async fn test_redirect_to_missing_target_fails() {
        let store = MockStore::default().with_pid(redirected("2", PidRef::new("recid", "9")));
        assert!(matches!(
            resolver().resolve(&store, "2").await,
            Err(ResolveError::ResolveFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_object() {
        let store = MockStore::default().with_pid(PersistentIdentifier::from_storage(
            "recid",
            "1",
            PidStatus::Registered,
            None,
            None,
            None,
        ));
        assert!(matches!(
            resolver().resolve(&store, "1").await,
            Err(ResolveError::MissingObject { .. })
        ));

        let other_object = MockStore::default().with_pid(
            PersistentIdentifier::registered("recid", "1", Uuid::new_v4()).with_object("file", Uuid::new_v4()),
        );
        assert!(matches!(
            resolver().resolve(&other_object, "1").await,
            Err(ResolveError::MissingObject { .. })
        ));
    }

    #[tokio::test]
    async fn test_storage_failures_fail_resolution() {
        let dangling = MockStore::default()
            .with_pid(PersistentIdentifier::registered("recid", "1", Uuid::new_v4()));
        assert!(matches!(
            resolver().resolve(&dangling, "1").await,
            Err(ResolveError::ResolveFailed { .. })
        ));

        let broken = MockStore {
            broken: true,
            ..Default::default()
        };
        assert!(matches!(
            resolver().resolve(&broken, "1").await,
            Err(ResolveError::ResolveFailed { .. })
        ));
    }
}
