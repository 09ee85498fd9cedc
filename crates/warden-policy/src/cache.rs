//! Role-keyed in-memory index of active policy documents.
//!
//! `PolicyCache` holds an immutable `RoleIndex` snapshot behind an `RwLock`.
//! `load` runs under a separate load lock, so reloads never interleave: the
//! store read and the swap of one load both finish before the next load
//! reads the store. The index itself is built without the `RwLock` and
//! swapped in under a short write lock; `lookup` clones the current `Arc`
//! under a read lock and works on the snapshot.
//!
//! Consistency: an evaluation that takes its snapshot before a concurrent
//! `load` completes sees the previous policy set. Callers get eventual
//! consistency, never a half-built index, and the last load to finish
//! always reflects the latest store state it could observe.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use tracing::{error, info};
use uuid::Uuid;

use warden_contracts::{
    error::{WardenError, WardenResult},
    policy::{PolicyDocument, Principal},
};
use warden_core::traits::PolicyStore;

#[derive(Debug, Default)]
struct RoleIndex {
    by_role: HashMap<String, Vec<Arc<PolicyDocument>>>,
    wildcard: Vec<Arc<PolicyDocument>>,
    documents: usize,
    version: u64,
    last_loaded: Option<DateTime<Utc>>,
}

impl RoleIndex {
    fn build(docs: Vec<PolicyDocument>) -> Self {
        let mut index = RoleIndex {
            documents: docs.len(),
            last_loaded: Some(Utc::now()),
            ..RoleIndex::default()
        };

        for doc in docs.into_iter().map(Arc::new) {
            // One bucket entry per distinct principal. A role literally
            // named "*" is an ordinary role, not the wildcard.
            let buckets: Vec<Option<String>> = doc
                .principals()
                .into_iter()
                .map(|p| match p {
                    Principal::Any => None,
                    Principal::Role(name) => Some(name.clone()),
                })
                .collect();

            for bucket in buckets {
                match bucket {
                    None => index.wildcard.push(Arc::clone(&doc)),
                    Some(role) => index.by_role.entry(role).or_default().push(Arc::clone(&doc)),
                }
            }
        }
        index
    }
}

/// Point-in-time counters describing the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Active documents indexed by the last successful load.
    pub documents: usize,
    /// Distinct role names with at least one bucketed document.
    pub roles: usize,
    /// Documents with at least one wildcard-principal statement.
    pub wildcard_documents: usize,
    /// Incremented by every successful load. Zero before the first.
    pub version: u64,
    pub last_loaded: Option<DateTime<Utc>>,
}

/// In-memory index of active documents, keyed by role.
pub struct PolicyCache {
    store: Arc<dyn PolicyStore>,
    index: RwLock<Arc<RoleIndex>>,
    /// Held across the store read and the swap of one `load`.
    load_lock: Mutex<()>,
}

impl PolicyCache {
    /// An empty cache over `store`. Call `load` before evaluating.
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        Self {
            store,
            index: RwLock::new(Arc::new(RoleIndex::default())),
            load_lock: Mutex::new(()),
        }
    }

    /// The store this cache reads from.
    pub fn store(&self) -> &Arc<dyn PolicyStore> {
        &self.store
    }

    /// Rebuild the index from every active document in the store.
    ///
    /// On failure the previous index stays in place and the store error is
    /// returned.
    pub fn load(&self) -> WardenResult<()> {
        let _loading = self.load_lock.lock().map_err(|e| WardenError::Store {
            reason: format!("policy cache load lock poisoned: {e}"),
        })?;

        let docs = match self.store.get_active() {
            Ok(docs) => docs,
            Err(e) => {
                error!(error = %e, "failed to load policies; keeping previous index");
                return Err(e);
            }
        };

        let mut fresh = RoleIndex::build(docs);
        let (documents, roles) = (fresh.documents, fresh.by_role.len());

        let version = {
            let mut guard = self.index.write().map_err(|e| WardenError::Store {
                reason: format!("policy cache lock poisoned: {e}"),
            })?;
            fresh.version = guard.version + 1;
            let version = fresh.version;
            *guard = Arc::new(fresh);
            version
        };

        info!(documents, roles, version, "policy cache loaded");
        Ok(())
    }

    /// Documents applying to `role`: the role bucket followed by the
    /// wildcard bucket, each document at most once.
    pub fn lookup(&self, role: &str) -> WardenResult<Vec<Arc<PolicyDocument>>> {
        let index = self.snapshot()?;

        let mut seen: HashSet<Uuid> = HashSet::new();
        let docs = index
            .by_role
            .get(role)
            .into_iter()
            .flatten()
            .chain(index.wildcard.iter())
            .filter(|doc| seen.insert(doc.id))
            .cloned()
            .collect();
        Ok(docs)
    }

    pub fn stats(&self) -> WardenResult<CacheStats> {
        let index = self.snapshot()?;
        Ok(CacheStats {
            documents: index.documents,
            roles: index.by_role.len(),
            wildcard_documents: index.wildcard.len(),
            version: index.version,
            last_loaded: index.last_loaded,
        })
    }

    fn snapshot(&self) -> WardenResult<Arc<RoleIndex>> {
        self.index
            .read()
            .map(|guard| Arc::clone(&*guard))
            .map_err(|e| WardenError::Store {
                reason: format!("policy cache lock poisoned: {e}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use warden_contracts::error::WardenError;
    use warden_contracts::request::{PermissionRequest, PermissionResponse};
    use warden_core::traits::PolicyEngine;
    use warden_store::InMemoryPolicyStore;

    use super::PolicyCache;
    use crate::CachedPolicyEngine;

    fn poisoned_cache() -> PolicyCache {
        let cache = PolicyCache::new(Arc::new(InMemoryPolicyStore::new()));
        std::thread::scope(|s| {
            let writer = s.spawn(|| {
                let _guard = cache.index.write().unwrap();
                panic!("writer dies holding the index lock");
            });
            assert!(writer.join().is_err());
        });
        cache
    }

    // ── Poisoned index ───────────────────────────────────────────────────────

    /// A poisoned index surfaces as a store error from `evaluate`, not as
    /// a refusal.
    #[test]
    fn test_poisoned_index_fails_evaluation() {
        let engine = CachedPolicyEngine::with_cache(poisoned_cache());
        let request = PermissionRequest::new(Uuid::new_v4(), "admin", "product:read", "read");

        assert!(matches!(engine.evaluate(&request), Err(WardenError::Store { .. })));
        assert!(matches!(engine.cache_stats(), Err(WardenError::Store { .. })));

        let response = engine.decide(&request);
        assert!(!response.allowed);
        assert_eq!(response.reason, PermissionResponse::NO_POLICIES_FOR_ROLE);
    }
}
