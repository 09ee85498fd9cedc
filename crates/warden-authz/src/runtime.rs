//! Assembling store, engine, and service from a `WardenConfig`.

use std::sync::Arc;

use tracing::info;

use warden_contracts::error::{WardenError, WardenResult};
use warden_core::traits::PolicyStore;
use warden_policy::{bootstrap, CachedPolicyEngine};

use crate::config::WardenConfig;
use crate::guard::RouteGuard;
use crate::service::AuthorizationService;

/// The wired authorization core.
pub struct Warden {
    pub engine: Arc<CachedPolicyEngine>,
    pub service: Arc<AuthorizationService>,
}

impl Warden {
    /// Build the core over `store`:
    ///
    /// 1. seed the default policies if enabled and the store is empty,
    /// 2. load the cache,
    /// 3. add every document from the configured policy files, skipping
    ///    names the store already holds.
    pub fn build(config: &WardenConfig, store: Arc<dyn PolicyStore>) -> WardenResult<Self> {
        if config.authorization.bootstrap_defaults {
            let seeded = bootstrap(store.as_ref())?;
            if seeded > 0 {
                info!(documents = seeded, "seeded default policies");
            }
        }

        let engine = Arc::new(CachedPolicyEngine::new(store)?);

        for doc in config.policy_documents()? {
            match engine.add_policy(&doc) {
                Ok(stored) => info!(policy = %stored.name, "loaded policy from file"),
                Err(WardenError::Conflict { .. }) => {
                    info!(policy = %doc.name, "policy already stored; skipping file copy")
                }
                Err(e) => return Err(e),
            }
        }

        let service = AuthorizationService::new(engine.clone())
            .with_known_roles(config.authorization.known_roles.iter().cloned());

        Ok(Self {
            engine,
            service: Arc::new(service),
        })
    }

    /// A route guard checking against this core's service.
    pub fn route_guard(&self) -> RouteGuard {
        RouteGuard::new(self.service.clone())
    }
}
