//! # warden-policy
//!
//! The statement-based, deny-overrides policy engine for the Warden
//! authorization core.
//!
//! ## Overview
//!
//! [`CachedPolicyEngine`] implements the
//! [`PolicyEngine`](warden_core::traits::PolicyEngine) trait on top of a
//! [`PolicyCache`], a role-keyed index of the store's active documents.
//! Every statement of every candidate document is tested; a single matching
//! `deny` vetoes all matching `allow`s. No match at all is a deny.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! let store: Arc<dyn PolicyStore> = Arc::new(InMemoryPolicyStore::new());
//! warden_policy::bootstrap(store.as_ref())?;
//! let engine = CachedPolicyEngine::new(store)?;
//! ```
//!
//! Documents may also be declared in TOML and loaded with [`PolicyFile`].

pub mod bootstrap;
pub mod cache;
pub mod engine;
pub mod file;

pub use bootstrap::{bootstrap, default_policies};
pub use cache::{CacheStats, PolicyCache};
pub use engine::CachedPolicyEngine;
pub use file::PolicyFile;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use serde_json::json;
    use uuid::Uuid;

    use warden_contracts::error::{WardenError, WardenResult};
    use warden_contracts::policy::{Conditions, PolicyDocument, PolicyStatement, Principal};
    use warden_contracts::request::{PermissionRequest, PermissionResponse};
    use warden_core::traits::{PolicyEngine, PolicyStore};
    use warden_store::InMemoryPolicyStore;

    use crate::bootstrap::{ADMIN_FULL_ACCESS, USER_PRODUCT_ACCESS};
    use crate::{bootstrap, CachedPolicyEngine, PolicyCache, PolicyFile};

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// An engine over a fresh store seeded with `docs`.
    fn engine_with(docs: Vec<PolicyDocument>) -> (Arc<InMemoryPolicyStore>, CachedPolicyEngine) {
        let store = Arc::new(InMemoryPolicyStore::new());
        for doc in &docs {
            store.create(doc).unwrap();
        }
        let engine = CachedPolicyEngine::new(store.clone()).unwrap();
        (store, engine)
    }

    /// An engine over a store holding only the default policies.
    fn bootstrapped() -> (Arc<InMemoryPolicyStore>, CachedPolicyEngine) {
        let store = Arc::new(InMemoryPolicyStore::new());
        bootstrap(store.as_ref()).unwrap();
        let engine = CachedPolicyEngine::new(store.clone()).unwrap();
        (store, engine)
    }

    fn request(role: &str, resource: &str, action: &str) -> PermissionRequest {
        PermissionRequest::new(Uuid::new_v4(), role, resource, action)
    }

    fn doc(name: &str, statements: Vec<PolicyStatement>) -> PolicyDocument {
        PolicyDocument::new(name, statements)
    }

    fn user() -> Principal {
        Principal::role("user")
    }

    // ── 1. conflict resolution ────────────────────────────────────────────────

    /// A matching deny wins over a matching allow, whichever is stored first.
    #[test]
    fn test_deny_overrides_allow_regardless_of_order() {
        let allow = || doc("allow-delete", vec![PolicyStatement::allow(user(), "delete", "product:delete")]);
        let deny = || doc("deny-delete", vec![PolicyStatement::deny(user(), "delete", "product:delete")]);

        for docs in [vec![allow(), deny()], vec![deny(), allow()]] {
            let (_, engine) = engine_with(docs);
            let response = engine.decide(&request("user", "product:delete", "delete"));
            assert!(!response.allowed);
            assert_eq!(response.reason, PermissionResponse::DENIED_BY_POLICY);
            assert_eq!(response.policies, vec!["deny-delete".to_string()]);
        }
    }

    /// Deny and allow inside the same document behave the same way.
    #[test]
    fn test_deny_overrides_allow_within_one_document() {
        let (_, engine) = engine_with(vec![doc(
            "mixed",
            vec![
                PolicyStatement::allow(user(), "*", "*"),
                PolicyStatement::deny(user(), "delete", "*"),
            ],
        )]);
        assert!(!engine.decide(&request("user", "product:delete", "delete")).allowed);
        assert!(engine.decide(&request("user", "product:read", "read")).allowed);
    }

    /// Allowed responses name every document that matched.
    #[test]
    fn test_allowed_response_lists_matching_documents() {
        let (_, engine) = engine_with(vec![
            doc("a", vec![PolicyStatement::allow(user(), "read", "product:read")]),
            doc("b", vec![PolicyStatement::allow(Principal::Any, "read", "*")]),
        ]);
        let response = engine.decide(&request("user", "product:read", "read"));
        assert!(response.allowed);
        assert_eq!(response.reason, PermissionResponse::ALLOWED_BY_POLICY);
        assert_eq!(response.policies, vec!["a".to_string(), "b".to_string()]);
    }

    // ── 2. no match ───────────────────────────────────────────────────────────

    #[test]
    fn test_no_matching_policy() {
        let (_, engine) = engine_with(vec![doc(
            "readers",
            vec![PolicyStatement::allow(user(), "read", "product:read")],
        )]);
        let response = engine.decide(&request("user", "product:update", "update"));
        assert_eq!(
            response,
            PermissionResponse::deny(PermissionResponse::NO_MATCHING_POLICY)
        );
    }

    #[test]
    fn test_no_policies_for_role() {
        let (_, engine) = engine_with(vec![doc(
            "admins",
            vec![PolicyStatement::allow(Principal::role("admin"), "*", "*")],
        )]);
        let response = engine.decide(&request("guest", "product:read", "read"));
        assert!(!response.allowed);
        assert_eq!(response.reason, PermissionResponse::NO_POLICIES_FOR_ROLE);
    }

    #[test]
    fn test_malformed_request_is_invalid() {
        let (_, engine) = bootstrapped();
        for req in [
            request("", "product:read", "read"),
            request("user", "", "read"),
            request("user", "product:read", ""),
        ] {
            let response = engine.decide(&req);
            assert!(!response.allowed);
            assert_eq!(response.reason, PermissionResponse::INVALID_REQUEST);
        }
    }

    // ── 3. wildcard principals ────────────────────────────────────────────────

    /// A wildcard-principal document is visible to every role; a
    /// role-specific document is not.
    #[test]
    fn test_wildcard_principal_visible_to_all_roles() {
        let (_, engine) = engine_with(vec![
            doc("public-read", vec![PolicyStatement::allow(Principal::Any, "read", "product:read")]),
            doc("admin-only", vec![PolicyStatement::allow(Principal::role("admin"), "update", "product:update")]),
        ]);

        for role in ["admin", "user", "auditor"] {
            assert!(engine.decide(&request(role, "product:read", "read")).allowed, "{role}");
        }
        assert!(engine.decide(&request("admin", "product:update", "update")).allowed);

        let response = engine.decide(&request("user", "product:update", "update"));
        assert_eq!(response.reason, PermissionResponse::NO_MATCHING_POLICY);
    }

    /// A role literally named `*` is an ordinary role: its documents are
    /// not shared with other roles.
    #[test]
    fn test_role_named_star_is_not_wildcard() {
        let (_, engine) = engine_with(vec![doc(
            "star-role",
            vec![PolicyStatement::allow(Principal::role("*"), "read", "product:read")],
        )]);

        let response = engine.decide(&request("guest", "product:read", "read"));
        assert_eq!(response.reason, PermissionResponse::NO_POLICIES_FOR_ROLE);
        assert_eq!(engine.cache_stats().unwrap().wildcard_documents, 0);
        assert!(engine.decide(&request("*", "product:read", "read")).allowed);
    }

    // ── 4. conditions ─────────────────────────────────────────────────────────

    fn owner_only() -> PolicyDocument {
        doc(
            "owner-update",
            vec![PolicyStatement::allow(user(), "update", "product:update")
                .with_conditions(Conditions::none().with_ownership())],
        )
    }

    /// With no resource id there is nothing to own, so the rule matches.
    #[test]
    fn test_ownership_bypassed_without_resource_id() {
        let (_, engine) = engine_with(vec![owner_only()]);
        assert!(engine.decide(&request("user", "product:update", "update")).allowed);
        assert!(engine
            .decide(&request("user", "product:update", "update").for_resource(""))
            .allowed);
    }

    #[test]
    fn test_ownership_denies_missing_or_foreign_owner() {
        let (_, engine) = engine_with(vec![owner_only()]);

        let missing = request("user", "product:update", "update").for_resource("p-1");
        assert_eq!(
            engine.decide(&missing).reason,
            PermissionResponse::NO_MATCHING_POLICY
        );

        let foreign = request("user", "product:update", "update")
            .for_resource("p-1")
            .with_context("resource_owner_id", Uuid::new_v4().to_string());
        assert!(!engine.decide(&foreign).allowed);

        let not_a_string = request("user", "product:update", "update")
            .for_resource("p-1")
            .with_context("resource_owner_id", 42);
        assert!(!engine.decide(&not_a_string).allowed);
    }

    #[test]
    fn test_ownership_allows_owner() {
        let (_, engine) = engine_with(vec![owner_only()]);
        let req = request("user", "product:update", "update").for_resource("p-1");
        let req = req.clone().with_context("resource_owner_id", req.user_id.to_string());
        assert!(engine.decide(&req).allowed);
    }

    #[test]
    fn test_attribute_condition_requires_equal_value() {
        let (_, engine) = engine_with(vec![doc(
            "gold-tier",
            vec![PolicyStatement::allow(user(), "read", "product:read")
                .with_conditions(Conditions::none().with_attribute("tier", "gold"))],
        )]);

        let base = request("user", "product:read", "read");
        assert!(!engine.decide(&base).allowed);
        assert!(!engine.decide(&base.clone().with_context("tier", "silver")).allowed);
        assert!(engine.decide(&base.clone().with_context("tier", json!("gold"))).allowed);
    }

    // ── 5. bootstrap ──────────────────────────────────────────────────────────

    #[test]
    fn test_bootstrap_user_may_create_product() {
        let (_, engine) = bootstrapped();
        let response = engine.decide(&request("user", "product:create", "create"));
        assert!(response.allowed);
        assert_eq!(response.policies, vec![USER_PRODUCT_ACCESS.to_string()]);
    }

    #[test]
    fn test_bootstrap_user_may_not_create_user() {
        let (_, engine) = bootstrapped();
        let response = engine.decide(&request("user", "user:create", "create"));
        assert!(!response.allowed);
        assert_eq!(response.reason, PermissionResponse::NO_MATCHING_POLICY);
    }

    #[test]
    fn test_bootstrap_admin_may_do_anything() {
        let (_, engine) = bootstrapped();
        for (resource, action) in [("user:delete", "delete"), ("product:list", "list"), ("reports", "export")] {
            let response = engine.decide(&request("admin", resource, action));
            assert!(response.allowed, "{resource}/{action}");
            assert_eq!(response.policies, vec![ADMIN_FULL_ACCESS.to_string()]);
        }
    }

    #[test]
    fn test_bootstrap_only_seeds_empty_store() {
        let store = InMemoryPolicyStore::new();
        assert_eq!(bootstrap(&store).unwrap(), 2);
        assert_eq!(bootstrap(&store).unwrap(), 0);
        assert_eq!(store.get_active().unwrap().len(), 2);

        let readers = store.get_by_role("user").unwrap();
        assert_eq!(readers.len(), 1);
        assert_eq!(readers[0].statements.len(), 5);
        assert_eq!(readers[0].version, "1.0");
    }

    /// An inactive document alone does not count as "populated".
    #[test]
    fn test_bootstrap_ignores_inactive_documents() {
        let store = InMemoryPolicyStore::new();
        store
            .create(&doc("old", vec![PolicyStatement::allow(user(), "*", "*")]).inactive())
            .unwrap();
        assert_eq!(bootstrap(&store).unwrap(), 2);
    }

    // ── 6. mutations ──────────────────────────────────────────────────────────

    /// Adding a deny statement flips `product:delete` for users.
    #[test]
    fn test_added_deny_takes_effect_immediately() {
        let (_, engine) = bootstrapped();
        let req = request("user", "product:delete", "delete");
        assert!(engine.decide(&req).allowed);

        engine
            .add_policy(&doc(
                "user-no-delete",
                vec![PolicyStatement::deny(user(), "delete", "product:delete")],
            ))
            .unwrap();

        let response = engine.decide(&req);
        assert!(!response.allowed);
        assert_eq!(response.reason, PermissionResponse::DENIED_BY_POLICY);
        assert_eq!(response.policies, vec!["user-no-delete".to_string()]);
    }

    #[test]
    fn test_add_policy_rejects_invalid_document() {
        let (store, engine) = bootstrapped();
        let before = engine.cache_stats().unwrap().version;

        let result = engine.add_policy(&doc("", vec![PolicyStatement::allow(user(), "*", "*")]));
        assert!(matches!(result, Err(WardenError::InvalidPolicy { .. })));
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(engine.cache_stats().unwrap().version, before);
    }

    #[test]
    fn test_update_and_remove_reload_cache() {
        let (_, engine) = engine_with(vec![]);
        let mut stored = engine
            .add_policy(&doc("readers", vec![PolicyStatement::allow(user(), "read", "product:read")]))
            .unwrap();
        assert!(engine.decide(&request("user", "product:read", "read")).allowed);

        stored.statements = vec![PolicyStatement::allow(user(), "list", "product:list")];
        engine.update_policy(&stored).unwrap();
        assert!(!engine.decide(&request("user", "product:read", "read")).allowed);
        assert!(engine.decide(&request("user", "product:list", "list")).allowed);

        engine.remove_policy(stored.id).unwrap();
        assert_eq!(
            engine.decide(&request("user", "product:list", "list")).reason,
            PermissionResponse::NO_POLICIES_FOR_ROLE
        );
        assert!(matches!(
            engine.remove_policy(stored.id),
            Err(WardenError::NotFound { .. })
        ));
    }

    /// Deactivating a document through update removes it from evaluation.
    #[test]
    fn test_inactive_documents_are_not_cached() {
        let (_, engine) = bootstrapped();
        let mut docs = engine.policies_for_role("user").unwrap();
        let mut user_doc = docs.remove(0);
        user_doc.is_active = false;
        engine.update_policy(&user_doc).unwrap();

        assert_eq!(
            engine.decide(&request("user", "product:read", "read")).reason,
            PermissionResponse::NO_POLICIES_FOR_ROLE
        );
    }

    /// `policies_for_role` reads the store, so it sees writes the cache
    /// has not reloaded yet.
    #[test]
    fn test_policies_for_role_bypasses_cache() {
        let (store, engine) = engine_with(vec![]);
        store
            .create(&doc("late", vec![PolicyStatement::allow(user(), "read", "product:read")]))
            .unwrap();

        assert_eq!(engine.policies_for_role("user").unwrap().len(), 1);
        assert!(!engine.decide(&request("user", "product:read", "read")).allowed);

        engine.reload().unwrap();
        assert!(engine.decide(&request("user", "product:read", "read")).allowed);
    }

    #[test]
    fn test_trait_evaluate_wraps_decision() {
        let (_, engine) = bootstrapped();
        let engine: &dyn PolicyEngine = &engine;
        let response = engine.evaluate(&request("user", "product:read", "read")).unwrap();
        assert!(response.allowed);
    }

    // ── 7. cache ──────────────────────────────────────────────────────────────

    /// A document naming both a role and the wildcard is returned once.
    #[test]
    fn test_lookup_deduplicates_documents() {
        let store = Arc::new(InMemoryPolicyStore::new());
        store
            .create(&doc(
                "both",
                vec![
                    PolicyStatement::allow(user(), "read", "product:read"),
                    PolicyStatement::allow(user(), "list", "product:list"),
                    PolicyStatement::allow(Principal::Any, "read", "product:read"),
                ],
            ))
            .unwrap();
        store
            .create(&doc("public", vec![PolicyStatement::allow(Principal::Any, "*", "product:list")]))
            .unwrap();

        let cache = PolicyCache::new(store);
        cache.load().unwrap();

        let names: Vec<String> = cache.lookup("user").unwrap().iter().map(|d| d.name.clone()).collect();
        assert_eq!(names, vec!["both", "public"]);
        assert_eq!(cache.lookup("admin").unwrap().len(), 2);

        let stats = cache.stats().unwrap();
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.roles, 1);
        assert_eq!(stats.wildcard_documents, 2);
    }

    #[test]
    fn test_cache_is_empty_until_loaded() {
        let store = Arc::new(InMemoryPolicyStore::new());
        bootstrap(store.as_ref()).unwrap();
        let cache = PolicyCache::new(store);

        let stats = cache.stats().unwrap();
        assert_eq!(stats.version, 0);
        assert_eq!(stats.last_loaded, None);
        assert!(cache.lookup("admin").unwrap().is_empty());

        cache.load().unwrap();
        let stats = cache.stats().unwrap();
        assert_eq!(stats.version, 1);
        assert!(stats.last_loaded.is_some());
        assert_eq!(cache.lookup("admin").unwrap().len(), 1);
    }

    /// A failed reload keeps serving the previous index.
    #[test]
    fn test_failed_load_keeps_previous_index() {
        let (store, engine) = bootstrapped();
        let before = engine.cache_stats().unwrap();

        store.set_offline(true);
        assert!(matches!(engine.reload(), Err(WardenError::Store { .. })));
        assert!(engine.decide(&request("user", "product:read", "read")).allowed);
        assert_eq!(engine.cache_stats().unwrap(), before);

        store.set_offline(false);
        engine.reload().unwrap();
        assert_eq!(engine.cache_stats().unwrap().version, before.version + 1);
    }

    #[test]
    fn test_engine_construction_fails_when_store_offline() {
        let store = Arc::new(InMemoryPolicyStore::new());
        store.set_offline(true);
        assert!(CachedPolicyEngine::new(store).is_err());
    }

    /// Readers keep evaluating while another thread reloads.
    #[test]
    fn test_concurrent_evaluation_during_reload() {
        let (_, engine) = bootstrapped();

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..200 {
                        let response = engine.decide(&request("admin", "user:delete", "delete"));
                        assert!(response.allowed);
                    }
                });
            }
            s.spawn(|| {
                for _ in 0..50 {
                    engine.reload().unwrap();
                }
            });
        });

        assert_eq!(engine.cache_stats().unwrap().version, 51);
    }

    /// Delegates to an in-memory store; the first armed `get_active` call
    /// reports that it has read and then blocks until released.
    struct PausingStore {
        inner: InMemoryPolicyStore,
        gate: Mutex<Option<(Sender<()>, Receiver<()>)>>,
    }

    impl PolicyStore for PausingStore {
        fn create(&self, policy: &PolicyDocument) -> WardenResult<PolicyDocument> {
            self.inner.create(policy)
        }

        fn get(&self, id: Uuid) -> WardenResult<PolicyDocument> {
            self.inner.get(id)
        }

        fn get_by_role(&self, role: &str) -> WardenResult<Vec<PolicyDocument>> {
            self.inner.get_by_role(role)
        }

        fn get_active(&self) -> WardenResult<Vec<PolicyDocument>> {
            let docs = self.inner.get_active()?;
            let gate = self.gate.lock().unwrap().take();
            if let Some((reached, release)) = gate {
                reached.send(()).unwrap();
                release.recv().unwrap();
            }
            Ok(docs)
        }

        fn update(&self, policy: &PolicyDocument) -> WardenResult<PolicyDocument> {
            self.inner.update(policy)
        }

        fn delete(&self, id: Uuid) -> WardenResult<()> {
            self.inner.delete(id)
        }
    }

    /// A load that read the store before a delete cannot publish its stale
    /// index over a later load that saw the delete.
    #[test]
    fn test_overlapping_loads_do_not_resurrect_deleted_policy() {
        let (reached_tx, reached_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let store = Arc::new(PausingStore {
            inner: InMemoryPolicyStore::new(),
            gate: Mutex::new(None),
        });
        let grant = store
            .create(&doc("temp-grant", vec![PolicyStatement::allow(user(), "read", "product:read")]))
            .unwrap();
        *store.gate.lock().unwrap() = Some((reached_tx, release_rx));

        let cache = PolicyCache::new(store.clone());

        std::thread::scope(|s| {
            let slow = s.spawn(|| cache.load());
            reached_rx.recv().unwrap();

            store.delete(grant.id).unwrap();
            let fast = s.spawn(|| cache.load());
            std::thread::sleep(Duration::from_millis(50));

            release_tx.send(()).unwrap();
            slow.join().unwrap().unwrap();
            fast.join().unwrap().unwrap();
        });

        assert!(cache.lookup("user").unwrap().is_empty());
        assert_eq!(cache.stats().unwrap().version, 2);
    }

    // ── 8. policy files ───────────────────────────────────────────────────────

    const FILE: &str = r#"
        [[policies]]
        name = "user-no-delete"
        version = "1.1"

        [[policies.statements]]
        effect = "deny"
        principal = "role:user"
        action = "delete"
        resource = "product:delete"

        [[policies.statements]]
        effect = "allow"
        principal = "role:user"
        action = "update"
        resource = "product:update"

        [policies.statements.conditions]
        resource_owner = true

        [[policies]]
        name = "public-catalog"

        [[policies.statements]]
        effect = "allow"
        principal = "*"
        action = "list"
        resource = "product:list"
    "#;

    #[test]
    fn test_policy_file_parses_documents() {
        let docs = PolicyFile::from_toml_str(FILE).unwrap().into_documents().unwrap();
        assert_eq!(docs.len(), 2);

        assert_eq!(docs[0].name, "user-no-delete");
        assert_eq!(docs[0].version, "1.1");
        assert_eq!(docs[0].statements.len(), 2);
        assert!(docs[0].statements[0].conditions.is_empty());
        assert_eq!(
            docs[0].statements[1].conditions,
            Conditions::none().with_ownership()
        );

        assert_eq!(docs[1].version, "1.0");
        assert!(docs[1].is_active);
        assert_eq!(docs[1].statements[0].principal, Principal::Any);
    }

    #[test]
    fn test_policy_file_documents_drive_engine() {
        let (_, engine) = bootstrapped();
        for doc in PolicyFile::from_toml_str(FILE).unwrap().into_documents().unwrap() {
            engine.add_policy(&doc).unwrap();
        }
        assert!(!engine.decide(&request("user", "product:delete", "delete")).allowed);
        assert!(engine.decide(&request("guest", "product:list", "list")).allowed);
    }

    #[test]
    fn test_policy_file_rejects_unknown_effect_and_principal() {
        let bad_effect = r#"
            [[policies]]
            name = "x"
            [[policies.statements]]
            effect = "permit"
            principal = "*"
            action = "*"
            resource = "*"
        "#;
        assert!(matches!(
            PolicyFile::from_toml_str(bad_effect),
            Err(WardenError::ConfigError { .. })
        ));

        let bad_principal = bad_effect
            .replace("\"permit\"", "\"allow\"")
            .replace("principal = \"*\"", "principal = \"user:alice\"");
        assert!(matches!(
            PolicyFile::from_toml_str(&bad_principal),
            Err(WardenError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_policy_file_rejects_unnamed_document() {
        let file = PolicyFile::from_toml_str("[[policies]]\nname = \"\"\n").unwrap();
        assert!(matches!(
            file.into_documents(),
            Err(WardenError::InvalidPolicy { .. })
        ));
    }
}
