//! Scenario 3: ownership on instance routes.
//!
//! The user's `update` statement is narrowed to resources the caller owns.
//! Collection checks carry no instance and pass; instance checks pass only
//! when the recorded owner is the caller.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use warden_authz::{RouteAccess, Warden, WardenConfig};
use warden_contracts::error::{WardenError, WardenResult};
use warden_contracts::policy::Conditions;
use warden_contracts::request::keys;
use warden_core::traits::PolicyStore;
use warden_policy::bootstrap::USER_PRODUCT_ACCESS;
use warden_store::InMemoryPolicyStore;

use super::report;

pub fn run_scenario(config: &WardenConfig) -> WardenResult<()> {
    println!("=== Scenario 3: Ownership Conditions ===");
    println!();

    let store = Arc::new(InMemoryPolicyStore::new());
    let warden = Warden::build(config, store.clone())?;

    let mut doc = store
        .get_by_role("user")?
        .into_iter()
        .find(|d| d.name == USER_PRODUCT_ACCESS)
        .ok_or_else(|| WardenError::NotFound {
            entity: "policy".to_string(),
            id: USER_PRODUCT_ACCESS.to_string(),
        })?;
    for statement in &mut doc.statements {
        if statement.action.to_string() == "update" {
            statement.conditions = Conditions::none().with_ownership();
        }
    }
    warden.engine.update_policy(&doc)?;
    println!("  Narrowed '{}' update to owners", doc.name);
    println!();

    let service = &warden.service;
    let me = Uuid::new_v4();
    let ctx = service.create_enriched_context(&Default::default(), me, "user", "owner@example.com");
    let item = Uuid::new_v4().to_string();
    let owned_by =
        |owner: Uuid| BTreeMap::from([(keys::RESOURCE_OWNER_ID.to_string(), json!(owner.to_string()))]);

    let route = RouteAccess::PRODUCT_UPDATE;
    report(
        "collection update",
        &service.check_resource_permission_with(&ctx, me, route.resource, route.action, "", BTreeMap::new()),
        true,
    );
    report(
        "instance update, owner unknown",
        &service.check_resource_permission_with(&ctx, me, route.resource, route.action, &item, BTreeMap::new()),
        false,
    );
    report(
        "instance update, caller owns it",
        &service.check_resource_permission_with(&ctx, me, route.resource, route.action, &item, owned_by(me)),
        true,
    );
    report(
        "instance update, someone else's",
        &service.check_resource_permission_with(
            &ctx,
            me,
            route.resource,
            route.action,
            &item,
            owned_by(Uuid::new_v4()),
        ),
        false,
    );

    // Route guards pass the path id through the same check.
    report(
        "guard PUT /products/{id}",
        &warden.route_guard().authorize(&ctx, route, Some(&item)),
        false,
    );

    println!();
    println!("  Scenario 3 complete.");
    println!();
    Ok(())
}
