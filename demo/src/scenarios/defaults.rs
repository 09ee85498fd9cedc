//! Scenario 1: the default policies.
//!
//! A fresh store is seeded with `admin-full-access` and
//! `user-product-access`; every route is then checked for an admin, a user
//! and a role with no policies at all.

use uuid::Uuid;

use warden_authz::{RouteAccess, WardenConfig};
use warden_contracts::error::WardenResult;
use warden_contracts::request::{PermissionRequest, PermissionResponse};
use warden_core::traits::PolicyEngine;

use crate::build_warden;

pub fn run_scenario(config: &WardenConfig) -> WardenResult<()> {
    println!("=== Scenario 1: Default Policies ===");
    println!();

    let warden = build_warden(config)?;
    let stats = warden.engine.cache_stats()?;
    println!(
        "  Cache: {} document(s), {} role bucket(s), version {}",
        stats.documents, stats.roles, stats.version
    );
    println!();

    println!("  {:<18} {:<8} {:<8} {:<8}", "route", "admin", "user", "guest");
    for route in RouteAccess::ALL {
        let cell = |role: &str| {
            if warden.service.quick_check(role, route.resource, route.action) {
                "allow"
            } else {
                "deny"
            }
        };
        println!(
            "  {:<18} {:<8} {:<8} {:<8}",
            route.resource,
            cell("admin"),
            cell("user"),
            cell("guest")
        );
    }
    println!();

    // The reason strings distinguish "no document" from "no statement".
    // Wildcard documents from policy files give every role a document.
    let user_on_users = warden
        .engine
        .evaluate(&PermissionRequest::new(Uuid::new_v4(), "user", "user:delete", "delete"))?;
    let guest = warden
        .engine
        .evaluate(&PermissionRequest::new(Uuid::new_v4(), "guest", "user:list", "list"))?;
    println!("  user  -> user:delete:   {}", user_on_users.reason);
    println!("  guest -> user:list:     {}", guest.reason);

    let guest_expected = if stats.wildcard_documents > 0 {
        PermissionResponse::NO_MATCHING_POLICY
    } else {
        PermissionResponse::NO_POLICIES_FOR_ROLE
    };
    let as_expected = user_on_users.reason == PermissionResponse::NO_MATCHING_POLICY
        && guest.reason == guest_expected;
    println!(
        "  RESULT: {}",
        if as_expected { "SUCCESS (expected)" } else { "UNEXPECTED reasons" }
    );
    println!();
    println!("  Scenario 1 complete.");
    println!();
    Ok(())
}
