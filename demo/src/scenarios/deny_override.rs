//! Scenario 2: deny-overrides.
//!
//! A user may delete products under the defaults. Loading the
//! `user-no-delete` document adds a matching Deny, which wins over the
//! existing Allow; removing it restores the grant.

use uuid::Uuid;

use warden_authz::WardenConfig;
use warden_contracts::error::WardenResult;
use warden_core::traits::AccessControl;
use warden_policy::PolicyFile;

use super::report;
use crate::build_warden;

const USER_NO_DELETE: &str = include_str!("../../policies/user-no-delete.toml");

pub fn run_scenario(config: &WardenConfig) -> WardenResult<()> {
    println!("=== Scenario 2: Deny Overrides Allow ===");
    println!();

    let warden = build_warden(config)?;
    let service = &warden.service;
    let me = Uuid::new_v4();
    let ctx = service.create_enriched_context(&Default::default(), me, "user", "");

    report(
        "user product:delete (defaults)",
        &service.check_permission(&ctx, me, "product:delete", "delete"),
        true,
    );

    let mut added = Vec::new();
    for doc in PolicyFile::from_toml_str(USER_NO_DELETE)?.into_documents()? {
        let stored = warden.engine.add_policy(&doc)?;
        println!("  Loaded policy '{}' v{}", stored.name, stored.version);
        added.push(stored.id);
    }

    let denied = service.check_permission(&ctx, me, "product:delete", "delete");
    report("user product:delete (with deny)", &denied, false);
    report(
        "user product:update (with deny)",
        &service.check_permission(&ctx, me, "product:update", "update"),
        true,
    );

    for id in added {
        warden.engine.remove_policy(id)?;
    }
    report(
        "user product:delete (deny removed)",
        &service.check_permission(&ctx, me, "product:delete", "delete"),
        true,
    );

    println!(
        "  Cache version after changes: {}",
        warden.engine.cache_stats()?.version
    );
    println!();
    println!("  Scenario 2 complete.");
    println!();
    Ok(())
}
