//! Scenario 5: context propagation.
//!
//! A gateway serializes the caller's auth context; a downstream worker
//! restores it onto its own base context and re-checks the permission.

use uuid::Uuid;

use warden_authz::WardenConfig;
use warden_contracts::error::WardenResult;
use warden_contracts::request::AuthContext;
use warden_core::traits::AccessControl;

use super::report;
use crate::build_warden;

pub fn run_scenario(config: &WardenConfig) -> WardenResult<()> {
    println!("=== Scenario 5: Context Propagation ===");
    println!();

    let warden = build_warden(config)?;
    let service = &warden.service;

    let me = Uuid::new_v4();
    let gateway = service.create_enriched_context(
        &AuthContext::default().client_ip("192.0.2.44"),
        me,
        "user",
        "courier@example.com",
    );
    let payload = service.serialize_context(&gateway)?;
    println!("  Payload:  {}", payload);

    let worker = service.context_from_serialized(&AuthContext::default(), &payload)?;
    println!(
        "  Restored: user_id={} role={} email={} ip={}",
        worker.user_id.map(|u| u.to_string()).unwrap_or_default(),
        worker.role.as_deref().unwrap_or("-"),
        worker.email.as_deref().unwrap_or("-"),
        worker.client_ip.as_deref().unwrap_or("-"),
    );
    println!("  Identical to gateway context: {}", worker == gateway);
    println!();

    report(
        "worker product:update",
        &service.check_permission(&worker, me, "product:update", "update"),
        true,
    );
    report(
        "worker user:update",
        &service.check_permission(&worker, me, "user:update", "update"),
        false,
    );
    report(
        "malformed payload",
        &service.context_from_serialized(&AuthContext::default(), "not json"),
        false,
    );

    println!();
    println!("  Scenario 5 complete.");
    println!();
    Ok(())
}
