//! Scenario 4: guarded repository and audit chain.
//!
//! A user runs the five CRUD operations on a product through a
//! `GuardedRepository`; each allowed operation is sealed into the audit
//! chain. A guest's attempt is refused before the store and leaves no entry.
//! The exported chain verifies, and a tampered copy does not.

use std::sync::Arc;

use uuid::Uuid;

use warden_audit::{verify_chain, InMemoryAuditLog};
use warden_authz::WardenConfig;
use warden_contracts::error::{WardenError, WardenResult};
use warden_contracts::request::AuthContext;
use warden_core::{GuardedRepository, Page};
use warden_store::InMemoryEntityStore;

use super::{report, Product};
use crate::build_warden;

type Products = GuardedRepository<Product, InMemoryEntityStore<Product>>;

pub fn run_scenario(config: &WardenConfig) -> WardenResult<()> {
    println!("=== Scenario 4: Audit Trail ===");
    println!();

    let warden = build_warden(config)?;
    let audit = Arc::new(InMemoryAuditLog::new("products-api"));
    let products = Products::new(
        InMemoryEntityStore::new("product"),
        warden.service.clone(),
        audit.clone(),
        "product",
    );

    let base = AuthContext::default().client_ip("203.0.113.7");
    let me = Uuid::new_v4();
    let ctx = warden
        .service
        .create_enriched_context(&base, me, "user", "buyer@example.com");

    // ── Sub-case A: the full CRUD cycle ───────────────────────────────────────

    println!("  Sub-case A: user runs create / read / update / list / delete");
    let mut lamp = Product::new("desk lamp", 3499);
    report("create", &products.create(&ctx, &lamp, me), true);
    let fetched = products.get(&ctx, lamp.id, me);
    report("read", &fetched, true);
    if let Ok(p) = &fetched {
        println!("    fetched '{}' at {} cents", p.name, p.price_cents);
    }
    lamp.price_cents = 2999;
    report("update", &products.update(&ctx, &lamp, me), true);
    report("list", &products.list(&ctx, Page::default(), me), true);
    report("delete", &products.delete(&ctx, lamp.id, me), true);
    println!();

    // ── Sub-case B: a refused operation ───────────────────────────────────────

    println!("  Sub-case B: guest attempts to create");
    let guest_id = Uuid::new_v4();
    let guest = warden.service.create_enriched_context(&base, guest_id, "guest", "");
    report("create", &products.create(&guest, &Product::new("contraband", 1), guest_id), false);
    println!("    guest audit entries: {}", audit.events_for_user(guest_id)?.len());
    println!();

    // ── Sub-case C: the exported chain ────────────────────────────────────────

    println!("  Sub-case C: export and verify");
    let export = audit.export_log()?;
    for entry in &export.entries {
        println!(
            "    #{} {:<15} {}...",
            entry.sequence,
            entry.event.resource,
            entry.this_hash.get(..16).unwrap_or(&entry.this_hash)
        );
    }
    println!("    terminal hash:   {}", export.terminal_hash);
    println!("    chain verified:  {}", audit.verify_integrity()?);

    let mut tampered = export.entries.clone();
    if let Some(first) = tampered.first_mut() {
        first.event.action = "read".to_string();
    }
    println!("    tampered copy:   {}", verify_chain(&tampered));

    let json = serde_json::to_string(&export).map_err(|e| WardenError::AuditWriteFailed {
        reason: format!("export serialization failed: {e}"),
    })?;
    println!("    export size:     {} bytes of JSON", json.len());

    println!();
    println!("  Scenario 4 complete.");
    println!();
    Ok(())
}
