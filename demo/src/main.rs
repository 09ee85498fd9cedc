//! Warden authorization demo CLI
//!
//! Wires the in-memory policy store, cached engine, authorization service,
//! guarded repository and audit log together and runs scripted scenarios
//! against them, or answers one-off permission questions.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- --config demo/warden.toml run-all
//!   cargo run -p demo -- check user product:delete delete
//!   cargo run -p demo -- permissions admin

mod scenarios;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use warden_authz::{Warden, WardenConfig};
use warden_contracts::error::WardenResult;
use warden_contracts::request::{AuthContext, PermissionRequest};
use warden_core::traits::PolicyEngine;
use warden_store::InMemoryPolicyStore;

// ── CLI definition ────────────────────────────────────────────────────────────

/// Warden: policy-based access control demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "Warden authorization demo",
    long_about = "Runs Warden scenarios showing role policies, deny-overrides,\n\
                  ownership conditions, context propagation and the audit chain."
)]
struct Cli {
    /// TOML configuration file. Built-in defaults when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every scenario in sequence.
    RunAll,
    /// Scenario 1: the default admin and user policies.
    Defaults,
    /// Scenario 2: a deny statement overriding an allow.
    DenyOverride,
    /// Scenario 3: ownership conditions on instance routes.
    Ownership,
    /// Scenario 4: guarded repository writes and the audit chain.
    AuditTrail,
    /// Scenario 5: carrying an auth context across a process boundary.
    Propagation,
    /// Evaluate a single permission request.
    Check {
        role: String,
        resource: String,
        action: String,
        /// Instance id, for ownership-conditioned statements.
        #[arg(long)]
        resource_id: Option<String>,
    },
    /// List the permissions granted to a role.
    Permissions { role: String },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    };

    // RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(false)
        .compact()
        .init();

    info!(
        roles = ?config.authorization.known_roles,
        policy_files = config.policies.files.len(),
        bootstrap = config.authorization.bootstrap_defaults,
        "configuration loaded"
    );

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all(&config),
        Command::Defaults => scenarios::defaults::run_scenario(&config),
        Command::DenyOverride => scenarios::deny_override::run_scenario(&config),
        Command::Ownership => scenarios::ownership::run_scenario(&config),
        Command::AuditTrail => scenarios::audit_trail::run_scenario(&config),
        Command::Propagation => scenarios::propagation::run_scenario(&config),
        Command::Check {
            role,
            resource,
            action,
            resource_id,
        } => run_check(&config, &role, &resource, &action, resource_id),
        Command::Permissions { role } => run_permissions(&config, &role),
    };

    match result {
        Ok(()) => {
            println!("Done.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> WardenResult<WardenConfig> {
    match path {
        Some(path) => WardenConfig::from_file(path),
        None => Ok(WardenConfig::default()),
    }
}

/// A fresh core over an empty in-memory store.
pub(crate) fn build_warden(config: &WardenConfig) -> WardenResult<Warden> {
    Warden::build(config, Arc::new(InMemoryPolicyStore::new()))
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

fn run_all(config: &WardenConfig) -> WardenResult<()> {
    scenarios::defaults::run_scenario(config)?;
    scenarios::deny_override::run_scenario(config)?;
    scenarios::ownership::run_scenario(config)?;
    scenarios::audit_trail::run_scenario(config)?;
    scenarios::propagation::run_scenario(config)?;
    Ok(())
}

// ── Ad-hoc queries ────────────────────────────────────────────────────────────

fn run_check(
    config: &WardenConfig,
    role: &str,
    resource: &str,
    action: &str,
    resource_id: Option<String>,
) -> WardenResult<()> {
    let warden = build_warden(config)?;

    let mut request = PermissionRequest::new(Uuid::new_v4(), role, resource, action);
    if let Some(id) = resource_id {
        request = request.for_resource(id);
    }
    let response = warden.engine.evaluate(&request)?;

    println!("  Role:      {}", role);
    println!("  Resource:  {}", resource);
    println!("  Action:    {}", action);
    println!("  Allowed:   {}", response.allowed);
    println!("  Reason:    {}", response.reason);
    if !response.policies.is_empty() {
        println!("  Policies:  {}", response.policies.join(", "));
    }
    println!();
    Ok(())
}

fn run_permissions(config: &WardenConfig, role: &str) -> WardenResult<()> {
    let warden = build_warden(config)?;
    let ctx = AuthContext::with_role(role);

    let known = warden.service.known_roles();
    if !known.iter().any(|r| r == role) {
        println!("  Note: '{}' is not a configured role ({}).", role, known.join(", "));
    }

    let permissions = warden.service.get_user_permissions(&ctx, Uuid::new_v4())?;
    if permissions.is_empty() {
        println!("  Role '{}' holds no permissions.", role);
    }
    for p in permissions {
        println!("  {:<8} {:<20} {}", p.role, p.resource, p.action);
    }
    println!();
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("Warden: Policy-based Access Control");
    println!("===================================");
    println!();
    println!("Per guarded operation:");
    println!("  [1] Auth context supplies user id and role");
    println!("  [2] Cached policies for the role (plus wildcard) are evaluated");
    println!("  [3] Any matching Deny wins; otherwise any matching Allow grants");
    println!("  [4] Allowed operations reach the store and are sealed into the audit chain");
    println!();
}
