//! # warden-authz
//!
//! The authorization façade of the Warden core and the pieces that consume
//! it at the edge of an API.
//!
//! - `service`: `AuthorizationService`, the `AccessControl` implementation
//! - `propagation`: encode/decode `AuthContext` for cross-service calls
//! - `guard`: route-level permission table and `RouteGuard`
//! - `config`: `WardenConfig`, read from TOML
//! - `runtime`: `Warden`, wiring store, engine and service together

pub mod config;
pub mod guard;
pub mod propagation;
pub mod runtime;
pub mod service;

pub use config::WardenConfig;
pub use guard::{RouteAccess, RouteGuard};
pub use runtime::Warden;
pub use service::AuthorizationService;
