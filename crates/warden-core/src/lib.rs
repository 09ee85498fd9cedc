//! # warden-core
//!
//! The seams of the Warden authorization core and the guarded repository
//! that ties them together.
//!
//! This crate provides:
//! - The collaborator traits (`PolicyStore`, `PolicyEngine`, `AccessControl`,
//!   `AuditLogger`, `EntityStore`)
//! - `GuardedRepository`, which runs access check → store → audit in order
//!
//! ## Usage
//!
//! ```rust,ignore
//! use warden_core::{GuardedRepository, traits::{AccessControl, AuditLogger}};
//! ```

pub mod repository;
pub mod traits;

pub use repository::{GuardedRepository, Page};
