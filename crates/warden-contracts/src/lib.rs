//! # warden-contracts
//!
//! Shared types and error definitions for the Warden authorization core.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions, validation, and error types.

pub mod audit;
pub mod error;
pub mod policy;
pub mod request;
pub mod role;
