//! # warden-store
//!
//! Reference storage for the Warden authorization core.
//!
//! - `record`: the storage row mapping for policy documents
//! - `policy`: `InMemoryPolicyStore`, a transactional `PolicyStore`
//! - `entity`: `InMemoryEntityStore<T>`, the CRUD store guarded repositories wrap

pub mod entity;
pub mod policy;
pub mod record;

pub use entity::InMemoryEntityStore;
pub use policy::InMemoryPolicyStore;
pub use record::{PolicyRecord, StatementRecord};
