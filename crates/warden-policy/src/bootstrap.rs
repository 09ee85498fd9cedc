//! Built-in policy documents seeded into an empty store.

use tracing::info;

use warden_contracts::{
    error::WardenResult,
    policy::{PolicyDocument, PolicyStatement, Principal},
    role::{action, resource, resource_token, Role},
};
use warden_core::traits::PolicyStore;

pub const ADMIN_FULL_ACCESS: &str = "admin-full-access";
pub const USER_PRODUCT_ACCESS: &str = "user-product-access";

/// The default policy set:
///
/// - `admin-full-access`: admins may do anything to anything.
/// - `user-product-access`: users may create, read, update, delete and list
///   products.
pub fn default_policies() -> Vec<PolicyDocument> {
    let admin = Principal::role(Role::Admin.as_str());
    let user = Principal::role(Role::User.as_str());

    vec![
        PolicyDocument::new(ADMIN_FULL_ACCESS, vec![PolicyStatement::allow(admin, "*", "*")]),
        PolicyDocument::new(
            USER_PRODUCT_ACCESS,
            action::ALL
                .iter()
                .map(|a| PolicyStatement::allow(user.clone(), *a, resource_token(resource::PRODUCT, a)))
                .collect(),
        ),
    ]
}

/// Seed `store` with `default_policies` when it holds no active document.
///
/// Returns the number of documents created; zero when the store was
/// already populated.
pub fn bootstrap(store: &dyn PolicyStore) -> WardenResult<usize> {
    if !store.get_active()?.is_empty() {
        return Ok(0);
    }

    let defaults = default_policies();
    for doc in &defaults {
        store.create(doc)?;
        info!(policy = %doc.name, "bootstrapped default policy");
    }
    Ok(defaults.len())
}
