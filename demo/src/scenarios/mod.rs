//! Scripted demo scenarios. Each builds its own core over an empty store.

pub mod audit_trail;
pub mod defaults;
pub mod deny_override;
pub mod ownership;
pub mod propagation;

use uuid::Uuid;

use warden_contracts::error::WardenResult;
use warden_core::traits::Entity;

/// The catalog entity the scenarios read and write.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price_cents: u64,
}

impl Product {
    pub fn new(name: &str, price_cents: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price_cents,
        }
    }
}

impl Entity for Product {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Print an outcome line, marking whether it matched the expectation.
pub(crate) fn report<T>(label: &str, result: &WardenResult<T>, expect_allowed: bool) {
    let verdict = match result {
        Ok(_) => "ALLOWED".to_string(),
        Err(e) => format!("DENIED ({e})"),
    };
    let note = if result.is_ok() == expect_allowed { "expected" } else { "UNEXPECTED" };
    println!("  {:<34} {} [{}]", label, verdict, note);
}
