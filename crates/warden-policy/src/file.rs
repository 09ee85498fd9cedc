//! Policy documents declared in TOML.
//!
//! A `PolicyFile` holds any number of documents. Statement fields use the
//! storage forms: `effect = "allow" | "deny"`, `principal = "*" | "role:<name>"`,
//! and `"*"` for wildcard actions and resources.
//!
//! Example:
//! ```toml
//! [[policies]]
//! name = "user-no-delete"
//! version = "1.1"
//!
//! [[policies.statements]]
//! effect = "deny"
//! principal = "role:user"
//! action = "delete"
//! resource = "product:delete"
//!
//! [[policies.statements]]
//! effect = "allow"
//! principal = "role:user"
//! action = "update"
//! resource = "product:update"
//!
//! [policies.statements.conditions]
//! resource_owner = true
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use warden_contracts::{
    error::{WardenError, WardenResult},
    policy::{Conditions, Effect, PolicyDocument, PolicyStatement, Principal},
};

fn default_version() -> String {
    "1.0".to_string()
}

fn default_active() -> bool {
    true
}

/// One statement as written in a policy file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementSpec {
    pub effect: Effect,
    pub principal: Principal,
    pub action: String,
    pub resource: String,

    /// Flat key/value conditions. `resource_owner = true` requests the
    /// ownership check.
    #[serde(default)]
    pub conditions: BTreeMap<String, Value>,
}

/// One document as written in a policy file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSpec {
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "default_active")]
    pub active: bool,

    #[serde(default)]
    pub statements: Vec<StatementSpec>,
}

/// The top-level structure deserialized from a TOML policy file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyFile {
    #[serde(default)]
    pub policies: Vec<DocumentSpec>,
}

impl PolicyFile {
    /// Parse `s` as a TOML policy file.
    ///
    /// Returns `WardenError::ConfigError` if the TOML is malformed or an
    /// effect or principal is not one of the accepted forms.
    pub fn from_toml_str(s: &str) -> WardenResult<Self> {
        toml::from_str(s).map_err(|e| WardenError::ConfigError {
            reason: format!("failed to parse policy TOML: {e}"),
        })
    }

    /// Read the file at `path` and parse it as a TOML policy file.
    pub fn from_file(path: &Path) -> WardenResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| WardenError::ConfigError {
            reason: format!("failed to read policy file '{}': {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Convert every declared document into a validated `PolicyDocument`
    /// with fresh ids and timestamps.
    pub fn into_documents(self) -> WardenResult<Vec<PolicyDocument>> {
        self.policies
            .into_iter()
            .map(|decl| {
                let statements = decl
                    .statements
                    .into_iter()
                    .map(|s| {
                        PolicyStatement::new(s.effect, s.principal, s.action, s.resource)
                            .with_conditions(Conditions::from(s.conditions))
                    })
                    .collect();

                let mut doc = PolicyDocument::new(decl.name, statements).with_version(decl.version);
                doc.is_active = decl.active;
                doc.validate()?;
                Ok(doc)
            })
            .collect()
    }
}
