//! Runtime configuration, read from TOML.
//!
//! Every section and field is optional; `WardenConfig::default()` is the
//! built-in behaviour (roles `admin` and `user`, default policies seeded
//! into an empty store, `info` logging, no extra policy files).
//!
//! ```toml
//! [authorization]
//! known_roles = ["admin", "user"]
//! bootstrap_defaults = true
//!
//! [logging]
//! level = "debug"
//!
//! [policies]
//! files = ["policies/catalog.toml"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use warden_contracts::{
    error::{WardenError, WardenResult},
    policy::PolicyDocument,
    role::Role,
};
use warden_policy::PolicyFile;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub authorization: AuthorizationConfig,
    pub logging: LoggingConfig,
    pub policies: PolicySources,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    /// Roles `validate_role` accepts.
    pub known_roles: Vec<String>,
    /// Seed the default policies when the store has no active document.
    pub bootstrap_defaults: bool,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            known_roles: Role::ALL.iter().map(|r| r.as_str().to_string()).collect(),
            bootstrap_defaults: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySources {
    /// TOML policy files seeded at startup, relative to the config file.
    pub files: Vec<PathBuf>,
}

impl WardenConfig {
    /// Parse `s` as TOML configuration.
    ///
    /// Returns `WardenError::ConfigError` on malformed TOML, unknown value
    /// types, or an empty role set.
    pub fn from_toml_str(s: &str) -> WardenResult<Self> {
        let config: WardenConfig = toml::from_str(s).map_err(|e| WardenError::ConfigError {
            reason: format!("failed to parse config TOML: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse the file at `path`. Relative policy file paths are
    /// resolved against the file's directory.
    pub fn from_file(path: &Path) -> WardenResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| WardenError::ConfigError {
            reason: format!("failed to read config file '{}': {e}", path.display()),
        })?;
        let mut config = Self::from_toml_str(&contents)?;

        if let Some(dir) = path.parent() {
            for file in &mut config.policies.files {
                if file.is_relative() {
                    *file = dir.join(&*file);
                }
            }
        }
        Ok(config)
    }

    fn validate(&self) -> WardenResult<()> {
        if self.authorization.known_roles.iter().all(|r| r.trim().is_empty()) {
            return Err(WardenError::ConfigError {
                reason: "authorization.known_roles must name at least one role".to_string(),
            });
        }
        Ok(())
    }

    /// Load every configured policy file, in order.
    pub fn policy_documents(&self) -> WardenResult<Vec<PolicyDocument>> {
        let mut documents = Vec::new();
        for path in &self.policies.files {
            documents.extend(PolicyFile::from_file(path)?.into_documents()?);
        }
        Ok(documents)
    }
}
