//! Policy documents, statements, and their typed patterns.
//!
//! A `PolicyDocument` is a named, versioned bundle of `PolicyStatement`s.
//! Each statement pairs a principal, an action pattern, a resource pattern,
//! and a set of conditions with an `Effect`. The engine evaluates every
//! matching statement; any matching `Deny` vetoes all matching `Allow`s.
//!
//! Wildcards and the ownership condition are tagged variants rather than
//! magic strings. The string forms (`"*"`, `"role:<name>"`,
//! `"resource_owner"`) only exist at the serialization boundary.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{WardenError, WardenResult};

/// Storage form of the universal wildcard.
pub const WILDCARD: &str = "*";

/// Prefix of a role principal in storage form.
pub const ROLE_PREFIX: &str = "role:";

/// Reserved condition key that requests an ownership check.
pub const RESOURCE_OWNER_CONDITION: &str = "resource_owner";

// ── Effect ───────────────────────────────────────────────────────────────────

/// The outcome a statement contributes when it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(self) -> &'static str {
        match self {
            Effect::Allow => "allow",
            Effect::Deny => "deny",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Effect {
    type Err = WardenError;

    fn from_str(s: &str) -> WardenResult<Self> {
        match s {
            "allow" => Ok(Effect::Allow),
            "deny" => Ok(Effect::Deny),
            other => Err(WardenError::InvalidPolicy {
                reason: format!("unknown effect '{other}', expected 'allow' or 'deny'"),
            }),
        }
    }
}

// ── Principal ────────────────────────────────────────────────────────────────

/// The subject a statement applies to.
///
/// Serialized as `"*"` or `"role:<name>"`. Any other string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Principal {
    /// Every role.
    Any,
    /// Exactly one named role.
    Role(String),
}

impl Principal {
    pub fn role(name: impl Into<String>) -> Self {
        Principal::Role(name.into())
    }

    /// True if a request made under `role` is covered by this principal.
    pub fn matches(&self, role: &str) -> bool {
        match self {
            Principal::Any => true,
            Principal::Role(name) => name == role,
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::Any => f.write_str(WILDCARD),
            Principal::Role(name) => write!(f, "{ROLE_PREFIX}{name}"),
        }
    }
}

impl FromStr for Principal {
    type Err = WardenError;

    fn from_str(s: &str) -> WardenResult<Self> {
        if s == WILDCARD {
            return Ok(Principal::Any);
        }
        match s.strip_prefix(ROLE_PREFIX) {
            Some(name) if !name.is_empty() => Ok(Principal::Role(name.to_string())),
            _ => Err(WardenError::InvalidPolicy {
                reason: format!("principal '{s}' must be '*' or 'role:<name>'"),
            }),
        }
    }
}

impl TryFrom<String> for Principal {
    type Error = WardenError;

    fn try_from(s: String) -> WardenResult<Self> {
        s.parse()
    }
}

impl From<Principal> for String {
    fn from(p: Principal) -> String {
        p.to_string()
    }
}

// ── Pattern ──────────────────────────────────────────────────────────────────

/// An action or resource pattern: the wildcard, or one exact token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Pattern {
    Any,
    Exact(String),
}

impl Pattern {
    pub fn exact(token: impl Into<String>) -> Self {
        Pattern::Exact(token.into())
    }

    /// Case-sensitive match; `Any` matches every value.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::Exact(token) => token == value,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Any => f.write_str(WILDCARD),
            Pattern::Exact(token) => f.write_str(token),
        }
    }
}

impl From<String> for Pattern {
    fn from(s: String) -> Self {
        if s == WILDCARD {
            Pattern::Any
        } else {
            Pattern::Exact(s)
        }
    }
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self {
        Pattern::from(s.to_string())
    }
}

impl From<Pattern> for String {
    fn from(p: Pattern) -> String {
        p.to_string()
    }
}

// ── Conditions ───────────────────────────────────────────────────────────────

/// One condition a statement places on the request context.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `context[key]` must be present and equal to `value`.
    AttributeEquals { key: String, value: Value },
    /// The caller must own the targeted resource instance.
    ///
    /// Satisfied trivially when the request names no resource instance.
    /// Keyed by presence alone: any value stored under `"resource_owner"`,
    /// `false` included, selects this condition and is written back as `true`.
    ResourceOwnership,
}

/// The full condition set of a statement. Empty means "always match".
///
/// Serialized as a flat string-keyed map; the reserved key
/// `"resource_owner"` becomes `Condition::ResourceOwnership` whatever its
/// value, so the map form normalizes that value to `true`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Value>", into = "BTreeMap<String, Value>")]
pub struct Conditions(Vec<Condition>);

// Order-insensitive: two condition sets are equal when their maps are.
impl PartialEq for Conditions {
    fn eq(&self, other: &Self) -> bool {
        self.to_map() == other.to_map()
    }
}

impl Conditions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.0.iter()
    }

    /// Add an attribute-equality condition, replacing any existing one on `key`.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        self.0.retain(|c| !matches!(c, Condition::AttributeEquals { key: k, .. } if *k == key));
        self.0.push(Condition::AttributeEquals { key, value: value.into() });
        self
    }

    /// Require resource ownership.
    pub fn with_ownership(mut self) -> Self {
        if !self.0.contains(&Condition::ResourceOwnership) {
            self.0.push(Condition::ResourceOwnership);
        }
        self
    }

    pub fn to_map(&self) -> BTreeMap<String, Value> {
        self.0
            .iter()
            .map(|c| match c {
                Condition::AttributeEquals { key, value } => (key.clone(), value.clone()),
                Condition::ResourceOwnership => {
                    (RESOURCE_OWNER_CONDITION.to_string(), Value::Bool(true))
                }
            })
            .collect()
    }
}

impl From<BTreeMap<String, Value>> for Conditions {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Conditions(
            map.into_iter()
                .map(|(key, value)| {
                    if key == RESOURCE_OWNER_CONDITION {
                        Condition::ResourceOwnership
                    } else {
                        Condition::AttributeEquals { key, value }
                    }
                })
                .collect(),
        )
    }
}

impl From<Conditions> for BTreeMap<String, Value> {
    fn from(c: Conditions) -> Self {
        c.to_map()
    }
}

impl FromIterator<Condition> for Conditions {
    fn from_iter<I: IntoIterator<Item = Condition>>(iter: I) -> Self {
        iter.into_iter().fold(Conditions::none(), |acc, c| match c {
            Condition::AttributeEquals { key, value } => acc.with_attribute(key, value),
            Condition::ResourceOwnership => acc.with_ownership(),
        })
    }
}

// ── Statement & document ─────────────────────────────────────────────────────

/// One (principal, action, resource, conditions, effect) rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyStatement {
    pub id: Uuid,
    /// The owning document. Assigned by the store on create/update.
    pub policy_id: Uuid,
    pub effect: Effect,
    pub principal: Principal,
    pub action: Pattern,
    pub resource: Pattern,
    #[serde(default)]
    pub conditions: Conditions,
}

impl PolicyStatement {
    /// A statement with a fresh id and no conditions.
    pub fn new(
        effect: Effect,
        principal: Principal,
        action: impl Into<Pattern>,
        resource: impl Into<Pattern>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            policy_id: Uuid::nil(),
            effect,
            principal,
            action: action.into(),
            resource: resource.into(),
            conditions: Conditions::none(),
        }
    }

    pub fn allow(principal: Principal, action: impl Into<Pattern>, resource: impl Into<Pattern>) -> Self {
        Self::new(Effect::Allow, principal, action, resource)
    }

    pub fn deny(principal: Principal, action: impl Into<Pattern>, resource: impl Into<Pattern>) -> Self {
        Self::new(Effect::Deny, principal, action, resource)
    }

    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
        self
    }

    /// Reject statements the engine could never match.
    pub fn validate(&self) -> WardenResult<()> {
        let empty_exact = |p: &Pattern| matches!(p, Pattern::Exact(t) if t.is_empty());
        if empty_exact(&self.action) {
            return Err(WardenError::InvalidPolicy {
                reason: format!("statement {} has an empty action", self.id),
            });
        }
        if empty_exact(&self.resource) {
            return Err(WardenError::InvalidPolicy {
                reason: format!("statement {} has an empty resource", self.id),
            });
        }
        if let Principal::Role(name) = &self.principal {
            if name.is_empty() {
                return Err(WardenError::InvalidPolicy {
                    reason: format!("statement {} has an empty role principal", self.id),
                });
            }
        }
        Ok(())
    }
}

/// A named, versioned bundle of statements, activated as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub id: Uuid,
    /// Unique across the store.
    pub name: String,
    /// Informational only.
    pub version: String,
    pub is_active: bool,
    pub statements: Vec<PolicyStatement>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PolicyDocument {
    /// A new active document, version `"1.0"`, with a fresh id.
    pub fn new(name: impl Into<String>, statements: Vec<PolicyStatement>) -> Self {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let statements = statements
            .into_iter()
            .map(|mut s| {
                s.policy_id = id;
                s
            })
            .collect();
        Self {
            id,
            name: name.into(),
            version: "1.0".to_string(),
            is_active: true,
            statements,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Validate the name and every statement.
    pub fn validate(&self) -> WardenResult<()> {
        if self.name.trim().is_empty() {
            return Err(WardenError::InvalidPolicy {
                reason: "policy name must not be empty".to_string(),
            });
        }
        self.statements.iter().try_for_each(PolicyStatement::validate)
    }

    /// Distinct principals named by this document's statements, in first
    /// occurrence order.
    pub fn principals(&self) -> Vec<&Principal> {
        let mut out: Vec<&Principal> = Vec::new();
        for statement in &self.statements {
            if !out.contains(&&statement.principal) {
                out.push(&statement.principal);
            }
        }
        out
    }
}
