//! Storage representation of policy documents.
//!
//! A document is persisted as one `PolicyRecord` row plus one
//! `StatementRecord` row per statement, keyed back to the document by
//! `policy_id`. Typed fields are stored in their string form and conditions
//! as a JSON object in a text column, so the same rows can back an
//! embedded-file or relational store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use warden_contracts::{
    error::{WardenError, WardenResult},
    policy::{Conditions, PolicyDocument, PolicyStatement},
};

/// One row of the `policy_documents` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub id: String,
    pub name: String,
    pub version: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub statements: Vec<StatementRecord>,
}

/// One row of the `policy_statements` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRecord {
    pub id: String,
    pub policy_id: String,
    pub effect: String,
    pub principal: String,
    pub action: String,
    pub resource: String,
    /// JSON object text. Empty or `null` means no conditions.
    pub conditions: String,
}

impl PolicyRecord {
    /// Flatten a domain document into its storage rows.
    pub fn from_document(policy: &PolicyDocument) -> WardenResult<Self> {
        let statements = policy
            .statements
            .iter()
            .map(|s| StatementRecord::from_statement(s, policy.id))
            .collect::<WardenResult<Vec<_>>>()?;

        Ok(Self {
            id: policy.id.to_string(),
            name: policy.name.clone(),
            version: policy.version.clone(),
            is_active: policy.is_active,
            created_at: policy.created_at,
            updated_at: policy.updated_at,
            statements,
        })
    }

    /// Rebuild the domain document, validating every typed column.
    pub fn to_document(&self) -> WardenResult<PolicyDocument> {
        let statements = self
            .statements
            .iter()
            .map(StatementRecord::to_statement)
            .collect::<WardenResult<Vec<_>>>()?;

        Ok(PolicyDocument {
            id: parse_id(&self.id, "policy")?,
            name: self.name.clone(),
            version: self.version.clone(),
            is_active: self.is_active,
            statements,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl StatementRecord {
    pub fn from_statement(statement: &PolicyStatement, policy_id: Uuid) -> WardenResult<Self> {
        let conditions = serde_json::to_string(&statement.conditions.to_map()).map_err(|e| {
            WardenError::store(format!("failed to encode conditions of statement {}: {e}", statement.id))
        })?;

        Ok(Self {
            id: statement.id.to_string(),
            policy_id: policy_id.to_string(),
            effect: statement.effect.to_string(),
            principal: statement.principal.to_string(),
            action: statement.action.to_string(),
            resource: statement.resource.to_string(),
            conditions,
        })
    }

    pub fn to_statement(&self) -> WardenResult<PolicyStatement> {
        let conditions = match self.conditions.trim() {
            "" | "null" => Conditions::none(),
            text => {
                let map: BTreeMap<String, Value> = serde_json::from_str(text).map_err(|e| {
                    WardenError::store(format!("corrupt conditions on statement {}: {e}", self.id))
                })?;
                Conditions::from(map)
            }
        };

        Ok(PolicyStatement {
            id: parse_id(&self.id, "statement")?,
            policy_id: parse_id(&self.policy_id, "statement policy")?,
            effect: self.effect.parse()?,
            principal: self.principal.parse()?,
            action: self.action.clone().into(),
            resource: self.resource.clone().into(),
            conditions,
        })
    }
}

fn parse_id(raw: &str, what: &str) -> WardenResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| WardenError::store(format!("invalid {what} id '{raw}': {e}")))
}
