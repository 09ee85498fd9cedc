//! Carrying caller identity across service boundaries.
//!
//! The wire form is a flat JSON object with the keys `user_id`, `user_role`,
//! `user_email` and `client_ip`, each present only when the context holds
//! a value. Decoding skips missing keys, values of the wrong type, and user
//! ids that are not UUIDs; only malformed JSON or a non-object document is
//! an error.

use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use warden_contracts::{
    error::{WardenError, WardenResult},
    request::{keys, AuthContext},
};

/// Encode the authorization-relevant part of `ctx`.
pub fn serialize_context(ctx: &AuthContext) -> WardenResult<String> {
    serde_json::to_string(&ctx.attributes()).map_err(|e| WardenError::ContextDecode {
        reason: format!("failed to encode context: {e}"),
    })
}

/// Overlay the identity carried in `data` onto `base`.
///
/// Fields absent from `data` keep their value from `base`.
pub fn context_from_serialized(base: &AuthContext, data: &str) -> WardenResult<AuthContext> {
    let value: Value = serde_json::from_str(data).map_err(|e| WardenError::ContextDecode {
        reason: format!("malformed context data: {e}"),
    })?;
    let Value::Object(fields) = value else {
        return Err(WardenError::ContextDecode {
            reason: "context data must be a JSON object".to_string(),
        });
    };

    let mut ctx = base.clone();

    if let Some(raw) = string_field(&fields, keys::USER_ID) {
        match Uuid::parse_str(raw) {
            Ok(id) => ctx.user_id = Some(id),
            Err(e) => debug!(user_id = %raw, error = %e, "ignoring unparsable propagated user id"),
        }
    }
    if let Some(role) = string_field(&fields, keys::USER_ROLE) {
        ctx.role = Some(role.to_string());
    }
    if let Some(email) = string_field(&fields, keys::USER_EMAIL) {
        ctx.email = Some(email.to_string());
    }
    if let Some(ip) = string_field(&fields, keys::CLIENT_IP) {
        ctx.client_ip = Some(ip.to_string());
    }

    Ok(ctx)
}

fn string_field<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields.get(key).and_then(Value::as_str)
}
