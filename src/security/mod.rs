//! Access control and parameter sanitization.
//!
//! The dispatcher hands the parameter bag to an [`AccessControl`]
//! collaborator before any handler runs, and echoes parameters back only
//! after [`sanitize_parameters`] has stripped caller identity, credentials,
//! raw query text and binary payloads.

mod rbac;

pub use rbac::{ACCESS_LEVEL_FIELD, AccessResult, Permission, Role, RoleBasedAccessControl};

use crate::Result;
use crate::models::{Intent, ParameterBag};
use serde_json::{Map, Value};

/// Access-control collaborator.
pub trait AccessControl: Send + Sync {
    /// Rewrites `parameters` so that `user_id` only sees what it may.
    ///
    /// # Errors
    ///
    /// Returns an error if the user's permissions cannot be determined.
    fn apply_filters(&self, parameters: ParameterBag, user_id: &str) -> Result<ParameterBag>;

    /// Checks that `user_id` may run a query of `intent`. Allows everything
    /// by default.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the reason when access is denied.
    fn authorize(&self, intent: Intent, user_id: &str) -> Result<()> {
        let _ = (intent, user_id);
        Ok(())
    }
}

/// Keys never echoed back to the caller.
const REMOVED_KEYS: &[&str] = &[
    "user_id",
    "access_token",
    "auth_token",
    "auth_context",
    "api_key",
    "raw_query",
    "raw_text",
    "query",
    "query_text",
    "text",
    "query_id",
];

/// Binary payload key, replaced wherever it appears.
const BINARY_KEY: &str = "image_data";

/// Replacement text for binary payloads.
pub const BINARY_PLACEHOLDER: &str = "[binary data removed]";

/// Returns the parameters as a JSON object safe to include in a response.
///
/// Identity, credential and raw-text keys are removed at any depth, inside
/// nested objects and arrays alike. Every `image_data` value is replaced by
/// [`BINARY_PLACEHOLDER`].
#[must_use]
pub fn sanitize_parameters(parameters: &ParameterBag) -> Map<String, Value> {
    let mut map = match parameters.to_value() {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    strip(&mut map);

    if parameters.image_data.is_some() {
        map.insert(
            BINARY_KEY.to_string(),
            Value::String(BINARY_PLACEHOLDER.to_string()),
        );
    }
    map
}

fn is_sensitive(key: &str) -> bool {
    let lower = key.to_lowercase();
    REMOVED_KEYS.contains(&lower.as_str()) || lower.ends_with("_token") || lower.ends_with("_secret")
}

fn strip(map: &mut Map<String, Value>) {
    map.retain(|key, _| !is_sensitive(key));
    for (key, value) in map.iter_mut() {
        if key.eq_ignore_ascii_case(BINARY_KEY) {
            *value = Value::String(BINARY_PLACEHOLDER.to_string());
        } else {
            strip_value(value);
        }
    }
}

fn strip_value(value: &mut Value) {
    match value {
        Value::Object(inner) => strip(inner),
        Value::Array(items) => items.iter_mut().for_each(strip_value),
        _ => {},
    }
}
