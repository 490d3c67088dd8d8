//! Role-based access control over the model catalog.
//!
//! Catalog records may carry an `access_level` metadata field (`public`,
//! `internal` or `restricted`; records without one are public). Each role
//! sees a subset of levels and may use a subset of query intents.
//!
//! | Role | Sees | Intents |
//! |------|------|---------|
//! | `Admin` | everything | all |
//! | `Researcher` | public, internal | all |
//! | `Viewer` | public | retrieval, image search, metadata |
//!
//! # Example
//!
//! ```rust
//! use modelscout::security::{AccessControl, Role, RoleBasedAccessControl};
//! use modelscout::models::ParameterBag;
//!
//! let ac = RoleBasedAccessControl::new().with_assignment("alice", Role::Admin);
//! let filtered = ac.apply_filters(ParameterBag::new(), "bob").unwrap_or_default();
//! assert!(filtered.filters.contains_key("access_level"));
//! ```

use super::AccessControl;
use crate::models::{Intent, ParameterBag};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, HashSet};

/// Metadata field holding a record's access level.
pub const ACCESS_LEVEL_FIELD: &str = "access_level";

/// Catalog roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Unrestricted.
    Admin,
    /// Internal and public records, every intent.
    Researcher,
    /// Public records, read-only intents.
    Viewer,
}

impl Role {
    /// Returns all roles.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Admin, Self::Researcher, Self::Viewer]
    }

    /// Parses a role name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "researcher" => Some(Self::Researcher),
            "viewer" | "read_only" | "readonly" => Some(Self::Viewer),
            _ => None,
        }
    }

    /// Returns the role name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Researcher => "researcher",
            Self::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Semantic search over model scripts.
    SearchModels,
    /// Semantic search over generated images.
    SearchImages,
    /// Metadata fetches.
    ViewMetadata,
    /// Multi-model comparison.
    CompareModels,
    /// Notebook generation requests.
    GenerateNotebooks,
    /// Records marked `internal`.
    ViewInternal,
    /// Records marked `restricted`.
    ViewRestricted,
}

impl Permission {
    /// Permission an intent requires.
    #[must_use]
    pub const fn for_intent(intent: Intent) -> Self {
        match intent {
            Intent::Retrieval | Intent::Unknown => Self::SearchModels,
            Intent::ImageSearch => Self::SearchImages,
            Intent::Metadata => Self::ViewMetadata,
            Intent::Comparison => Self::CompareModels,
            Intent::Notebook => Self::GenerateNotebooks,
        }
    }
}

/// Outcome of a permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessResult {
    /// Allowed.
    Granted,
    /// Refused, with the reason.
    Denied(String),
}

impl AccessResult {
    /// Returns true if access is granted.
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Role-based [`AccessControl`]. Users without an assignment get the
/// default role ([`Role::Viewer`] unless changed).
#[derive(Debug, Clone)]
pub struct RoleBasedAccessControl {
    role_permissions: HashMap<Role, HashSet<Permission>>,
    assignments: HashMap<String, Role>,
    default_role: Role,
}

impl Default for RoleBasedAccessControl {
    fn default() -> Self {
        Self::new()
    }
}

impl RoleBasedAccessControl {
    /// Creates the default role table.
    #[must_use]
    pub fn new() -> Self {
        use Permission::{
            CompareModels, GenerateNotebooks, SearchImages, SearchModels, ViewInternal,
            ViewMetadata, ViewRestricted,
        };

        let viewer: HashSet<Permission> = [SearchModels, SearchImages, ViewMetadata]
            .into_iter()
            .collect();
        let mut researcher = viewer.clone();
        researcher.extend([CompareModels, GenerateNotebooks, ViewInternal]);
        let mut admin = researcher.clone();
        admin.insert(ViewRestricted);

        let role_permissions = HashMap::from([
            (Role::Admin, admin),
            (Role::Researcher, researcher),
            (Role::Viewer, viewer),
        ]);

        Self {
            role_permissions,
            assignments: HashMap::new(),
            default_role: Role::Viewer,
        }
    }

    /// Assigns `role` to `user_id`.
    #[must_use]
    pub fn with_assignment(mut self, user_id: impl Into<String>, role: Role) -> Self {
        self.assignments.insert(user_id.into(), role);
        self
    }

    /// Sets the role for unassigned users.
    #[must_use]
    pub const fn with_default_role(mut self, role: Role) -> Self {
        self.default_role = role;
        self
    }

    /// Returns the role of `user_id`.
    #[must_use]
    pub fn role_for(&self, user_id: &str) -> Role {
        self.assignments
            .get(user_id)
            .copied()
            .unwrap_or(self.default_role)
    }

    /// Returns true if `role` has `permission`.
    #[must_use]
    pub fn has_permission(&self, role: Role, permission: Permission) -> bool {
        self.role_permissions
            .get(&role)
            .is_some_and(|perms| perms.contains(&permission))
    }

    /// Checks whether `user_id` may run a query of `intent`.
    #[must_use]
    pub fn check(&self, user_id: &str, intent: Intent) -> AccessResult {
        let role = self.role_for(user_id);
        let permission = Permission::for_intent(intent);
        if self.has_permission(role, permission) {
            AccessResult::Granted
        } else {
            AccessResult::Denied(format!(
                "Role '{role}' is not allowed to run {intent} queries"
            ))
        }
    }

    fn hidden_levels(&self, role: Role) -> Vec<&'static str> {
        let mut hidden = Vec::new();
        if !self.has_permission(role, Permission::ViewInternal) {
            hidden.push("internal");
        }
        if !self.has_permission(role, Permission::ViewRestricted) {
            hidden.push("restricted");
        }
        hidden
    }
}

impl AccessControl for RoleBasedAccessControl {
    fn authorize(&self, intent: Intent, user_id: &str) -> Result<()> {
        match self.check(user_id, intent) {
            AccessResult::Granted => Ok(()),
            AccessResult::Denied(reason) => {
                tracing::warn!(user_id, intent = %intent, "Access denied");
                Err(Error::Validation(reason))
            },
        }
    }

    fn apply_filters(&self, mut parameters: ParameterBag, user_id: &str) -> Result<ParameterBag> {
        let role = self.role_for(user_id);

        // A caller-supplied access level must not widen what the role sees.
        if parameters.filters.remove(ACCESS_LEVEL_FIELD).is_some() {
            tracing::debug!(user_id, "Discarded caller-supplied access level filter");
        }

        let hidden = self.hidden_levels(role);
        if !hidden.is_empty() {
            parameters
                .filters
                .insert(ACCESS_LEVEL_FIELD.to_string(), json!({ "$nin": hidden }));
        }
        Ok(parameters)
    }
}
