// Atrium
// Copyright (C) 2025 Atrium Contributors

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Access decisions and role derivation

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::MatrixCache;
use crate::config::RbacConfig;
use crate::registry::{Area, PageRegistry, RoleKey};
use crate::resolver::{normalize_path, PathResolver};

/// What the identity layer hands the engine about the current user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleClaims {
    pub is_admin: bool,
    /// Free-form display name of the user's assigned role, if any
    pub role_name: Option<String>,
}

impl RoleClaims {
    pub fn admin() -> Self {
        Self {
            is_admin: true,
            role_name: None,
        }
    }

    pub fn named(role_name: impl Into<String>) -> Self {
        Self {
            is_admin: false,
            role_name: Some(role_name.into()),
        }
    }
}

/// Maps identity claims onto a [`RoleKey`]
///
/// The admin flag wins outright. Otherwise the role display name is matched
/// case-insensitively: "manager" before the staff markers, and unmatched
/// names fall through to partner, the least-privileged role. Note that a
/// role merely *named* something containing "admin" (without the flag) is
/// staff, not an administrator; only `is_admin` grants admin.
pub fn derive_role(claims: &RoleClaims) -> RoleKey {
    if claims.is_admin {
        return RoleKey::Admin;
    }
    let name = claims
        .role_name
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    if name.contains("manager") {
        return RoleKey::Manager;
    }
    if name.contains("employee") || name.contains("staff") || name.contains("admin") {
        return RoleKey::Employee;
    }
    RoleKey::Partner
}

/// Outcome of a gate check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "decision")]
pub enum Decision {
    Allow,
    Deny {
        redirect_to: String,
        message: String,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Enforces effective permissions on back-office requests
pub struct AccessGate {
    resolver: PathResolver,
    cache: Arc<MatrixCache>,
    config: RbacConfig,
}

impl AccessGate {
    pub fn new(registry: Arc<PageRegistry>, cache: Arc<MatrixCache>, config: RbacConfig) -> Self {
        Self {
            resolver: PathResolver::new(registry),
            cache,
            config,
        }
    }

    /// Check one already-resolved page against the caller's claims
    ///
    /// The configured settings path bypasses the check entirely, so an
    /// administrator who revoked their own access to everything can still
    /// reach the page that undoes it. A page missing from the matrix denies.
    pub async fn require_page_access(
        &self,
        claims: &RoleClaims,
        page_key: &str,
        path: &str,
    ) -> Decision {
        if self.is_bypass_path(path) {
            return Decision::Allow;
        }
        let role = derive_role(claims);
        let matrix = self.cache.get().await;
        match matrix.permission_for(role, page_key) {
            Some(perm) if perm.can_access => Decision::Allow,
            _ => {
                warn!(role = %role, page_key, path, "page access denied");
                self.deny()
            }
        }
    }

    /// Resolve a raw request path and gate it
    ///
    /// API paths and paths that resolve to no page pass through: the gate
    /// only enforces what the registry declares, it never invents a 404.
    pub async fn resolve_and_require_access(&self, claims: &RoleClaims, path: &str) -> Decision {
        if path.starts_with(&self.config.api_prefix) {
            return Decision::Allow;
        }
        // The gate guards the back office; partner-portal routing has its
        // own entry point.
        match self.resolver.resolve(path, Area::Admin) {
            Some(page_key) => self.require_page_access(claims, &page_key, path).await,
            None => Decision::Allow,
        }
    }

    fn is_bypass_path(&self, path: &str) -> bool {
        normalize_path(path) == normalize_path(&self.config.settings_bypass_path)
    }

    fn deny(&self) -> Decision {
        Decision::Deny {
            redirect_to: self.config.deny_redirect.clone(),
            message: self.config.deny_message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::MatrixBuilder;
    use crate::models::PermissionOverride;
    use crate::store::{InMemoryPermissionStore, PermissionStore};
    use chrono::Utc;
    use std::time::Duration;

    fn gate_with_store() -> (AccessGate, Arc<InMemoryPermissionStore>) {
        let registry = Arc::new(PageRegistry::default());
        let store = Arc::new(InMemoryPermissionStore::new());
        let builder = MatrixBuilder::new(registry.clone(), store.clone());
        let cache = Arc::new(MatrixCache::new(builder, Duration::from_secs(60)));
        (
            AccessGate::new(registry, cache, RbacConfig::default()),
            store,
        )
    }

    #[test]
    fn admin_flag_wins_over_any_role_name() {
        let claims = RoleClaims {
            is_admin: true,
            role_name: Some("External Partner".to_string()),
        };
        assert_eq!(derive_role(&claims), RoleKey::Admin);
    }

    #[test]
    fn manager_marker_beats_staff_markers() {
        assert_eq!(derive_role(&RoleClaims::named("Office Manager")), RoleKey::Manager);
        assert_eq!(derive_role(&RoleClaims::named("Admin Manager")), RoleKey::Manager);
    }

    #[test]
    fn staff_markers_map_to_employee() {
        assert_eq!(derive_role(&RoleClaims::named("Senior Employee")), RoleKey::Employee);
        assert_eq!(derive_role(&RoleClaims::named("Support Staff")), RoleKey::Employee);
    }

    // Long-standing behavior: a role *named* admin without the admin flag is
    // internal staff. Do not "fix" this to map to RoleKey::Admin.
    #[test]
    fn role_name_containing_admin_maps_to_employee() {
        assert_eq!(derive_role(&RoleClaims::named("Administration")), RoleKey::Employee);
        assert_eq!(derive_role(&RoleClaims::named("admin")), RoleKey::Employee);
    }

    #[test]
    fn unmatched_and_missing_names_fall_through_to_partner() {
        assert_eq!(derive_role(&RoleClaims::named("Accountant")), RoleKey::Partner);
        assert_eq!(derive_role(&RoleClaims::default()), RoleKey::Partner);
    }

    #[tokio::test]
    async fn default_permissions_gate_by_role() {
        let (gate, _store) = gate_with_store();
        let employee = RoleClaims::named("Employee");

        let allowed = gate
            .require_page_access(&employee, "admin.customers", "/admin/customers")
            .await;
        assert!(allowed.is_allowed());

        let denied = gate
            .require_page_access(&employee, "admin.payroll", "/admin/payroll")
            .await;
        let Decision::Deny { redirect_to, .. } = denied else {
            panic!("expected deny");
        };
        assert_eq!(redirect_to, "/admin");
    }

    #[tokio::test]
    async fn unknown_page_key_denies() {
        let (gate, _store) = gate_with_store();
        let decision = gate
            .require_page_access(&RoleClaims::admin(), "admin.ghost", "/admin/ghost")
            .await;
        assert!(!decision.is_allowed());
    }

    #[tokio::test]
    async fn settings_bypass_survives_a_self_lockout() {
        let (gate, store) = gate_with_store();
        store
            .upsert_override(PermissionOverride {
                role_key: RoleKey::Admin,
                page_key: "admin.platform_settings".to_string(),
                can_access: false,
                in_sidebar: false,
                sidebar_order: 1210,
                updated_by: None,
                updated_at: Utc::now(),
            })
            .await
            .unwrap();

        let decision = gate
            .require_page_access(
                &RoleClaims::admin(),
                "admin.platform_settings",
                "/admin/platform-settings",
            )
            .await;
        assert!(decision.is_allowed());

        // Trailing slash is tolerated on the bypass path.
        let decision = gate
            .require_page_access(
                &RoleClaims::admin(),
                "admin.platform_settings",
                "/admin/platform-settings/",
            )
            .await;
        assert!(decision.is_allowed());
    }

    #[tokio::test]
    async fn bypass_is_a_single_literal_not_a_prefix() {
        let (gate, store) = gate_with_store();
        store
            .upsert_override(PermissionOverride {
                role_key: RoleKey::Admin,
                page_key: "admin.platform_settings".to_string(),
                can_access: false,
                in_sidebar: false,
                sidebar_order: 1210,
                updated_by: None,
                updated_at: Utc::now(),
            })
            .await
            .unwrap();

        let decision = gate
            .require_page_access(
                &RoleClaims::admin(),
                "admin.platform_settings",
                "/admin/platform-settings/advanced",
            )
            .await;
        assert!(!decision.is_allowed());
    }

    #[tokio::test]
    async fn api_and_unresolved_paths_pass_through() {
        let (gate, _store) = gate_with_store();
        let partner = RoleClaims::default();

        assert!(gate
            .resolve_and_require_access(&partner, "/api/health")
            .await
            .is_allowed());
        assert!(gate
            .resolve_and_require_access(&partner, "/admin/does-not-exist")
            .await
            .is_allowed());
    }

    #[tokio::test]
    async fn resolved_paths_are_gated() {
        let (gate, _store) = gate_with_store();
        let partner = RoleClaims::default();
        let decision = gate
            .resolve_and_require_access(&partner, "/admin/customers/42/edit")
            .await;
        assert!(!decision.is_allowed());
    }
}
