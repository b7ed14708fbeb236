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

//! The wired-up RBAC engine

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::audit::AuditLogger;
use crate::cache::MatrixCache;
use crate::config::RbacConfig;
use crate::error::{RbacError, RbacResult};
use crate::gate::{AccessGate, Decision, RoleClaims};
use crate::matrix::{EffectiveMatrix, MatrixBuilder};
use crate::models::{
    NavigationTree, PageRow, PermissionOverride, PermissionUpdate, RequestMeta, RolePagePermission,
};
use crate::nav::NavBuilder;
use crate::registry::{PageRegistry, RoleKey};
use crate::store::PermissionStore;

/// Facade owning every engine component, wired over one registry and store
///
/// Embedders construct one of these at startup and call into it from their
/// HTTP layer; all components share the same matrix cache, so reads are
/// consistent within a TTL window and writes invalidate for everyone.
pub struct RbacSystem {
    registry: Arc<PageRegistry>,
    store: Arc<dyn PermissionStore>,
    cache: Arc<MatrixCache>,
    gate: AccessGate,
    nav: NavBuilder,
    audit: AuditLogger,
}

impl RbacSystem {
    pub fn new(
        registry: Arc<PageRegistry>,
        store: Arc<dyn PermissionStore>,
        config: RbacConfig,
    ) -> Self {
        let builder = MatrixBuilder::new(registry.clone(), store.clone());
        let cache = Arc::new(MatrixCache::new(builder, config.cache_ttl));
        let gate = AccessGate::new(registry.clone(), cache.clone(), config);
        let nav = NavBuilder::new(cache.clone());
        let audit = AuditLogger::new(store.clone());
        Self {
            registry,
            store,
            cache,
            gate,
            nav,
            audit,
        }
    }

    /// Mirror the compiled-in catalog into the store
    ///
    /// Safe to run on every startup; returns the number of synced pages.
    pub async fn sync_registry(&self) -> RbacResult<usize> {
        let rows: Vec<PageRow> = self
            .registry
            .all_pages()
            .iter()
            .map(PageRow::from_definition)
            .collect();
        self.store.upsert_page_catalog(&rows).await?;
        self.cache.invalidate().await;
        info!(pages = rows.len(), "page catalog synced");
        Ok(rows.len())
    }

    /// The current effective matrix snapshot (never fails; degrades to defaults)
    pub async fn get_matrix(&self) -> Arc<EffectiveMatrix> {
        self.cache.get().await
    }

    /// One role's column of the matrix, keyed by page key
    pub async fn effective_permissions_for_role(
        &self,
        role: RoleKey,
    ) -> HashMap<String, RolePagePermission> {
        self.get_matrix().await.effective_for_role(role)
    }

    /// Apply a batch of per-page overrides for one role
    ///
    /// The whole batch is validated against the registry catalog before any
    /// row is written; an unknown page key rejects the batch untouched.
    /// A store failure mid-batch leaves earlier rows applied and reports
    /// how far it got via [`RbacError::SaveAborted`]. Each applied row is
    /// journaled individually with its prior value.
    pub async fn save_permissions(
        &self,
        role_key: RoleKey,
        updates: &[PermissionUpdate],
        actor: Option<&str>,
        meta: &RequestMeta,
    ) -> RbacResult<usize> {
        let known: HashSet<&str> = self
            .registry
            .all_pages()
            .iter()
            .map(|p| p.key.as_str())
            .collect();
        for update in updates {
            if !known.contains(update.page_key.as_str()) {
                return Err(RbacError::UnknownPage {
                    page_key: update.page_key.clone(),
                });
            }
        }

        let total = updates.len();
        for (applied, update) in updates.iter().enumerate() {
            let row = PermissionOverride {
                role_key,
                page_key: update.page_key.clone(),
                can_access: update.can_access,
                // A page you cannot open has no business in your sidebar.
                in_sidebar: update.can_access && update.in_sidebar,
                sidebar_order: update.sidebar_order,
                updated_by: actor.map(str::to_string),
                updated_at: Utc::now(),
            };
            let new_value = row.value();
            let old_value = match self.store.upsert_override(row).await {
                Ok(old_value) => old_value,
                Err(err) => {
                    if applied > 0 {
                        self.cache.invalidate().await;
                    }
                    return Err(RbacError::SaveAborted {
                        page_key: update.page_key.clone(),
                        applied,
                        total,
                        message: err.to_string(),
                    });
                }
            };
            self.audit
                .record_override_change(
                    role_key,
                    &update.page_key,
                    old_value,
                    new_value,
                    actor,
                    meta,
                )
                .await;
        }

        self.cache.invalidate().await;
        info!(role_key = %role_key, rows = total, "permission overrides saved");
        Ok(total)
    }

    /// Remove every override for a role, returning how many were removed
    ///
    /// A reset that removed nothing writes no audit record.
    pub async fn reset_role(
        &self,
        role_key: RoleKey,
        actor: Option<&str>,
        meta: &RequestMeta,
    ) -> RbacResult<usize> {
        let removed = self.store.delete_overrides_for_role(role_key).await?;
        let count = removed.len();
        if count > 0 {
            self.audit
                .record_role_reset(role_key, removed, actor, meta)
                .await;
        }
        self.cache.invalidate().await;
        info!(role_key = %role_key, removed = count, "role reset to registry defaults");
        Ok(count)
    }

    pub async fn require_page_access(
        &self,
        claims: &RoleClaims,
        page_key: &str,
        path: &str,
    ) -> Decision {
        self.gate.require_page_access(claims, page_key, path).await
    }

    pub async fn resolve_and_require_access(&self, claims: &RoleClaims, path: &str) -> Decision {
        self.gate.resolve_and_require_access(claims, path).await
    }

    pub async fn build_nav(&self, claims: &RoleClaims) -> NavigationTree {
        self.nav.build_for_claims(claims).await
    }

    pub async fn build_nav_for_role(&self, role: RoleKey) -> NavigationTree {
        self.nav.build(role).await
    }
}
