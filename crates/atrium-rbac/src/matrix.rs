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

//! Effective permission matrix construction

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{EffectivePermission, PageRow, PermissionOverride, RolePagePermission};
use crate::registry::{PageRegistry, RoleKey};
use crate::store::PermissionStore;

/// Canonical section ordering for the matrix and navigation.
/// Sections not listed here sort lexically after these.
pub const SECTION_ORDER: [&str; 13] = [
    "Overview",
    "Leads",
    "Sales",
    "CRM",
    "Execution",
    "Tickets",
    "Communication",
    "Services",
    "Team",
    "Billing",
    "Tools",
    "Internal",
    "Settings",
];

/// One page row of the matrix with a resolved cell per role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixPage {
    pub page_key: String,
    pub label: String,
    pub path: String,
    pub section: String,
    pub roles: HashMap<RoleKey, EffectivePermission>,
}

/// The fully resolved role × page permission matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveMatrix {
    pub roles: Vec<RoleKey>,
    /// Sections in display order; keys into `by_section`
    pub sections: Vec<String>,
    pub by_section: HashMap<String, Vec<MatrixPage>>,
}

impl EffectiveMatrix {
    /// The resolved cell for one (role, page), if the page exists
    pub fn permission_for(&self, role: RoleKey, page_key: &str) -> Option<EffectivePermission> {
        self.by_section
            .values()
            .flatten()
            .find(|p| p.page_key == page_key)
            .and_then(|p| p.roles.get(&role).copied())
    }

    /// Flatten one role's column into a page-key map
    pub fn effective_for_role(&self, role: RoleKey) -> HashMap<String, RolePagePermission> {
        let mut out = HashMap::new();
        for page in self.by_section.values().flatten() {
            let Some(perm) = page.roles.get(&role) else {
                continue;
            };
            out.insert(
                page.page_key.clone(),
                RolePagePermission {
                    page_key: page.page_key.clone(),
                    label: page.label.clone(),
                    path: page.path.clone(),
                    section: page.section.clone(),
                    can_access: perm.can_access,
                    in_sidebar: perm.in_sidebar,
                    sidebar_order: perm.sidebar_order,
                },
            );
        }
        out
    }

    pub fn page_count(&self) -> usize {
        self.by_section.values().map(Vec::len).sum()
    }
}

/// Orders section labels canonically, unknown labels lexically at the end
pub(crate) fn order_sections<I: IntoIterator<Item = String>>(present: I) -> Vec<String> {
    let mut known: Vec<String> = Vec::new();
    let mut unknown: Vec<String> = Vec::new();
    for section in present {
        if SECTION_ORDER.contains(&section.as_str()) {
            known.push(section);
        } else {
            unknown.push(section);
        }
    }
    known.sort_by_key(|s| SECTION_ORDER.iter().position(|c| c == s));
    unknown.sort();
    known.extend(unknown);
    known
}

/// Builds the effective matrix from the registry and the store
///
/// The read path is degrade-safe: if the store is unreachable the builder
/// serves registry defaults instead of failing, so a database outage narrows
/// everyone to their defaults rather than taking the back office down.
pub struct MatrixBuilder {
    registry: Arc<PageRegistry>,
    store: Arc<dyn PermissionStore>,
}

impl MatrixBuilder {
    pub fn new(registry: Arc<PageRegistry>, store: Arc<dyn PermissionStore>) -> Self {
        Self { registry, store }
    }

    pub async fn build(&self) -> EffectiveMatrix {
        match self.build_from_store().await {
            Ok(matrix) => matrix,
            Err(err) => {
                warn!(error = %err, "permission store unreachable, serving registry defaults");
                counter!("rbac_matrix_fallback", 1);
                self.build_from_defaults()
            }
        }
    }

    async fn build_from_store(&self) -> crate::error::RbacResult<EffectiveMatrix> {
        let rows: Vec<PageRow> = self
            .registry
            .all_pages()
            .iter()
            .map(PageRow::from_definition)
            .collect();
        self.store.upsert_page_catalog(&rows).await?;
        let (pages, overrides) = self.store.read_pages_and_overrides().await?;
        Ok(merge(pages, overrides))
    }

    pub(crate) fn build_from_defaults(&self) -> EffectiveMatrix {
        let pages: Vec<PageRow> = self
            .registry
            .all_pages()
            .iter()
            .map(PageRow::from_definition)
            .collect();
        merge(pages, Vec::new())
    }
}

fn merge(mut pages: Vec<PageRow>, overrides: Vec<PermissionOverride>) -> EffectiveMatrix {
    pages.sort_by(|a, b| {
        (&a.section, a.default_sidebar_order, &a.page_key)
            .cmp(&(&b.section, b.default_sidebar_order, &b.page_key))
    });

    // Overrides referencing pages no longer in the catalog fall out here.
    let by_key: HashMap<(RoleKey, &str), &PermissionOverride> = overrides
        .iter()
        .map(|o| ((o.role_key, o.page_key.as_str()), o))
        .collect();

    let mut by_section: HashMap<String, Vec<MatrixPage>> = HashMap::new();
    for page in &pages {
        let mut roles = HashMap::new();
        for role in RoleKey::ALL {
            let cell = match by_key.get(&(role, page.page_key.as_str())) {
                Some(o) => EffectivePermission {
                    can_access: o.can_access,
                    // Access gone means the sidebar entry goes too, even if
                    // the stored row still says otherwise.
                    in_sidebar: o.can_access && o.in_sidebar,
                    sidebar_order: o.sidebar_order,
                    overridden: true,
                },
                None => EffectivePermission {
                    can_access: page.default_access_roles.contains(&role),
                    in_sidebar: page.default_sidebar_roles.contains(&role),
                    sidebar_order: page.default_sidebar_order,
                    overridden: false,
                },
            };
            roles.insert(role, cell);
        }
        by_section
            .entry(page.section.clone())
            .or_default()
            .push(MatrixPage {
                page_key: page.page_key.clone(),
                label: page.label.clone(),
                path: page.path.clone(),
                section: page.section.clone(),
                roles,
            });
    }

    let sections = order_sections(by_section.keys().cloned());
    EffectiveMatrix {
        roles: RoleKey::ALL.to_vec(),
        sections,
        by_section,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryPermissionStore;
    use chrono::Utc;

    fn builder_with_store() -> (MatrixBuilder, Arc<InMemoryPermissionStore>) {
        let store = Arc::new(InMemoryPermissionStore::new());
        let builder = MatrixBuilder::new(Arc::new(PageRegistry::default()), store.clone());
        (builder, store)
    }

    fn deny_override(role_key: RoleKey, page_key: &str) -> PermissionOverride {
        PermissionOverride {
            role_key,
            page_key: page_key.to_string(),
            can_access: false,
            in_sidebar: false,
            sidebar_order: 1,
            updated_by: None,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn defaults_fill_cells_without_overrides() {
        let (builder, _store) = builder_with_store();
        let matrix = builder.build().await;

        let cell = matrix
            .permission_for(RoleKey::Employee, "admin.customers")
            .unwrap();
        assert!(cell.can_access && cell.in_sidebar && !cell.overridden);

        let cell = matrix
            .permission_for(RoleKey::Employee, "admin.payroll")
            .unwrap();
        assert!(!cell.can_access && !cell.in_sidebar);
    }

    #[tokio::test]
    async fn override_fully_replaces_the_default() {
        let (builder, store) = builder_with_store();
        store
            .upsert_override(deny_override(RoleKey::Employee, "admin.customers"))
            .await
            .unwrap();

        let matrix = builder.build().await;
        let cell = matrix
            .permission_for(RoleKey::Employee, "admin.customers")
            .unwrap();
        assert!(!cell.can_access && cell.overridden);
        // Other roles keep their defaults.
        let manager = matrix
            .permission_for(RoleKey::Manager, "admin.customers")
            .unwrap();
        assert!(manager.can_access && !manager.overridden);
    }

    #[tokio::test]
    async fn sidebar_is_forced_off_when_access_is_off() {
        let (builder, store) = builder_with_store();
        let mut row = deny_override(RoleKey::Employee, "admin.customers");
        row.in_sidebar = true;
        store.upsert_override(row).await.unwrap();

        let matrix = builder.build().await;
        let cell = matrix
            .permission_for(RoleKey::Employee, "admin.customers")
            .unwrap();
        assert!(!cell.in_sidebar);
    }

    #[tokio::test]
    async fn orphaned_override_is_ignored() {
        let (builder, store) = builder_with_store();
        store
            .upsert_override(deny_override(RoleKey::Employee, "admin.retired-page"))
            .await
            .unwrap();

        let matrix = builder.build().await;
        assert_eq!(matrix.permission_for(RoleKey::Employee, "admin.retired-page"), None);
        assert_eq!(matrix.page_count(), PageRegistry::default().all_pages().len());
    }

    #[tokio::test]
    async fn store_outage_degrades_to_defaults() {
        let (builder, store) = builder_with_store();
        store
            .upsert_override(deny_override(RoleKey::Employee, "admin.customers"))
            .await
            .unwrap();
        store.set_unavailable(true);

        let matrix = builder.build().await;
        let cell = matrix
            .permission_for(RoleKey::Employee, "admin.customers")
            .unwrap();
        assert!(cell.can_access, "fallback must ignore stored overrides");
        assert_eq!(matrix.page_count(), PageRegistry::default().all_pages().len());
    }

    #[test]
    fn sections_follow_canonical_order_with_unknown_last() {
        let ordered = order_sections(
            ["Settings", "Zebra", "Overview", "Billing", "Apples"]
                .into_iter()
                .map(String::from),
        );
        assert_eq!(ordered, vec!["Overview", "Billing", "Settings", "Apples", "Zebra"]);
    }
}
