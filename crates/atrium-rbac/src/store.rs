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

//! Persistence seam for pages, overrides, and the audit journal

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{RbacError, RbacResult};
use crate::models::{AuditRecord, OverrideValue, PageRow, PermissionOverride};
use crate::registry::RoleKey;

/// Storage backend for the RBAC engine
///
/// Implementations are expected to make each method independently atomic;
/// the engine never asks for cross-call transactions.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Mirror the registry catalog into storage, keyed by page key.
    /// Must be idempotent; re-syncing an unchanged catalog is a no-op
    /// apart from timestamps.
    async fn upsert_page_catalog(&self, pages: &[PageRow]) -> RbacResult<()>;

    /// Read every page row and every override row in one shot
    async fn read_pages_and_overrides(&self) -> RbacResult<(Vec<PageRow>, Vec<PermissionOverride>)>;

    /// Insert or replace one override row, returning the previous value
    /// for the same (role, page) if there was one
    async fn upsert_override(&self, row: PermissionOverride) -> RbacResult<Option<OverrideValue>>;

    /// Delete every override for a role, returning the affected page keys
    async fn delete_overrides_for_role(&self, role_key: RoleKey) -> RbacResult<Vec<String>>;

    /// Append one record to the audit journal
    async fn insert_audit(&self, record: AuditRecord) -> RbacResult<()>;
}

/// In-memory [`PermissionStore`] used in tests and single-process embeddings
///
/// The `unavailable` switch makes every call fail with
/// [`RbacError::PersistenceUnavailable`], which is how outage behavior
/// (matrix fallback, save aborts) gets exercised without a real backend.
#[derive(Default)]
pub struct InMemoryPermissionStore {
    pages: RwLock<BTreeMap<String, PageRow>>,
    overrides: RwLock<HashMap<(RoleKey, String), PermissionOverride>>,
    audit: RwLock<Vec<AuditRecord>>,
    unavailable: AtomicBool,
}

impl InMemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle the simulated outage
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn page_count(&self) -> usize {
        self.pages.read().await.len()
    }

    pub async fn override_rows(&self) -> Vec<PermissionOverride> {
        let mut rows: Vec<_> = self.overrides.read().await.values().cloned().collect();
        rows.sort_by(|a, b| (a.role_key, &a.page_key).cmp(&(b.role_key, &b.page_key)));
        rows
    }

    pub async fn audit_records(&self) -> Vec<AuditRecord> {
        self.audit.read().await.clone()
    }

    fn check_available(&self) -> RbacResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RbacError::PersistenceUnavailable {
                message: "store offline".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn upsert_page_catalog(&self, pages: &[PageRow]) -> RbacResult<()> {
        self.check_available()?;
        let mut stored = self.pages.write().await;
        for row in pages {
            stored.insert(row.page_key.clone(), row.clone());
        }
        Ok(())
    }

    async fn read_pages_and_overrides(&self) -> RbacResult<(Vec<PageRow>, Vec<PermissionOverride>)> {
        self.check_available()?;
        let mut pages: Vec<_> = self.pages.read().await.values().cloned().collect();
        pages.sort_by(|a, b| {
            (&a.section, a.default_sidebar_order, &a.page_key)
                .cmp(&(&b.section, b.default_sidebar_order, &b.page_key))
        });
        let overrides = self.override_rows().await;
        Ok((pages, overrides))
    }

    async fn upsert_override(&self, row: PermissionOverride) -> RbacResult<Option<OverrideValue>> {
        self.check_available()?;
        let mut overrides = self.overrides.write().await;
        let previous = overrides.insert((row.role_key, row.page_key.clone()), row);
        Ok(previous.map(|p| p.value()))
    }

    async fn delete_overrides_for_role(&self, role_key: RoleKey) -> RbacResult<Vec<String>> {
        self.check_available()?;
        let mut overrides = self.overrides.write().await;
        let mut removed: Vec<String> = overrides
            .keys()
            .filter(|(role, _)| *role == role_key)
            .map(|(_, page_key)| page_key.clone())
            .collect();
        for page_key in &removed {
            overrides.remove(&(role_key, page_key.clone()));
        }
        removed.sort();
        Ok(removed)
    }

    async fn insert_audit(&self, record: AuditRecord) -> RbacResult<()> {
        self.check_available()?;
        self.audit.write().await.push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PageRegistry;
    use chrono::Utc;

    fn override_row(role_key: RoleKey, page_key: &str, can_access: bool) -> PermissionOverride {
        PermissionOverride {
            role_key,
            page_key: page_key.to_string(),
            can_access,
            in_sidebar: can_access,
            sidebar_order: 50,
            updated_by: Some("tester".to_string()),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn catalog_sync_is_idempotent() {
        let store = InMemoryPermissionStore::new();
        let rows: Vec<PageRow> = PageRegistry::default()
            .all_pages()
            .iter()
            .map(PageRow::from_definition)
            .collect();

        store.upsert_page_catalog(&rows).await.unwrap();
        let first = store.page_count().await;
        store.upsert_page_catalog(&rows).await.unwrap();
        assert_eq!(store.page_count().await, first);
    }

    #[tokio::test]
    async fn upsert_returns_previous_value() {
        let store = InMemoryPermissionStore::new();
        let first = store
            .upsert_override(override_row(RoleKey::Employee, "admin.notes", true))
            .await
            .unwrap();
        assert_eq!(first, None);

        let second = store
            .upsert_override(override_row(RoleKey::Employee, "admin.notes", false))
            .await
            .unwrap();
        assert_eq!(
            second,
            Some(OverrideValue {
                can_access: true,
                in_sidebar: true,
                sidebar_order: 50,
            })
        );
    }

    #[tokio::test]
    async fn delete_for_role_only_touches_that_role() {
        let store = InMemoryPermissionStore::new();
        store
            .upsert_override(override_row(RoleKey::Employee, "admin.notes", false))
            .await
            .unwrap();
        store
            .upsert_override(override_row(RoleKey::Employee, "admin.scraper", false))
            .await
            .unwrap();
        store
            .upsert_override(override_row(RoleKey::Manager, "admin.notes", false))
            .await
            .unwrap();

        let removed = store
            .delete_overrides_for_role(RoleKey::Employee)
            .await
            .unwrap();
        assert_eq!(removed, vec!["admin.notes", "admin.scraper"]);
        assert_eq!(store.override_rows().await.len(), 1);
    }

    #[tokio::test]
    async fn outage_switch_fails_every_call() {
        let store = InMemoryPermissionStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.read_pages_and_overrides().await,
            Err(RbacError::PersistenceUnavailable { .. })
        ));
        store.set_unavailable(false);
        assert!(store.read_pages_and_overrides().await.is_ok());
    }
}
