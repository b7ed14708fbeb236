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

//! Append-only audit journal for permission changes
//!
//! Audit writes never fail the operation they describe: a permission change
//! that went through stays through, and a failed journal insert is logged
//! and counted instead of propagated.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use tracing::{error, info};
use uuid::Uuid;

use crate::models::{AuditRecord, AuditValue, OverrideValue, RequestMeta, RESET_PAGE_KEY};
use crate::registry::RoleKey;
use crate::store::PermissionStore;

pub struct AuditLogger {
    store: Arc<dyn PermissionStore>,
}

impl AuditLogger {
    pub fn new(store: Arc<dyn PermissionStore>) -> Self {
        Self { store }
    }

    /// Journal one per-page override change
    pub async fn record_override_change(
        &self,
        role_key: RoleKey,
        page_key: &str,
        old_value: Option<OverrideValue>,
        new_value: OverrideValue,
        actor: Option<&str>,
        meta: &RequestMeta,
    ) {
        let record = AuditRecord {
            id: Uuid::new_v4().to_string(),
            role_key,
            page_key: page_key.to_string(),
            old_value: old_value.map(AuditValue::Override),
            new_value: AuditValue::Override(new_value),
            changed_by: actor.map(str::to_string),
            ip: meta.ip.clone(),
            user_agent: meta.user_agent.clone(),
            created_at: Utc::now(),
        };
        self.write(record).await;
    }

    /// Journal a role reset as one record carrying every removed page key
    pub async fn record_role_reset(
        &self,
        role_key: RoleKey,
        removed_page_keys: Vec<String>,
        actor: Option<&str>,
        meta: &RequestMeta,
    ) {
        let record = AuditRecord {
            id: Uuid::new_v4().to_string(),
            role_key,
            page_key: RESET_PAGE_KEY.to_string(),
            old_value: Some(AuditValue::BulkReset {
                page_keys: removed_page_keys,
            }),
            new_value: AuditValue::ResetMarker,
            changed_by: actor.map(str::to_string),
            ip: meta.ip.clone(),
            user_agent: meta.user_agent.clone(),
            created_at: Utc::now(),
        };
        self.write(record).await;
    }

    async fn write(&self, record: AuditRecord) {
        let role_key = record.role_key;
        let page_key = record.page_key.clone();
        match self.store.insert_audit(record).await {
            Ok(()) => {
                info!(role_key = %role_key, page_key = %page_key, "permission change journaled");
            }
            Err(err) => {
                error!(
                    role_key = %role_key,
                    page_key = %page_key,
                    error = %err,
                    "audit write failed, permission change is not journaled"
                );
                counter!("rbac_audit_write_failed", 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryPermissionStore;

    fn value(can_access: bool) -> OverrideValue {
        OverrideValue {
            can_access,
            in_sidebar: can_access,
            sidebar_order: 10,
        }
    }

    #[tokio::test]
    async fn override_change_journals_old_and_new() {
        let store = Arc::new(InMemoryPermissionStore::new());
        let logger = AuditLogger::new(store.clone());

        logger
            .record_override_change(
                RoleKey::Employee,
                "admin.notes",
                Some(value(true)),
                value(false),
                Some("user-7"),
                &RequestMeta {
                    ip: Some("10.0.0.9".to_string()),
                    user_agent: Some("test-agent".to_string()),
                },
            )
            .await;

        let records = store.audit_records().await;
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.page_key, "admin.notes");
        assert_eq!(record.old_value, Some(AuditValue::Override(value(true))));
        assert_eq!(record.new_value, AuditValue::Override(value(false)));
        assert_eq!(record.changed_by.as_deref(), Some("user-7"));
        assert_eq!(record.ip.as_deref(), Some("10.0.0.9"));
    }

    #[tokio::test]
    async fn first_override_has_no_old_value() {
        let store = Arc::new(InMemoryPermissionStore::new());
        let logger = AuditLogger::new(store.clone());

        logger
            .record_override_change(
                RoleKey::Manager,
                "admin.scraper",
                None,
                value(true),
                None,
                &RequestMeta::default(),
            )
            .await;

        let records = store.audit_records().await;
        assert_eq!(records[0].old_value, None);
        assert_eq!(records[0].changed_by, None);
    }

    #[tokio::test]
    async fn reset_uses_the_sentinel_page_key() {
        let store = Arc::new(InMemoryPermissionStore::new());
        let logger = AuditLogger::new(store.clone());

        logger
            .record_role_reset(
                RoleKey::Employee,
                vec!["admin.notes".to_string(), "admin.scraper".to_string()],
                Some("user-7"),
                &RequestMeta::default(),
            )
            .await;

        let records = store.audit_records().await;
        assert_eq!(records[0].page_key, RESET_PAGE_KEY);
        assert_eq!(records[0].new_value, AuditValue::ResetMarker);
        assert_eq!(
            records[0].old_value,
            Some(AuditValue::BulkReset {
                page_keys: vec!["admin.notes".to_string(), "admin.scraper".to_string()],
            })
        );
    }

    #[tokio::test]
    async fn journal_failure_is_swallowed() {
        let store = Arc::new(InMemoryPermissionStore::new());
        let logger = AuditLogger::new(store.clone());
        store.set_unavailable(true);

        // Must not panic or propagate.
        logger
            .record_override_change(
                RoleKey::Employee,
                "admin.notes",
                None,
                value(false),
                None,
                &RequestMeta::default(),
            )
            .await;

        store.set_unavailable(false);
        assert!(store.audit_records().await.is_empty());
    }
}
