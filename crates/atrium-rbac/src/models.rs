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

//! Persisted rows, update inputs, and derived views

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::{Area, PageDefinition, RoleKey};

/// Sentinel page key used on audit records produced by a role reset
pub const RESET_PAGE_KEY: &str = "_reset";

/// A registry page as mirrored into the store by catalog sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRow {
    pub page_key: String,
    pub label: String,
    pub path: String,
    pub area: Area,
    pub section: String,
    pub default_access_roles: Vec<RoleKey>,
    pub default_sidebar_roles: Vec<RoleKey>,
    pub default_sidebar_order: i64,
    pub updated_at: DateTime<Utc>,
}

impl PageRow {
    pub fn from_definition(def: &PageDefinition) -> Self {
        Self {
            page_key: def.key.clone(),
            label: def.label.clone(),
            path: def.path.clone(),
            area: def.area,
            section: def.section.clone(),
            default_access_roles: def.default_access_roles.clone(),
            default_sidebar_roles: def.default_sidebar_roles.clone(),
            default_sidebar_order: def.default_sidebar_order,
            updated_at: Utc::now(),
        }
    }
}

/// A stored (role, page) permission override
///
/// One row fully replaces the page's registry default for that role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverride {
    pub role_key: RoleKey,
    pub page_key: String,
    pub can_access: bool,
    pub in_sidebar: bool,
    pub sidebar_order: i64,
    /// Identifier of the actor who last wrote the row, if known
    pub updated_by: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl PermissionOverride {
    /// The audit-facing snapshot of this row
    pub fn value(&self) -> OverrideValue {
        OverrideValue {
            can_access: self.can_access,
            in_sidebar: self.in_sidebar,
            sidebar_order: self.sidebar_order,
        }
    }
}

/// The permission payload of an override, without its key columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideValue {
    pub can_access: bool,
    pub in_sidebar: bool,
    pub sidebar_order: i64,
}

/// One row of a batched permission save, as submitted by a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionUpdate {
    pub page_key: String,
    pub can_access: bool,
    pub in_sidebar: bool,
    pub sidebar_order: i64,
}

/// Resolved permission for one (role, page) cell of the matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePermission {
    pub can_access: bool,
    pub in_sidebar: bool,
    pub sidebar_order: i64,
    /// Whether an override row produced this cell (false means registry default)
    pub overridden: bool,
}

/// Per-page effective permission for a single role, with display fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePagePermission {
    pub page_key: String,
    pub label: String,
    pub path: String,
    pub section: String,
    pub can_access: bool,
    pub in_sidebar: bool,
    pub sidebar_order: i64,
}

/// Value snapshot stored on an audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AuditValue {
    /// A concrete override payload (old or new side of a per-page change)
    Override(OverrideValue),
    /// Old side of a role reset: every override value the reset removed
    BulkReset { page_keys: Vec<String> },
    /// New side of a role reset: the role is back on registry defaults
    ResetMarker,
}

/// One immutable audit journal entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: String,
    pub role_key: RoleKey,
    /// Page key the change applies to, or [`RESET_PAGE_KEY`] for a role reset
    pub page_key: String,
    /// Prior state; `None` when no override existed before the change
    pub old_value: Option<AuditValue>,
    pub new_value: AuditValue,
    pub changed_by: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied request context attached to audit records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Sidebar navigation for one role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationTree {
    pub sections: Vec<NavSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavSection {
    pub label: String,
    pub items: Vec<NavItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavItem {
    pub page_key: String,
    pub label: String,
    pub path: String,
    pub sidebar_order: i64,
}
