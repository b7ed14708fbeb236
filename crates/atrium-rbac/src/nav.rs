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

//! Per-role sidebar navigation

use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::MatrixCache;
use crate::gate::{derive_role, RoleClaims};
use crate::matrix::order_sections;
use crate::models::{NavItem, NavSection, NavigationTree};
use crate::registry::RoleKey;

/// Builds the sectioned sidebar tree for a role
///
/// A page appears only when the role both can access it and has it flagged
/// for the sidebar; sections that end up empty are dropped, not rendered
/// as headers with nothing under them.
pub struct NavBuilder {
    cache: Arc<MatrixCache>,
}

impl NavBuilder {
    pub fn new(cache: Arc<MatrixCache>) -> Self {
        Self { cache }
    }

    pub async fn build(&self, role: RoleKey) -> NavigationTree {
        let matrix = self.cache.get().await;
        let mut by_section: HashMap<String, Vec<NavItem>> = HashMap::new();
        for perm in matrix.effective_for_role(role).into_values() {
            if !(perm.can_access && perm.in_sidebar) {
                continue;
            }
            by_section.entry(perm.section).or_default().push(NavItem {
                page_key: perm.page_key,
                label: perm.label,
                path: perm.path,
                sidebar_order: perm.sidebar_order,
            });
        }

        let sections = order_sections(by_section.keys().cloned())
            .into_iter()
            .map(|label| {
                let mut items = by_section.remove(&label).unwrap_or_default();
                items.sort_by(|a, b| {
                    (a.sidebar_order, &a.page_key).cmp(&(b.sidebar_order, &b.page_key))
                });
                NavSection { label, items }
            })
            .collect();
        NavigationTree { sections }
    }

    pub async fn build_for_claims(&self, claims: &RoleClaims) -> NavigationTree {
        self.build(derive_role(claims)).await
    }
}
