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

//! Request-path to page-key resolution

use std::sync::Arc;

use crate::registry::{Area, PageRegistry};

/// Maps request paths onto registry page keys
///
/// Resolution is exact-match first, then the longest declared page path that
/// is a whole-segment prefix of the request path, so detail routes like
/// `/admin/customers/42/edit` land on their parent page. Area-root pages
/// (single-segment paths such as `/admin`) only match exactly; unknown paths
/// resolve to `None` rather than being swallowed by the dashboard.
#[derive(Debug, Clone)]
pub struct PathResolver {
    registry: Arc<PageRegistry>,
}

impl PathResolver {
    pub fn new(registry: Arc<PageRegistry>) -> Self {
        Self { registry }
    }

    pub fn resolve(&self, path: &str, area: Area) -> Option<String> {
        let normalized = normalize_path(path);
        let pages = self.registry.pages_for_area(area);

        for page in &pages {
            if normalize_path(&page.path) == normalized {
                return Some(page.key.clone());
            }
        }

        let mut best: Option<(usize, &str)> = None;
        for page in &pages {
            let page_path = normalize_path(&page.path);
            if segment_count(&page_path) < 2 {
                continue;
            }
            let is_prefix = normalized
                .strip_prefix(page_path.as_str())
                .is_some_and(|rest| rest.starts_with('/'));
            if is_prefix && best.map_or(true, |(len, _)| page_path.len() > len) {
                best = Some((page_path.len(), page.key.as_str()));
            }
        }
        best.map(|(_, key)| key.to_string())
    }
}

/// Strips one trailing slash; an empty result becomes `/`
pub(crate) fn normalize_path(path: &str) -> String {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn segment_count(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}
