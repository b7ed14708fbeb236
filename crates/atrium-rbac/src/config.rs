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

//! RBAC engine configuration

use std::time::Duration;

/// Tunables for the RBAC engine
#[derive(Debug, Clone)]
pub struct RbacConfig {
    /// How long a built effective matrix is served before a rebuild
    pub cache_ttl: Duration,
    /// Paths starting with this prefix are never gated by page permissions
    pub api_prefix: String,
    /// The one page path that stays reachable regardless of overrides,
    /// so an administrator can always undo a lock-out
    pub settings_bypass_path: String,
    /// Where a denied request is redirected
    pub deny_redirect: String,
    /// Message attached to a deny decision
    pub deny_message: String,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(60),
            api_prefix: "/api/".to_string(),
            settings_bypass_path: "/admin/platform-settings".to_string(),
            deny_redirect: "/admin".to_string(),
            deny_message: "You do not have access to this page.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ttl_is_one_minute() {
        let config = RbacConfig::default();
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
    }

    #[test]
    fn default_bypass_path_lives_under_the_admin_area() {
        let config = RbacConfig::default();
        assert!(config.settings_bypass_path.starts_with("/admin"));
        assert!(!config.settings_bypass_path.ends_with('/'));
    }
}
