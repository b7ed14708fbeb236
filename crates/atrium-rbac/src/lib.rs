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

//! Role-based access control for the Atrium back office
//!
//! This crate resolves "can this user open this page, and what belongs in
//! their sidebar" for a multi-tenant admin application. The pieces:
//!
//! - [`registry`]: the compiled-in page catalog with per-role defaults
//! - [`resolver`]: request-path to page-key mapping
//! - [`matrix`] / [`cache`]: the effective role × page matrix, merged from
//!   registry defaults and stored overrides, served from a TTL cache
//! - [`gate`]: role derivation from identity claims and allow/deny decisions
//! - [`nav`]: per-role sidebar trees
//! - [`audit`]: an append-only journal of permission changes
//! - [`store`]: the persistence seam ([`store::PermissionStore`]) with an
//!   in-memory implementation
//! - [`system`]: the [`system::RbacSystem`] facade wiring it all together
//!
//! Reads are degrade-safe: if the store is down, the engine serves registry
//! defaults instead of failing, and write operations report errors normally.

pub mod audit;
pub mod cache;
pub mod config;
pub mod error;
pub mod gate;
pub mod matrix;
pub mod models;
pub mod nav;
pub mod registry;
pub mod resolver;
pub mod store;
pub mod system;


pub use audit::AuditLogger;
pub use cache::{Clock, MatrixCache, SystemClock};
pub use config::RbacConfig;
pub use error::{RbacError, RbacResult};
pub use gate::{derive_role, AccessGate, Decision, RoleClaims};
pub use matrix::{EffectiveMatrix, MatrixBuilder, MatrixPage, SECTION_ORDER};
pub use models::{
    AuditRecord, AuditValue, EffectivePermission, NavItem, NavSection, NavigationTree,
    OverrideValue, PageRow, PermissionOverride, PermissionUpdate, RequestMeta,
    RolePagePermission, RESET_PAGE_KEY,
};
pub use nav::NavBuilder;
pub use registry::{Area, PageDefinition, PageRegistry, RoleKey};
pub use resolver::PathResolver;
pub use store::{InMemoryPermissionStore, PermissionStore};
pub use system::RbacSystem;
