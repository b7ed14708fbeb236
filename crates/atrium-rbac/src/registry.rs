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

//! Declarative page registry
//!
//! The registry is the single compiled-in source of truth for which pages
//! exist, where they live, and what each role may do with them before any
//! stored override is applied. Permission overrides are keyed by page key,
//! never by path, so paths can move without invalidating stored data.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RbacError;

/// Application area a page belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Area {
    /// The internal back office
    Admin,
    /// The external partner portal
    Partner,
}

impl Area {
    pub fn as_str(&self) -> &'static str {
        match self {
            Area::Admin => "admin",
            Area::Partner => "partner",
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of roles known to the engine
///
/// Roles are not user-defined records; adding one is a code change. Stored
/// rows referencing anything else are rejected at the edge via [`FromStr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKey {
    Admin,
    Manager,
    Employee,
    Partner,
}

impl RoleKey {
    /// Every role, in canonical matrix column order
    pub const ALL: [RoleKey; 4] = [
        RoleKey::Admin,
        RoleKey::Manager,
        RoleKey::Employee,
        RoleKey::Partner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleKey::Admin => "admin",
            RoleKey::Manager => "manager",
            RoleKey::Employee => "employee",
            RoleKey::Partner => "partner",
        }
    }
}

impl fmt::Display for RoleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleKey {
    type Err = RbacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(RoleKey::Admin),
            "manager" => Ok(RoleKey::Manager),
            "employee" => Ok(RoleKey::Employee),
            "partner" => Ok(RoleKey::Partner),
            other => Err(RbacError::UnknownRole {
                role: other.to_string(),
            }),
        }
    }
}

/// One page as declared in code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDefinition {
    /// Stable identifier, e.g. `admin.payments.invoices`
    pub key: String,
    /// Human-readable label shown in navigation and the permission matrix
    pub label: String,
    /// Route path, e.g. `/admin/payments/invoices`
    pub path: String,
    /// Area the page belongs to
    pub area: Area,
    /// Section grouping for navigation and the matrix
    pub section: String,
    /// Roles that can open the page when no override exists
    pub default_access_roles: Vec<RoleKey>,
    /// Roles that see the page in the sidebar when no override exists
    pub default_sidebar_roles: Vec<RoleKey>,
    /// Sort position within the section
    pub default_sidebar_order: i64,
}

/// The compiled-in page catalog
#[derive(Debug, Clone)]
pub struct PageRegistry {
    pages: Vec<PageDefinition>,
}

impl Default for PageRegistry {
    fn default() -> Self {
        Self {
            pages: built_in_pages(),
        }
    }
}

impl PageRegistry {
    /// Build a registry from an explicit page list (tests, embedders)
    pub fn with_pages(pages: Vec<PageDefinition>) -> Self {
        Self { pages }
    }

    pub fn all_pages(&self) -> &[PageDefinition] {
        &self.pages
    }

    pub fn pages_for_area(&self, area: Area) -> Vec<&PageDefinition> {
        self.pages.iter().filter(|p| p.area == area).collect()
    }

    pub fn page(&self, key: &str) -> Option<&PageDefinition> {
        self.pages.iter().find(|p| p.key == key)
    }

    pub fn role_keys(&self) -> &'static [RoleKey] {
        &RoleKey::ALL
    }
}

const AME: &[RoleKey] = &[RoleKey::Admin, RoleKey::Manager, RoleKey::Employee];
const AM: &[RoleKey] = &[RoleKey::Admin, RoleKey::Manager];
const A: &[RoleKey] = &[RoleKey::Admin];
const HIDDEN: &[RoleKey] = &[];

fn page(
    key: &str,
    label: &str,
    path: &str,
    section: &str,
    access: &[RoleKey],
    sidebar: &[RoleKey],
    order: i64,
) -> PageDefinition {
    PageDefinition {
        key: key.to_string(),
        label: label.to_string(),
        path: path.to_string(),
        area: Area::Admin,
        section: section.to_string(),
        default_access_roles: access.to_vec(),
        default_sidebar_roles: sidebar.to_vec(),
        default_sidebar_order: order,
    }
}

/// The back-office catalog
///
/// Ordering is grouped by section; `default_sidebar_order` spaces values so
/// pages can be inserted between existing ones without renumbering.
fn built_in_pages() -> Vec<PageDefinition> {
    vec![
        page("admin.dashboard", "Dashboard", "/admin", "Overview", AME, AME, 100),
        page("admin.leads", "Leads", "/admin/leads", "Leads", AME, AME, 200),
        page("admin.leads.engine", "Lead Engine", "/admin/leads/engine", "Leads", AME, AME, 210),
        page("admin.leads.activities", "Activities", "/admin/leads/activities", "Leads", AME, AME, 220),
        page("admin.leads.industries", "Industries", "/admin/leads/industries", "Leads", AM, AM, 230),
        page("admin.opportunities", "Opportunities", "/admin/opportunities", "Sales", AME, AME, 300),
        page("admin.opportunities.streams", "Streams", "/admin/opportunities/streams", "Sales", AM, AM, 310),
        page("admin.opportunities.deals", "Deals", "/admin/opportunities/deals", "Sales", AME, AME, 320),
        page("admin.customers", "Customers", "/admin/customers", "CRM", AME, AME, 400),
        page("admin.contacts", "Contacts", "/admin/contacts", "CRM", AME, AME, 410),
        page("admin.tasks", "Tasks", "/admin/tasks", "Execution", AME, AME, 500),
        page("admin.tickets", "Tickets", "/admin/tickets", "Tickets", AME, AME, 550),
        page("admin.messages", "Messages", "/admin/messages", "Communication", AME, AME, 600),
        page("admin.mail", "Mail", "/admin/mail", "Communication", AME, AME, 610),
        page("admin.calendar", "Calendar", "/admin/calendar", "Communication", AME, AME, 620),
        page("admin.services", "Services", "/admin/services", "Services", AME, AME, 700),
        page("admin.services.catalog", "Catalog", "/admin/services/catalog", "Services", AME, AME, 710),
        page("admin.services.analytics", "Analytics", "/admin/services/analytics", "Services", AME, AME, 720),
        page("admin.services.settings", "Service Settings", "/admin/services/settings", "Services", AM, AM, 730),
        page("admin.employees", "Employees", "/admin/employees", "Team", AM, AM, 800),
        page("admin.time-entries", "Time Entries", "/admin/time-entries", "Team", AME, AME, 810),
        page("admin.payroll", "Payroll", "/admin/payroll", "Team", A, A, 820),
        page("admin.payments", "Payments", "/admin/payments", "Billing", AME, AME, 900),
        page("admin.payments.invoices", "Invoices", "/admin/payments/invoices", "Billing", AME, AME, 910),
        page("admin.payments.mandates", "Mandates", "/admin/payments/mandates", "Billing", AM, AM, 920),
        page("admin.payments.banking", "Banking", "/admin/payments/banking", "Billing", AM, AM, 930),
        page("admin.scraper", "Scraper", "/admin/scraper", "Tools", AM, AM, 1000),
        page("admin.notes", "Notes", "/admin/notes", "Tools", AM, AM, 1010),
        page("admin.sops", "SOPs", "/admin/sops", "Internal", AME, AME, 1100),
        page("admin.users", "Users", "/admin/users", "Internal", A, HIDDEN, 1110),
        page("admin.profiles", "Profiles", "/admin/profiles", "Internal", A, HIDDEN, 1120),
        page("admin.settings", "Settings", "/admin/settings", "Settings", AME, AME, 1200),
        page("admin.platform_settings", "Platform Settings", "/admin/platform-settings", "Settings", A, A, 1210),
    ]
}
