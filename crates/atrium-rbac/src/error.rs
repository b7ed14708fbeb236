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

//! Error handling for the RBAC engine

use thiserror::Error;

/// Errors surfaced by the RBAC engine
///
/// Read-path degradation (serving registry defaults when the store is down)
/// is intentionally not represented here: matrix and navigation reads never
/// fail, they fall back. These kinds cover write-path and caller errors.
#[derive(Error, Debug)]
pub enum RbacError {
    /// A role key outside the closed role set was supplied
    #[error("Unknown role key: {role}")]
    UnknownRole { role: String },

    /// A page key absent from the synced page catalog was supplied
    #[error("Unknown page key: {page_key}")]
    UnknownPage { page_key: String },

    /// The persistence collaborator failed or timed out
    #[error("Persistence unavailable: {message}")]
    PersistenceUnavailable { message: String },

    /// The audit insert failed after the permission write succeeded
    #[error("Audit write failed: {message}")]
    AuditWriteFailed { message: String },

    /// A batched save stopped mid-way; rows before `page_key` stay applied
    #[error("Save aborted at {page_key} after {applied} of {total} rows: {message}")]
    SaveAborted {
        page_key: String,
        applied: usize,
        total: usize,
        message: String,
    },
}

/// Result type for RBAC operations
pub type RbacResult<T> = Result<T, RbacError>;
