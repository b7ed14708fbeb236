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

//! TTL cache around the matrix builder

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use crate::matrix::{EffectiveMatrix, MatrixBuilder};

/// Time source, injectable so expiry can be tested without sleeping
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Clone)]
struct CacheEntry {
    matrix: Arc<EffectiveMatrix>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Single-slot TTL cache for the effective matrix
///
/// Gate checks, navigation, and matrix reads all go through here, so within
/// one TTL window every consumer sees the same snapshot. Writes call
/// [`MatrixCache::invalidate`], which makes the next read rebuild.
pub struct MatrixCache {
    builder: MatrixBuilder,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entry: RwLock<Option<CacheEntry>>,
}

impl MatrixCache {
    pub fn new(builder: MatrixBuilder, ttl: Duration) -> Self {
        Self::with_clock(builder, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(builder: MatrixBuilder, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            builder,
            ttl,
            clock,
            entry: RwLock::new(None),
        }
    }

    /// The current matrix snapshot, rebuilding if the slot is cold or stale
    pub async fn get(&self) -> Arc<EffectiveMatrix> {
        let now = self.clock.now();
        {
            let entry = self.entry.read().await;
            if let Some(entry) = entry.as_ref() {
                if !entry.is_expired(now) {
                    return entry.matrix.clone();
                }
            }
        }

        let mut slot = self.entry.write().await;
        // Another task may have rebuilt while we waited for the write lock.
        if let Some(entry) = slot.as_ref() {
            if !entry.is_expired(now) {
                return entry.matrix.clone();
            }
        }

        let matrix = Arc::new(self.builder.build().await);
        *slot = Some(CacheEntry {
            matrix: matrix.clone(),
            expires_at: now + self.ttl,
        });
        debug!(pages = matrix.page_count(), "effective matrix rebuilt");
        matrix
    }

    /// Drop the cached snapshot so the next read rebuilds
    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
        debug!("effective matrix cache invalidated");
    }
}
