// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::num::NonZeroUsize;

use lru::LruCache;
use uuid::Uuid;

/// Bounded memory of recently seen event ids.
///
/// A subscriber attached to several topics receives a fanned-out event once
/// per topic; only the first copy passes.
#[derive(Debug)]
pub struct EventDeduper {
    seen: LruCache<Uuid, ()>,
}

impl EventDeduper {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            seen: LruCache::new(capacity),
        }
    }

    /// Record `id`; returns `true` the first time it is observed.
    pub fn observe(&mut self, id: Uuid) -> bool {
        if self.seen.contains(&id) {
            return false;
        }
        self.seen.put(id, ());
        true
    }
}
