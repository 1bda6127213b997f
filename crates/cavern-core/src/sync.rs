// Copyright 2025 the cavern authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Publish-by-swap snapshot cells.
//!
//! The render thread and the application thread never share mutable data
//! directly. A writer publishes a complete immutable value; readers load
//! whichever snapshot is current. A reader can never observe a
//! half-written value, and neither side ever blocks the other for longer
//! than an `Arc` pointer swap.

use std::sync::{Arc, Mutex};

/// A cell holding the latest published snapshot of a value.
///
/// `publish` replaces the snapshot wholesale; `load` hands out a cheap
/// `Arc` clone of the current one. The internal lock is held only for the
/// pointer exchange.
#[derive(Debug)]
pub struct SharedSnapshot<T> {
    slot: Mutex<Arc<T>>,
}

impl<T> SharedSnapshot<T> {
    /// Creates a cell seeded with `value`.
    pub fn new(value: T) -> Self {
        Self {
            slot: Mutex::new(Arc::new(value)),
        }
    }

    /// Publishes a new snapshot, replacing the previous one.
    ///
    /// Readers holding the old `Arc` keep a consistent view until they
    /// load again.
    pub fn publish(&self, value: T) {
        let next = Arc::new(value);
        let mut slot = match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = next;
    }

    /// Loads the current snapshot.
    pub fn load(&self) -> Arc<T> {
        let slot = match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(&slot)
    }
}

impl<T: Default> Default for SharedSnapshot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_load_returns_seed_value() {
        let cell = SharedSnapshot::new(41);
        assert_eq!(*cell.load(), 41);
    }

    #[test]
    fn test_publish_replaces_snapshot() {
        let cell = SharedSnapshot::new(0);
        cell.publish(7);
        assert_eq!(*cell.load(), 7);
        cell.publish(8);
        assert_eq!(*cell.load(), 8);
    }

    #[test]
    fn test_old_snapshot_stays_consistent_after_publish() {
        let cell = SharedSnapshot::new(vec![1, 2, 3]);
        let before = cell.load();
        cell.publish(vec![4, 5, 6]);
        assert_eq!(*before, vec![1, 2, 3], "held snapshots must not change");
        assert_eq!(*cell.load(), vec![4, 5, 6]);
    }

    #[test]
    fn test_concurrent_publish_and_load() {
        let cell = Arc::new(SharedSnapshot::new((0u64, 0u64)));
        let writer = {
            let cell = Arc::clone(&cell);
            thread::spawn(move || {
                for i in 1..=10_000u64 {
                    cell.publish((i, i.wrapping_mul(31)));
                }
            })
        };
        // Every observed snapshot must be internally consistent.
        for _ in 0..10_000 {
            let snap = cell.load();
            assert_eq!(
                snap.1,
                snap.0.wrapping_mul(31),
                "reader observed a torn snapshot: {snap:?}"
            );
        }
        writer.join().expect("writer thread panicked");
    }
}
