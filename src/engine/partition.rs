// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Instance index that owns `key` among `partitions` instances.
///
/// Stable for the lifetime of the process, which is all the routing needs:
/// every tuple with the same key reaches the same instance.
pub fn partition_for<K: Hash + ?Sized>(key: &K, partitions: usize) -> usize {
    if partitions <= 1 {
        return 0;
    }
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % partitions as u64) as usize
}
