//! Outbound value cache
//!
//! Keeps the last value + payload written to each wire address so the session
//! only sends deltas. This is a correctness property, not an optimization:
//! the transport enforces a minimum inter-message interval, and re-sending
//! unchanged state would starve real updates.

use std::collections::HashMap;

/// Last value written to one wire address.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheEntry {
    value: u8,
    payload: Vec<u8>,
}

/// Per-address last-written-value store.
///
/// Addresses are `(channel, state)` pairs: the logical track/channel index
/// and the state identifier within that channel. Cleared in bulk on every
/// successful (re-)handshake, since the hardware's own state is assumed
/// reset then.
#[derive(Debug, Default)]
pub struct ValueCache {
    entries: HashMap<(u8, u8), CacheEntry>,
}

impl ValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a write; returns `true` when the cache already held an
    /// identical value + payload and the write can be suppressed.
    ///
    /// Equality is exact: any difference, including payload length, counts
    /// as a change.
    pub fn store(&mut self, channel: u8, state: u8, value: u8, payload: &[u8]) -> bool {
        let key = (channel, state);
        if let Some(entry) = self.entries.get(&key) {
            if entry.value == value && entry.payload == payload {
                return true;
            }
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                payload: payload.to_vec(),
            },
        );
        false
    }

    /// Drop every entry, forcing the next write to each address through.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_write_is_suppressed() {
        let mut cache = ValueCache::new();
        assert!(!cache.store(0, 1, 5, &[]));
        assert!(cache.store(0, 1, 5, &[]));
    }

    #[test]
    fn test_payload_difference_is_a_change() {
        let mut cache = ValueCache::new();
        assert!(!cache.store(0, 1, 5, &[]));
        assert!(cache.store(0, 1, 5, &[]));
        assert!(!cache.store(0, 1, 5, &[1]));
        assert!(cache.store(0, 1, 5, &[1]));
    }

    #[test]
    fn test_payload_length_difference_is_a_change() {
        let mut cache = ValueCache::new();
        assert!(!cache.store(2, 3, 9, &[1, 2]));
        assert!(!cache.store(2, 3, 9, &[1, 2, 0]));
    }

    #[test]
    fn test_value_difference_is_a_change() {
        let mut cache = ValueCache::new();
        assert!(!cache.store(0, 1, 5, &[7]));
        assert!(!cache.store(0, 1, 6, &[7]));
    }

    #[test]
    fn test_addresses_are_independent() {
        let mut cache = ValueCache::new();
        assert!(!cache.store(0, 1, 5, &[]));
        assert!(!cache.store(1, 1, 5, &[]));
        assert!(!cache.store(0, 2, 5, &[]));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_clear_forces_resend() {
        let mut cache = ValueCache::new();
        assert!(!cache.store(0, 1, 5, &[]));
        assert!(cache.store(0, 1, 5, &[]));
        cache.clear();
        // First write after a clear is never suppressed.
        assert!(!cache.store(0, 1, 5, &[]));
    }
}
