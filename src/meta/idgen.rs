//! Node id allocation.
//!
//! Ids combine a host-derived prefix with a base-36 monotonic counter seeded
//! from wall-clock millis. Allocation is a single mutual-exclusion section;
//! rapid sequential allocations bump the counter past the clock, so ids stay
//! distinct without coordination beyond the lock.

use crate::types::NodeId;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Encode an integer in lowercase base-36.
pub(crate) fn base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ascii")
}

pub struct IdGenerator {
    prefix: String,
    last: Mutex<u64>,
}

impl IdGenerator {
    /// Generator with a prefix derived from the local host name.
    pub fn new() -> Self {
        Self::with_prefix(host_prefix())
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            last: Mutex::new(0),
        }
    }

    pub fn next(&self) -> NodeId {
        let mut last = self.last.lock();
        let mut counter = chrono::Utc::now().timestamp_millis().max(0) as u64;
        if counter <= *last {
            counter = *last + 1;
        }
        *last = counter;
        format!("{}{}", self.prefix, base36(counter))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn host_prefix() -> String {
    let host = std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "localhost".to_string());
    let mut hasher = DefaultHasher::new();
    host.hash(&mut hasher);
    let tag = base36(hasher.finish());
    format!("{}-", &tag[..tag.len().min(5)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_base36_encoding() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "z");
        assert_eq!(base36(36), "10");
        assert_eq!(base36(36 * 36 + 1), "101");
    }

    #[test]
    fn test_rapid_sequential_allocation_is_distinct() {
        let ids = IdGenerator::with_prefix("t-");
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(ids.next()));
        }
    }

    #[test]
    fn test_concurrent_allocation_is_distinct() {
        let ids = Arc::new(IdGenerator::with_prefix("c-"));
        let mut handles = vec![];
        for _ in 0..8 {
            let ids = ids.clone();
            handles.push(thread::spawn(move || {
                (0..500).map(|_| ids.next()).collect::<Vec<_>>()
            }));
        }
        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
    }

    #[test]
    fn test_prefix_carried() {
        let ids = IdGenerator::with_prefix("abc-");
        assert!(ids.next().starts_with("abc-"));
    }
}
