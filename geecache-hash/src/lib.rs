//! Consistent hash ring with virtual nodes, mapping keys to peer ids.

use std::collections::BTreeMap;

/// Virtual-node multiplier used when a caller doesn't pick one explicitly.
pub const DEFAULT_REPLICAS: usize = 50;

/// A hash function from arbitrary bytes to a 32-bit ring position.
pub type HashFn = Box<dyn Fn(&[u8]) -> u32 + Send + Sync>;

fn crc32_ieee(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Maps keys onto a set of peer ids via consistent hashing.
///
/// Not safe to call `add` concurrently with `get`; callers that need
/// concurrent access wrap a `Ring` in their own lock (see the peer
/// server adapter in `geecache-transport`, which rebuilds and swaps a
/// whole `Ring` under its own mutex instead of mutating one in place).
pub struct Ring {
    replicas: usize,
    hash_fn: HashFn,
    // virtual node hash -> owning real peer id. A BTreeMap keeps ring
    // positions sorted by construction, so `get` is a single range
    // lookup instead of a separate sort-then-binary-search step.
    ring: BTreeMap<u32, String>,
}

impl Ring {
    pub fn new(replicas: usize) -> Self {
        Self::with_hash_fn(replicas, Box::new(crc32_ieee))
    }

    pub fn with_hash_fn(replicas: usize, hash_fn: HashFn) -> Self {
        Ring {
            replicas,
            hash_fn,
            ring: BTreeMap::new(),
        }
    }

    /// Adds real peers, each materialized as `replicas` virtual nodes.
    /// On hash collisions between virtual nodes, the later `add` wins
    /// ownership of that ring position.
    pub fn add<I, S>(&mut self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for peer in peers {
            let peer = peer.as_ref();
            for i in 0..self.replicas {
                let mut key = i.to_string();
                key.push_str(peer);
                let hash = (self.hash_fn)(key.as_bytes());
                self.ring.insert(hash, peer.to_string());
            }
        }
    }

    /// Returns the peer id owning `key`, or `None` if no peers are configured.
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.ring.is_empty() {
            return None;
        }
        let hash = (self.hash_fn)(key.as_bytes());
        let owner = self
            .ring
            .range(hash..)
            .next()
            .or_else(|| self.ring.iter().next())
            .map(|(_, peer)| peer.as_str());
        owner
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}
