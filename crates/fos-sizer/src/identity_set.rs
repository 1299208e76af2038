//! Sharded object identity set.
//!
//! Engines report hundreds of thousands of objects per pass, so the set is
//! split into [`SHARD_COUNT`] independent maps selected by a pseudo-random
//! transform of the identity. Aligned addresses that differ only in their
//! low bits land in different shards.

use crate::name_tree::NameIndex;
use std::collections::HashMap;

/// log2 of the shard count
const SHARD_BITS: u32 = 12;

/// Number of independent shards (4096)
pub const SHARD_COUNT: usize = 1 << SHARD_BITS;

/// Park-Miller modulus, 2^31 - 1
const LEHMER_MODULUS: i64 = 0x7FFF_FFFF;
const LEHMER_MULTIPLIER: i64 = 16807;
/// Schrage decomposition of the modulus: `q = m / a`, `r = m % a`
const SCHRAGE_Q: i64 = 127773;
const SCHRAGE_R: i64 = 2836;

/// One distinct object seen during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityRecord {
    pub identity: usize,
    pub size: u64,
    /// Scope that was active when the object was first added
    pub name_index: NameIndex,
}

/// Outcome of [`ObjectIdentitySet::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    /// First sighting of the identity
    Inserted,
    /// Already recorded with the same size
    Duplicate,
    /// Already recorded with a different size; `added` bytes were folded into
    /// the record, which belongs to `owner`
    Resized { owner: NameIndex, added: u64 },
}

/// Map a pointer-sized identity to a shard.
///
/// One step of a Lehmer generator seeded with `identity >> 2`.
pub fn shard_index(identity: usize) -> usize {
    let seed = ((identity as u64 >> 2) % LEHMER_MODULUS as u64) as i64;
    let mut rem = LEHMER_MULTIPLIER * (seed % SCHRAGE_Q) - SCHRAGE_R * (seed / SCHRAGE_Q);
    if rem < 0 {
        rem += LEHMER_MODULUS;
    }
    (rem as usize) & (SHARD_COUNT - 1)
}

/// De-duplicating set of reported objects.
#[derive(Debug)]
pub struct ObjectIdentitySet {
    shards: Vec<HashMap<usize, IdentityRecord>>,
    len: usize,
}

impl ObjectIdentitySet {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| HashMap::new()).collect(),
            len: 0,
        }
    }

    /// Record `identity` as owned by `name_index`.
    pub fn insert(&mut self, identity: usize, size: u64, name_index: NameIndex) -> Insert {
        let shard = &mut self.shards[shard_index(identity)];

        match shard.get_mut(&identity) {
            None => {
                shard.insert(
                    identity,
                    IdentityRecord {
                        identity,
                        size,
                        name_index,
                    },
                );
                self.len += 1;
                Insert::Inserted
            }
            Some(record) if record.size == size => Insert::Duplicate,
            Some(record) => {
                record.size += size;
                Insert::Resized {
                    owner: record.name_index,
                    added: size,
                }
            }
        }
    }

    pub fn get(&self, identity: usize) -> Option<&IdentityRecord> {
        self.shards[shard_index(identity)].get(&identity)
    }

    pub fn contains(&self, identity: usize) -> bool {
        self.get(identity).is_some()
    }

    /// Number of distinct identities across all shards.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of shards currently holding at least one record.
    pub fn occupied_shards(&self) -> usize {
        self.shards.iter().filter(|shard| !shard.is_empty()).count()
    }

    pub fn clear(&mut self) {
        if self.len == 0 {
            return;
        }
        for shard in &mut self.shards {
            shard.clear();
        }
        self.len = 0;
    }
}

impl Default for ObjectIdentitySet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_shard_index_in_range() {
        for identity in [0usize, 1, 8, 0x1000, usize::MAX, 0xDEAD_BEEF] {
            assert!(shard_index(identity) < SHARD_COUNT);
        }
    }

    #[test]
    fn test_shard_index_deterministic() {
        assert_eq!(shard_index(0x7fff_1230), shard_index(0x7fff_1230));
    }

    #[test]
    fn test_adjacent_identities_spread() {
        // 4096 consecutive seeds map onto every shard exactly once
        let shards: HashSet<usize> = (0..SHARD_COUNT).map(|k| shard_index(k * 4)).collect();
        assert_eq!(shards.len(), SHARD_COUNT);

        // Typical 16-byte aligned allocations still spread widely
        let aligned: HashSet<usize> = (0..1024usize)
            .map(|k| shard_index(0x5555_0000 + k * 16))
            .collect();
        assert!(aligned.len() > 512);
    }

    #[test]
    fn test_insert_and_duplicate() {
        let mut set = ObjectIdentitySet::new();
        assert_eq!(set.insert(0x1000, 64, 1), Insert::Inserted);
        assert_eq!(set.insert(0x1000, 64, 2), Insert::Duplicate);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(0x1000).map(|r| r.name_index), Some(1));
    }

    #[test]
    fn test_resize_reports_owner() {
        let mut set = ObjectIdentitySet::new();
        set.insert(0x2000, 100, 3);

        assert_eq!(
            set.insert(0x2000, 50, 7),
            Insert::Resized { owner: 3, added: 50 }
        );
        assert_eq!(set.get(0x2000).map(|r| r.size), Some(150));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut set = ObjectIdentitySet::new();
        for k in 1..100usize {
            set.insert(k * 8, 8, 0);
        }
        assert_eq!(set.len(), 99);
        assert!(set.occupied_shards() > 1);

        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.occupied_shards(), 0);
        assert!(!set.contains(8));
    }
}
