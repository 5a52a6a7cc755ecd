//! Open-chained hash table mapping `(key, hash)` to slab slots.
//!
//! The cache builds its own table rather than using a map type because the
//! contract is wider than lookup: `insert` must install an entry *and* hand
//! back the slot of a displaced same-key entry so the shard can finalize it,
//! and eviction must unlink an entry whose key lives inside the slab being
//! mutated.
//!
//! ## Architecture
//!
//! ```text
//!   buckets: Vec<Option<SlotId>>       (length = power of two, min 4)
//!
//!   bucket = hash & (len - 1)
//!   ┌───────────┐
//!   │ Some(id₀) │ ─next_hash─► id₁ ─next_hash─► None
//!   │ None      │
//!   │ Some(id₂) │ ─next_hash─► None
//!   └───────────┘
//! ```
//!
//! Chains run through the entries' own `next_hash` fields ([`KeyedNode`]),
//! so a bucket costs one `Option<SlotId>` and an entry one link. The table
//! doubles whenever the element count exceeds the bucket count, keeping the
//! expected chain length at or below one.
//!
//! A single walk primitive, `find_pos`, returns the *position* holding a
//! matching entry (a bucket head or a predecessor's `next_hash` field);
//! lookup, insert, and remove all reuse it, mirroring the pointer-to-slot
//! walk of classic open-chained tables in index space.

use crate::ds::slab::{EntrySlab, SlotId};

/// Node addressable by the hash index: exposes its key bytes, cached hash,
/// and the chain link the table threads through it.
pub trait KeyedNode {
    fn key(&self) -> &[u8];
    fn hash(&self) -> u32;
    fn next_hash(&self) -> Option<SlotId>;
    fn set_next_hash(&mut self, next: Option<SlotId>);
}

/// Minimum (and initial) bucket count.
const MIN_BUCKETS: usize = 4;

/// Position of a chain slot: either a bucket head or the `next_hash` field
/// of the entry preceding the slot's target.
#[derive(Debug, Clone, Copy)]
enum SlotPos {
    Bucket(usize),
    Chain(SlotId),
}

#[derive(Debug)]
/// Open-chained hash table over slab-resident entries.
pub struct HashIndex {
    buckets: Vec<Option<SlotId>>,
    elems: usize,
}

impl HashIndex {
    /// Creates an empty table with the minimum bucket count.
    pub fn new() -> Self {
        Self {
            buckets: vec![None; MIN_BUCKETS],
            elems: 0,
        }
    }

    /// Returns the number of installed entries.
    pub fn len(&self) -> usize {
        self.elems
    }

    /// Returns `true` if no entries are installed.
    pub fn is_empty(&self) -> bool {
        self.elems == 0
    }

    /// Returns the current bucket count.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the slot of the entry matching `(key, hash)`, if installed.
    pub fn lookup<T: KeyedNode>(
        &self,
        slab: &EntrySlab<T>,
        key: &[u8],
        hash: u32,
    ) -> Option<SlotId> {
        let pos = self.find_pos(slab, key, hash);
        self.target(slab, pos)
    }

    /// Installs `id` at the position its `(key, hash)` occupies.
    ///
    /// If an entry with the same key and hash is already installed, it is
    /// unlinked from its chain and returned so the caller can finalize it.
    pub fn insert<T: KeyedNode>(&mut self, slab: &mut EntrySlab<T>, id: SlotId) -> Option<SlotId> {
        let pos = {
            let node = chained(slab, id);
            self.find_pos(slab, node.key(), node.hash())
        };

        match self.target(slab, pos) {
            Some(old) => {
                // Splice the new entry into the displaced entry's position.
                let old_next = chained(slab, old).next_hash();
                chained_mut(slab, id).set_next_hash(old_next);
                self.set_target(slab, pos, Some(id));
                chained_mut(slab, old).set_next_hash(None);
                Some(old)
            },
            None => {
                chained_mut(slab, id).set_next_hash(None);
                self.set_target(slab, pos, Some(id));
                self.elems += 1;
                if self.elems > self.buckets.len() {
                    // Entries are heavyweight; aim for chains of length <= 1.
                    self.grow(slab);
                }
                None
            },
        }
    }

    /// Unlinks and returns the entry matching `(key, hash)`, if installed.
    pub fn remove<T: KeyedNode>(
        &mut self,
        slab: &mut EntrySlab<T>,
        key: &[u8],
        hash: u32,
    ) -> Option<SlotId> {
        let pos = self.find_pos(slab, key, hash);
        let found = self.target(slab, pos)?;
        self.unlink_at(slab, pos, found);
        Some(found)
    }

    /// Unlinks a specific installed entry identified by its slot.
    ///
    /// Used on the eviction path, where the caller already holds the victim's
    /// slot and the key bytes live inside the slab being mutated.
    pub fn remove_slot<T: KeyedNode>(
        &mut self,
        slab: &mut EntrySlab<T>,
        id: SlotId,
    ) -> Option<SlotId> {
        let hash = chained(slab, id).hash();
        let bucket = self.bucket_of(hash);
        let mut pos = SlotPos::Bucket(bucket);
        loop {
            match self.target(slab, pos) {
                None => return None,
                Some(cur) if cur == id => {
                    self.unlink_at(slab, pos, cur);
                    return Some(cur);
                },
                Some(cur) => pos = SlotPos::Chain(cur),
            }
        }
    }

    fn bucket_of(&self, hash: u32) -> usize {
        (hash as usize) & (self.buckets.len() - 1)
    }

    /// Walks the chain for `(key, hash)` and returns the position whose
    /// target is the matching entry, or the trailing empty position.
    fn find_pos<T: KeyedNode>(&self, slab: &EntrySlab<T>, key: &[u8], hash: u32) -> SlotPos {
        let mut pos = SlotPos::Bucket(self.bucket_of(hash));
        loop {
            match self.target(slab, pos) {
                None => return pos,
                Some(id) => {
                    let node = chained(slab, id);
                    if node.hash() == hash && node.key() == key {
                        return pos;
                    }
                    pos = SlotPos::Chain(id);
                },
            }
        }
    }

    fn target<T: KeyedNode>(&self, slab: &EntrySlab<T>, pos: SlotPos) -> Option<SlotId> {
        match pos {
            SlotPos::Bucket(idx) => self.buckets[idx],
            SlotPos::Chain(id) => chained(slab, id).next_hash(),
        }
    }

    fn set_target<T: KeyedNode>(
        &mut self,
        slab: &mut EntrySlab<T>,
        pos: SlotPos,
        to: Option<SlotId>,
    ) {
        match pos {
            SlotPos::Bucket(idx) => self.buckets[idx] = to,
            SlotPos::Chain(id) => chained_mut(slab, id).set_next_hash(to),
        }
    }

    fn unlink_at<T: KeyedNode>(&mut self, slab: &mut EntrySlab<T>, pos: SlotPos, found: SlotId) {
        let next = chained(slab, found).next_hash();
        self.set_target(slab, pos, next);
        chained_mut(slab, found).set_next_hash(None);
        self.elems -= 1;
    }

    /// Rebuilds the bucket array at the smallest power of two that holds
    /// `elems` at load factor <= 1 (minimum 4) and rehashes every chain.
    fn grow<T: KeyedNode>(&mut self, slab: &mut EntrySlab<T>) {
        let mut new_len = MIN_BUCKETS;
        while new_len < self.elems {
            new_len *= 2;
        }

        let old = std::mem::replace(&mut self.buckets, vec![None; new_len]);
        let mask = new_len - 1;
        let mut count = 0usize;
        for head in old {
            let mut cur = head;
            while let Some(id) = cur {
                let (next, hash) = {
                    let node = chained(slab, id);
                    (node.next_hash(), node.hash())
                };
                let bucket = (hash as usize) & mask;
                let old_head = self.buckets[bucket];
                chained_mut(slab, id).set_next_hash(old_head);
                self.buckets[bucket] = Some(id);
                cur = next;
                count += 1;
            }
        }
        debug_assert_eq!(count, self.elems);
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate<T: KeyedNode>(&self, slab: &EntrySlab<T>) {
        assert!(self.buckets.len().is_power_of_two());
        assert!(self.buckets.len() >= MIN_BUCKETS);

        let mut seen = std::collections::HashSet::new();
        for (idx, head) in self.buckets.iter().enumerate() {
            let mut cur = *head;
            while let Some(id) = cur {
                assert!(seen.insert(id), "entry installed twice");
                let node = slab.get(id).expect("hash chain references missing slot");
                assert_eq!(self.bucket_of(node.hash()), idx, "entry in wrong bucket");
                cur = node.next_hash();
            }
        }
        assert_eq!(seen.len(), self.elems);
    }
}

impl Default for HashIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Looks up a chained node, asserting the index invariant that installed
/// slots are live.
fn chained<T: KeyedNode>(slab: &EntrySlab<T>, id: SlotId) -> &T {
    slab.get(id).expect("hash chain references missing slot")
}

fn chained_mut<T: KeyedNode>(slab: &mut EntrySlab<T>, id: SlotId) -> &mut T {
    slab.get_mut(id)
        .expect("hash chain references missing slot")
}
