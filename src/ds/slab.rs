//! Entry slab: stable-slot storage for one shard's cache entries.
//!
//! Every entry a shard owns lives in one slot of its `EntrySlab`; the hash
//! chain and both recency lists are threaded through the entries by
//! [`SlotId`] instead of by pointer. A slot keeps its id for as long as its
//! entry is alive, so a `SlotId` held inside a cache handle stays valid
//! until the entry's last reference drops.
//!
//! ## Architecture
//!
//! ```text
//!   slots: Vec<Slot<T>>
//!
//!   index: 0            1                2            3
//!          Occupied(e)  Vacant{next:3}  Occupied(e)  Vacant{next:None}
//!                       ▲
//!                       │
//!               free_head = 1      (vacancies chain through themselves)
//! ```
//!
//! Vacant slots form an intrusive free chain in the same spirit as the
//! entry links: the chain lives inside the storage it describes, so the
//! slab carries no side table and reuses the most recently vacated slot
//! first. Freed ids may therefore be handed out again; a holder of a
//! `SlotId` must own a liveness stake in its entry (the cache refcount
//! plays that role).
//!
//! Slot ids are `NonZeroU32` internally: each cache entry carries three
//! `Option<SlotId>` links (hash chain plus the two list links), and the
//! niche keeps each of them at four bytes. One shard is bounded at
//! `u32::MAX - 1` concurrent entries, far beyond any real capacity budget.
//!
//! `debug_validate_invariants()` is available in debug/test builds.

use std::fmt;
use std::num::NonZeroU32;

/// Identifies a slot in a shard's [`EntrySlab`].
///
/// Valid while the slot's entry is alive; once the entry is removed the id
/// may be reissued for a later insert.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(NonZeroU32);

impl SlotId {
    fn from_index(index: usize) -> Self {
        let raw = u32::try_from(index + 1).expect("shard slab exceeds u32 slots");
        Self(NonZeroU32::new(raw).expect("slot index overflowed"))
    }

    /// Returns the underlying slot index.
    pub fn index(self) -> usize {
        self.0.get() as usize - 1
    }
}

impl fmt::Debug for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SlotId").field(&self.index()).finish()
    }
}

#[derive(Debug)]
enum Slot<T> {
    Occupied(T),
    Vacant { next_free: Option<SlotId> },
}

#[derive(Debug)]
/// Stable-slot entry storage with an intrusive vacancy chain.
pub struct EntrySlab<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<SlotId>,
    len: usize,
}

impl<T> EntrySlab<T> {
    /// Creates an empty slab.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            len: 0,
        }
    }

    /// Stores an entry, reusing the most recently vacated slot if one
    /// exists, and returns its `SlotId`.
    pub fn insert(&mut self, entry: T) -> SlotId {
        let id = match self.free_head {
            Some(id) => {
                let next_free = match self.slots[id.index()] {
                    Slot::Vacant { next_free } => next_free,
                    Slot::Occupied(_) => unreachable!("vacancy chain references a live slot"),
                };
                self.free_head = next_free;
                self.slots[id.index()] = Slot::Occupied(entry);
                id
            },
            None => {
                let id = SlotId::from_index(self.slots.len());
                self.slots.push(Slot::Occupied(entry));
                id
            },
        };
        self.len += 1;
        id
    }

    /// Vacates the slot at `id` and returns its entry, or `None` if the
    /// slot is already vacant or out of range.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        match self.slots.get(id.index()) {
            Some(Slot::Occupied(_)) => {},
            _ => return None,
        }
        let vacant = Slot::Vacant {
            next_free: self.free_head,
        };
        let taken = std::mem::replace(&mut self.slots[id.index()], vacant);
        self.free_head = Some(id);
        self.len -= 1;
        match taken {
            Slot::Occupied(entry) => Some(entry),
            Slot::Vacant { .. } => None,
        }
    }

    /// Returns a shared reference to the entry at `id`, if its slot is live.
    pub fn get(&self, id: SlotId) -> Option<&T> {
        match self.slots.get(id.index()) {
            Some(Slot::Occupied(entry)) => Some(entry),
            _ => None,
        }
    }

    /// Returns a mutable reference to the entry at `id`, if its slot is live.
    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        match self.slots.get_mut(id.index()) {
            Some(Slot::Occupied(entry)) => Some(entry),
            _ => None,
        }
    }

    /// Returns `true` if `id` currently refers to a live slot.
    pub fn contains(&self, id: SlotId) -> bool {
        matches!(self.slots.get(id.index()), Some(Slot::Occupied(_)))
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the slab holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates over live `(SlotId, &T)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Occupied(entry) => Some((SlotId::from_index(index), entry)),
                Slot::Vacant { .. } => None,
            })
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let occupied = self
            .slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Occupied(_)))
            .count();
        assert_eq!(self.len, occupied);

        let mut vacant_seen = std::collections::HashSet::new();
        let mut cursor = self.free_head;
        while let Some(id) = cursor {
            assert!(vacant_seen.insert(id), "vacancy chain revisits a slot");
            cursor = match self.slots[id.index()] {
                Slot::Vacant { next_free } => next_free,
                Slot::Occupied(_) => panic!("vacancy chain references a live slot"),
            };
        }
        assert_eq!(vacant_seen.len() + self.len, self.slots.len());
    }
}

impl<T> Default for EntrySlab<T> {
    fn default() -> Self {
        Self::new()
    }
}
