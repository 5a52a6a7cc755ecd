pub mod entry_list;
pub mod hash_index;
pub mod shard;
pub mod slab;

pub use entry_list::{EntryList, ListNode};
pub use hash_index::{HashIndex, KeyedNode};
pub use shard::{bytes_hash, shard_index};
pub use slab::{EntrySlab, SlotId};
