//! Intrusive doubly linked lists over slab-resident nodes.
//!
//! The cache keeps every entry in one `EntrySlab` per shard and threads two
//! independent lists through the entries' own link fields: the recency
//! (eviction-ordered) list and the pinned (in-use) list. Because the links
//! live inside the entries, moving an entry between lists is a relink, never
//! an allocation, and the list itself owns no storage.
//!
//! ```text
//!   slab (EntrySlab<E>)                 EntryList { head, tail, len }
//!   ┌────────┬─────────────────────┐
//!   │ SlotId │ E { prev, next, … } │     head ─► oldest … newest ◄─ tail
//!   └────────┴─────────────────────┘
//! ```
//!
//! `EntryList` operates on any node type implementing [`ListNode`]; the two
//! shard lists share one entry type, so an entry carries exactly one pair of
//! link fields and is a member of at most one list at a time. Callers must
//! only pass `SlotId`s that are members of *this* list (aside from the push
//! operations); the shard's refcount rules guarantee that.
//!
//! All operations are O(1). `debug_validate(slab)` walks the chain in
//! debug/test builds.

use crate::ds::slab::{EntrySlab, SlotId};

/// Node that can be linked into an [`EntryList`] living in an `EntrySlab`.
pub trait ListNode {
    fn prev(&self) -> Option<SlotId>;
    fn next(&self) -> Option<SlotId>;
    fn set_prev(&mut self, prev: Option<SlotId>);
    fn set_next(&mut self, next: Option<SlotId>);
}

#[derive(Debug, Default)]
/// Doubly linked list threaded through slab-resident nodes.
///
/// `head` is the oldest member, `tail` the newest; eviction consumes from
/// the head while `push_back` appends at the tail.
pub struct EntryList {
    head: Option<SlotId>,
    tail: Option<SlotId>,
    len: usize,
}

impl EntryList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of linked nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the list has no members.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the oldest member without unlinking it.
    pub fn front(&self) -> Option<SlotId> {
        self.head
    }

    /// Returns the newest member without unlinking it.
    pub fn back(&self) -> Option<SlotId> {
        self.tail
    }

    /// Appends `id` at the newest end.
    ///
    /// `id` must be a live slab slot that is not currently on any list.
    pub fn push_back<T: ListNode>(&mut self, slab: &mut EntrySlab<T>, id: SlotId) {
        let old_tail = self.tail;
        if let Some(node) = slab.get_mut(id) {
            node.set_prev(old_tail);
            node.set_next(None);
        }
        match old_tail {
            Some(tail) => {
                if let Some(tail_node) = slab.get_mut(tail) {
                    tail_node.set_next(Some(id));
                }
            },
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
    }

    /// Unlinks `id` from the list, leaving its slab slot intact.
    ///
    /// `id` must be a member of this list.
    pub fn unlink<T: ListNode>(&mut self, slab: &mut EntrySlab<T>, id: SlotId) {
        let (prev, next) = match slab.get(id) {
            Some(node) => (node.prev(), node.next()),
            None => return,
        };

        match prev {
            Some(prev_id) => {
                if let Some(prev_node) = slab.get_mut(prev_id) {
                    prev_node.set_next(next);
                }
            },
            None => self.head = next,
        }

        match next {
            Some(next_id) => {
                if let Some(next_node) = slab.get_mut(next_id) {
                    next_node.set_prev(prev);
                }
            },
            None => self.tail = prev,
        }

        if let Some(node) = slab.get_mut(id) {
            node.set_prev(None);
            node.set_next(None);
        }
        self.len -= 1;
    }

    /// Unlinks and returns the oldest member.
    pub fn pop_front<T: ListNode>(&mut self, slab: &mut EntrySlab<T>) -> Option<SlotId> {
        let id = self.head?;
        self.unlink(slab, id);
        Some(id)
    }

    /// Iterates member ids oldest-first.
    pub fn iter<'a, T: ListNode>(&'a self, slab: &'a EntrySlab<T>) -> EntryListIter<'a, T> {
        EntryListIter {
            slab,
            current: self.head,
        }
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate<T: ListNode>(&self, slab: &EntrySlab<T>) {
        if self.head.is_none() || self.tail.is_none() {
            assert!(self.head.is_none());
            assert!(self.tail.is_none());
            assert_eq!(self.len, 0);
            return;
        }

        let mut count = 0usize;
        let mut current = self.head;
        let mut prev = None;

        while let Some(id) = current {
            let node = slab.get(id).expect("list references missing slot");
            assert_eq!(node.prev(), prev);
            prev = Some(id);
            current = node.next();
            count += 1;
            assert!(count <= self.len, "cycle detected in list");
        }

        assert_eq!(prev, self.tail);
        assert_eq!(count, self.len);
    }
}

pub struct EntryListIter<'a, T> {
    slab: &'a EntrySlab<T>,
    current: Option<SlotId>,
}

impl<'a, T: ListNode> Iterator for EntryListIter<'a, T> {
    type Item = SlotId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.slab.get(id).and_then(|node| node.next());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Node {
        label: &'static str,
        prev: Option<SlotId>,
        next: Option<SlotId>,
    }

    impl Node {
        fn new(label: &'static str) -> Self {
            Self {
                label,
                prev: None,
                next: None,
            }
        }
    }

    impl ListNode for Node {
        fn prev(&self) -> Option<SlotId> {
            self.prev
        }
        fn next(&self) -> Option<SlotId> {
            self.next
        }
        fn set_prev(&mut self, prev: Option<SlotId>) {
            self.prev = prev;
        }
        fn set_next(&mut self, next: Option<SlotId>) {
            self.next = next;
        }
    }

    fn labels(list: &EntryList, slab: &EntrySlab<Node>) -> Vec<&'static str> {
        list.iter(slab)
            .map(|id| slab.get(id).unwrap().label)
            .collect()
    }

    #[test]
    fn entry_list_push_and_pop_order() {
        let mut slab = EntrySlab::new();
        let mut list = EntryList::new();

        let a = slab.insert(Node::new("a"));
        let b = slab.insert(Node::new("b"));
        let c = slab.insert(Node::new("c"));
        list.push_back(&mut slab, a);
        list.push_back(&mut slab, b);
        list.push_back(&mut slab, c);

        assert_eq!(list.len(), 3);
        assert_eq!(list.front(), Some(a));
        assert_eq!(list.back(), Some(c));
        assert_eq!(labels(&list, &slab), vec!["a", "b", "c"]);

        assert_eq!(list.pop_front(&mut slab), Some(a));
        assert_eq!(list.pop_front(&mut slab), Some(b));
        assert_eq!(list.pop_front(&mut slab), Some(c));
        assert_eq!(list.pop_front(&mut slab), None);
        assert!(list.is_empty());
    }

    #[test]
    fn entry_list_unlink_middle_and_ends() {
        let mut slab = EntrySlab::new();
        let mut list = EntryList::new();

        let a = slab.insert(Node::new("a"));
        let b = slab.insert(Node::new("b"));
        let c = slab.insert(Node::new("c"));
        list.push_back(&mut slab, a);
        list.push_back(&mut slab, b);
        list.push_back(&mut slab, c);

        list.unlink(&mut slab, b);
        assert_eq!(labels(&list, &slab), vec!["a", "c"]);
        list.debug_validate(&slab);

        list.unlink(&mut slab, a);
        assert_eq!(list.front(), Some(c));
        assert_eq!(list.back(), Some(c));

        list.unlink(&mut slab, c);
        assert!(list.is_empty());
        assert_eq!(list.front(), None);
        assert_eq!(list.back(), None);
        list.debug_validate(&slab);
    }

    #[test]
    fn entry_list_relink_moves_to_newest_end() {
        let mut slab = EntrySlab::new();
        let mut list = EntryList::new();

        let a = slab.insert(Node::new("a"));
        let b = slab.insert(Node::new("b"));
        list.push_back(&mut slab, a);
        list.push_back(&mut slab, b);

        // unlink + push_back is the shard's "touch" sequence
        list.unlink(&mut slab, a);
        list.push_back(&mut slab, a);
        assert_eq!(labels(&list, &slab), vec!["b", "a"]);
        list.debug_validate(&slab);
    }

    #[test]
    fn entry_list_nodes_migrate_between_lists() {
        let mut slab = EntrySlab::new();
        let mut hot = EntryList::new();
        let mut cold = EntryList::new();

        let a = slab.insert(Node::new("a"));
        let b = slab.insert(Node::new("b"));
        cold.push_back(&mut slab, a);
        cold.push_back(&mut slab, b);

        cold.unlink(&mut slab, a);
        hot.push_back(&mut slab, a);

        assert_eq!(labels(&cold, &slab), vec!["b"]);
        assert_eq!(labels(&hot, &slab), vec!["a"]);
        cold.debug_validate(&slab);
        hot.debug_validate(&slab);
    }
}
