//! Pinned GC roots
//!
//! Roots are doubly linked nodes kept in a slab. Handles carry a generation so a handle to a
//! deleted root is rejected instead of aliasing a later registration.

use crate::boxed::heap::Heap;
use crate::require;
use crate::word::Word;

/// Opaque handle to a registered root
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RootHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct RootNode {
    value: Word,
    finalizable: bool,
    prev: Option<u32>,
    next: Option<u32>,
}

#[derive(Debug)]
enum Entry {
    Occupied(RootNode),
    Vacant { next_free: Option<u32> },
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    entry: Entry,
}

/// Registry of GC roots
#[derive(Debug, Default)]
pub struct GcRoots {
    slots: Vec<Slot>,
    head: Option<u32>,
    free: Option<u32>,
    len: usize,
}

impl GcRoots {
    pub fn new() -> GcRoots {
        Self::default()
    }

    /// Returns the number of registered roots
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn node(&self, handle: RootHandle) -> Option<&RootNode> {
        match self.slots.get(handle.index as usize) {
            Some(Slot {
                generation,
                entry: Entry::Occupied(node),
            }) if *generation == handle.generation => Some(node),
            _ => None,
        }
    }

    fn node_mut(&mut self, handle: RootHandle) -> Option<&mut RootNode> {
        match self.slots.get_mut(handle.index as usize) {
            Some(Slot {
                generation,
                entry: Entry::Occupied(node),
            }) if *generation == handle.generation => Some(node),
            _ => None,
        }
    }

    fn node_at_mut(&mut self, index: u32) -> &mut RootNode {
        match &mut self.slots[index as usize].entry {
            Entry::Occupied(node) => node,
            Entry::Vacant { .. } => unreachable!("root list links to a vacant slot"),
        }
    }

    /// Registers a new root holding `value`
    pub fn register(&mut self, value: Word, finalizable: bool) -> RootHandle {
        let node = RootNode {
            value,
            finalizable,
            prev: None,
            next: self.head,
        };

        let index = match self.free {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                self.free = match slot.entry {
                    Entry::Vacant { next_free } => next_free,
                    Entry::Occupied(_) => unreachable!("free list links to an occupied slot"),
                };
                slot.entry = Entry::Occupied(node);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: Entry::Occupied(node),
                });
                (self.slots.len() - 1) as u32
            }
        };

        if let Some(old_head) = self.head {
            self.node_at_mut(old_head).prev = Some(index);
        }
        self.head = Some(index);
        self.len += 1;

        RootHandle {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    /// Removes a root returning its last value
    ///
    /// Deleting a stale handle returns `None` and has no effect.
    pub fn delete(&mut self, handle: RootHandle) -> Option<Word> {
        let (value, prev, next) = {
            let node = self.node(handle)?;
            (node.value, node.prev, node.next)
        };

        match prev {
            Some(prev) => self.node_at_mut(prev).next = next,
            None => self.head = next,
        }
        if let Some(next) = next {
            self.node_at_mut(next).prev = prev;
        }

        let slot = &mut self.slots[handle.index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        slot.entry = Entry::Vacant {
            next_free: self.free,
        };

        self.free = Some(handle.index);
        self.len -= 1;
        Some(value)
    }

    /// Returns the value of a root or `None` for a stale handle
    pub fn get(&self, handle: RootHandle) -> Option<Word> {
        self.node(handle).map(|node| node.value)
    }

    /// Replaces the value of a root returning the previous value
    pub fn set(&mut self, handle: RootHandle, value: Word) -> Option<Word> {
        self.node_mut(handle)
            .map(|node| std::mem::replace(&mut node.value, value))
    }

    /// Returns if the root was registered as finalizable
    pub fn is_finalizable(&self, handle: RootHandle) -> Option<bool> {
        self.node(handle).map(|node| node.finalizable)
    }

    /// Iterates over registered roots from the most recently registered
    pub fn iter(&self) -> impl Iterator<Item = (RootHandle, Word, bool)> + '_ {
        let mut cursor = self.head;

        std::iter::from_fn(move || {
            let index = cursor?;
            let slot = &self.slots[index as usize];

            match &slot.entry {
                Entry::Occupied(node) => {
                    cursor = node.next;
                    Some((
                        RootHandle {
                            index,
                            generation: slot.generation,
                        },
                        node.value,
                        node.finalizable,
                    ))
                }
                Entry::Vacant { .. } => None,
            }
        })
    }

    /// Returns the handles of finalizable roots
    pub fn finalizable(&self) -> Vec<RootHandle> {
        self.iter()
            .filter(|(_, _, finalizable)| *finalizable)
            .map(|(handle, _, _)| handle)
            .collect()
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut Word> {
        self.slots.iter_mut().filter_map(|slot| match &mut slot.entry {
            Entry::Occupied(node) => Some(&mut node.value),
            Entry::Vacant { .. } => None,
        })
    }
}

impl Heap {
    /// Pins `value` across collections
    ///
    /// Roots must not be registered while a collection is in progress.
    pub fn register_root(&mut self, value: Word, finalizable: bool) -> RootHandle {
        require!(!self.is_collecting());

        let handle = self.roots_mut().register(value, finalizable);
        log::debug!("registered root {:?}", handle);
        handle
    }

    /// Unpins a root returning its last value
    pub fn delete_root(&mut self, handle: RootHandle) -> Option<Word> {
        require!(!self.is_collecting());

        let value = self.roots_mut().delete(handle);
        log::debug!("deleted root {:?}", handle);
        value
    }

    /// Returns the value of a root or `None` if it was deleted
    pub fn root_value(&self, handle: RootHandle) -> Option<Word> {
        self.roots().get(handle)
    }

    /// Replaces the value of a root
    ///
    /// Roots are traced on every collection so no write barrier is involved.
    pub fn set_root(&mut self, handle: RootHandle, value: Word) -> Option<Word> {
        self.roots_mut().set(handle, value)
    }
}
