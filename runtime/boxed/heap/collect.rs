//! Cooperation with an external moving collector
//!
//! The runtime never decides when or how to collect. A [`Collector`] is handed the heap between
//! mutator steps and drives a collection with the primitives here:
//!
//! 1. [`Heap::begin_collection`] opens an empty reserve space.
//! 2. [`Heap::evacuate`] copies a block in to the reserve and leaves a forwarding address behind.
//!    [`Heap::evacuate_roots`] does this for every GC root and interned symbol.
//! 3. The collector walks the copied blocks with [`Heap::next_copied_block`], evacuating every
//!    slot in [`Heap::scannable_slots`].
//! 4. [`Heap::settle_weak_references`] breaks weak pairs and weak locatives whose targets were not
//!    copied.
//! 5. [`Heap::end_collection`] makes the reserve the new allocation space.

use std::cell::RefCell;
use std::mem;
use std::ops::Range;
use std::rc::Rc;

use crate::boxed::heap::{invalid_block, Heap, SpaceId};
use crate::boxed::{BlockKind, Header};
use crate::fault::Result;
use crate::intern::SymbolTables;
use crate::word::{Word, WORD_BYTES};
use crate::{checked, require};

/// Hook invoked before a pointer is stored in to an existing block
pub trait WriteBarrier {
    /// Records that `value` is about to be stored in slot `index` of `block`
    fn record(&mut self, block: Word, index: usize, value: Word);
}

/// Write barrier remembering every mutated slot
///
/// Clones share the same set so a collector can keep a clone while the heap owns another.
#[derive(Clone, Default, Debug)]
pub struct RememberedSet {
    slots: Rc<RefCell<Vec<(Word, usize)>>>,
}

impl RememberedSet {
    pub fn new() -> RememberedSet {
        Self::default()
    }

    /// Returns the number of remembered slots
    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }

    /// Removes and returns every remembered slot
    pub fn drain(&self) -> Vec<(Word, usize)> {
        std::mem::take(&mut *self.slots.borrow_mut())
    }
}

impl WriteBarrier for RememberedSet {
    fn record(&mut self, block: Word, index: usize, _value: Word) {
        self.slots.borrow_mut().push((block, index));
    }
}

/// External collector invoked when the allocation space runs low
pub trait Collector {
    /// Makes at least `words` words available in the current space if possible
    ///
    /// Only GC roots and interned symbols survive; any other block pointers held by the mutator
    /// are invalidated.
    fn reclaim(&mut self, heap: &mut Heap, words: usize) -> Result<()>;
}

impl Heap {
    /// Starts a collection with a reserve space of `reserve_words`
    ///
    /// If no size is given the reserve matches the current space.
    pub fn begin_collection(&mut self, reserve_words: Option<usize>) {
        require!(!self.is_collecting());

        let capacity = reserve_words.unwrap_or_else(|| self.current_space().capacity());
        log::debug!(
            "beginning collection {} with {} reserve words",
            self.collections() + 1,
            capacity
        );

        self.begin_reserve(capacity);
    }

    /// Finishes a collection and makes the reserve the allocation space
    ///
    /// Every block left in the previous allocation space is released.
    pub fn end_collection(&mut self) {
        require!(self.is_collecting());

        if let Some(released) = self.flip_reserve() {
            log::debug!(
                "collection {} finished: {} words live, {} words released",
                self.collections(),
                self.current_space().used_words(),
                released.used_words()
            );
        }
    }

    /// Returns the new address of a forwarded block
    pub fn forwarding_address(&self, block: Word) -> Option<Word> {
        let (id, index) = self.header_index(block);
        let space = self.space(id);

        if Header::from_raw(space.words[index]).is_forwarded() {
            Some(Word::from_raw(space.words[index + 1]))
        } else {
            None
        }
    }

    /// Marks a block as relocated to `to`
    ///
    /// The first data word of the block is overwritten with the new address.
    pub fn forward(&mut self, block: Word, to: Word) {
        let (id, index) = self.header_index(block);
        let space = self.space_mut(id);

        space.words[index] = Header::from_raw(space.words[index]).forwarded().to_raw();
        space.words[index + 1] = to.to_raw();
    }

    /// Follows a forwarding address if the word points to a forwarded block
    pub fn resolve(&self, word: Word) -> Word {
        if word.is_pointer() {
            if let Some(to) = self.forwarding_address(word) {
                return to;
            }
        }

        word
    }

    /// Copies a block from the allocation space in to the reserve
    ///
    /// Immediates, permanent blocks and blocks already in the reserve are returned unchanged. A
    /// block that was already copied returns its forwarding address.
    pub fn evacuate(&mut self, word: Word) -> Result<Word> {
        require!(self.is_collecting());

        if word.is_immediate() {
            return Ok(word);
        }

        let (id, index) = self.header_index(word);
        if id != SpaceId::Current {
            return Ok(word);
        }

        if let Some(to) = self.forwarding_address(word) {
            return Ok(to);
        }

        let header = Header::from_raw(self.current.words[index]);
        let kind = match header.kind() {
            Some(kind) => kind,
            None => invalid_block(word),
        };

        let to = self.alloc_in(SpaceId::Reserve, kind, header.size())?;
        let (_, to_index) = self.header_index(to);

        let data_words = header.total_words() - 1;
        if let Some(reserve) = self.reserve.as_mut() {
            reserve.words[to_index + 1..to_index + 1 + data_words]
                .copy_from_slice(&self.current.words[index + 1..index + 1 + data_words]);
        }

        self.forward(word, to);
        Ok(to)
    }

    /// Returns the indices of the slots a collector must trace
    ///
    /// Byte blocks have no traced slots and the first slot of a special block is opaque.
    pub fn scannable_slots(&self, block: Word) -> Range<usize> {
        let header = self.header(block);

        if header.is_byteblock() {
            0..0
        } else if header.is_special() {
            std::cmp::min(1, header.size())..header.size()
        } else {
            0..header.size()
        }
    }

    /// Returns the copied block at `cursor` in the reserve and the cursor of the next one
    ///
    /// Cursors start at zero. Blocks copied while walking are visited before the walk ends.
    pub fn next_copied_block(&self, cursor: usize) -> Option<(Word, usize)> {
        self.next_block(SpaceId::Reserve, cursor)
    }

    /// Evacuates the values of every GC root and symbol table entry
    pub fn evacuate_roots(&mut self) -> Result<()> {
        let mut roots = mem::take(&mut self.roots);
        let mut symbol_tables = mem::replace(&mut self.symbol_tables, SymbolTables::detached());

        let result = roots
            .values_mut()
            .chain(symbol_tables.values_mut())
            .try_for_each(|value| {
                *value = self.evacuate(*value)?;
                Ok(())
            });

        self.roots = roots;
        self.symbol_tables = symbol_tables;
        result
    }

    /// Updates the car of a copied weak pair
    ///
    /// A car pointing to a block that was not copied is replaced with the broken weak pointer.
    pub fn break_weak_pair(&mut self, pair: Word) {
        let pair = checked!(pair, |p| self.has_kind(*p, BlockKind::WeakPair));
        let car = self.slot(pair, 0);

        if car.is_pointer() && self.in_current_space(car) {
            let settled = self.forwarding_address(car).unwrap_or(Word::BROKEN_WEAK_POINTER);
            self.set_slot(pair, 0, settled);
        }
    }

    /// Updates the address of a copied locative
    ///
    /// A locative whose target was not copied becomes lost.
    pub fn settle_locative(&mut self, locative: Word) {
        let locative = checked!(locative, |l| self.has_kind(*l, BlockKind::Locative));

        let address = self.raw_slot(locative, 0);
        if address == 0 {
            return;
        }

        let offset = self.slot(locative, 1).unfix() as usize;
        let target = Word::from_raw(address - offset - WORD_BYTES);

        if self.in_current_space(target) {
            let settled = match self.forwarding_address(target) {
                Some(to) => to.to_raw() + WORD_BYTES + offset,
                None => 0,
            };
            self.set_raw_slot(locative, 0, settled);
        }
    }

    /// Settles every weak pair and locative copied in to the reserve
    pub fn settle_weak_references(&mut self) {
        let mut cursor = 0;
        while let Some((block, next)) = self.next_copied_block(cursor) {
            match self.kind(block) {
                Some(BlockKind::WeakPair) => self.break_weak_pair(block),
                Some(BlockKind::Locative) => self.settle_locative(block),
                _ => {}
            }
            cursor = next;
        }
    }
}
