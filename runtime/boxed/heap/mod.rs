//! Managed and permanent spaces
//!
//! Blocks live in word arenas. Each space is assigned a disjoint range of word aligned addresses
//! and a block pointer is the address of its header word. This keeps pointers as plain tagged words
//! while every access is resolved and bounds checked against the owning arena.
//!
//! Two managed spaces alternate as the allocation space and the copy target of a collection. The
//! permanent space holds literals that are never relocated or freed.

pub mod collect;
pub mod root;

use std::{fmt, slice};

use crate::boxed::{BlockKind, Header};
use crate::config::{Growth, RuntimeConfig, Thresholds};
use crate::fault::{Fault, FaultCode, Result};
use crate::intern::SymbolTables;
use crate::word::{Word, WORD_BYTES};
use crate::{checked, require};

use self::collect::WriteBarrier;
use self::root::GcRoots;

/// Contiguous arena of words with a bump allocated free region
pub struct Space {
    base: usize,
    words: Vec<usize>,
    low: usize,
    high: usize,
    growth: Growth,
}

impl Space {
    fn new(base: usize, capacity: usize, growth: Growth) -> Space {
        Space {
            base,
            words: vec![0; capacity],
            low: 0,
            high: capacity,
            growth,
        }
    }

    /// Returns the number of words in this space
    pub fn capacity(&self) -> usize {
        self.words.len()
    }

    /// Returns the number of words still available for allocation
    pub fn free_words(&self) -> usize {
        self.high - self.low
    }

    /// Returns the number of allocated words
    pub fn used_words(&self) -> usize {
        self.capacity() - self.free_words()
    }

    fn contains(&self, address: usize) -> bool {
        address >= self.base && (address - self.base) / WORD_BYTES < self.words.len()
    }

    fn address_of(&self, index: usize) -> usize {
        self.base + index * WORD_BYTES
    }

    fn index_of(&self, address: usize) -> usize {
        (address - self.base) / WORD_BYTES
    }

    /// Reserves `count` words in the growth direction returning the index of the first
    fn bump(&mut self, count: usize) -> Option<usize> {
        if count > self.free_words() {
            return None;
        }

        match self.growth {
            Growth::Upward => {
                let start = self.low;
                self.low += count;
                Some(start)
            }
            Growth::Downward => {
                self.high -= count;
                Some(self.high)
            }
        }
    }
}

impl fmt::Debug for Space {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Space")
            .field("base", &format_args!("{:#x}", self.base))
            .field("capacity", &self.capacity())
            .field("free", &self.free_words())
            .field("growth", &self.growth)
            .finish()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum SpaceId {
    Permanent,
    Current,
    Reserve,
}

/// Heap of blocks
pub struct Heap {
    permanent: Space,
    current: Space,
    reserve: Option<Space>,
    next_base: usize,
    growth: Growth,
    thresholds: Thresholds,
    roots: GcRoots,
    symbol_tables: SymbolTables,
    write_barrier: Option<Box<dyn WriteBarrier>>,
    collecting: bool,
    collections: usize,
}

fn words_as_bytes(words: &[usize]) -> &[u8] {
    // Any initialised word is a valid sequence of bytes
    unsafe { slice::from_raw_parts(words.as_ptr() as *const u8, words.len() * WORD_BYTES) }
}

fn words_as_bytes_mut(words: &mut [usize]) -> &mut [u8] {
    unsafe { slice::from_raw_parts_mut(words.as_mut_ptr() as *mut u8, words.len() * WORD_BYTES) }
}

#[cold]
#[inline(never)]
pub(crate) fn invalid_block(block: Word) -> ! {
    panic!("{:?} does not point in to the heap", block)
}

impl Heap {
    /// Address of the first space
    ///
    /// Address 0 never refers to a block.
    const FIRST_BASE: usize = 0x1_0000;

    /// Alignment between the address ranges of spaces
    const SPACE_ALIGN: usize = 0x1000;

    /// Returns a heap using the given configuration
    pub fn new(config: &RuntimeConfig) -> Heap {
        let mut next_base = Self::FIRST_BASE;

        let permanent = Self::assign_space(&mut next_base, config.permanent_words, Growth::Upward);
        let current = Self::assign_space(&mut next_base, config.heap_words, config.growth);

        log::debug!(
            "created heap with {} managed words and {} permanent words",
            config.heap_words,
            config.permanent_words
        );

        Heap {
            permanent,
            current,
            reserve: None,
            next_base,
            growth: config.growth,
            thresholds: config.thresholds,
            roots: GcRoots::new(),
            symbol_tables: SymbolTables::new(),
            write_barrier: None,
            collecting: false,
            collections: 0,
        }
    }

    /// Returns a heap with a managed space of `heap_words` and default settings otherwise
    pub fn with_capacity(heap_words: usize) -> Heap {
        Self::new(&RuntimeConfig {
            heap_words,
            ..RuntimeConfig::default()
        })
    }

    fn assign_space(next_base: &mut usize, capacity: usize, growth: Growth) -> Space {
        let base = *next_base;
        let span = (capacity + 1) * WORD_BYTES;

        // Address ranges are never reused while a heap exists
        *next_base = (base + span + Self::SPACE_ALIGN) & !(Self::SPACE_ALIGN - 1);
        Space::new(base, capacity, growth)
    }

    /// Returns the thresholds used by bignum algorithms on this heap
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn set_thresholds(&mut self, thresholds: Thresholds) {
        self.thresholds = thresholds;
    }

    /// Returns the current allocation space
    pub fn current_space(&self) -> &Space {
        &self.current
    }

    /// Returns the permanent space
    pub fn permanent_space(&self) -> &Space {
        &self.permanent
    }

    /// Returns the number of completed collections
    pub fn collections(&self) -> usize {
        self.collections
    }

    /// Returns if a collection is in progress
    pub fn is_collecting(&self) -> bool {
        self.collecting
    }

    /// Returns if at least `words` more words can be allocated in the current space
    pub fn demand(&self, words: usize) -> bool {
        self.current.free_words() >= words
    }

    /// Returns the number of words that can still be allocated in the current space
    pub fn free_words(&self) -> usize {
        self.current.free_words()
    }

    /// Returns the GC root registry
    pub fn roots(&self) -> &GcRoots {
        &self.roots
    }

    pub(crate) fn roots_mut(&mut self) -> &mut GcRoots {
        &mut self.roots
    }

    /// Returns the symbol tables of this heap
    pub fn symbol_tables(&self) -> &SymbolTables {
        &self.symbol_tables
    }

    pub fn symbol_tables_mut(&mut self) -> &mut SymbolTables {
        &mut self.symbol_tables
    }

    /// Installs the write barrier invoked when a pointer is stored in to an existing block
    pub fn set_write_barrier(&mut self, barrier: Box<dyn WriteBarrier>) {
        self.write_barrier = Some(barrier);
    }

    /// Removes and returns the installed write barrier
    pub fn take_write_barrier(&mut self) -> Option<Box<dyn WriteBarrier>> {
        self.write_barrier.take()
    }

    pub(crate) fn space(&self, id: SpaceId) -> &Space {
        match id {
            SpaceId::Permanent => &self.permanent,
            SpaceId::Current => &self.current,
            SpaceId::Reserve => match &self.reserve {
                Some(reserve) => reserve,
                None => panic!("no reserve space outside of a collection"),
            },
        }
    }

    pub(crate) fn space_mut(&mut self, id: SpaceId) -> &mut Space {
        match id {
            SpaceId::Permanent => &mut self.permanent,
            SpaceId::Current => &mut self.current,
            SpaceId::Reserve => match &mut self.reserve {
                Some(reserve) => reserve,
                None => panic!("no reserve space outside of a collection"),
            },
        }
    }

    pub(crate) fn locate(&self, address: usize) -> Option<(SpaceId, usize)> {
        if self.current.contains(address) {
            Some((SpaceId::Current, self.current.index_of(address)))
        } else if self.permanent.contains(address) {
            Some((SpaceId::Permanent, self.permanent.index_of(address)))
        } else {
            match &self.reserve {
                Some(reserve) if reserve.contains(address) => {
                    Some((SpaceId::Reserve, reserve.index_of(address)))
                }
                _ => None,
            }
        }
    }

    /// Returns if the word points to a block on this heap
    pub fn is_block(&self, word: Word) -> bool {
        word.is_pointer() && word.to_raw() % WORD_BYTES == 0 && self.locate(word.to_raw()).is_some()
    }

    /// Returns if the word points in to the permanent space
    pub fn permanentp(&self, word: Word) -> bool {
        word.is_pointer() && self.permanent.contains(word.to_raw())
    }

    /// Returns if the word points in to the current allocation space
    pub fn in_current_space(&self, word: Word) -> bool {
        word.is_pointer() && self.current.contains(word.to_raw())
    }

    #[track_caller]
    pub(crate) fn header_index(&self, block: Word) -> (SpaceId, usize) {
        let block = checked!(block, |b| self.is_block(*b));

        match self.locate(block.to_raw()) {
            Some(found) => found,
            None => invalid_block(block),
        }
    }

    /// Returns the header of a block
    #[track_caller]
    pub fn header(&self, block: Word) -> Header {
        let (id, index) = self.header_index(block);
        Header::from_raw(self.space(id).words[index])
    }

    #[track_caller]
    pub(crate) fn set_header(&mut self, block: Word, header: Header) {
        let (id, index) = self.header_index(block);
        self.space_mut(id).words[index] = header.to_raw();
    }

    /// Returns the kind of a block or `None` for immediates
    pub fn kind(&self, word: Word) -> Option<BlockKind> {
        if word.is_immediate() {
            None
        } else {
            self.header(word).kind()
        }
    }

    /// Returns if the word is a block of the given kind
    pub fn has_kind(&self, word: Word, kind: BlockKind) -> bool {
        self.kind(word) == Some(kind)
    }

    /// Returns the header size of a block
    #[track_caller]
    pub fn block_size(&self, block: Word) -> usize {
        self.header(block).size()
    }

    /// Returns `#t` for a block with no data
    #[track_caller]
    pub fn vemptyp(&self, block: Word) -> Word {
        Word::make_bool(self.block_size(block) == 0)
    }

    /// Returns `#t` if both words are blocks with the same kind and flags
    pub fn sametypep(&self, x: Word, y: Word) -> Word {
        Word::make_bool(
            self.is_block(x) && self.is_block(y) && self.header(x).same_type(self.header(y)),
        )
    }

    #[track_caller]
    fn slot_index(&self, block: Word, index: usize) -> (SpaceId, usize) {
        let header = self.header(block);
        let index = checked!(index, |i| !header.is_byteblock() && *i < header.size());

        let (id, header_index) = self.header_index(block);
        (id, header_index + 1 + index)
    }

    /// Returns a data slot of a word block
    #[track_caller]
    pub fn slot(&self, block: Word, index: usize) -> Word {
        let (id, index) = self.slot_index(block, index);
        Word::from_raw(self.space(id).words[index])
    }

    /// Initialises a data slot of a word block without invoking the write barrier
    ///
    /// This is only valid on blocks that are still being constructed or during a collection.
    /// Stores in to live blocks must go through [`Heap::mutate`].
    #[track_caller]
    pub fn set_slot(&mut self, block: Word, index: usize, value: Word) {
        let (id, index) = self.slot_index(block, index);
        self.space_mut(id).words[index] = value.to_raw();
    }

    /// Returns the raw contents of a slot
    ///
    /// This is used for the opaque first slot of special blocks.
    #[track_caller]
    pub fn raw_slot(&self, block: Word, index: usize) -> usize {
        let (id, index) = self.slot_index(block, index);
        self.space(id).words[index]
    }

    #[track_caller]
    pub fn set_raw_slot(&mut self, block: Word, index: usize, raw: usize) {
        let (id, index) = self.slot_index(block, index);
        self.space_mut(id).words[index] = raw;
    }

    /// Stores a value in to a slot of an existing block
    ///
    /// Storing a pointer invokes the write barrier before the store. Immediates are stored
    /// directly. The stored value is returned.
    #[track_caller]
    pub fn mutate(&mut self, block: Word, index: usize, value: Word) -> Word {
        let (id, slot_index) = self.slot_index(block, index);

        if value.is_pointer() {
            if let Some(barrier) = self.write_barrier.as_mut() {
                log::trace!("write barrier for slot {} of {:?}", index, block);
                barrier.record(block, index, value);
            }
        }

        self.space_mut(id).words[slot_index] = value.to_raw();
        value
    }

    #[track_caller]
    fn data_range(&self, block: Word) -> (SpaceId, std::ops::Range<usize>) {
        let header = self.header(block);
        let (id, index) = self.header_index(block);
        (id, index + 1..index + 1 + header.data_words())
    }

    /// Returns the bytes of a byte block
    #[track_caller]
    pub fn bytes(&self, block: Word) -> &[u8] {
        let header = checked!(self.header(block), |h| h.is_byteblock());
        let (id, range) = self.data_range(block);

        &words_as_bytes(&self.space(id).words[range])[..header.size()]
    }

    #[track_caller]
    pub fn bytes_mut(&mut self, block: Word) -> &mut [u8] {
        let header = checked!(self.header(block), |h| h.is_byteblock());
        let (id, range) = self.data_range(block);

        &mut words_as_bytes_mut(&mut self.space_mut(id).words[range])[..header.size()]
    }

    /// Returns the data of a byte block as whole words
    #[track_caller]
    pub fn data_words(&self, block: Word) -> &[usize] {
        checked!(self.header(block), |h| h.is_byteblock());
        let (id, range) = self.data_range(block);

        &self.space(id).words[range]
    }

    #[track_caller]
    pub fn data_words_mut(&mut self, block: Word) -> &mut [usize] {
        checked!(self.header(block), |h| h.is_byteblock());
        let (id, range) = self.data_range(block);

        &mut self.space_mut(id).words[range]
    }

    /// Allocates a block in the current space
    ///
    /// `size` counts bytes for byte blocks and words otherwise. Word slots start out undefined and
    /// bytes start out zeroed.
    pub fn alloc(&mut self, kind: BlockKind, size: usize) -> Result<Word> {
        require!(!self.collecting);
        self.alloc_in(SpaceId::Current, kind, size)
    }

    /// Allocates a block in the permanent space
    pub fn alloc_permanent(&mut self, kind: BlockKind, size: usize) -> Result<Word> {
        self.alloc_in(SpaceId::Permanent, kind, size)
    }

    pub(crate) fn alloc_in(&mut self, id: SpaceId, kind: BlockKind, size: usize) -> Result<Word> {
        if size as u64 > crate::layout::NATIVE.max_block_size() {
            return Err(Fault::at(FaultCode::OutOfRange, "alloc"));
        }

        let header = Header::new(kind, size);
        let total = header.total_words();

        // Narrow words need a hole in front of doubles that would otherwise be misaligned
        let pad = kind.is_8aligned() && WORD_BYTES < 8;

        let space = self.space_mut(id);
        let start = match space.bump(total + pad as usize) {
            Some(start) => start,
            None => {
                log::debug!(
                    "{:?} space exhausted allocating {} words for {}",
                    id,
                    total,
                    kind.to_str()
                );
                return Err(Fault::at(FaultCode::OutOfMemory, "alloc"));
            }
        };

        let header_index = if pad {
            let data_aligned = space.address_of(start + 1) % 8 == 0;
            let (block_index, hole_index) = if data_aligned {
                (start, start + total)
            } else {
                (start + 1, start)
            };

            space.words[hole_index] = Header::filler(1).to_raw();
            block_index
        } else {
            start
        };

        let fill = if kind.is_byteblock() {
            0
        } else {
            Word::UNDEFINED.to_raw()
        };

        space.words[header_index] = header.to_raw();
        for word in &mut space.words[header_index + 1..header_index + total] {
            *word = fill;
        }

        Ok(Word::from_raw(space.address_of(header_index)))
    }

    /// Changes the kind of a freshly built block without copying it
    #[track_caller]
    pub fn reclassify(&mut self, block: Word, kind: BlockKind) {
        let header = self.header(block);
        checked!(header.kind(), |from| from.map_or(false, |from| from.can_reclassify_as(kind)));

        self.set_header(block, Header::new(kind, header.size()));
    }

    /// Reduces the size of a block in place
    ///
    /// Any words no longer covered by the block are turned in to filler.
    #[track_caller]
    pub fn shrink(&mut self, block: Word, new_size: usize) {
        let header = self.header(block);
        let new_size = checked!(new_size, |s| *s <= header.size());
        let kind = match header.kind() {
            Some(kind) => kind,
            None => invalid_block(block),
        };

        let new_header = Header::new(kind, new_size);
        let freed = header.total_words() - new_header.total_words();

        let (id, index) = self.header_index(block);
        let space = self.space_mut(id);

        space.words[index] = new_header.to_raw();
        if freed > 0 {
            space.words[index + new_header.total_words()] = Header::filler(freed).to_raw();
        }
    }

    /// Returns the block whose header is at `index` and the index of the block following it
    ///
    /// Only blocks below the free region of an upward growing space are visited.
    pub(crate) fn next_block(&self, id: SpaceId, index: usize) -> Option<(Word, usize)> {
        let space = self.space(id);
        if index >= space.low {
            return None;
        }

        let header = Header::from_raw(space.words[index]);
        Some((
            Word::from_raw(space.address_of(index)),
            index + header.total_words(),
        ))
    }

    pub(crate) fn begin_reserve(&mut self, capacity: usize) {
        let reserve = Self::assign_space(&mut self.next_base, capacity, Growth::Upward);
        self.reserve = Some(reserve);
        self.collecting = true;
    }

    pub(crate) fn flip_reserve(&mut self) -> Option<Space> {
        let mut reserve = self.reserve.take()?;
        reserve.growth = self.growth;

        self.collecting = false;
        self.collections += 1;
        Some(std::mem::replace(&mut self.current, reserve))
    }
}

impl Default for Heap {
    fn default() -> Heap {
        Heap::new(&RuntimeConfig::default())
    }
}

impl fmt::Debug for Heap {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Heap")
            .field("current", &self.current)
            .field("permanent", &self.permanent)
            .field("collecting", &self.collecting)
            .field("collections", &self.collections)
            .finish()
    }
}

/// Object that can be used as a heap
pub trait AsHeap {
    /// Returns this object as a heap
    fn as_heap(&self) -> &Heap;

    /// Returns this object as a mutable heap
    fn as_heap_mut(&mut self) -> &mut Heap;
}

impl AsHeap for Heap {
    fn as_heap(&self) -> &Heap {
        self
    }

    fn as_heap_mut(&mut self) -> &mut Heap {
        self
    }
}
