//! Heap blocks
//!
//! A block is a header word followed by its data. The header packs the block's kind, its flags and
//! the size of its data, which counts bytes for byte blocks and words otherwise.

pub mod heap;
pub mod types;

use std::fmt;

use crate::layout::{ALIGN8_FLAG, BYTEBLOCK_FLAG, FORWARDING_FLAG, NATIVE, SPECIALBLOCK_FLAG};
use crate::word::WORD_BYTES;

pub use crate::boxed::heap::{AsHeap, Heap};

macro_rules! define_block_kinds {
    ($($name:ident = $type_byte:expr, $fixed_size:expr);* $(;)?) => {
        /// Kind of a block as encoded in its header
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        pub enum BlockKind {
            $( $name ),*
        }

        impl BlockKind {
            /// Every block kind
            pub const ALL: &'static [BlockKind] = &[ $( BlockKind::$name ),* ];

            /// Returns the header flags and type nibble of this kind
            pub const fn type_byte(self) -> u8 {
                match self {
                    $( BlockKind::$name => $type_byte ),*
                }
            }

            /// Returns the header size of fixed size kinds
            pub const fn fixed_size(self) -> Option<usize> {
                match self {
                    $( BlockKind::$name => $fixed_size ),*
                }
            }

            pub fn to_str(self) -> &'static str {
                match self {
                    $( BlockKind::$name => stringify!($name) ),*
                }
            }
        }
    }
}

define_block_kinds! {
    Vector = 0x00, None;
    Symbol = 0x01, Some(3);
    String = BYTEBLOCK_FLAG | 0x02, None;
    Pair = 0x03, Some(2);
    WeakPair = SPECIALBLOCK_FLAG | 0x03, Some(2);
    Closure = SPECIALBLOCK_FLAG | 0x04, None;
    Flonum = BYTEBLOCK_FLAG | ALIGN8_FLAG | 0x05, Some(8);
    Bignum = 0x06, Some(1);
    Port = SPECIALBLOCK_FLAG | 0x07, Some(15);
    Structure = 0x08, None;
    Pointer = SPECIALBLOCK_FLAG | 0x09, Some(1);
    Locative = SPECIALBLOCK_FLAG | 0x0a, Some(4);
    TaggedPointer = SPECIALBLOCK_FLAG | 0x0b, Some(2);
    Ratnum = 0x0c, Some(2);
    LambdaInfo = BYTEBLOCK_FLAG | 0x0d, None;
    Cplxnum = 0x0e, Some(2);
    Bytevector = BYTEBLOCK_FLAG | ALIGN8_FLAG | 0x00, None;
}

impl BlockKind {
    /// Decodes a header type byte with the forwarding flag cleared
    pub fn from_type_byte(type_byte: u8) -> Option<BlockKind> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.type_byte() == type_byte)
    }

    pub const fn is_byteblock(self) -> bool {
        self.type_byte() & BYTEBLOCK_FLAG != 0
    }

    pub const fn is_special(self) -> bool {
        self.type_byte() & SPECIALBLOCK_FLAG != 0
    }

    pub const fn is_8aligned(self) -> bool {
        self.type_byte() & ALIGN8_FLAG != 0
    }

    /// Returns if a block may be reclassified in place from `self` to `to`
    ///
    /// Freshly built vectors can become closures or structures and strings can become bytevectors
    /// or lambda info. The data layout is unchanged in each case.
    pub fn can_reclassify_as(self, to: BlockKind) -> bool {
        matches!(
            (self, to),
            (BlockKind::Vector, BlockKind::Closure)
                | (BlockKind::Vector, BlockKind::Structure)
                | (BlockKind::String, BlockKind::Bytevector)
                | (BlockKind::String, BlockKind::LambdaInfo)
        )
    }
}

/// Native block header word
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Header(usize);

impl Header {
    /// Builds a header for a block of the given kind and size
    pub fn new(kind: BlockKind, size: usize) -> Header {
        Header(NATIVE.make_header(kind, size as u64) as usize)
    }

    /// Header of a single unused word
    ///
    /// Real blocks are never forwarded in the space being walked so the forwarding flag
    /// distinguishes this from an empty string.
    pub const HOLE: Header = Header(
        (NATIVE.flag(FORWARDING_FLAG) | NATIVE.kind_bits(BlockKind::String)) as usize,
    );

    /// Builds a header covering `words` words of dead space
    ///
    /// The filler is an unscanned byte block so linear walks of a space skip it.
    pub fn filler(words: usize) -> Header {
        if words == 1 {
            Header::HOLE
        } else {
            Header::new(BlockKind::String, words.saturating_sub(1) * WORD_BYTES)
        }
    }

    pub const fn from_raw(raw: usize) -> Header {
        Header(raw)
    }

    pub const fn to_raw(self) -> usize {
        self.0
    }

    /// Returns the kind of this header or `None` for an invalid flag combination
    pub fn kind(self) -> Option<BlockKind> {
        NATIVE.header_kind(self.0 as u64)
    }

    /// Returns the size of the block's data in bytes or words
    pub fn size(self) -> usize {
        NATIVE.header_size(self.0 as u64) as usize
    }

    /// Returns the flags and type nibble without the size
    pub fn bits(self) -> usize {
        NATIVE.header_bits(self.0 as u64) as usize
    }

    /// Returns the four bit type nibble
    pub fn type_nibble(self) -> u8 {
        NATIVE.header_type(self.0 as u64)
    }

    pub fn is_byteblock(self) -> bool {
        NATIVE.has_flag(self.0 as u64, BYTEBLOCK_FLAG)
    }

    pub fn is_special(self) -> bool {
        NATIVE.has_flag(self.0 as u64, SPECIALBLOCK_FLAG)
    }

    pub fn is_forwarded(self) -> bool {
        NATIVE.has_flag(self.0 as u64, FORWARDING_FLAG)
    }

    pub fn is_8aligned(self) -> bool {
        NATIVE.has_flag(self.0 as u64, ALIGN8_FLAG)
    }

    /// Returns this header with the forwarding flag set
    pub fn forwarded(self) -> Header {
        Header(self.0 | NATIVE.flag(FORWARDING_FLAG) as usize)
    }

    /// Returns if both headers have the same kind and flags
    pub fn same_type(self, other: Header) -> bool {
        self.bits() == other.bits()
    }

    /// Returns the number of words occupied by the block's data
    pub fn data_words(self) -> usize {
        if self.is_byteblock() {
            (self.size() + WORD_BYTES - 1) / WORD_BYTES
        } else {
            self.size()
        }
    }

    /// Returns the words a block with this header occupies including the header
    ///
    /// Every block reserves at least one data word to hold a forwarding address.
    pub fn total_words(self) -> usize {
        if self == Header::HOLE {
            return 1;
        }

        1 + std::cmp::max(1, self.data_words())
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => write!(
                formatter,
                "Header({}{}, {})",
                kind.to_str(),
                if self.is_forwarded() { ", forwarded" } else { "" },
                self.size()
            ),
            None => write!(formatter, "Header({:#x})", self.0),
        }
    }
}
