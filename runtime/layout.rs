//! Word-size parameterised bit layout
//!
//! Headers and fixnums have the same shape on 32-bit and 64-bit words; only the bit widths differ.
//! The top byte of every header holds four flag bits and the four bit type nibble while the
//! remaining low bits hold the block size. All masks are computed as `u64` so both layouts can be
//! described (and tested) from a single host.

use crate::boxed::BlockKind;

/// Bit layout of headers and fixnums for a machine word width
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WordLayout {
    word_bits: u32,
}

/// Layout used by 32-bit builds
pub const LAYOUT_32: WordLayout = WordLayout { word_bits: 32 };

/// Layout used by 64-bit builds
pub const LAYOUT_64: WordLayout = WordLayout { word_bits: 64 };

/// Layout of the host this crate was compiled for
pub const NATIVE: WordLayout = WordLayout {
    word_bits: usize::BITS,
};

/// Header flag: block has been relocated and slot 0 holds its new address
pub const FORWARDING_FLAG: u8 = 0x80;
/// Header flag: block holds raw bytes and the size field counts bytes
pub const BYTEBLOCK_FLAG: u8 = 0x40;
/// Header flag: slot 0 is opaque and not scanned by the collector
pub const SPECIALBLOCK_FLAG: u8 = 0x20;
/// Header flag: block data must start on an 8 byte boundary
pub const ALIGN8_FLAG: u8 = 0x10;

const TYPE_NIBBLE: u8 = 0x0f;

impl WordLayout {
    /// Returns the word width in bits
    pub const fn word_bits(self) -> u32 {
        self.word_bits
    }

    /// Returns the word width in bytes
    pub const fn word_bytes(self) -> u64 {
        (self.word_bits / 8) as u64
    }

    const fn flag_shift(self) -> u32 {
        self.word_bits - 8
    }

    /// Mask covering every bit of a word
    pub const fn word_mask(self) -> u64 {
        if self.word_bits == 64 {
            u64::MAX
        } else {
            (1u64 << self.word_bits) - 1
        }
    }

    /// Mask covering the flags and type nibble of a header
    pub const fn bits_mask(self) -> u64 {
        0xffu64 << self.flag_shift()
    }

    /// Mask covering the type nibble of a header
    pub const fn type_mask(self) -> u64 {
        (TYPE_NIBBLE as u64) << self.flag_shift()
    }

    /// Mask covering the size field of a header
    pub const fn size_mask(self) -> u64 {
        self.word_mask() & !self.bits_mask()
    }

    /// Returns a header flag shifted in to its position in the top byte
    pub const fn flag(self, flag: u8) -> u64 {
        (flag as u64) << self.flag_shift()
    }

    /// Returns the largest size a header can describe
    pub const fn max_block_size(self) -> u64 {
        self.size_mask()
    }

    /// Returns the kind and flag bits for a block kind without any size
    pub const fn kind_bits(self, kind: BlockKind) -> u64 {
        (kind.type_byte() as u64) << self.flag_shift()
    }

    /// Packs a block kind and size in to a header word
    ///
    /// `size` counts bytes for byte blocks and words otherwise. It must fit in the size field.
    pub fn make_header(self, kind: BlockKind, size: u64) -> u64 {
        debug_assert!(size <= self.size_mask(), "block size overflows header");
        self.kind_bits(kind) | (size & self.size_mask())
    }

    /// Returns the flags and type nibble of a header without its size
    pub const fn header_bits(self, header: u64) -> u64 {
        header & self.bits_mask()
    }

    /// Returns the size field of a header
    pub const fn header_size(self, header: u64) -> u64 {
        header & self.size_mask()
    }

    /// Returns the raw four bit type nibble of a header
    pub const fn header_type(self, header: u64) -> u8 {
        ((header & self.type_mask()) >> self.flag_shift()) as u8
    }

    /// Returns the top byte of a header containing flags and the type nibble
    pub const fn header_type_byte(self, header: u64) -> u8 {
        ((header & self.bits_mask()) >> self.flag_shift()) as u8
    }

    /// Returns the block kind of a header
    ///
    /// The forwarding flag is ignored. `None` is returned for flag combinations that do not
    /// describe any kind.
    pub fn header_kind(self, header: u64) -> Option<BlockKind> {
        BlockKind::from_type_byte(self.header_type_byte(header) & !FORWARDING_FLAG)
    }

    /// Returns if the given header flag is set
    pub const fn has_flag(self, header: u64, flag: u8) -> bool {
        header & self.flag(flag) != 0
    }

    /// Sign bit of a word
    pub const fn sign_bit(self) -> u64 {
        1u64 << (self.word_bits - 1)
    }

    /// Bit below the sign bit of a word
    pub const fn top_bit(self) -> u64 {
        1u64 << (self.word_bits - 2)
    }

    /// Largest integer representable as a fixnum
    pub const fn most_positive_fixnum(self) -> i64 {
        (1i64 << (self.word_bits - 2)) - 1
    }

    /// Smallest integer representable as a fixnum
    pub const fn most_negative_fixnum(self) -> i64 {
        -(1i64 << (self.word_bits - 2))
    }

    /// Returns if a word-width signed value fits in a fixnum
    ///
    /// The two high bits of the value must agree as the top one is lost when tagging.
    pub const fn fits_in_fixnum(self, n: i64) -> bool {
        let n = (n as u64) & self.word_mask();
        (n & self.sign_bit()) == ((n & self.top_bit()) << 1)
    }

    /// Returns if a word-width unsigned value fits in a fixnum
    pub const fn ufits_in_fixnum(self, n: u64) -> bool {
        n & (self.sign_bit() | self.top_bit()) == 0
    }
}
