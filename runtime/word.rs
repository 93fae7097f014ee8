//! Tagged machine words
//!
//! Every runtime value is a single [`Word`]. The low bits select its representation:
//!
//! | Low bits    | Value                                    |
//! |-------------|------------------------------------------|
//! | `xxx1`      | Fixnum, value arithmetically shifted up 1 |
//! | `0110`      | Boolean                                  |
//! | `1010`      | Character, code point shifted up 8       |
//! | `1110`      | Singleton marker                         |
//! | `xx00`      | Pointer to a block header                |
//!
//! Predicates in this module return encoded boolean words so their results can flow directly in to
//! other runtime operations. Native `bool` accessors are provided on [`Word`] for Rust callers.

use std::fmt;

use crate::checked;
use crate::layout::NATIVE;

/// Tagged machine word
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Word(usize);

/// Bytes in a machine word
pub const WORD_BYTES: usize = std::mem::size_of::<usize>();

/// Tag bit marking a fixnum
pub const FIXNUM_BIT: usize = 1;
/// Shift applied to fixnum values
pub const FIXNUM_SHIFT: u32 = 1;

const IMMEDIATE_MARK_BITS: usize = 0x3;
const IMMEDIATE_TYPE_BITS: usize = 0xf;
const BOOLEAN_BITS: usize = 0x6;
const CHARACTER_BITS: usize = 0xa;
const SPECIAL_BITS: usize = 0xe;

const CHAR_SHIFT: u32 = 8;

/// Mask applied to character code points
pub const CHAR_BIT_MASK: u32 = 0x1f_ffff;

/// Largest integer representable as a native fixnum
pub const MOST_POSITIVE_FIXNUM: isize = NATIVE.most_positive_fixnum() as isize;
/// Smallest integer representable as a native fixnum
pub const MOST_NEGATIVE_FIXNUM: isize = NATIVE.most_negative_fixnum() as isize;

/// Sign bit of a native word
pub const INT_SIGN_BIT: usize = 1 << (usize::BITS - 1);
/// Bit below the sign bit of a native word
pub const INT_TOP_BIT: usize = 1 << (usize::BITS - 2);

/// Returns if a native signed value fits in a fixnum
#[inline]
pub const fn fits_in_fixnum(n: isize) -> bool {
    (n as usize & INT_SIGN_BIT) == ((n as usize & INT_TOP_BIT) << 1)
}

/// Returns if a native unsigned value fits in a fixnum
#[inline]
pub const fn ufits_in_fixnum(n: usize) -> bool {
    n & (INT_SIGN_BIT | INT_TOP_BIT) == 0
}

/// Representation class of a word
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum WordClass {
    Fixnum,
    Boolean,
    Character,
    Singleton,
    Pointer,
}

/// Fixed singleton markers
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Singleton {
    EndOfList,
    Undefined,
    Unbound,
    EndOfFile,
    BrokenWeakPointer,
}

impl Singleton {
    /// Returns the encoded word for this singleton
    pub const fn word(self) -> Word {
        match self {
            Singleton::EndOfList => Word::END_OF_LIST,
            Singleton::Undefined => Word::UNDEFINED,
            Singleton::Unbound => Word::UNBOUND,
            Singleton::EndOfFile => Word::END_OF_FILE,
            Singleton::BrokenWeakPointer => Word::BROKEN_WEAK_POINTER,
        }
    }

    /// Decodes a singleton marker
    ///
    /// Words in the singleton class that are not one of the known markers return `None`.
    pub fn from_word(word: Word) -> Option<Singleton> {
        match word {
            Word::END_OF_LIST => Some(Singleton::EndOfList),
            Word::UNDEFINED => Some(Singleton::Undefined),
            Word::UNBOUND => Some(Singleton::Unbound),
            Word::END_OF_FILE => Some(Singleton::EndOfFile),
            Word::BROKEN_WEAK_POINTER => Some(Singleton::BrokenWeakPointer),
            _ => None,
        }
    }
}

impl Word {
    pub const FALSE: Word = Word(BOOLEAN_BITS);
    pub const TRUE: Word = Word(0x10 | BOOLEAN_BITS);

    pub const END_OF_LIST: Word = Word(SPECIAL_BITS);
    pub const UNDEFINED: Word = Word(0x10 | SPECIAL_BITS);
    pub const UNBOUND: Word = Word(0x20 | SPECIAL_BITS);
    pub const END_OF_FILE: Word = Word(0x30 | SPECIAL_BITS);
    pub const BROKEN_WEAK_POINTER: Word = Word(0x40 | SPECIAL_BITS);

    /// Reinterprets a raw machine word
    pub const fn from_raw(raw: usize) -> Word {
        Word(raw)
    }

    /// Returns the raw machine word
    pub const fn to_raw(self) -> usize {
        self.0
    }

    /// Encodes an integer in the fixnum range
    #[track_caller]
    pub fn fix(n: isize) -> Word {
        let n = checked!(n, |n| fits_in_fixnum(*n));
        Word(((n as usize) << FIXNUM_SHIFT) | FIXNUM_BIT)
    }

    /// Decodes a fixnum
    #[track_caller]
    pub fn unfix(self) -> isize {
        let word = checked!(self, |w| w.is_fixnum());
        (word.0 as isize) >> FIXNUM_SHIFT
    }

    /// Encodes a character code point
    ///
    /// Bits outside the 21 bit code point range are discarded.
    pub const fn make_char(code_point: u32) -> Word {
        Word((((code_point & CHAR_BIT_MASK) as usize) << CHAR_SHIFT) | CHARACTER_BITS)
    }

    /// Encodes a Rust character
    pub const fn from_char(c: char) -> Word {
        Word::make_char(c as u32)
    }

    /// Decodes a character code point
    #[track_caller]
    pub fn character(self) -> u32 {
        let word = checked!(self, |w| w.is_char());
        (word.0 >> CHAR_SHIFT) as u32 & CHAR_BIT_MASK
    }

    /// Decodes a character as a Rust `char`
    ///
    /// Surrogate code points have no `char` representation and return `None`.
    pub fn to_char(self) -> Option<char> {
        std::char::from_u32(self.character())
    }

    /// Encodes a boolean
    pub const fn make_bool(value: bool) -> Word {
        if value {
            Word::TRUE
        } else {
            Word::FALSE
        }
    }

    /// Returns if this word counts as true; only `#f` is false
    pub const fn is_true(self) -> bool {
        self.0 != Word::FALSE.0
    }

    /// Classifies this word
    pub fn classify(self) -> WordClass {
        if self.0 & FIXNUM_BIT != 0 {
            WordClass::Fixnum
        } else if self.0 & IMMEDIATE_MARK_BITS == 0 {
            WordClass::Pointer
        } else {
            match self.0 & IMMEDIATE_TYPE_BITS {
                BOOLEAN_BITS => WordClass::Boolean,
                CHARACTER_BITS => WordClass::Character,
                _ => WordClass::Singleton,
            }
        }
    }

    pub const fn is_immediate(self) -> bool {
        self.0 & IMMEDIATE_MARK_BITS != 0
    }

    pub const fn is_pointer(self) -> bool {
        !self.is_immediate()
    }

    pub const fn is_fixnum(self) -> bool {
        self.0 & FIXNUM_BIT != 0
    }

    pub const fn is_bool(self) -> bool {
        self.0 & IMMEDIATE_TYPE_BITS == BOOLEAN_BITS
    }

    pub const fn is_char(self) -> bool {
        self.0 & IMMEDIATE_TYPE_BITS == CHARACTER_BITS
    }

    pub const fn is_null(self) -> bool {
        self.0 == Word::END_OF_LIST.0
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.classify() {
            WordClass::Fixnum => write!(formatter, "Word::fix({})", self.unfix()),
            WordClass::Boolean => write!(formatter, "Word::make_bool({})", self.is_true()),
            WordClass::Character => write!(formatter, "Word::make_char({:#x})", self.character()),
            WordClass::Singleton => match Singleton::from_word(*self) {
                Some(singleton) => write!(formatter, "{:?}", singleton),
                None => write!(formatter, "Word::from_raw({:#x})", self.0),
            },
            WordClass::Pointer => write!(formatter, "Word::pointer({:#x})", self.0),
        }
    }
}

impl From<bool> for Word {
    fn from(value: bool) -> Word {
        Word::make_bool(value)
    }
}

impl From<char> for Word {
    fn from(c: char) -> Word {
        Word::from_char(c)
    }
}

/// Returns `#t` if the word is a fixnum
pub fn fixnump(x: Word) -> Word {
    Word::make_bool(x.is_fixnum())
}

/// Returns `#t` if the word is an immediate value
pub fn immp(x: Word) -> Word {
    Word::make_bool(x.is_immediate())
}

/// Returns `#t` if the word points to a block
pub fn blockp(x: Word) -> Word {
    Word::make_bool(x.is_pointer())
}

pub fn booleanp(x: Word) -> Word {
    Word::make_bool(x.is_bool())
}

pub fn charp(x: Word) -> Word {
    Word::make_bool(x.is_char())
}

pub fn nullp(x: Word) -> Word {
    Word::make_bool(x.is_null())
}

pub fn eofp(x: Word) -> Word {
    Word::make_bool(x == Word::END_OF_FILE)
}

pub fn undefinedp(x: Word) -> Word {
    Word::make_bool(x == Word::UNDEFINED)
}

pub fn unboundvaluep(x: Word) -> Word {
    Word::make_bool(x == Word::UNBOUND)
}

/// Returns `#t` for the broken weak pointer marker
pub fn bwpp(x: Word) -> Word {
    Word::make_bool(x == Word::BROKEN_WEAK_POINTER)
}

/// Identity comparison
pub fn eqp(x: Word, y: Word) -> Word {
    Word::make_bool(x == y)
}

/// Returns `#t` for every value other than `#f`
pub fn truep(x: Word) -> Word {
    Word::make_bool(x.is_true())
}

/// Logical negation of a word's truthiness
pub fn not(x: Word) -> Word {
    Word::make_bool(!x.is_true())
}
