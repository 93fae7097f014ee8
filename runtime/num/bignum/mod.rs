//! Arbitrary precision integers
//!
//! A bignum is a one slot wrapper pointing at a digit vector. The digit vector is a byte block
//! whose first word is the sign and whose remaining words are the magnitude's digits, least
//! significant first. Keeping the digits behind the wrapper lets them be replaced or shrunk without
//! changing the bignum's identity.
//!
//! Bignums produced by arithmetic are normalised: they never have high zero digits and never hold a
//! value that fits in a fixnum.

pub mod digits;
pub mod string;

use std::cmp::Ordering;
use std::convert::TryFrom;

use crate::boxed::types::expect_kind;
use crate::boxed::{AsHeap, BlockKind, Heap};
use crate::fault::{FaultCode, Result};
use crate::word::{ufits_in_fixnum, Word, MOST_NEGATIVE_FIXNUM, WORD_BYTES};

/// Sign and magnitude of an exact integer held outside the heap
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedDigits {
    pub negative: bool,
    pub digits: Vec<usize>,
}

impl SignedDigits {
    /// Returns a normalised value
    ///
    /// High zero digits are removed and zero is never negative.
    pub fn new(negative: bool, mut digits: Vec<usize>) -> SignedDigits {
        digits::trim(&mut digits);
        SignedDigits {
            negative: negative && !digits.is_empty(),
            digits,
        }
    }

    pub fn zero() -> SignedDigits {
        SignedDigits {
            negative: false,
            digits: vec![],
        }
    }

    pub fn from_isize(n: isize) -> SignedDigits {
        SignedDigits::new(n < 0, vec![n.unsigned_abs()])
    }

    pub fn from_i128(n: i128) -> SignedDigits {
        let magnitude = n.unsigned_abs();
        let digits = (0..128 / digits::DIGIT_BITS)
            .map(|index| (magnitude >> (index * digits::DIGIT_BITS)) as usize)
            .collect();

        SignedDigits::new(n < 0, digits)
    }

    /// Returns the value as an `i128` if it fits
    pub fn to_i128(&self) -> Option<i128> {
        if digits::bit_length(&self.digits) > 127 {
            return None;
        }

        let magnitude = self
            .digits
            .iter()
            .enumerate()
            .fold(0i128, |acc, (index, digit)| {
                acc | ((*digit as i128) << (index as u32 * digits::DIGIT_BITS))
            });

        Some(if self.negative { -magnitude } else { magnitude })
    }

    pub fn is_zero(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn negate(self) -> SignedDigits {
        SignedDigits::new(!self.negative, self.digits)
    }

    pub fn abs(self) -> SignedDigits {
        SignedDigits::new(false, self.digits)
    }

    /// Returns the value as a native integer if it fits in a fixnum
    pub fn to_fixnum(&self) -> Option<isize> {
        match self.digits[..] {
            [] => Some(0),
            [digit] if !self.negative && ufits_in_fixnum(digit) => Some(digit as isize),
            [digit] if self.negative && digit <= MOST_NEGATIVE_FIXNUM.unsigned_abs() => {
                Some((digit as isize).wrapping_neg())
            }
            _ => None,
        }
    }

    pub fn add(&self, other: &SignedDigits) -> SignedDigits {
        if self.negative == other.negative {
            return SignedDigits::new(self.negative, digits::add(&self.digits, &other.digits));
        }

        match digits::cmp(&self.digits, &other.digits) {
            Ordering::Less => {
                SignedDigits::new(other.negative, digits::sub(&other.digits, &self.digits))
            }
            _ => SignedDigits::new(self.negative, digits::sub(&self.digits, &other.digits)),
        }
    }

    pub fn sub(&self, other: &SignedDigits) -> SignedDigits {
        self.add(&other.clone().negate())
    }

    pub fn mul(&self, other: &SignedDigits, karatsuba_threshold: usize) -> SignedDigits {
        SignedDigits::new(
            self.negative != other.negative,
            digits::mul(&self.digits, &other.digits, karatsuba_threshold),
        )
    }

    /// Divides truncating towards zero
    ///
    /// The remainder has the sign of the dividend. The divisor must not be zero.
    pub fn divrem(&self, other: &SignedDigits) -> (SignedDigits, SignedDigits) {
        let (quotient, remainder) = digits::divrem(&self.digits, &other.digits);

        (
            SignedDigits::new(self.negative != other.negative, quotient),
            SignedDigits::new(self.negative, remainder),
        )
    }

    pub fn cmp(&self, other: &SignedDigits) -> Ordering {
        match (self.negative, other.negative) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, false) => digits::cmp(&self.digits, &other.digits),
            (true, true) => digits::cmp(&other.digits, &self.digits),
        }
    }

    /// Returns the nearest double
    ///
    /// Ties round to even. Values beyond the double range become infinities.
    pub fn to_f64(&self) -> f64 {
        let bits = digits::bit_length(&self.digits);

        let magnitude = if bits <= 64 {
            let low = self.to_low_u64();
            low as f64
        } else {
            // Keep the top 64 bits with a sticky bit so the conversion rounds once
            let discarded = bits - 64;
            let top = SignedDigits::new(false, digits::shr(&self.digits, discarded)).to_low_u64();
            let sticky = digits::any_low_bits(&self.digits, discarded) as u64;

            let scale = i32::try_from(discarded).unwrap_or(i32::MAX);
            ((top | sticky) as f64) * 2f64.powi(scale)
        };

        if self.negative {
            -magnitude
        } else {
            magnitude
        }
    }

    fn to_low_u64(&self) -> u64 {
        self.digits
            .iter()
            .take((64 / digits::DIGIT_BITS) as usize)
            .enumerate()
            .fold(0u64, |acc, (index, digit)| {
                acc | ((*digit as u64) << (index as u32 * digits::DIGIT_BITS))
            })
    }

    /// Returns the exact value of an integral double
    pub fn from_f64(value: f64) -> Option<SignedDigits> {
        if !value.is_finite() || value.trunc() != value {
            return None;
        }

        let bits = value.to_bits();
        let exponent = ((bits >> 52) & 0x7ff) as i32;
        let fraction = bits & ((1 << 52) - 1);

        if exponent == 0 {
            // Subnormals and zero have no integral part
            return Some(SignedDigits::zero());
        }

        let mantissa = fraction | (1 << 52);
        let shift = exponent - 1075;

        let magnitude = SignedDigits::from_i128(mantissa as i128).digits;
        let digits = if shift >= 0 {
            digits::shl(&magnitude, shift as usize)
        } else {
            digits::shr(&magnitude, (-shift) as usize)
        };

        Some(SignedDigits::new(value < 0.0, digits))
    }
}

fn expect_bignum(heap: &Heap, x: Word, site: &'static str) -> Result<Word> {
    expect_kind(heap, x, BlockKind::Bignum, FaultCode::NoExactInteger, site)
}

pub(crate) fn alloc(
    heap: &mut Heap,
    negative: bool,
    digits: &[usize],
    permanent: bool,
) -> Result<Word> {
    let bytes = (digits.len() + 1) * WORD_BYTES;

    let (digit_vector, bignum) = if permanent {
        (
            heap.alloc_permanent(BlockKind::Bytevector, bytes)?,
            heap.alloc_permanent(BlockKind::Bignum, 1)?,
        )
    } else {
        (
            heap.alloc(BlockKind::Bytevector, bytes)?,
            heap.alloc(BlockKind::Bignum, 1)?,
        )
    };

    let words = heap.data_words_mut(digit_vector);
    words[0] = negative as usize;
    words[1..].copy_from_slice(digits);

    heap.set_slot(bignum, 0, digit_vector);
    Ok(bignum)
}

/// Allocates a one digit bignum without normalising it
pub fn one_digit(heap: &mut impl AsHeap, negative: bool, digit: usize) -> Result<Word> {
    alloc(heap.as_heap_mut(), negative, &[digit], false)
}

/// Allocates a two digit bignum without normalising it
pub fn two_digits(heap: &mut impl AsHeap, negative: bool, low: usize, high: usize) -> Result<Word> {
    alloc(heap.as_heap_mut(), negative, &[low, high], false)
}

pub fn bignump(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(heap.as_heap().has_kind(x, BlockKind::Bignum))
}

fn digit_vector(heap: &Heap, bignum: Word) -> Word {
    heap.slot(bignum, 0)
}

/// Returns if a bignum is negative
pub fn negativep(heap: &impl AsHeap, bignum: Word) -> Result<bool> {
    let heap = heap.as_heap();

    let bignum = expect_bignum(heap, bignum, "bignum-negative?")?;
    Ok(heap.data_words(digit_vector(heap, bignum))[0] != 0)
}

/// Returns the digits of a bignum least significant first
pub fn digits(heap: &impl AsHeap, bignum: Word) -> Result<&[usize]> {
    let heap = heap.as_heap();

    let bignum = expect_bignum(heap, bignum, "bignum-digits")?;
    Ok(&heap.data_words(digit_vector(heap, bignum))[1..])
}

/// Copies an exact integer out of the heap
pub fn unpack(heap: &impl AsHeap, x: Word) -> Result<SignedDigits> {
    if x.is_fixnum() {
        return Ok(SignedDigits::from_isize(x.unfix()));
    }

    let negative = negativep(heap, x)?;
    Ok(SignedDigits::new(negative, digits(heap, x)?.to_vec()))
}

/// Stores an exact integer as a fixnum when it fits and a bignum otherwise
pub fn make_integer(heap: &mut impl AsHeap, value: SignedDigits) -> Result<Word> {
    match value.to_fixnum() {
        Some(n) => Ok(Word::fix(n)),
        None => alloc(heap.as_heap_mut(), value.negative, &value.digits, false),
    }
}

/// Stores an exact integer in the permanent space
pub fn make_static_integer(heap: &mut impl AsHeap, value: SignedDigits) -> Result<Word> {
    match value.to_fixnum() {
        Some(n) => Ok(Word::fix(n)),
        None => alloc(heap.as_heap_mut(), value.negative, &value.digits, true),
    }
}

/// Normalises a bignum in place
///
/// High zero digits are released by shrinking the digit vector. Values that fit in a fixnum are
/// returned as fixnums.
pub fn simplify(heap: &mut impl AsHeap, bignum: Word) -> Result<Word> {
    let heap = heap.as_heap_mut();
    let bignum = expect_bignum(heap, bignum, "bignum-simplify")?;

    let digit_vector = digit_vector(heap, bignum);
    let words = heap.data_words(digit_vector);
    let length = digits::significant(&words[1..]).len();

    if length + 1 < words.len() {
        heap.shrink(digit_vector, (length + 1) * WORD_BYTES);
    }

    let value = unpack(heap, bignum)?;
    if value.is_zero() {
        heap.data_words_mut(digit_vector)[0] = 0;
    }

    Ok(match value.to_fixnum() {
        Some(n) => Word::fix(n),
        None => bignum,
    })
}

/// Parses an integer literal in to the permanent space
///
/// Text that is not a valid integer in `radix` returns `#f`.
pub fn static_bignum(heap: &mut impl AsHeap, text: &str, radix: u32) -> Result<Word> {
    match string::parse(text, radix)? {
        Some(value) => make_static_integer(heap, value),
        None => Ok(Word::FALSE),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::word::MOST_POSITIVE_FIXNUM;

    #[test]
    fn make_and_unpack() {
        let mut heap = Heap::with_capacity(256);

        let big = make_integer(&mut heap, SignedDigits::new(true, vec![1, 2])).unwrap();
        assert_eq!(Word::TRUE, bignump(&heap, big));
        assert!(negativep(&heap, big).unwrap());
        assert_eq!(&[1, 2], digits(&heap, big).unwrap());
        assert_eq!(
            SignedDigits::new(true, vec![1, 2]),
            unpack(&heap, big).unwrap()
        );

        let small = make_integer(&mut heap, SignedDigits::new(true, vec![5, 0])).unwrap();
        assert_eq!(Word::fix(-5), small);
    }

    #[test]
    fn fixnum_boundaries() {
        let max = SignedDigits::from_isize(MOST_POSITIVE_FIXNUM);
        assert_eq!(Some(MOST_POSITIVE_FIXNUM), max.to_fixnum());

        let above = max.add(&SignedDigits::from_isize(1));
        assert_eq!(None, above.to_fixnum());

        let min = SignedDigits::from_isize(MOST_NEGATIVE_FIXNUM);
        assert_eq!(Some(MOST_NEGATIVE_FIXNUM), min.to_fixnum());
        assert_eq!(None, min.clone().negate().to_fixnum());
    }

    #[test]
    fn simplify_in_place() {
        let mut heap = Heap::with_capacity(256);

        let padded = two_digits(&mut heap, false, 7, 0).unwrap();
        assert_eq!(Word::fix(7), simplify(&mut heap, padded).unwrap());

        let zero = two_digits(&mut heap, true, 0, 0).unwrap();
        assert_eq!(Word::fix(0), simplify(&mut heap, zero).unwrap());

        let wide = two_digits(&mut heap, false, 1, 1).unwrap();
        assert_eq!(wide, simplify(&mut heap, wide).unwrap());

        let large = one_digit(&mut heap, false, usize::MAX).unwrap();
        assert_eq!(large, simplify(&mut heap, large).unwrap());
    }

    #[test]
    fn signed_arithmetic() {
        let a = SignedDigits::from_i128(-1_000_000_000_000_000_000_000);
        let b = SignedDigits::from_i128(999_999_999_999_999_999);

        assert_eq!(
            Some(-1_000_000_000_000_000_000_000 + 999_999_999_999_999_999),
            a.add(&b).to_i128()
        );
        assert_eq!(
            Some(-1_000_000_000_000_000_000_000 - 999_999_999_999_999_999),
            a.sub(&b).to_i128()
        );

        let (quotient, remainder) = a.divrem(&b);
        assert_eq!(
            Some(-1_000_000_000_000_000_000_000 / 999_999_999_999_999_999),
            quotient.to_i128()
        );
        assert_eq!(
            Some(-1_000_000_000_000_000_000_000 % 999_999_999_999_999_999),
            remainder.to_i128()
        );
        assert_eq!(Ordering::Less, a.cmp(&b));
    }

    #[test]
    fn doubles() {
        assert_eq!(
            Some(SignedDigits::from_i128(-(1 << 70))),
            SignedDigits::from_f64(-(2f64.powi(70)))
        );
        assert_eq!(None, SignedDigits::from_f64(0.5));
        assert_eq!(None, SignedDigits::from_f64(f64::INFINITY));
        assert_eq!(Some(SignedDigits::zero()), SignedDigits::from_f64(-0.0));

        assert_eq!(2f64.powi(100), SignedDigits::from_f64(2f64.powi(100)).unwrap().to_f64());
        assert_eq!(-3.0, SignedDigits::from_isize(-3).to_f64());

        // 2^64 + 1 rounds down and 2^64 + 2^12 rounds to even
        let above = SignedDigits::from_i128((1 << 64) + 1);
        assert_eq!(2f64.powi(64), above.to_f64());
        let tie = SignedDigits::from_i128((1 << 64) + (1 << 11));
        assert_eq!(2f64.powi(64), tie.to_f64());
    }

    #[test]
    fn static_literals() {
        let mut heap = Heap::with_capacity(256);

        let big = static_bignum(&mut heap, "123456789012345678901234567890", 10).unwrap();
        assert!(heap.permanentp(big));
        assert_eq!(
            Some(123_456_789_012_345_678_901_234_567_890),
            unpack(&heap, big).unwrap().to_i128()
        );

        assert_eq!(Word::FALSE, static_bignum(&mut heap, "12x", 10).unwrap());
        assert_eq!(Word::fix(12), static_bignum(&mut heap, "12", 10).unwrap());
    }
}
