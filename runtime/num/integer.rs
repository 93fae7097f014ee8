//! Exact integer arithmetic over fixnums and bignums
//!
//! Operands may be any mix of fixnums and bignums. Fixnum operands take the fixnum paths directly
//! while everything else is unpacked and computed on digit vectors. Every result is normalised so
//! values in the fixnum range are always fixnums.

use std::cmp::Ordering;
use std::convert::TryFrom;

use crate::boxed::{AsHeap, BlockKind, Heap};
use crate::fault::{Fault, FaultCode, Result};
use crate::num::bignum::{self, digits, SignedDigits};
use crate::num::fixnum;
use crate::word::Word;

fn is_integer(heap: &Heap, x: Word) -> bool {
    x.is_fixnum() || heap.has_kind(x, BlockKind::Bignum)
}

/// Returns `x` if it is a fixnum or bignum otherwise faults
pub fn expect_integer(heap: &impl AsHeap, x: Word, site: &'static str) -> Result<Word> {
    if is_integer(heap.as_heap(), x) {
        Ok(x)
    } else {
        Err(Fault::at(FaultCode::NoExactInteger, site).with_operand(x))
    }
}

pub fn exact_integerp(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(is_integer(heap.as_heap(), x))
}

fn unpack(heap: &impl AsHeap, x: Word, site: &'static str) -> Result<SignedDigits> {
    bignum::unpack(heap, expect_integer(heap, x, site)?)
}

fn both_fixnums(x: Word, y: Word) -> bool {
    x.is_fixnum() && y.is_fixnum()
}

pub fn plus(heap: &mut impl AsHeap, x: Word, y: Word) -> Result<Word> {
    if both_fixnums(x, y) {
        return fixnum::plus(heap, x, y);
    }

    let sum = unpack(&*heap, x, "+")?.add(&unpack(&*heap, y, "+")?);
    bignum::make_integer(heap, sum)
}

pub fn minus(heap: &mut impl AsHeap, x: Word, y: Word) -> Result<Word> {
    if both_fixnums(x, y) {
        return fixnum::difference(heap, x, y);
    }

    let difference = unpack(&*heap, x, "-")?.sub(&unpack(&*heap, y, "-")?);
    bignum::make_integer(heap, difference)
}

/// Multiplies two integers
///
/// Karatsuba multiplication is used above the heap's configured threshold.
pub fn times(heap: &mut impl AsHeap, x: Word, y: Word) -> Result<Word> {
    if both_fixnums(x, y) {
        return fixnum::times(heap, x, y);
    }

    let threshold = heap.as_heap().thresholds().karatsuba;
    let product = unpack(&*heap, x, "*")?.mul(&unpack(&*heap, y, "*")?, threshold);
    bignum::make_integer(heap, product)
}

pub fn negate(heap: &mut impl AsHeap, x: Word) -> Result<Word> {
    if x.is_fixnum() {
        return fixnum::negate(heap, x);
    }

    let negated = unpack(&*heap, x, "negate")?.negate();
    bignum::make_integer(heap, negated)
}

pub fn abs(heap: &mut impl AsHeap, x: Word) -> Result<Word> {
    if x.is_fixnum() {
        return fixnum::abs(heap, x);
    }

    if bignum::negativep(&*heap, expect_integer(&*heap, x, "abs")?)? {
        negate(heap, x)
    } else {
        Ok(x)
    }
}

fn unpack_division(
    heap: &impl AsHeap,
    x: Word,
    y: Word,
    site: &'static str,
) -> Result<(SignedDigits, SignedDigits)> {
    let dividend = unpack(heap, x, site)?;
    let divisor = unpack(heap, y, site)?;

    if divisor.is_zero() {
        return Err(Fault::at(FaultCode::DivisionByZero, site).with_operand(x));
    }

    Ok((dividend, divisor))
}

/// Divides truncating towards zero returning the quotient and remainder
pub fn divrem(heap: &mut impl AsHeap, x: Word, y: Word) -> Result<(Word, Word)> {
    if both_fixnums(x, y) {
        let remainder = fixnum::remainder(x, y)?;
        return Ok((fixnum::quotient(heap, x, y)?, remainder));
    }

    let (dividend, divisor) = unpack_division(&*heap, x, y, "quotient&remainder")?;
    let (quotient, remainder) = dividend.divrem(&divisor);

    Ok((
        bignum::make_integer(heap, quotient)?,
        bignum::make_integer(heap, remainder)?,
    ))
}

pub fn quotient(heap: &mut impl AsHeap, x: Word, y: Word) -> Result<Word> {
    if both_fixnums(x, y) {
        return fixnum::quotient(heap, x, y);
    }

    let (dividend, divisor) = unpack_division(&*heap, x, y, "quotient")?;
    bignum::make_integer(heap, dividend.divrem(&divisor).0)
}

/// Returns the remainder with the sign of the dividend
pub fn remainder(heap: &mut impl AsHeap, x: Word, y: Word) -> Result<Word> {
    if both_fixnums(x, y) {
        return fixnum::remainder(x, y);
    }

    let (dividend, divisor) = unpack_division(&*heap, x, y, "remainder")?;
    bignum::make_integer(heap, dividend.divrem(&divisor).1)
}

/// Returns the remainder with the sign of the divisor
pub fn modulo(heap: &mut impl AsHeap, x: Word, y: Word) -> Result<Word> {
    if both_fixnums(x, y) {
        return fixnum::modulo(x, y);
    }

    let (dividend, divisor) = unpack_division(&*heap, x, y, "modulo")?;
    let (_, mut remainder) = dividend.divrem(&divisor);

    if !remainder.is_zero() && remainder.negative != divisor.negative {
        remainder = remainder.add(&divisor);
    }

    bignum::make_integer(heap, remainder)
}

/// Returns the non-negative greatest common divisor
pub fn gcd(heap: &mut impl AsHeap, x: Word, y: Word) -> Result<Word> {
    if both_fixnums(x, y) {
        return fixnum::gcd(heap, x, y);
    }

    let mut a = unpack(&*heap, x, "gcd")?.abs();
    let mut b = unpack(&*heap, y, "gcd")?.abs();

    while !b.is_zero() {
        let (_, r) = a.divrem(&b);
        a = b;
        b = r;
    }

    bignum::make_integer(heap, a)
}

pub fn compare(heap: &impl AsHeap, x: Word, y: Word) -> Result<Ordering> {
    if both_fixnums(x, y) {
        return Ok(x.unfix().cmp(&y.unfix()));
    }

    Ok(unpack(heap, x, "compare")?.cmp(&unpack(heap, y, "compare")?))
}

pub fn signum(heap: &impl AsHeap, x: Word) -> Result<Word> {
    if x.is_fixnum() {
        return Ok(fixnum::signum(x));
    }

    let x = expect_integer(heap, x, "signum")?;
    Ok(Word::fix(if bignum::negativep(heap, x)? { -1 } else { 1 }))
}

pub fn zerop(x: Word) -> bool {
    x == Word::fix(0)
}

pub fn evenp(heap: &impl AsHeap, x: Word) -> Result<Word> {
    let value = unpack(heap, x, "even?")?;
    Ok(Word::make_bool(value.digits.first().map_or(true, |d| d & 1 == 0)))
}

pub fn oddp(heap: &impl AsHeap, x: Word) -> Result<Word> {
    Ok(Word::make_bool(!evenp(heap, x)?.is_true()))
}

/// Returns the number of bits needed to represent the value excluding the sign
pub fn length(heap: &impl AsHeap, x: Word) -> Result<usize> {
    let value = unpack(heap, x, "integer-length")?;

    if value.negative {
        // The two's complement of -n needs as many bits as n - 1
        let predecessor = digits::sub(&value.digits, &[1]);
        Ok(digits::bit_length(&predecessor))
    } else {
        Ok(digits::bit_length(&value.digits))
    }
}

/// Multiplies by a power of two rounding towards negative infinity
///
/// Left shifts whose result cannot fit in the free space fault before any digits are built.
pub fn arithmetic_shift(heap: &mut impl AsHeap, x: Word, count: isize) -> Result<Word> {
    let site = "arithmetic-shift";
    let value = unpack(&*heap, x, site)?;
    let bits = count.unsigned_abs();

    if count > 0 && !value.is_zero() {
        // The shifted magnitude needs at least this many digits
        let words = value.digits.len() + bits / digits::DIGIT_BITS as usize;
        if !heap.as_heap().demand(words) {
            return Err(Fault::at(FaultCode::OutOfMemory, site).with_operand(x));
        }
    }

    let shifted = if count >= 0 {
        SignedDigits::new(value.negative, digits::shl(&value.digits, bits))
    } else {
        let mut magnitude = digits::shr(&value.digits, bits);
        if value.negative && digits::any_low_bits(&value.digits, bits) {
            magnitude = digits::add(&magnitude, &[1]);
        }
        SignedDigits::new(value.negative, magnitude)
    };

    bignum::make_integer(heap, shifted)
}

/// Formats an integer in `radix`
pub fn to_string(heap: &impl AsHeap, x: Word, radix: u32) -> Result<String> {
    let threshold = heap.as_heap().thresholds().recursive_to_string;
    bignum::string::to_string(&unpack(heap, x, "number->string")?, radix, threshold)
}

/// Formats an integer in `radix` as a heap string
pub fn number_to_string(heap: &mut impl AsHeap, x: Word, radix: u32) -> Result<Word> {
    let text = to_string(&*heap, x, radix)?;
    crate::boxed::types::str::string(heap, &text)
}

/// Parses an integer in `radix` returning `#f` for text that is not an integer
pub fn parse(heap: &mut impl AsHeap, text: &str, radix: u32) -> Result<Word> {
    match bignum::string::parse(text, radix)? {
        Some(value) => bignum::make_integer(heap, value),
        None => Ok(Word::FALSE),
    }
}

pub fn from_i64(heap: &mut impl AsHeap, n: i64) -> Result<Word> {
    bignum::make_integer(heap, SignedDigits::from_i128(i128::from(n)))
}

pub fn from_u64(heap: &mut impl AsHeap, n: u64) -> Result<Word> {
    bignum::make_integer(heap, SignedDigits::from_i128(i128::from(n)))
}

pub fn from_isize(heap: &mut impl AsHeap, n: isize) -> Result<Word> {
    bignum::make_integer(heap, SignedDigits::from_isize(n))
}

pub fn from_usize(heap: &mut impl AsHeap, n: usize) -> Result<Word> {
    bignum::make_integer(heap, SignedDigits::new(false, vec![n]))
}

fn to_native<T: TryFrom<i128>>(heap: &impl AsHeap, x: Word, site: &'static str) -> Result<T> {
    unpack(heap, x, site)?
        .to_i128()
        .and_then(|n| T::try_from(n).ok())
        .ok_or_else(|| Fault::at(FaultCode::ForeignLimitation, site).with_operand(x))
}

pub fn to_i32(heap: &impl AsHeap, x: Word) -> Result<i32> {
    to_native(heap, x, "integer->i32")
}

pub fn to_u32(heap: &impl AsHeap, x: Word) -> Result<u32> {
    to_native(heap, x, "integer->u32")
}

pub fn to_i64(heap: &impl AsHeap, x: Word) -> Result<i64> {
    to_native(heap, x, "integer->i64")
}

pub fn to_u64(heap: &impl AsHeap, x: Word) -> Result<u64> {
    to_native(heap, x, "integer->u64")
}

pub fn to_isize(heap: &impl AsHeap, x: Word) -> Result<isize> {
    to_native(heap, x, "integer->isize")
}

pub fn to_usize(heap: &impl AsHeap, x: Word) -> Result<usize> {
    to_native(heap, x, "integer->usize")
}

/// Returns the nearest double
///
/// Magnitudes beyond the double range become infinities.
pub fn to_f64(heap: &impl AsHeap, x: Word) -> Result<f64> {
    if x.is_fixnum() {
        return Ok(x.unfix() as f64);
    }

    Ok(unpack(heap, x, "exact->inexact")?.to_f64())
}

/// Returns the exact integer equal to an integral double
pub fn from_f64(heap: &mut impl AsHeap, value: f64) -> Result<Word> {
    match SignedDigits::from_f64(value) {
        Some(value) => bignum::make_integer(heap, value),
        None => Err(Fault::at(FaultCode::CantRepresentInexact, "inexact->exact")),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::boxed::types::str::string_bytes;
    use crate::word::{MOST_NEGATIVE_FIXNUM, MOST_POSITIVE_FIXNUM};

    fn int(heap: &mut Heap, n: i128) -> Word {
        bignum::make_integer(heap, SignedDigits::from_i128(n)).unwrap()
    }

    fn value(heap: &Heap, x: Word) -> i128 {
        bignum::unpack(heap, x).unwrap().to_i128().unwrap()
    }

    #[test]
    fn mixed_arithmetic() {
        let mut heap = Heap::with_capacity(4096);

        let big = int(&mut heap, 1 << 80);
        let small = Word::fix(-3);

        let sum = plus(&mut heap, big, small).unwrap();
        assert_eq!((1 << 80) - 3, value(&heap, sum));

        let difference = minus(&mut heap, small, big).unwrap();
        assert_eq!(-3 - (1 << 80), value(&heap, difference));

        let product = times(&mut heap, big, small).unwrap();
        assert_eq!(-3 * (1 << 80), value(&heap, product));

        // Cancelling back in to the fixnum range
        let back = minus(&mut heap, sum, big).unwrap();
        assert_eq!(Word::fix(-3), back);
    }

    #[test]
    fn division() {
        let mut heap = Heap::with_capacity(4096);

        let x = int(&mut heap, -(1 << 90) - 7);
        let y = int(&mut heap, 1 << 40);

        let (q, r) = divrem(&mut heap, x, y).unwrap();
        assert_eq!((-(1 << 90) - 7) / (1 << 40), value(&heap, q));
        assert_eq!((-(1 << 90) - 7) % (1 << 40), value(&heap, r));

        let m = modulo(&mut heap, x, y).unwrap();
        assert_eq!((-(1i128 << 90) - 7).rem_euclid(1 << 40), value(&heap, m));

        let fault = quotient(&mut heap, x, Word::fix(0)).unwrap_err();
        assert_eq!(FaultCode::DivisionByZero, fault.code());
        assert_eq!(Some("quotient"), fault.site());
    }

    #[test]
    fn gcd_and_compare() {
        let mut heap = Heap::with_capacity(4096);

        let x = int(&mut heap, 6 * (1 << 70));
        let y = int(&mut heap, -(9 * (1 << 65)));

        let divisor = gcd(&mut heap, x, y).unwrap();
        assert_eq!(3 * (1 << 65), value(&heap, divisor));

        assert_eq!(Ordering::Greater, compare(&heap, x, y).unwrap());
        assert_eq!(Ordering::Less, compare(&heap, y, Word::fix(0)).unwrap());
        assert_eq!(Word::fix(-1), signum(&heap, y).unwrap());
        assert_eq!(Word::TRUE, evenp(&heap, x).unwrap());
        assert_eq!(Word::FALSE, oddp(&heap, y).unwrap());
    }

    #[test]
    fn shifts() {
        let mut heap = Heap::with_capacity(4096);

        let shifted = arithmetic_shift(&mut heap, Word::fix(3), 100).unwrap();
        assert_eq!(3 << 100, value(&heap, shifted));

        assert_eq!(
            Word::fix(3),
            arithmetic_shift(&mut heap, shifted, -100).unwrap()
        );
        assert_eq!(
            Word::fix(-2),
            arithmetic_shift(&mut heap, Word::fix(-3), -1).unwrap()
        );
        assert_eq!(
            Word::fix(-1),
            arithmetic_shift(&mut heap, Word::fix(-3), -500).unwrap()
        );

        assert_eq!(0, length(&heap, Word::fix(-1)).unwrap());
        assert_eq!(101, length(&heap, shifted).unwrap() - 1);
    }

    #[test]
    fn shifts_beyond_the_heap() {
        let mut heap = Heap::with_capacity(256);

        for count in [isize::MAX, isize::MAX / 2, 64 * 256].iter() {
            let fault = arithmetic_shift(&mut heap, Word::fix(1), *count).unwrap_err();
            assert_eq!(FaultCode::OutOfMemory, fault.code());
            assert_eq!(&[Word::fix(1)], fault.operands());
        }
        assert_eq!(256, heap.free_words());

        // Zero and right shifts never grow
        assert_eq!(Word::fix(0), arithmetic_shift(&mut heap, Word::fix(0), isize::MAX).unwrap());
        assert_eq!(Word::fix(-1), arithmetic_shift(&mut heap, Word::fix(-1), isize::MIN).unwrap());
    }

    #[test]
    fn native_conversions() {
        let mut heap = Heap::with_capacity(4096);

        let max = from_u64(&mut heap, u64::MAX).unwrap();
        assert_eq!(u64::MAX, to_u64(&heap, max).unwrap());
        assert_eq!(
            FaultCode::ForeignLimitation,
            to_i64(&heap, max).unwrap_err().code()
        );

        let min = from_i64(&mut heap, i64::MIN).unwrap();
        assert_eq!(i64::MIN, to_i64(&heap, min).unwrap());
        assert_eq!(
            FaultCode::ForeignLimitation,
            to_u32(&heap, Word::fix(-1)).unwrap_err().code()
        );
        assert_eq!(-1, to_i32(&heap, Word::fix(-1)).unwrap());

        assert_eq!(
            Word::fix(MOST_POSITIVE_FIXNUM),
            from_isize(&mut heap, MOST_POSITIVE_FIXNUM).unwrap()
        );
        let above = from_usize(&mut heap, MOST_POSITIVE_FIXNUM as usize + 1).unwrap();
        assert_eq!(Word::TRUE, bignum::bignump(&heap, above));

        assert_eq!(
            FaultCode::NoExactInteger,
            to_isize(&heap, Word::TRUE).unwrap_err().code()
        );
    }

    #[test]
    fn doubles() {
        let mut heap = Heap::with_capacity(4096);

        assert_eq!(-2.0, to_f64(&heap, Word::fix(-2)).unwrap());
        let big = from_f64(&mut heap, 2f64.powi(80)).unwrap();
        assert_eq!(1 << 80, value(&heap, big));
        assert_eq!(2f64.powi(80), to_f64(&heap, big).unwrap());

        assert_eq!(
            Word::fix(MOST_NEGATIVE_FIXNUM),
            from_f64(&mut heap, MOST_NEGATIVE_FIXNUM as f64).unwrap()
        );
        assert_eq!(
            FaultCode::CantRepresentInexact,
            from_f64(&mut heap, f64::NAN).unwrap_err().code()
        );
        assert_eq!(
            FaultCode::CantRepresentInexact,
            from_f64(&mut heap, 0.5).unwrap_err().code()
        );
    }

    #[test]
    fn strings() {
        let mut heap = Heap::with_capacity(4096);

        let x = parse(&mut heap, "-123456789012345678901234567890", 10).unwrap();
        assert_eq!(
            "-123456789012345678901234567890",
            to_string(&heap, x, 10).unwrap()
        );
        assert_eq!("-ff", to_string(&heap, Word::fix(-255), 16).unwrap());
        assert_eq!(Word::FALSE, parse(&mut heap, "1.5", 10).unwrap());

        let text = number_to_string(&mut heap, Word::fix(42), 10).unwrap();
        assert_eq!(b"42", string_bytes(&heap, text).unwrap());
    }
}
