//! Rationals and complex numbers
//!
//! Both are immutable two slot wrappers. A ratnum is assumed to already be in lowest terms with a
//! positive denominator; reducing it is the caller's job. A cplxnum's parts are either both exact
//! or both flonums.

use crate::boxed::types::expect_kind;
use crate::boxed::{AsHeap, BlockKind, Heap};
use crate::fault::{Fault, FaultCode, Result};
use crate::num::bignum::{self, digits, SignedDigits};
use crate::num::{self, integer};
use crate::word::Word;

fn pair(heap: &mut Heap, kind: BlockKind, first: Word, second: Word) -> Result<Word> {
    let block = heap.alloc(kind, 2)?;
    heap.set_slot(block, 0, first);
    heap.set_slot(block, 1, second);
    Ok(block)
}

/// Builds a rational from an exact numerator and a non-zero denominator
pub fn ratnum(heap: &mut impl AsHeap, numerator: Word, denominator: Word) -> Result<Word> {
    let site = "ratnum";
    integer::expect_integer(&*heap, numerator, site)?;
    integer::expect_integer(&*heap, denominator, site)?;

    if integer::zerop(denominator) {
        return fault!(DivisionByZero, site, numerator, denominator);
    }

    pair(heap.as_heap_mut(), BlockKind::Ratnum, numerator, denominator)
}

pub fn ratnump(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(heap.as_heap().has_kind(x, BlockKind::Ratnum))
}

fn expect_ratnum(heap: &Heap, x: Word) -> Result<Word> {
    expect_kind(heap, x, BlockKind::Ratnum, FaultCode::BadArgumentType, "ratnum")
}

pub fn numerator(heap: &impl AsHeap, x: Word) -> Result<Word> {
    let heap = heap.as_heap();
    Ok(heap.slot(expect_ratnum(heap, x)?, 0))
}

pub fn denominator(heap: &impl AsHeap, x: Word) -> Result<Word> {
    let heap = heap.as_heap();
    Ok(heap.slot(expect_ratnum(heap, x)?, 1))
}

fn is_exact_real(heap: &Heap, x: Word) -> bool {
    x.is_fixnum() || heap.has_kind(x, BlockKind::Bignum) || heap.has_kind(x, BlockKind::Ratnum)
}

/// Builds a complex number from two real parts of the same exactness
pub fn cplxnum(heap: &mut impl AsHeap, real: Word, imaginary: Word) -> Result<Word> {
    let site = "cplxnum";

    let exactness = {
        let heap = heap.as_heap();
        let mut exactness = [false; 2];

        for (index, part) in [real, imaginary].iter().enumerate() {
            if is_exact_real(heap, *part) {
                exactness[index] = true;
            } else if !heap.has_kind(*part, BlockKind::Flonum) {
                return Err(Fault::at(FaultCode::NoReal, site).with_operand(*part));
            }
        }

        exactness
    };

    if exactness[0] != exactness[1] {
        return fault!(BadArgumentType, site, real, imaginary);
    }

    pair(heap.as_heap_mut(), BlockKind::Cplxnum, real, imaginary)
}

pub fn cplxnump(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(heap.as_heap().has_kind(x, BlockKind::Cplxnum))
}

fn expect_cplxnum(heap: &Heap, x: Word) -> Result<Word> {
    expect_kind(heap, x, BlockKind::Cplxnum, FaultCode::BadArgumentType, "cplxnum")
}

pub fn real_part(heap: &impl AsHeap, x: Word) -> Result<Word> {
    let heap = heap.as_heap();
    Ok(heap.slot(expect_cplxnum(heap, x)?, 0))
}

pub fn imaginary_part(heap: &impl AsHeap, x: Word) -> Result<Word> {
    let heap = heap.as_heap();
    Ok(heap.slot(expect_cplxnum(heap, x)?, 1))
}

/// Returns the nearest double to an exact rational
///
/// Ties round to even. Neither part needs to be representable as a double.
pub fn ratnum_to_f64(heap: &impl AsHeap, x: Word) -> Result<f64> {
    let numerator = bignum::unpack(heap, numerator(heap, x)?)?;
    let denominator = bignum::unpack(heap, denominator(heap, x)?)?;

    let magnitude = quotient_magnitude(&numerator.digits, &denominator.digits);
    Ok(if numerator.negative != denominator.negative {
        -magnitude
    } else {
        magnitude
    })
}

const MANTISSA_BITS: i64 = f64::MANTISSA_DIGITS as i64;
const MIN_EXPONENT: i64 = f64::MIN_EXP as i64 - 1;
const MAX_EXPONENT: i64 = f64::MAX_EXP as i64 - 1;

/// Returns `2^exponent` for exponents between the smallest subnormal and the largest double
fn power_of_two(exponent: i64) -> f64 {
    if exponent >= MIN_EXPONENT {
        f64::from_bits(((exponent - MIN_EXPONENT + 1) as u64) << (MANTISSA_BITS - 1))
    } else {
        f64::from_bits(1 << (exponent - MIN_EXPONENT + MANTISSA_BITS - 1))
    }
}

fn quotient_magnitude(numerator: &[usize], denominator: &[usize]) -> f64 {
    let numerator_bits = digits::bit_length(numerator) as i64;
    let denominator_bits = digits::bit_length(denominator) as i64;

    if numerator_bits == 0 {
        return 0.0;
    }

    if numerator_bits <= MANTISSA_BITS && denominator_bits <= MANTISSA_BITS {
        // Both parts are exact so the division rounds once
        let exact = |part: &[usize]| SignedDigits::new(false, part.to_vec()).to_f64();
        return exact(numerator) / exact(denominator);
    }

    // Scale the numerator so the integer quotient keeps two bits past the mantissa
    let scale = MANTISSA_BITS + 2 - (numerator_bits - denominator_bits);
    let (quotient, remainder) = if scale >= 0 {
        digits::divrem(&digits::shl(numerator, scale as usize), denominator)
    } else {
        digits::divrem(numerator, &digits::shl(denominator, (-scale) as usize))
    };

    let quotient = digits::significant(&quotient)
        .iter()
        .enumerate()
        .fold(0u64, |acc, (index, digit)| {
            acc | ((*digit as u64) << (index as u32 * digits::DIGIT_BITS))
        });
    let inexact = !digits::significant(&remainder).is_empty();

    let quotient_bits = (u64::BITS - quotient.leading_zeros()) as i64;
    let exponent = quotient_bits - 1 - scale;

    if exponent > MAX_EXPONENT {
        return f64::INFINITY;
    }

    // Subnormals lose one bit of precision for each step below the minimum exponent
    let precision = if exponent >= MIN_EXPONENT {
        MANTISSA_BITS
    } else {
        MANTISSA_BITS - (MIN_EXPONENT - exponent)
    };

    if precision < 0 {
        return 0.0;
    }

    let dropped = (quotient_bits - precision) as u32;
    let kept = quotient >> dropped;
    let rest = quotient & ((1 << dropped) - 1);
    let half = 1 << (dropped - 1);

    let round_up = rest > half || (rest == half && (inexact || kept & 1 == 1));
    let mantissa = kept + round_up as u64;

    // The mantissa has at most 54 bits so this multiplication is exact or overflows
    (mantissa as f64) * power_of_two(dropped as i64 - scale)
}

/// Converts both parts of a complex number to flonums
pub fn cplxnum_to_inexact(heap: &mut impl AsHeap, x: Word) -> Result<Word> {
    let real = num::exact_to_inexact(heap, real_part(&*heap, x)?)?;
    let imaginary = num::exact_to_inexact(heap, imaginary_part(&*heap, x)?)?;

    pair(heap.as_heap_mut(), BlockKind::Cplxnum, real, imaginary)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::num::flonum;

    #[test]
    fn rationals() {
        let mut heap = Heap::with_capacity(256);

        let half = ratnum(&mut heap, Word::fix(1), Word::fix(2)).unwrap();
        assert_eq!(Word::TRUE, ratnump(&heap, half));
        assert_eq!(Word::fix(1), numerator(&heap, half).unwrap());
        assert_eq!(Word::fix(2), denominator(&heap, half).unwrap());
        assert_eq!(0.5, ratnum_to_f64(&heap, half).unwrap());

        assert_eq!(
            FaultCode::DivisionByZero,
            ratnum(&mut heap, Word::fix(1), Word::fix(0))
                .unwrap_err()
                .code()
        );
        assert_eq!(
            FaultCode::NoExactInteger,
            ratnum(&mut heap, Word::TRUE, Word::fix(2))
                .unwrap_err()
                .code()
        );

        // Reduction is not enforced
        let unreduced = ratnum(&mut heap, Word::fix(2), Word::fix(4)).unwrap();
        assert_eq!(Word::fix(4), denominator(&heap, unreduced).unwrap());
    }

    #[test]
    fn huge_rationals() {
        let mut heap = Heap::with_capacity(4096);

        let numerator = integer::arithmetic_shift(&mut heap, Word::fix(3), 2000).unwrap();
        let denominator = integer::arithmetic_shift(&mut heap, Word::fix(1), 2001).unwrap();
        let ratio = ratnum(&mut heap, numerator, denominator).unwrap();

        assert_eq!(1.5, ratnum_to_f64(&heap, ratio).unwrap());
    }

    fn shifted_ratio(heap: &mut Heap, numerator: (isize, isize), denominator: (isize, isize)) -> f64 {
        let numerator = integer::arithmetic_shift(heap, Word::fix(numerator.0), numerator.1).unwrap();
        let denominator =
            integer::arithmetic_shift(heap, Word::fix(denominator.0), denominator.1).unwrap();
        let ratio = ratnum(heap, numerator, denominator).unwrap();

        ratnum_to_f64(&*heap, ratio).unwrap()
    }

    #[test]
    fn rationals_with_unbalanced_parts() {
        let mut heap = Heap::with_capacity(4096);

        assert_eq!(1.0715086071862673e301, shifted_ratio(&mut heap, (1, 2000), (1, 1000)));
        assert_eq!(2f64.powi(-1000), shifted_ratio(&mut heap, (1, 1000), (1, 2000)));
        assert_eq!(-1.0 / 3.0, shifted_ratio(&mut heap, (-1, 200), (3, 200)));

        // Subnormal results round once to the nearest representable value
        assert_eq!(f64::from_bits(1), shifted_ratio(&mut heap, (1, 0), (1, 1074)));
        assert_eq!(f64::from_bits(2), shifted_ratio(&mut heap, (3, 0), (1, 1075)));
        assert_eq!(f64::from_bits(2), shifted_ratio(&mut heap, (5, 0), (1, 1075)));
        assert_eq!(0.0, shifted_ratio(&mut heap, (1, 0), (1, 1075)));
        assert_eq!(f64::from_bits(1), shifted_ratio(&mut heap, (3, 0), (1, 1076)));

        // Past the largest double
        assert_eq!(f64::INFINITY, shifted_ratio(&mut heap, (1, 2000), (3, 0)));
        assert_eq!(f64::NEG_INFINITY, shifted_ratio(&mut heap, (-1, 2000), (3, 0)));
    }

    #[test]
    fn complex_numbers() {
        let mut heap = Heap::with_capacity(256);

        let exact = cplxnum(&mut heap, Word::fix(1), Word::fix(-2)).unwrap();
        assert_eq!(Word::TRUE, cplxnump(&heap, exact));
        assert_eq!(Word::fix(1), real_part(&heap, exact).unwrap());
        assert_eq!(Word::fix(-2), imaginary_part(&heap, exact).unwrap());

        let inexact = cplxnum_to_inexact(&mut heap, exact).unwrap();
        assert_eq!(-2.0, flonum::value(&heap, imaginary_part(&heap, inexact).unwrap()));

        let one = flonum::flonum(&mut heap, 1.0).unwrap();
        assert_eq!(
            FaultCode::BadArgumentType,
            cplxnum(&mut heap, one, Word::fix(2)).unwrap_err().code()
        );
        assert_eq!(
            FaultCode::NoReal,
            cplxnum(&mut heap, exact, Word::fix(2)).unwrap_err().code()
        );
    }
}
