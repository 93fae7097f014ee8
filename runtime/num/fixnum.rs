//! Fixnum arithmetic
//!
//! The `u_` operations and the bitwise operations work directly on tagged words and wrap on
//! overflow. Callers use them where the compiler has already proven the result is in range.
//!
//! The remaining operations promote to a bignum whenever the exact result leaves the fixnum range.
//! Operands must be fixnums; this is only asserted by debug builds.

use std::cmp;
use std::convert::TryFrom;

use crate::boxed::AsHeap;
use crate::checked;
use crate::fault::{Fault, FaultCode, Result};
use crate::num::bignum::{self, digits};
use crate::word::{
    fits_in_fixnum, ufits_in_fixnum, Word, FIXNUM_BIT, FIXNUM_SHIFT, INT_SIGN_BIT,
    MOST_NEGATIVE_FIXNUM,
};

const WORD_BITS: u32 = usize::BITS;

fn raw(x: Word) -> usize {
    checked!(x, |x| x.is_fixnum()).to_raw()
}

/// Encodes the low bits of `n` as a fixnum discarding the bit shifted out
fn wrap(n: isize) -> Word {
    Word::from_raw(((n as usize) << FIXNUM_SHIFT) | FIXNUM_BIT)
}

fn is_negative(x: Word) -> bool {
    raw(x) & INT_SIGN_BIT != 0
}

pub fn u_plus(x: Word, y: Word) -> Word {
    Word::from_raw((raw(x) - FIXNUM_BIT).wrapping_add(raw(y)))
}

pub fn u_difference(x: Word, y: Word) -> Word {
    Word::from_raw(raw(x).wrapping_sub(raw(y)).wrapping_add(FIXNUM_BIT))
}

pub fn u_negate(x: Word) -> Word {
    Word::from_raw(raw(x).wrapping_neg().wrapping_add(2 * FIXNUM_BIT))
}

pub fn increase(x: Word) -> Word {
    Word::from_raw(raw(x).wrapping_add(1 << FIXNUM_SHIFT))
}

pub fn decrease(x: Word) -> Word {
    Word::from_raw(raw(x).wrapping_sub(1 << FIXNUM_SHIFT))
}

pub fn and(x: Word, y: Word) -> Word {
    Word::from_raw(raw(x) & raw(y))
}

pub fn or(x: Word, y: Word) -> Word {
    Word::from_raw(raw(x) | raw(y))
}

pub fn xor(x: Word, y: Word) -> Word {
    Word::from_raw((raw(x) ^ raw(y)) | FIXNUM_BIT)
}

pub fn not(x: Word) -> Word {
    Word::from_raw(!raw(x) | FIXNUM_BIT)
}

/// Shifts left discarding bits shifted past the fixnum range
pub fn shift_left(x: Word, count: u32) -> Word {
    if count >= WORD_BITS {
        return Word::fix(0);
    }

    wrap(((x.unfix() as usize) << count) as isize)
}

/// Shifts right propagating the sign
pub fn shift_right(x: Word, count: u32) -> Word {
    let count = cmp::min(count, WORD_BITS - 1);
    Word::from_raw(((raw(x) as isize) >> count) as usize | FIXNUM_BIT)
}

/// Shifts left for positive counts and right for negative counts
///
/// Left shifts wrap like [`shift_left`]. Use [`integer::arithmetic_shift`] for an exact result.
///
/// [`integer::arithmetic_shift`]: crate::num::integer::arithmetic_shift
pub fn arithmetic_shift(x: Word, count: Word) -> Word {
    let count = count.unfix();
    let magnitude = u32::try_from(count.unsigned_abs()).unwrap_or(u32::MAX);

    if count < 0 {
        shift_right(x, magnitude)
    } else {
        shift_left(x, magnitude)
    }
}

fn promote(heap: &mut impl AsHeap, z: isize) -> Result<Word> {
    if fits_in_fixnum(z) {
        Ok(Word::fix(z))
    } else {
        bignum::one_digit(heap, z < 0, z.unsigned_abs())
    }
}

pub fn plus(heap: &mut impl AsHeap, x: Word, y: Word) -> Result<Word> {
    promote(heap, x.unfix() + y.unfix())
}

pub fn difference(heap: &mut impl AsHeap, x: Word, y: Word) -> Result<Word> {
    promote(heap, x.unfix() - y.unfix())
}

/// Negates a fixnum
///
/// Only the most negative fixnum has a negation outside the fixnum range.
pub fn negate(heap: &mut impl AsHeap, x: Word) -> Result<Word> {
    promote(heap, -x.unfix())
}

pub fn abs(heap: &mut impl AsHeap, x: Word) -> Result<Word> {
    if is_negative(x) {
        negate(heap, x)
    } else {
        Ok(x)
    }
}

/// Multiplies two fixnums
///
/// The magnitudes are multiplied as two half digit numbers. The result is a fixnum when it fits
/// and otherwise a bignum with only as many digits as the product needs.
pub fn times(heap: &mut impl AsHeap, x: Word, y: Word) -> Result<Word> {
    let negative = is_negative(x) != is_negative(y);
    let x = x.unfix().unsigned_abs();
    let y = y.unfix().unsigned_abs();

    let (xhi, xlo) = (digits::hi(x), digits::lo(x));
    let (yhi, ylo) = (digits::hi(y), digits::lo(y));

    let mut p = xlo * ylo;
    let mut rlo = digits::lo(p);

    p = xhi * ylo + digits::hi(p);
    let mut rhi = digits::hi(p);

    p = xlo * yhi + digits::lo(p);
    rlo = digits::combine(rlo, digits::lo(p));

    rhi += xhi * yhi + digits::hi(p);

    if rhi != 0 {
        bignum::two_digits(heap, negative, rlo, rhi)
    } else if negative {
        if rlo & INT_SIGN_BIT != 0 || !fits_in_fixnum((rlo as isize).wrapping_neg()) {
            bignum::one_digit(heap, true, rlo)
        } else {
            Ok(Word::fix((rlo as isize).wrapping_neg()))
        }
    } else if !ufits_in_fixnum(rlo) {
        bignum::one_digit(heap, false, rlo)
    } else {
        Ok(Word::fix(rlo as isize))
    }
}

fn check_divisor(y: Word, site: &'static str) -> Result<isize> {
    match y.unfix() {
        0 => Err(Fault::at(FaultCode::DivisionByZero, site).with_operand(y)),
        y => Ok(y),
    }
}

/// Divides truncating towards zero
///
/// The most negative fixnum divided by -1 is the one quotient that needs a bignum.
pub fn quotient(heap: &mut impl AsHeap, x: Word, y: Word) -> Result<Word> {
    let divisor = check_divisor(y, "fx/")?;
    let dividend = x.unfix();

    if dividend == MOST_NEGATIVE_FIXNUM && divisor == -1 {
        return bignum::one_digit(heap, false, MOST_NEGATIVE_FIXNUM.unsigned_abs());
    }

    Ok(Word::fix(dividend / divisor))
}

/// Returns the remainder with the sign of the dividend
pub fn remainder(x: Word, y: Word) -> Result<Word> {
    let divisor = check_divisor(y, "fxrem")?;
    let dividend = x.unfix();

    Ok(Word::fix(dividend - (dividend / divisor) * divisor))
}

/// Returns the remainder with the sign of the divisor
pub fn modulo(x: Word, y: Word) -> Result<Word> {
    let divisor = check_divisor(y, "fxmod")?;

    let mut result = x.unfix() % divisor;
    if (divisor < 0 && result > 0) || (divisor > 0 && result < 0) {
        result += divisor;
    }

    Ok(Word::fix(result))
}

/// Returns the non-negative greatest common divisor
///
/// The result only leaves the fixnum range for the most negative fixnum and zero.
pub fn gcd(heap: &mut impl AsHeap, x: Word, y: Word) -> Result<Word> {
    let mut a = x.unfix().unsigned_abs();
    let mut b = y.unfix().unsigned_abs();

    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }

    if ufits_in_fixnum(a) {
        Ok(Word::fix(a as isize))
    } else {
        bignum::one_digit(heap, false, a)
    }
}

pub fn min(x: Word, y: Word) -> Word {
    if (raw(x) as isize) < (raw(y) as isize) {
        x
    } else {
        y
    }
}

pub fn max(x: Word, y: Word) -> Word {
    if (raw(x) as isize) > (raw(y) as isize) {
        x
    } else {
        y
    }
}

pub fn signum(x: Word) -> Word {
    if x == Word::fix(0) {
        x
    } else if is_negative(x) {
        Word::fix(-1)
    } else {
        Word::fix(1)
    }
}

/// Returns the number of bits needed to represent the value excluding the sign
pub fn length(x: Word) -> Word {
    let n = x.unfix();
    let magnitude = if n < 0 { !n } else { n };

    Word::fix((WORD_BITS - (magnitude as usize).leading_zeros()) as isize)
}

/// Tests a bit of the two's complement representation
///
/// Indexes past the word test the sign.
pub fn bit_to_bool(x: Word, index: Word) -> Result<Word> {
    if is_negative(index) {
        return Err(Fault::at(FaultCode::NoUinteger, "bit->boolean").with_operand(index));
    }

    let index = index.unfix() as usize;
    Ok(Word::make_bool(if index >= WORD_BITS as usize {
        is_negative(x)
    } else {
        (x.unfix() as usize) & (1 << index as u32) != 0
    }))
}

pub fn evenp(x: Word) -> Word {
    Word::make_bool(raw(x) & 2 == 0)
}

pub fn oddp(x: Word) -> Word {
    Word::make_bool(raw(x) & 2 != 0)
}

pub fn negativep(x: Word) -> Word {
    Word::make_bool(is_negative(x))
}

pub fn positivep(x: Word) -> Word {
    Word::make_bool(!is_negative(x) && x != Word::fix(0))
}

pub fn greaterp(x: Word, y: Word) -> Word {
    Word::make_bool(raw(x) as isize > raw(y) as isize)
}

pub fn lessp(x: Word, y: Word) -> Word {
    Word::make_bool((raw(x) as isize) < raw(y) as isize)
}

pub fn greater_or_equalp(x: Word, y: Word) -> Word {
    Word::make_bool(raw(x) as isize >= raw(y) as isize)
}

pub fn less_or_equalp(x: Word, y: Word) -> Word {
    Word::make_bool(raw(x) as isize <= raw(y) as isize)
}
