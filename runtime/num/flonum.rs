//! Boxed doubles
//!
//! Arithmetic follows IEEE semantics. Only the checked quotient and the integer division family
//! fault on their operands.

use std::convert::TryInto;

use crate::boxed::{AsHeap, BlockKind, Heap};
use crate::checked;
use crate::fault::{Fault, FaultCode, Result};
use crate::word::Word;

/// Boxes a double
pub fn flonum(heap: &mut impl AsHeap, value: f64) -> Result<Word> {
    let heap = heap.as_heap_mut();

    let block = heap.alloc(BlockKind::Flonum, 8)?;
    heap.bytes_mut(block).copy_from_slice(&value.to_ne_bytes());
    Ok(block)
}

/// Boxes a double in the permanent space
pub fn static_flonum(heap: &mut impl AsHeap, value: f64) -> Result<Word> {
    let heap = heap.as_heap_mut();

    let block = heap.alloc_permanent(BlockKind::Flonum, 8)?;
    heap.bytes_mut(block).copy_from_slice(&value.to_ne_bytes());
    Ok(block)
}

fn magnitude(heap: &Heap, x: Word) -> Result<f64> {
    match heap.bytes(x).get(..8).and_then(|bytes| bytes.try_into().ok()) {
        Some(bytes) => Ok(f64::from_ne_bytes(bytes)),
        None => Err(Fault::at(FaultCode::NoFlonum, "flonum").with_operand(x)),
    }
}

/// Returns the value of a flonum
///
/// The operand must be a flonum; this is only asserted by debug builds. A block too short to hold
/// a double raises a fault.
#[track_caller]
pub fn value(heap: &impl AsHeap, x: Word) -> f64 {
    let heap = heap.as_heap();
    let x = checked!(x, |x| heap.has_kind(*x, BlockKind::Flonum));

    magnitude(heap, x).unwrap_or_else(|fault| fault.raise())
}

/// Returns the value of a flonum or faults
pub fn to_f64(heap: &impl AsHeap, x: Word) -> Result<f64> {
    let heap = heap.as_heap();

    if heap.has_kind(x, BlockKind::Flonum) {
        magnitude(heap, x)
    } else {
        Err(Fault::at(FaultCode::NoFlonum, "flonum").with_operand(x))
    }
}

pub fn flonump(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(heap.as_heap().has_kind(x, BlockKind::Flonum))
}

/// Returns if two doubles are the same number
///
/// Zeros of different sign are distinct and NaN is never the same as itself.
pub fn eqv(x: f64, y: f64) -> bool {
    x == y && x.is_sign_negative() == y.is_sign_negative()
}

/// Compares two flonums for `eqv?`
pub fn eqvp(heap: &impl AsHeap, x: Word, y: Word) -> Word {
    Word::make_bool(eqv(value(heap, x), value(heap, y)))
}

fn binary(heap: &mut impl AsHeap, x: Word, y: Word, op: fn(f64, f64) -> f64) -> Result<Word> {
    let result = op(value(&*heap, x), value(&*heap, y));
    flonum(heap, result)
}

pub fn plus(heap: &mut impl AsHeap, x: Word, y: Word) -> Result<Word> {
    binary(heap, x, y, |x, y| x + y)
}

pub fn difference(heap: &mut impl AsHeap, x: Word, y: Word) -> Result<Word> {
    binary(heap, x, y, |x, y| x - y)
}

pub fn times(heap: &mut impl AsHeap, x: Word, y: Word) -> Result<Word> {
    binary(heap, x, y, |x, y| x * y)
}

/// Divides producing infinities or NaN for a zero divisor
pub fn quotient(heap: &mut impl AsHeap, x: Word, y: Word) -> Result<Word> {
    binary(heap, x, y, |x, y| x / y)
}

/// Divides faulting on a zero divisor
pub fn quotient_checked(heap: &mut impl AsHeap, x: Word, y: Word) -> Result<Word> {
    let result = checked_div(value(&*heap, x), value(&*heap, y))?;
    flonum(heap, result)
}

pub fn checked_div(x: f64, y: f64) -> Result<f64> {
    if y == 0.0 {
        return Err(Fault::at(FaultCode::DivisionByZero, "fp/?"));
    }

    Ok(x / y)
}

/// Computes `x * y + z` with a single rounding
pub fn multiply_add(heap: &mut impl AsHeap, x: Word, y: Word, z: Word) -> Result<Word> {
    let result = value(&*heap, x).mul_add(value(&*heap, y), value(&*heap, z));
    flonum(heap, result)
}

pub fn negate(heap: &mut impl AsHeap, x: Word) -> Result<Word> {
    let result = -value(&*heap, x);
    flonum(heap, result)
}

/// Returns -1.0, 0.0 or 1.0
///
/// Zeros and NaN are returned unchanged.
pub fn signum(heap: &mut impl AsHeap, x: Word) -> Result<Word> {
    let x_value = value(&*heap, x);

    if x_value > 0.0 {
        flonum(heap, 1.0)
    } else if x_value < 0.0 {
        flonum(heap, -1.0)
    } else {
        Ok(x)
    }
}

/// Returns the smaller operand preferring `y` when they are unordered
pub fn min(heap: &impl AsHeap, x: Word, y: Word) -> Word {
    if value(heap, x) < value(heap, y) {
        x
    } else {
        y
    }
}

/// Returns the larger operand preferring `y` when they are unordered
pub fn max(heap: &impl AsHeap, x: Word, y: Word) -> Word {
    if value(heap, x) > value(heap, y) {
        x
    } else {
        y
    }
}

pub fn is_integral(x: f64) -> bool {
    x.is_finite() && x.trunc() == x
}

pub fn integerp(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(is_integral(value(heap, x)))
}

pub fn nanp(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(value(heap, x).is_nan())
}

pub fn infinitep(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(value(heap, x).is_infinite())
}

pub fn finitep(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(value(heap, x).is_finite())
}

fn integer_operands(x: f64, y: f64, site: &'static str) -> Result<()> {
    if !is_integral(x) {
        return Err(Fault::at(FaultCode::NoInteger, site));
    }
    if !is_integral(y) {
        return Err(Fault::at(FaultCode::NoInteger, site));
    }
    if y == 0.0 {
        return Err(Fault::at(FaultCode::DivisionByZero, site));
    }

    Ok(())
}

/// Divides integral doubles truncating towards zero
pub fn truncate_quotient(x: f64, y: f64) -> Result<f64> {
    integer_operands(x, y, "quotient")?;
    Ok((x / y).trunc())
}

/// Returns the remainder of integral doubles with the sign of `x`
pub fn remainder(x: f64, y: f64) -> Result<f64> {
    integer_operands(x, y, "remainder")?;
    Ok(x % y)
}

/// Returns the remainder of integral doubles with the sign of `y`
pub fn modulo(x: f64, y: f64) -> Result<f64> {
    integer_operands(x, y, "modulo")?;

    let r = x % y;
    if r != 0.0 && (r < 0.0) != (y < 0.0) {
        Ok(r + y)
    } else {
        Ok(r)
    }
}
