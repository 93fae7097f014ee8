//! Numeric tower
//!
//! Exact integers are fixnums or bignums. Rationals and complex numbers are built from them by
//! [`compound`], and doubles are boxed by [`flonum`]. The predicates here dispatch on the
//! representation and return encoded booleans.

pub mod bignum;
pub mod compound;
pub mod fixnum;
pub mod flonum;
pub mod integer;

use std::cmp::Ordering;

use crate::boxed::{AsHeap, BlockKind, Heap};
use crate::fault::{Fault, FaultCode, Result};
use crate::num::bignum::SignedDigits;
use crate::word::Word;

/// Representation of a number
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NumKind {
    Fixnum,
    Bignum,
    Flonum,
    Ratnum,
    Cplxnum,
}

/// Returns the representation of `x` or `None` if it is not a number
pub fn classify(heap: &impl AsHeap, x: Word) -> Option<NumKind> {
    if x.is_fixnum() {
        return Some(NumKind::Fixnum);
    }

    match heap.as_heap().kind(x)? {
        BlockKind::Bignum => Some(NumKind::Bignum),
        BlockKind::Flonum => Some(NumKind::Flonum),
        BlockKind::Ratnum => Some(NumKind::Ratnum),
        BlockKind::Cplxnum => Some(NumKind::Cplxnum),
        _ => None,
    }
}

fn expect_number(heap: &impl AsHeap, x: Word, site: &'static str) -> Result<NumKind> {
    classify(heap, x).ok_or_else(|| Fault::at(FaultCode::NoNumber, site).with_operand(x))
}

pub fn numberp(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(classify(heap, x).is_some())
}

pub fn realp(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(match classify(heap, x) {
        Some(NumKind::Cplxnum) | None => false,
        Some(_) => true,
    })
}

/// Returns `#t` for exact rationals and finite flonums
pub fn rationalp(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(match classify(heap, x) {
        Some(NumKind::Fixnum) | Some(NumKind::Bignum) | Some(NumKind::Ratnum) => true,
        Some(NumKind::Flonum) => flonum::value(heap, x).is_finite(),
        _ => false,
    })
}

/// Returns `#t` for exact integers and integral flonums
pub fn integerp(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(match classify(heap, x) {
        Some(NumKind::Fixnum) | Some(NumKind::Bignum) => true,
        Some(NumKind::Flonum) => flonum::is_integral(flonum::value(heap, x)),
        _ => false,
    })
}

pub fn exact_integerp(heap: &impl AsHeap, x: Word) -> Word {
    integer::exact_integerp(heap, x)
}

fn is_exact(heap: &Heap, x: Word, kind: NumKind) -> bool {
    match kind {
        NumKind::Fixnum | NumKind::Bignum | NumKind::Ratnum => true,
        NumKind::Flonum => false,
        // Both parts share the same exactness
        NumKind::Cplxnum => !heap.has_kind(heap.slot(x, 0), BlockKind::Flonum),
    }
}

pub fn exactp(heap: &impl AsHeap, x: Word) -> Result<Word> {
    let kind = expect_number(heap, x, "exact?")?;
    Ok(Word::make_bool(is_exact(heap.as_heap(), x, kind)))
}

pub fn inexactp(heap: &impl AsHeap, x: Word) -> Result<Word> {
    let kind = expect_number(heap, x, "inexact?")?;
    Ok(Word::make_bool(!is_exact(heap.as_heap(), x, kind)))
}

pub use self::bignum::bignump;
pub use self::compound::{cplxnump, ratnump};
pub use self::flonum::flonump;

/// Returns `#t` for exact and inexact zeros
pub fn zerop(heap: &impl AsHeap, x: Word) -> Result<Word> {
    Ok(Word::make_bool(match expect_number(heap, x, "zero?")? {
        NumKind::Fixnum => integer::zerop(x),
        NumKind::Flonum => flonum::value(heap, x) == 0.0,
        // Normalised bignums and ratnums are never zero
        NumKind::Bignum | NumKind::Ratnum => false,
        NumKind::Cplxnum => {
            zerop(heap, compound::real_part(heap, x)?)?.is_true()
                && zerop(heap, compound::imaginary_part(heap, x)?)?.is_true()
        }
    }))
}

fn float_predicate(
    heap: &impl AsHeap,
    x: Word,
    site: &'static str,
    test: fn(f64) -> bool,
) -> Result<Word> {
    Ok(Word::make_bool(match expect_number(heap, x, site)? {
        NumKind::Flonum => test(flonum::value(heap, x)),
        NumKind::Cplxnum => {
            float_predicate(heap, compound::real_part(heap, x)?, site, test)?.is_true()
                || float_predicate(heap, compound::imaginary_part(heap, x)?, site, test)?.is_true()
        }
        // Exact numbers are finite
        _ => test(0.0),
    }))
}

pub fn nanp(heap: &impl AsHeap, x: Word) -> Result<Word> {
    float_predicate(heap, x, "nan?", f64::is_nan)
}

pub fn infinitep(heap: &impl AsHeap, x: Word) -> Result<Word> {
    float_predicate(heap, x, "infinite?", f64::is_infinite)
}

/// Returns `#t` unless the number has an infinite or NaN component
pub fn finitep(heap: &impl AsHeap, x: Word) -> Result<Word> {
    let infinite = float_predicate(heap, x, "finite?", |f| !f.is_finite())?;
    Ok(Word::make_bool(!infinite.is_true()))
}

/// Returns if two numbers are operationally equivalent
///
/// Numbers of different representations are never equivalent. Rationals and complex numbers are
/// compared part by part.
pub fn eqv(heap: &impl AsHeap, x: Word, y: Word) -> bool {
    if x == y {
        return match classify(heap, x) {
            Some(NumKind::Flonum) => !flonum::value(heap, x).is_nan(),
            _ => true,
        };
    }

    let kind = match (classify(heap, x), classify(heap, y)) {
        (Some(x_kind), Some(y_kind)) if x_kind == y_kind => x_kind,
        _ => return false,
    };

    let heap = heap.as_heap();
    match kind {
        NumKind::Fixnum => false,
        NumKind::Flonum => flonum::eqv(flonum::value(heap, x), flonum::value(heap, y)),
        NumKind::Bignum => match (bignum::unpack(heap, x), bignum::unpack(heap, y)) {
            (Ok(x), Ok(y)) => x == y,
            _ => false,
        },
        NumKind::Ratnum | NumKind::Cplxnum => {
            eqv(heap, heap.slot(x, 0), heap.slot(y, 0))
                && eqv(heap, heap.slot(x, 1), heap.slot(y, 1))
        }
    }
}

pub fn eqvp(heap: &impl AsHeap, x: Word, y: Word) -> Word {
    Word::make_bool(eqv(heap, x, y))
}

/// An exact rational held outside the heap
struct Rational {
    numerator: SignedDigits,
    denominator: SignedDigits,
}

enum Real {
    Exact(Rational),
    Inexact(f64),
}

fn real(heap: &impl AsHeap, x: Word, site: &'static str) -> Result<Real> {
    Ok(match expect_number(heap, x, site)? {
        NumKind::Fixnum | NumKind::Bignum => Real::Exact(Rational {
            numerator: bignum::unpack(heap, x)?,
            denominator: SignedDigits::from_isize(1),
        }),
        NumKind::Ratnum => Real::Exact(Rational {
            numerator: bignum::unpack(heap, compound::numerator(heap, x)?)?,
            denominator: bignum::unpack(heap, compound::denominator(heap, x)?)?,
        }),
        NumKind::Flonum => Real::Inexact(flonum::value(heap, x)),
        NumKind::Cplxnum => {
            return Err(Fault::at(FaultCode::ComplexNoOrdering, site).with_operand(x));
        }
    })
}

fn compare_exact(heap: &Heap, x: &Rational, y: &Rational) -> Ordering {
    let threshold = heap.thresholds().karatsuba;

    // Denominators are positive so cross multiplication preserves the order
    x.numerator
        .mul(&y.denominator, threshold)
        .cmp(&y.numerator.mul(&x.denominator, threshold))
}

fn exact_from_f64(value: f64) -> Option<Rational> {
    if !value.is_finite() {
        return None;
    }

    let bits = value.to_bits();
    let exponent = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1 << 52) - 1);

    let (mantissa, exponent) = if exponent == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1 << 52), exponent - 1075)
    };

    let magnitude = SignedDigits::from_i128(i128::from(mantissa)).digits;
    let negative = value < 0.0;

    Some(if exponent >= 0 {
        Rational {
            numerator: SignedDigits::new(
                negative,
                bignum::digits::shl(&magnitude, exponent as usize),
            ),
            denominator: SignedDigits::from_isize(1),
        }
    } else {
        Rational {
            numerator: SignedDigits::new(negative, magnitude),
            denominator: SignedDigits::new(false, bignum::digits::shl(&[1], (-exponent) as usize)),
        }
    })
}

/// Compares two real numbers
///
/// Exact and inexact operands are compared exactly. Comparisons involving NaN are unordered and
/// return `None`.
pub fn compare(heap: &impl AsHeap, x: Word, y: Word) -> Result<Option<Ordering>> {
    let site = "compare";
    let x_real = real(heap, x, site)?;
    let y_real = real(heap, y, site)?;
    let heap = heap.as_heap();

    Ok(match (x_real, y_real) {
        (Real::Inexact(x), Real::Inexact(y)) => x.partial_cmp(&y),
        (Real::Exact(x), Real::Exact(y)) => Some(compare_exact(heap, &x, &y)),
        (Real::Exact(x), Real::Inexact(y)) => match exact_from_f64(y) {
            Some(y) => Some(compare_exact(heap, &x, &y)),
            None if y.is_nan() => None,
            None if y > 0.0 => Some(Ordering::Less),
            None => Some(Ordering::Greater),
        },
        (Real::Inexact(x), Real::Exact(y)) => match exact_from_f64(x) {
            Some(x) => Some(compare_exact(heap, &x, &y)),
            None if x.is_nan() => None,
            None if x > 0.0 => Some(Ordering::Greater),
            None => Some(Ordering::Less),
        },
    })
}

/// Returns the nearest double to a real number
pub fn to_f64(heap: &impl AsHeap, x: Word) -> Result<f64> {
    match expect_number(heap, x, "exact->inexact")? {
        NumKind::Fixnum | NumKind::Bignum => integer::to_f64(heap, x),
        NumKind::Flonum => Ok(flonum::value(heap, x)),
        NumKind::Ratnum => compound::ratnum_to_f64(heap, x),
        NumKind::Cplxnum => Err(Fault::at(FaultCode::NoReal, "exact->inexact").with_operand(x)),
    }
}

/// Converts a number to its inexact counterpart
///
/// Inexact numbers are returned unchanged.
pub fn exact_to_inexact(heap: &mut impl AsHeap, x: Word) -> Result<Word> {
    match expect_number(&*heap, x, "exact->inexact")? {
        NumKind::Flonum => Ok(x),
        NumKind::Cplxnum if !is_exact(heap.as_heap(), x, NumKind::Cplxnum) => Ok(x),
        NumKind::Cplxnum => compound::cplxnum_to_inexact(heap, x),
        _ => {
            let value = to_f64(&*heap, x)?;
            flonum::flonum(heap, value)
        }
    }
}

/// Returns the double value of a real number for a foreign call
pub fn c_double(heap: &impl AsHeap, x: Word) -> Result<f64> {
    to_f64(heap, x)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::word::MOST_POSITIVE_FIXNUM;

    struct Numbers {
        fixnum: Word,
        bignum: Word,
        flonum: Word,
        ratnum: Word,
        cplxnum: Word,
    }

    fn numbers(heap: &mut Heap) -> Numbers {
        let bignum = integer::plus(heap, Word::fix(MOST_POSITIVE_FIXNUM), Word::fix(1)).unwrap();
        let flonum = flonum::flonum(heap, 2.5).unwrap();
        let ratnum = compound::ratnum(heap, Word::fix(5), Word::fix(2)).unwrap();
        let cplxnum = compound::cplxnum(heap, Word::fix(1), Word::fix(2)).unwrap();

        Numbers {
            fixnum: Word::fix(3),
            bignum,
            flonum,
            ratnum,
            cplxnum,
        }
    }

    #[test]
    fn classification() {
        let mut heap = Heap::with_capacity(1024);
        let n = numbers(&mut heap);

        assert_eq!(Some(NumKind::Fixnum), classify(&heap, n.fixnum));
        assert_eq!(Some(NumKind::Bignum), classify(&heap, n.bignum));
        assert_eq!(Some(NumKind::Flonum), classify(&heap, n.flonum));
        assert_eq!(Some(NumKind::Ratnum), classify(&heap, n.ratnum));
        assert_eq!(Some(NumKind::Cplxnum), classify(&heap, n.cplxnum));
        assert_eq!(None, classify(&heap, Word::TRUE));

        assert_eq!(Word::FALSE, realp(&heap, n.cplxnum));
        assert_eq!(Word::TRUE, rationalp(&heap, n.ratnum));
        assert_eq!(Word::FALSE, integerp(&heap, n.ratnum));
        assert_eq!(Word::FALSE, integerp(&heap, n.flonum));
        assert_eq!(Word::TRUE, exact_integerp(&heap, n.bignum));

        assert_eq!(Word::TRUE, exactp(&heap, n.cplxnum).unwrap());
        assert_eq!(Word::TRUE, inexactp(&heap, n.flonum).unwrap());
        assert_eq!(
            FaultCode::NoNumber,
            exactp(&heap, Word::TRUE).unwrap_err().code()
        );
    }

    #[test]
    fn float_predicates() {
        let mut heap = Heap::with_capacity(1024);

        let nan = flonum::flonum(&mut heap, f64::NAN).unwrap();
        let inf = flonum::flonum(&mut heap, f64::NEG_INFINITY).unwrap();
        let zero = flonum::flonum(&mut heap, -0.0).unwrap();

        assert_eq!(Word::TRUE, nanp(&heap, nan).unwrap());
        assert_eq!(Word::TRUE, infinitep(&heap, inf).unwrap());
        assert_eq!(Word::FALSE, finitep(&heap, nan).unwrap());
        assert_eq!(Word::TRUE, finitep(&heap, Word::fix(1)).unwrap());
        assert_eq!(Word::TRUE, zerop(&heap, zero).unwrap());
        assert_eq!(Word::FALSE, rationalp(&heap, inf));

        let complex = compound::cplxnum(&mut heap, zero, inf).unwrap();
        assert_eq!(Word::TRUE, infinitep(&heap, complex).unwrap());
        assert_eq!(Word::FALSE, zerop(&heap, complex).unwrap());
    }

    #[test]
    fn equivalence() {
        let mut heap = Heap::with_capacity(1024);

        let positive_zero = flonum::flonum(&mut heap, 0.0).unwrap();
        let negative_zero = flonum::flonum(&mut heap, -0.0).unwrap();
        let other_zero = flonum::flonum(&mut heap, 0.0).unwrap();
        let nan = flonum::flonum(&mut heap, f64::NAN).unwrap();

        assert_eq!(Word::FALSE, eqvp(&heap, positive_zero, negative_zero));
        assert_eq!(Word::TRUE, eqvp(&heap, positive_zero, other_zero));
        assert_eq!(Word::FALSE, eqvp(&heap, nan, nan));
        assert_eq!(Word::FALSE, eqvp(&heap, Word::fix(0), positive_zero));

        let a = integer::arithmetic_shift(&mut heap, Word::fix(1), 100).unwrap();
        let b = integer::arithmetic_shift(&mut heap, Word::fix(1), 100).unwrap();
        assert_eq!(Word::TRUE, eqvp(&heap, a, b));

        let half = compound::ratnum(&mut heap, Word::fix(1), Word::fix(2)).unwrap();
        let other_half = compound::ratnum(&mut heap, Word::fix(1), Word::fix(2)).unwrap();
        assert_eq!(Word::TRUE, eqvp(&heap, half, other_half));

        let c1 = compound::cplxnum(&mut heap, positive_zero, nan).unwrap();
        let c2 = compound::cplxnum(&mut heap, positive_zero, nan).unwrap();
        assert_eq!(Word::FALSE, eqvp(&heap, c1, c2));
    }

    #[test]
    fn comparison() {
        let mut heap = Heap::with_capacity(1024);
        let n = numbers(&mut heap);

        assert_eq!(
            Some(Ordering::Greater),
            compare(&heap, n.ratnum, Word::fix(2)).unwrap()
        );
        assert_eq!(
            Some(Ordering::Equal),
            compare(&heap, n.ratnum, n.flonum).unwrap()
        );
        assert_eq!(
            Some(Ordering::Less),
            compare(&heap, n.flonum, n.bignum).unwrap()
        );

        // 2^62 + 1 is not representable as a double but still compares exactly
        let above = integer::plus(&mut heap, n.bignum, Word::fix(1)).unwrap();
        let bignum_f64 = integer::to_f64(&heap, n.bignum).unwrap();
        let rounded = flonum::flonum(&mut heap, bignum_f64).unwrap();
        assert_eq!(Some(Ordering::Greater), compare(&heap, above, rounded).unwrap());

        let nan = flonum::flonum(&mut heap, f64::NAN).unwrap();
        assert_eq!(None, compare(&heap, nan, Word::fix(1)).unwrap());

        let inf = flonum::flonum(&mut heap, f64::INFINITY).unwrap();
        assert_eq!(Some(Ordering::Less), compare(&heap, n.bignum, inf).unwrap());

        assert_eq!(
            FaultCode::ComplexNoOrdering,
            compare(&heap, n.cplxnum, Word::fix(1)).unwrap_err().code()
        );
        assert_eq!(
            FaultCode::NoNumber,
            compare(&heap, Word::TRUE, Word::fix(1)).unwrap_err().code()
        );
    }

    #[test]
    fn inexact_conversion() {
        let mut heap = Heap::with_capacity(1024);
        let n = numbers(&mut heap);

        let ratio = exact_to_inexact(&mut heap, n.ratnum).unwrap();
        assert_eq!(2.5, flonum::value(&heap, ratio));
        assert_eq!(n.flonum, exact_to_inexact(&mut heap, n.flonum).unwrap());

        let complex = exact_to_inexact(&mut heap, n.cplxnum).unwrap();
        assert_eq!(Word::TRUE, inexactp(&heap, complex).unwrap());
        assert_eq!(complex, exact_to_inexact(&mut heap, complex).unwrap());

        assert_eq!(3.0, c_double(&heap, n.fixnum).unwrap());
        assert_eq!(
            FaultCode::NoReal,
            c_double(&heap, n.cplxnum).unwrap_err().code()
        );
    }
}
