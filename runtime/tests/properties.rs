mod common;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use proptest::prelude::*;

use runtime::boxed::BlockKind;
use runtime::layout::{WordLayout, LAYOUT_32, LAYOUT_64};
use runtime::num::{bignum, compound, fixnum, integer};
use runtime::word::{Word, WordClass};

use common::{bigint_value, fixnum_value, from_bigint, heap, is_normalised, to_bigint};

fn block_kind() -> impl Strategy<Value = BlockKind> {
    prop::sample::select(BlockKind::ALL.to_vec())
}

fn header_round_trip(layout: WordLayout, kind: BlockKind, size: u64) {
    let size = size % (layout.max_block_size() + 1);
    let header = layout.make_header(kind, size);

    assert_eq!(Some(kind), layout.header_kind(header));
    assert_eq!(size, layout.header_size(header));
    assert_eq!(kind.type_byte(), layout.header_type_byte(header));
}

/// Rounds a quotient once by dividing to 62 or 63 bits and converting those
fn reference_quotient(numerator: &BigInt, denominator: &BigInt) -> f64 {
    let (numerator_bits, denominator_bits) = (numerator.bits() as i32, denominator.bits() as i32);
    let scale = 62 + denominator_bits - numerator_bits;

    let (dividend, divisor) = if scale >= 0 {
        (numerator.abs() << scale as usize, denominator.abs())
    } else {
        (numerator.abs(), denominator.abs() << (-scale) as usize)
    };

    let quotient = &dividend / &divisor;
    let sticky = !(&dividend % &divisor).is_zero();
    let quotient = quotient.to_u64().unwrap() | sticky as u64;

    let magnitude = BigInt::from(quotient).to_f64().unwrap() * 2f64.powi(-scale);
    if numerator.is_negative() != denominator.is_negative() {
        -magnitude
    } else {
        magnitude
    }
}

fn floor_modulo(x: &BigInt, y: &BigInt) -> BigInt {
    let remainder = x % y;

    if !remainder.is_zero() && remainder.is_negative() != y.is_negative() {
        remainder + y
    } else {
        remainder
    }
}

proptest! {
    #[test]
    fn words_have_one_class(raw in any::<usize>()) {
        let word = Word::from_raw(raw);
        let class = word.classify();

        prop_assert_eq!(class == WordClass::Fixnum, word.is_fixnum());
        prop_assert_eq!(class == WordClass::Pointer, word.is_pointer());
        prop_assert_eq!(class == WordClass::Boolean, !word.is_fixnum() && word.is_bool());
        prop_assert_eq!(class == WordClass::Character, !word.is_fixnum() && word.is_char());
        prop_assert_eq!(word.is_pointer(), !word.is_immediate());
    }

    #[test]
    fn fixnums_round_trip(n in fixnum_value()) {
        prop_assert_eq!(n, Word::fix(n).unfix());
        prop_assert_eq!(WordClass::Fixnum, Word::fix(n).classify());
    }

    #[test]
    fn headers_round_trip_32(kind in block_kind(), size in any::<u64>()) {
        header_round_trip(LAYOUT_32, kind, size);
    }

    #[test]
    fn headers_round_trip_64(kind in block_kind(), size in any::<u64>()) {
        header_round_trip(LAYOUT_64, kind, size);
    }

    #[test]
    fn fixnum_arithmetic_is_exact(x in fixnum_value(), y in fixnum_value()) {
        let mut heap = heap();
        let (wx, wy) = (Word::fix(x), Word::fix(y));
        let (bx, by) = (BigInt::from(x), BigInt::from(y));

        let sum = fixnum::plus(&mut heap, wx, wy).unwrap();
        prop_assert_eq!(&bx + &by, to_bigint(&heap, sum));
        prop_assert!(is_normalised(&heap, sum));

        let difference = fixnum::difference(&mut heap, wx, wy).unwrap();
        prop_assert_eq!(&bx - &by, to_bigint(&heap, difference));
        prop_assert!(is_normalised(&heap, difference));

        let product = fixnum::times(&mut heap, wx, wy).unwrap();
        prop_assert_eq!(&bx * &by, to_bigint(&heap, product));
        prop_assert!(is_normalised(&heap, product));

        let negated = fixnum::negate(&mut heap, wx).unwrap();
        prop_assert_eq!(-&bx, to_bigint(&heap, negated));
    }

    #[test]
    fn simplify_normalises(negative in any::<bool>(), low in any::<usize>(), high in prop_oneof![Just(0usize), any::<usize>()]) {
        let mut heap = heap();

        // A zero high digit leaves the bignum denormalised
        let wide = bignum::two_digits(&mut heap, negative, low, high).unwrap();
        let expected = to_bigint(&heap, wide);

        let simplified = bignum::simplify(&mut heap, wide).unwrap();
        prop_assert!(is_normalised(&heap, simplified));
        prop_assert_eq!(expected, to_bigint(&heap, simplified));
    }

    #[test]
    fn integer_arithmetic_is_exact(x in bigint_value(), y in bigint_value()) {
        let mut heap = heap();
        let wx = from_bigint(&mut heap, &x);
        let wy = from_bigint(&mut heap, &y);

        let sum = integer::plus(&mut heap, wx, wy).unwrap();
        prop_assert_eq!(&x + &y, to_bigint(&heap, sum));
        prop_assert!(is_normalised(&heap, sum));

        let difference = integer::minus(&mut heap, wx, wy).unwrap();
        prop_assert_eq!(&x - &y, to_bigint(&heap, difference));
        prop_assert!(is_normalised(&heap, difference));

        let product = integer::times(&mut heap, wx, wy).unwrap();
        prop_assert_eq!(&x * &y, to_bigint(&heap, product));
        prop_assert!(is_normalised(&heap, product));

        prop_assert_eq!(x.cmp(&y), integer::compare(&heap, wx, wy).unwrap());

        if !y.is_zero() {
            let (quotient, remainder) = integer::divrem(&mut heap, wx, wy).unwrap();
            prop_assert_eq!(&x / &y, to_bigint(&heap, quotient));
            prop_assert_eq!(&x % &y, to_bigint(&heap, remainder));
            prop_assert!(is_normalised(&heap, quotient));
            prop_assert!(is_normalised(&heap, remainder));

            let modulo = integer::modulo(&mut heap, wx, wy).unwrap();
            prop_assert_eq!(floor_modulo(&x, &y), to_bigint(&heap, modulo));
        }
    }

    #[test]
    fn shifts_are_exact(x in bigint_value(), count in -200isize..200) {
        let mut heap = heap();
        let wx = from_bigint(&mut heap, &x);

        let shifted = integer::arithmetic_shift(&mut heap, wx, count).unwrap();
        let expected = if count >= 0 {
            &x << count as usize
        } else {
            // Arithmetic right shifts round towards negative infinity
            &x >> (-count) as usize
        };

        prop_assert_eq!(expected, to_bigint(&heap, shifted));
        prop_assert!(is_normalised(&heap, shifted));
    }

    #[test]
    fn ratios_round_like_reference(numerator in bigint_value(), denominator in bigint_value()) {
        prop_assume!(!denominator.is_zero());

        let mut heap = heap();
        let wn = from_bigint(&mut heap, &numerator);
        let wd = from_bigint(&mut heap, &denominator);
        let ratio = compound::ratnum(&mut heap, wn, wd).unwrap();

        let expected = reference_quotient(&numerator, &denominator);
        prop_assert_eq!(expected, compound::ratnum_to_f64(&heap, ratio).unwrap());
    }

    #[test]
    fn bits_match_twos_complement(x in fixnum_value(), index in prop_oneof![0u64..128, 0u64..(1 << 40)]) {
        let bit = fixnum::bit_to_bool(Word::fix(x), Word::fix(index as isize)).unwrap();
        prop_assert_eq!(Word::make_bool(BigInt::from(x).bit(index)), bit);
    }

    #[test]
    fn strings_match_reference(x in bigint_value(), radix in 2u32..=36) {
        let mut heap = heap();
        let wx = from_bigint(&mut heap, &x);

        let text = integer::to_string(&heap, wx, radix).unwrap();
        prop_assert_eq!(x.to_str_radix(radix), text.clone());

        let parsed = integer::parse(&mut heap, &text, radix).unwrap();
        prop_assert_eq!(x, to_bigint(&heap, parsed));
    }
}
