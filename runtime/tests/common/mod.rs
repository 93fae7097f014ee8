// Shared helpers for comparing runtime integers against num-bigint

#![allow(dead_code)]

use num_bigint::{BigInt, BigUint, Sign};
use proptest::prelude::*;

use runtime::boxed::Heap;
use runtime::num::bignum::{self, SignedDigits};
use runtime::word::{Word, MOST_NEGATIVE_FIXNUM, MOST_POSITIVE_FIXNUM};

pub fn heap() -> Heap {
    Heap::with_capacity(1 << 16)
}

/// Reads an integer word in to a reference bigint
pub fn to_bigint(heap: &Heap, x: Word) -> BigInt {
    let value = bignum::unpack(heap, x).unwrap();

    let mut magnitude = BigUint::default();
    for digit in value.digits.iter().rev() {
        magnitude = (magnitude << usize::BITS) + BigUint::from(*digit as u64);
    }

    let sign = if value.negative { Sign::Minus } else { Sign::Plus };
    BigInt::from_biguint(sign, magnitude)
}

/// Builds a normalised integer word from a reference bigint
pub fn from_bigint(heap: &mut Heap, n: &BigInt) -> Word {
    let halves = n.magnitude().to_u32_digits();
    let per_digit = (usize::BITS / 32) as usize;

    let digits = halves
        .chunks(per_digit)
        .map(|chunk| {
            chunk
                .iter()
                .rev()
                .fold(0usize, |acc, half| (acc << 16 << 16) | *half as usize)
        })
        .collect();

    bignum::make_integer(heap, SignedDigits::new(n.sign() == Sign::Minus, digits)).unwrap()
}

/// Returns if a word is in its normalised integer representation
pub fn is_normalised(heap: &Heap, x: Word) -> bool {
    if x.is_fixnum() {
        return true;
    }

    let digits = bignum::digits(heap, x).unwrap();
    let value = to_bigint(heap, x);

    digits.last().map_or(false, |top| *top != 0)
        && (value > BigInt::from(MOST_POSITIVE_FIXNUM) || value < BigInt::from(MOST_NEGATIVE_FIXNUM))
}

pub fn fixnum_value() -> impl Strategy<Value = isize> {
    prop_oneof![
        MOST_NEGATIVE_FIXNUM..=MOST_POSITIVE_FIXNUM,
        -1000isize..1000,
        Just(MOST_POSITIVE_FIXNUM),
        Just(MOST_NEGATIVE_FIXNUM),
    ]
}

pub fn bigint_value() -> impl Strategy<Value = BigInt> {
    (
        any::<bool>(),
        prop::collection::vec(any::<u32>(), 0..24),
    )
        .prop_map(|(negative, halves)| {
            let sign = if negative { Sign::Minus } else { Sign::Plus };
            BigInt::from_biguint(sign, BigUint::new(halves))
        })
}
