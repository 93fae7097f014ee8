//! Magnitude arithmetic on little-endian digit slices
//!
//! A digit is a machine word. Multiplication and division work on half digits so every
//! intermediate product fits in a single word. Results are returned without high zero digits.

use std::cmp::{self, Ordering};

use crate::require;

/// Bits in a digit
pub const DIGIT_BITS: u32 = usize::BITS;
/// Bits in a half digit
pub const HALF_DIGIT_BITS: u32 = DIGIT_BITS / 2;
/// Mask selecting the low half of a digit
pub const HALF_DIGIT_MASK: usize = (1 << HALF_DIGIT_BITS) - 1;

/// Karatsuba needs operands long enough for the split halves to be strictly shorter
const KARATSUBA_MIN_DIGITS: usize = 4;

#[inline]
pub fn lo(digit: usize) -> usize {
    digit & HALF_DIGIT_MASK
}

#[inline]
pub fn hi(digit: usize) -> usize {
    digit >> HALF_DIGIT_BITS
}

/// Joins two half digits in to a digit
#[inline]
pub fn combine(lo: usize, hi: usize) -> usize {
    (hi << HALF_DIGIT_BITS) | lo
}

/// Returns the digits without high zero digits
pub fn significant(digits: &[usize]) -> &[usize] {
    let len = digits
        .iter()
        .rposition(|digit| *digit != 0)
        .map_or(0, |index| index + 1);

    &digits[..len]
}

/// Removes high zero digits
pub fn trim(digits: &mut Vec<usize>) {
    let len = significant(digits).len();
    digits.truncate(len);
}

/// Returns the number of significant bits
pub fn bit_length(digits: &[usize]) -> usize {
    let digits = significant(digits);

    match digits.last() {
        Some(top) => {
            (digits.len() - 1) * DIGIT_BITS as usize + (DIGIT_BITS - top.leading_zeros()) as usize
        }
        None => 0,
    }
}

pub fn cmp(a: &[usize], b: &[usize]) -> Ordering {
    let a = significant(a);
    let b = significant(b);

    a.len()
        .cmp(&b.len())
        .then_with(|| a.iter().rev().cmp(b.iter().rev()))
}

pub fn add(a: &[usize], b: &[usize]) -> Vec<usize> {
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };

    let mut sum = long.to_vec();
    sum.push(0);
    add_at(&mut sum, short, 0);

    trim(&mut sum);
    sum
}

/// Subtracts `b` from `a`
///
/// `a` must not be smaller than `b`.
pub fn sub(a: &[usize], b: &[usize]) -> Vec<usize> {
    require!(cmp(a, b) != Ordering::Less);

    let mut difference = significant(a).to_vec();
    sub_in_place(&mut difference, significant(b));

    trim(&mut difference);
    difference
}

/// Adds `x` in to `acc` starting at digit `offset`
///
/// Any carry out of the top of `acc` is dropped.
fn add_at(acc: &mut [usize], x: &[usize], offset: usize) {
    let mut carry = false;
    let mut index = offset;

    for digit in x {
        if index >= acc.len() {
            return;
        }

        let (partial, overflow1) = acc[index].overflowing_add(*digit);
        let (total, overflow2) = partial.overflowing_add(carry as usize);
        acc[index] = total;
        carry = overflow1 || overflow2;
        index += 1;
    }

    while carry && index < acc.len() {
        let (total, overflow) = acc[index].overflowing_add(1);
        acc[index] = total;
        carry = overflow;
        index += 1;
    }
}

fn sub_in_place(acc: &mut [usize], x: &[usize]) {
    let mut borrow = false;
    let mut index = 0;

    for digit in x {
        let (partial, overflow1) = acc[index].overflowing_sub(*digit);
        let (total, overflow2) = partial.overflowing_sub(borrow as usize);
        acc[index] = total;
        borrow = overflow1 || overflow2;
        index += 1;
    }

    while borrow && index < acc.len() {
        let (total, overflow) = acc[index].overflowing_sub(1);
        acc[index] = total;
        borrow = overflow;
        index += 1;
    }
}

fn to_halves(digits: &[usize]) -> Vec<usize> {
    let mut halves: Vec<usize> = digits
        .iter()
        .flat_map(|digit| [lo(*digit), hi(*digit)])
        .collect();

    trim(&mut halves);
    halves
}

fn from_halves(halves: &[usize]) -> Vec<usize> {
    let mut digits: Vec<usize> = halves
        .chunks(2)
        .map(|pair| combine(pair[0], pair.get(1).copied().unwrap_or(0)))
        .collect();

    trim(&mut digits);
    digits
}

/// Multiplies using the quadratic algorithm on half digits
pub fn mul_schoolbook(a: &[usize], b: &[usize]) -> Vec<usize> {
    let a = to_halves(a);
    let b = to_halves(b);
    if a.is_empty() || b.is_empty() {
        return vec![];
    }

    let mut product = vec![0; a.len() + b.len()];
    for (i, x) in a.iter().enumerate() {
        if *x == 0 {
            continue;
        }

        let mut carry = 0;
        for (j, y) in b.iter().enumerate() {
            // Cannot overflow: (B - 1)^2 + 2(B - 1) = B^2 - 1
            let t = x * y + product[i + j] + carry;
            product[i + j] = lo(t);
            carry = hi(t);
        }
        product[i + b.len()] = carry;
    }

    from_halves(&product)
}

/// Multiplies two magnitudes
///
/// Karatsuba is used once both operands have at least `karatsuba_threshold` digits.
pub fn mul(a: &[usize], b: &[usize], karatsuba_threshold: usize) -> Vec<usize> {
    let a = significant(a);
    let b = significant(b);

    if a.is_empty() || b.is_empty() {
        vec![]
    } else if cmp::min(a.len(), b.len()) < cmp::max(karatsuba_threshold, KARATSUBA_MIN_DIGITS) {
        mul_schoolbook(a, b)
    } else {
        karatsuba(a, b, karatsuba_threshold)
    }
}

fn split(digits: &[usize], at: usize) -> (&[usize], &[usize]) {
    if digits.len() <= at {
        (digits, &[])
    } else {
        digits.split_at(at)
    }
}

fn karatsuba(a: &[usize], b: &[usize], threshold: usize) -> Vec<usize> {
    let half = cmp::max(a.len(), b.len()) / 2;

    let (a0, a1) = split(a, half);
    let (b0, b1) = split(b, half);

    let z0 = mul(a0, b0, threshold);
    let z2 = mul(a1, b1, threshold);
    let z1 = {
        let cross = mul(&add(a0, a1), &add(b0, b1), threshold);
        sub(&sub(&cross, &z0), &z2)
    };

    let mut product = vec![0; a.len() + b.len()];
    add_at(&mut product, &z0, 0);
    add_at(&mut product, &z1, half);
    add_at(&mut product, &z2, 2 * half);

    trim(&mut product);
    product
}

/// Divides by a single half digit returning the quotient and remainder
pub fn divrem_half(a: &[usize], divisor: usize) -> (Vec<usize>, usize) {
    require!(divisor != 0 && divisor <= HALF_DIGIT_MASK);

    let mut quotient = vec![0; a.len()];
    let mut remainder = 0;

    for (index, digit) in a.iter().enumerate().rev() {
        let high = combine(hi(*digit), remainder);
        let q_high = high / divisor;
        remainder = high % divisor;

        let low = combine(lo(*digit), remainder);
        let q_low = low / divisor;
        remainder = low % divisor;

        quotient[index] = combine(q_low, q_high);
    }

    trim(&mut quotient);
    (quotient, remainder)
}

/// Divides two magnitudes returning the quotient and remainder
///
/// This is Knuth's algorithm D on half digits. The divisor must not be zero.
pub fn divrem(a: &[usize], b: &[usize]) -> (Vec<usize>, Vec<usize>) {
    let a = significant(a);
    let b = significant(b);
    require!(!b.is_empty());

    if cmp(a, b) == Ordering::Less {
        return (vec![], a.to_vec());
    }

    if b.len() == 1 && b[0] <= HALF_DIGIT_MASK {
        let (quotient, remainder) = divrem_half(a, b[0]);
        let remainder = if remainder == 0 { vec![] } else { vec![remainder] };
        return (quotient, remainder);
    }

    let u = to_halves(a);
    let v = to_halves(b);
    let n = v.len();
    let m = u.len() - n;

    // Normalise so the top half digit of the divisor has its high bit set
    let shift = v[n - 1].leading_zeros() - (DIGIT_BITS - HALF_DIGIT_BITS);
    let vn = shl_halves(&v, shift, false);
    let mut un = shl_halves(&u, shift, true);

    let base = HALF_DIGIT_MASK + 1;
    let mut quotient = vec![0; m + 1];

    for j in (0..=m).rev() {
        let numerator = combine(un[j + n - 1], un[j + n]);
        let mut qhat = numerator / vn[n - 1];
        let mut rhat = numerator % vn[n - 1];

        loop {
            if qhat > HALF_DIGIT_MASK || qhat * vn[n - 2] > combine(un[j + n - 2], rhat) {
                qhat -= 1;
                rhat += vn[n - 1];
                if rhat <= HALF_DIGIT_MASK {
                    continue;
                }
            }
            break;
        }

        // Multiply and subtract
        let mut carry = 0;
        let mut borrow = 0;
        for i in 0..n {
            let product = qhat * vn[i] + carry;
            carry = hi(product);

            let subtrahend = lo(product) + borrow;
            if un[i + j] >= subtrahend {
                un[i + j] -= subtrahend;
                borrow = 0;
            } else {
                un[i + j] = un[i + j] + base - subtrahend;
                borrow = 1;
            }
        }

        let subtrahend = carry + borrow;
        let overdrawn = un[j + n] < subtrahend;
        un[j + n] = lo(un[j + n].wrapping_sub(subtrahend));
        quotient[j] = qhat;

        if overdrawn {
            // qhat was one too large; add the divisor back
            quotient[j] -= 1;

            let mut carry = 0;
            for i in 0..n {
                let t = un[i + j] + vn[i] + carry;
                un[i + j] = lo(t);
                carry = hi(t);
            }
            un[j + n] = lo(un[j + n] + carry);
        }
    }

    let remainder: Vec<usize> = (0..n)
        .map(|i| {
            let next = if i + 1 < n { un[i + 1] } else { 0 };
            lo((un[i] >> shift) | (next << (HALF_DIGIT_BITS - shift)))
        })
        .collect();

    (from_halves(&quotient), from_halves(&remainder))
}

/// Shifts half digits left by less than a half digit
fn shl_halves(halves: &[usize], shift: u32, extend: bool) -> Vec<usize> {
    let mut shifted = Vec::with_capacity(halves.len() + 1);
    let mut previous = 0;

    for half in halves {
        shifted.push(lo((half << shift) | (previous >> (HALF_DIGIT_BITS - shift))));
        previous = *half;
    }

    if extend {
        shifted.push(previous >> (HALF_DIGIT_BITS - shift));
    }

    shifted
}

/// Shifts a magnitude left by `bits`
pub fn shl(a: &[usize], bits: usize) -> Vec<usize> {
    let a = significant(a);
    if a.is_empty() {
        return vec![];
    }

    let digit_shift = bits / DIGIT_BITS as usize;
    let bit_shift = (bits % DIGIT_BITS as usize) as u32;

    let mut shifted = vec![0; digit_shift];
    if bit_shift == 0 {
        shifted.extend_from_slice(a);
    } else {
        let mut carry = 0;
        for digit in a {
            shifted.push((digit << bit_shift) | carry);
            carry = digit >> (DIGIT_BITS - bit_shift);
        }
        shifted.push(carry);
    }

    trim(&mut shifted);
    shifted
}

/// Shifts a magnitude right by `bits` discarding the shifted out bits
pub fn shr(a: &[usize], bits: usize) -> Vec<usize> {
    let a = significant(a);

    let digit_shift = bits / DIGIT_BITS as usize;
    if digit_shift >= a.len() {
        return vec![];
    }

    let bit_shift = (bits % DIGIT_BITS as usize) as u32;
    let kept = &a[digit_shift..];

    let mut shifted: Vec<usize> = if bit_shift == 0 {
        kept.to_vec()
    } else {
        (0..kept.len())
            .map(|index| {
                let next = kept.get(index + 1).copied().unwrap_or(0);
                (kept[index] >> bit_shift) | (next << (DIGIT_BITS - bit_shift))
            })
            .collect()
    };

    trim(&mut shifted);
    shifted
}

/// Returns if any of the low `bits` bits are set
pub fn any_low_bits(a: &[usize], bits: usize) -> bool {
    let digit_count = bits / DIGIT_BITS as usize;
    let bit_count = (bits % DIGIT_BITS as usize) as u32;

    if a.iter().take(digit_count).any(|digit| *digit != 0) {
        return true;
    }

    match a.get(digit_count) {
        Some(digit) if bit_count > 0 => digit & ((1 << bit_count) - 1) != 0,
        _ => false,
    }
}
