//! Conversion between exact integers and text
//!
//! Small values are converted digit by digit using the largest power of the radix that fits in a
//! half digit. Large values are split around a power of the radix and each half is converted
//! separately, which keeps the cost of the repeated divisions down.

use crate::fault::{Fault, FaultCode, Result};
use crate::num::bignum::{digits, SignedDigits};

const MIN_RADIX: u32 = 2;
const MAX_RADIX: u32 = 36;

fn check_radix(radix: u32, site: &'static str) -> Result<()> {
    if (MIN_RADIX..=MAX_RADIX).contains(&radix) {
        Ok(())
    } else {
        Err(Fault::at(FaultCode::BadBase, site))
    }
}

/// Returns the largest power of `radix` that fits in a half digit and its exponent
fn chunk_power(radix: u32) -> (usize, usize) {
    let radix = radix as usize;

    let mut power = radix;
    let mut exponent = 1;
    while power * radix <= digits::HALF_DIGIT_MASK {
        power *= radix;
        exponent += 1;
    }

    (power, exponent)
}

fn pow(radix: u32, mut exponent: usize) -> Vec<usize> {
    let mut base = vec![radix as usize];
    let mut result = vec![1];

    while exponent > 0 {
        if exponent & 1 == 1 {
            result = digits::mul(&result, &base, usize::MAX);
        }

        exponent >>= 1;
        if exponent > 0 {
            base = digits::mul(&base, &base, usize::MAX);
        }
    }

    result
}

/// Returns an upper bound for the number of characters needed for a magnitude
fn estimate_chars(magnitude: &[usize], radix: u32) -> usize {
    let bits = digits::bit_length(magnitude) as f64;
    (bits / f64::from(radix).log2()).ceil() as usize + 1
}

fn push_digit(output: &mut Vec<u8>, value: usize, radix: u32) {
    let c = std::char::from_digit(value as u32, radix).unwrap_or('?');
    output.push(c as u8);
}

/// Appends the magnitude's digits most significant first
///
/// When `width` is given the output is left padded with zeros to exactly that many characters.
fn linear(output: &mut Vec<u8>, magnitude: &[usize], radix: u32, width: Option<usize>) {
    let (power, exponent) = chunk_power(radix);

    let mut chunks = vec![];
    let mut rest = digits::significant(magnitude).to_vec();
    while !rest.is_empty() {
        let (quotient, remainder) = digits::divrem_half(&rest, power);
        chunks.push(remainder);
        rest = quotient;
    }

    let mut text = vec![];
    for (index, chunk) in chunks.iter().rev().enumerate() {
        let mut chunk_digits = vec![];
        let mut chunk = *chunk;
        while chunk > 0 {
            chunk_digits.push(chunk % radix as usize);
            chunk /= radix as usize;
        }

        // Every chunk but the leading one is exactly `exponent` digits long
        if index > 0 {
            chunk_digits.resize(exponent, 0);
        }

        for value in chunk_digits.into_iter().rev() {
            push_digit(&mut text, value, radix);
        }
    }

    if let Some(width) = width {
        output.extend(std::iter::repeat(b'0').take(width.saturating_sub(text.len())));
    } else if text.is_empty() {
        text.push(b'0');
    }

    output.extend(text);
}

fn recursive(
    output: &mut Vec<u8>,
    magnitude: &[usize],
    radix: u32,
    width: Option<usize>,
    threshold: usize,
) {
    let chars = width.unwrap_or_else(|| estimate_chars(magnitude, radix));
    if chars <= threshold || chars < 2 {
        linear(output, magnitude, radix, width);
        return;
    }

    let low_width = chars / 2;
    let (high, low) = digits::divrem(magnitude, &pow(radix, low_width));

    let high_width = width.map(|width| width - low_width);
    if high.is_empty() && high_width.is_none() {
        // The estimate overshot for a short value
        linear(output, &low, radix, None);
    } else {
        recursive(output, &high, radix, high_width, threshold);
        recursive(output, &low, radix, Some(low_width), threshold);
    }
}

/// Formats an integer in `radix`
///
/// Values expected to need more than `threshold` characters are converted by divide and conquer.
/// Letters are lower case.
pub fn to_string(value: &SignedDigits, radix: u32, threshold: usize) -> Result<String> {
    check_radix(radix, "number->string")?;

    let mut output = vec![];
    if value.negative {
        output.push(b'-');
    }
    recursive(&mut output, &value.digits, radix, None, threshold);

    // Only ASCII digits and the sign are ever pushed
    Ok(output.into_iter().map(char::from).collect())
}

/// Parses an integer in `radix`
///
/// An optional sign may precede the digits. Text that is not an integer returns `None`.
pub fn parse(text: &str, radix: u32) -> Result<Option<SignedDigits>> {
    check_radix(radix, "string->number")?;

    let (negative, body) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    if body.is_empty() {
        return Ok(None);
    }

    let (power, exponent) = chunk_power(radix);
    let mut magnitude = vec![];

    let chars: Vec<char> = body.chars().collect();
    for chunk in chars.chunks(exponent) {
        let mut value = 0;
        for c in chunk {
            match c.to_digit(radix) {
                Some(digit) => value = value * radix as usize + digit as usize,
                None => return Ok(None),
            }
        }

        let scale = if chunk.len() == exponent {
            power
        } else {
            (radix as usize).pow(chunk.len() as u32)
        };

        magnitude = digits::add(&digits::mul(&magnitude, &[scale], usize::MAX), &[value]);
    }

    Ok(Some(SignedDigits::new(negative, magnitude)))
}

#[cfg(test)]
mod test {
    use super::*;

    fn format(n: i128, radix: u32, threshold: usize) -> String {
        to_string(&SignedDigits::from_i128(n), radix, threshold).unwrap()
    }

    #[test]
    fn small_values() {
        assert_eq!("0", format(0, 10, 750));
        assert_eq!("-1", format(-1, 10, 750));
        assert_eq!("ff", format(255, 16, 750));
        assert_eq!("-101", format(-5, 2, 750));
        assert_eq!("z", format(35, 36, 750));
    }

    #[test]
    fn chunk_boundaries() {
        assert_eq!("1000000000", format(1_000_000_000, 10, 750));
        assert_eq!(
            "1000000000000000000000000000001",
            format(1_000_000_000_000_000_000_000_000_000_001, 10, 750)
        );
    }

    #[test]
    fn divide_and_conquer_matches_linear() {
        let values = [
            170_141_183_460_469_231_731_687_303_715_884_105_727i128,
            -100_000_000_000_000_000_000_000_000_000,
            1 << 100,
            12_345_678_901_234_567_890_123,
        ];

        for value in values.iter() {
            for radix in [2, 7, 10, 16, 36].iter() {
                assert_eq!(format(*value, *radix, 1000), format(*value, *radix, 2));
            }
        }
    }

    #[test]
    fn bad_radix() {
        assert_eq!(
            FaultCode::BadBase,
            to_string(&SignedDigits::zero(), 1, 750).unwrap_err().code()
        );
        assert_eq!(FaultCode::BadBase, parse("1", 37).unwrap_err().code());
    }

    #[test]
    fn parsing() {
        assert_eq!(
            Some(SignedDigits::from_i128(-255)),
            parse("-ff", 16).unwrap()
        );
        assert_eq!(Some(SignedDigits::from_i128(255)), parse("+FF", 16).unwrap());
        assert_eq!(
            Some(SignedDigits::from_i128(
                123_456_789_012_345_678_901_234_567_890
            )),
            parse("123456789012345678901234567890", 10).unwrap()
        );
        assert_eq!(Some(SignedDigits::zero()), parse("-0000", 10).unwrap());

        assert_eq!(None, parse("", 10).unwrap());
        assert_eq!(None, parse("-", 10).unwrap());
        assert_eq!(None, parse("12a", 10).unwrap());
        assert_eq!(None, parse("2", 2).unwrap());
    }
}
