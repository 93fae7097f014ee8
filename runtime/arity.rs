//! Argument count checks
//!
//! Procedures receive their arguments as a slice. Fixed arity procedures check the exact count on
//! entry while variadic procedures check a minimum and then read their rest arguments by index.

use crate::boxed::types::list;
use crate::boxed::AsHeap;
use crate::fault::{Fault, FaultCode, Result};
use crate::word::Word;

fn count_word(count: usize) -> Word {
    Word::fix(count as isize)
}

/// Checks a procedure was called with exactly `expected` arguments
pub fn check_argument_count(count: usize, expected: usize) -> Result<()> {
    if count == expected {
        return Ok(());
    }

    Err(Fault::at(FaultCode::BadArgumentCount, "apply")
        .with_operand(count_word(count))
        .with_operand(count_word(expected)))
}

/// Checks a procedure was called with at least `minimum` arguments
pub fn check_minimum_argument_count(count: usize, minimum: usize) -> Result<()> {
    if count >= minimum {
        return Ok(());
    }

    Err(Fault::at(FaultCode::BadMinimumArgumentCount, "apply")
        .with_operand(count_word(count))
        .with_operand(count_word(minimum)))
}

/// Returns if there are no arguments at or after `index`
pub fn rest_nullp(args: &[Word], index: usize) -> Word {
    Word::make_bool(index >= args.len())
}

/// Returns the argument at `index` of a variadic call
///
/// `known` is the number of leading arguments the procedure declares. The fault carries the
/// argument count, the index and `known` as fixnums followed by the procedure.
pub fn rest_arg(args: &[Word], index: usize, known: usize, procedure: Word) -> Result<Word> {
    match args.get(index) {
        Some(arg) => Ok(*arg),
        None => Err(Fault::at(FaultCode::RestArgOutOfBounds, "rest-arg")
            .with_operand(count_word(args.len()))
            .with_operand(count_word(index))
            .with_operand(count_word(known))
            .with_operand(procedure)),
    }
}

/// Collects the arguments after the `known` leading ones in to a list
pub fn rest_list(heap: &mut impl AsHeap, args: &[Word], known: usize) -> Result<Word> {
    let rest = args.get(known..).unwrap_or(&[]);
    list::list(heap, rest)
}
