//! Typed views over heap blocks
//!
//! Each module builds and inspects one family of blocks. Constructors allocate through
//! [`AsHeap`](crate::boxed::AsHeap) and accessors check the block kind before touching any slot,
//! faulting with the code for the expected type.

pub mod fun;
pub mod list;
pub mod locative;
pub mod pointer;
pub mod port;
pub mod record;
pub mod str;
pub mod sym;
pub mod vector;

use crate::boxed::{BlockKind, Heap};
use crate::fault::{Fault, FaultCode, Result};
use crate::word::Word;

/// Returns `x` if it is a block of `kind` otherwise faults with `code`
pub(crate) fn expect_kind(
    heap: &Heap,
    x: Word,
    kind: BlockKind,
    code: FaultCode,
    site: &'static str,
) -> Result<Word> {
    if heap.has_kind(x, kind) {
        Ok(x)
    } else {
        Err(Fault::at(code, site).with_operand(x))
    }
}

/// Returns `x` as a non-negative index below `len` otherwise faults
pub(crate) fn expect_index(index: Word, len: usize, site: &'static str) -> Result<usize> {
    if !index.is_fixnum() {
        return Err(Fault::at(FaultCode::NoFixnum, site).with_operand(index));
    }

    let value = index.unfix();
    if value < 0 || value as usize >= len {
        Err(Fault::at(FaultCode::OutOfRange, site).with_operand(index))
    } else {
        Ok(value as usize)
    }
}
