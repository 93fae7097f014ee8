//! Closures
//!
//! A closure is a special block whose opaque first slot holds the native code address. The
//! remaining slots are the captured values.

use crate::boxed::types::{expect_index, expect_kind};
use crate::boxed::{AsHeap, BlockKind, Heap};
use crate::fault::{FaultCode, Result};
use crate::word::Word;

fn expect_closure(heap: &Heap, x: Word, site: &'static str) -> Result<Word> {
    expect_kind(heap, x, BlockKind::Closure, FaultCode::NoClosure, site)
}

/// Allocates a closure over the given captured values
pub fn closure(heap: &mut impl AsHeap, code: usize, captured: &[Word]) -> Result<Word> {
    let heap = heap.as_heap_mut();

    let closure = heap.alloc(BlockKind::Closure, captured.len() + 1)?;
    heap.set_raw_slot(closure, 0, code);
    for (index, value) in captured.iter().enumerate() {
        heap.set_slot(closure, index + 1, *value);
    }

    Ok(closure)
}

/// Reinterprets a freshly built vector as a closure
///
/// The first element must already hold the raw code address.
pub fn vector_to_closure(heap: &mut impl AsHeap, vector: Word) -> Result<Word> {
    let heap = heap.as_heap_mut();

    let vector = expect_kind(heap, vector, BlockKind::Vector, FaultCode::NoVector, "closure")?;
    if heap.block_size(vector) == 0 {
        return fault!(OutOfRange, "closure", vector);
    }

    heap.reclassify(vector, BlockKind::Closure);
    Ok(vector)
}

pub fn closurep(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(heap.as_heap().has_kind(x, BlockKind::Closure))
}

/// Returns the code address of a closure
pub fn closure_code(heap: &impl AsHeap, closure: Word) -> Result<usize> {
    let heap = heap.as_heap();
    Ok(heap.raw_slot(expect_closure(heap, closure, "closure-code")?, 0))
}

/// Returns the number of captured values
pub fn closure_length(heap: &impl AsHeap, closure: Word) -> Result<usize> {
    let heap = heap.as_heap();
    Ok(heap.block_size(expect_closure(heap, closure, "closure-length")?) - 1)
}

/// Returns a captured value by fixnum index
pub fn closure_captured(heap: &impl AsHeap, closure: Word, index: Word) -> Result<Word> {
    let heap = heap.as_heap();

    let closure = expect_closure(heap, closure, "closure-ref")?;
    let index = expect_index(index, heap.block_size(closure) - 1, "closure-ref")?;
    Ok(heap.slot(closure, index + 1))
}

/// Returns the closure if `x` can be applied
///
/// This is the check made before every call; anything else is a call of a non-procedure.
pub fn check_applicable(heap: &impl AsHeap, x: Word) -> Result<Word> {
    let heap = heap.as_heap();
    expect_kind(heap, x, BlockKind::Closure, FaultCode::NotAClosure, "apply")
}
