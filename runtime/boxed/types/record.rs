//! Structures
//!
//! A structure is a tagged aggregate. Its first slot holds the type tag, normally a symbol, and the
//! remaining slots hold the fields.

use crate::boxed::types::{expect_index, expect_kind};
use crate::boxed::{AsHeap, BlockKind, Heap};
use crate::fault::{Fault, FaultCode, Result};
use crate::word::Word;

/// Allocates a structure with the given tag and fields
pub fn structure(heap: &mut impl AsHeap, tag: Word, fields: &[Word]) -> Result<Word> {
    let heap = heap.as_heap_mut();

    let record = heap.alloc(BlockKind::Structure, fields.len() + 1)?;
    heap.set_slot(record, 0, tag);
    for (index, field) in fields.iter().enumerate() {
        heap.set_slot(record, index + 1, *field);
    }

    Ok(record)
}

/// Reinterprets a freshly built vector as a structure tagged by its first element
pub fn vector_to_structure(heap: &mut impl AsHeap, vector: Word) -> Result<Word> {
    let heap = heap.as_heap_mut();

    let vector = expect_kind(heap, vector, BlockKind::Vector, FaultCode::NoVector, "structure")?;
    if heap.block_size(vector) == 0 {
        return fault!(OutOfRange, "structure", vector);
    }

    heap.reclassify(vector, BlockKind::Structure);
    Ok(vector)
}

fn is_structure(heap: &Heap, x: Word, tag: Word) -> bool {
    heap.has_kind(x, BlockKind::Structure) && heap.slot(x, 0) == tag
}

/// Returns `#t` if `x` is a structure with the given tag
pub fn structurep(heap: &impl AsHeap, x: Word, tag: Word) -> Word {
    Word::make_bool(is_structure(heap.as_heap(), x, tag))
}

/// Returns the structure if it has the given tag
pub fn check_structure(heap: &impl AsHeap, x: Word, tag: Word) -> Result<Word> {
    if is_structure(heap.as_heap(), x, tag) {
        Ok(x)
    } else {
        Err(Fault::at(FaultCode::BadStruct, "check-structure")
            .with_operand(x)
            .with_operand(tag))
    }
}

/// Returns the type tag of any structure
pub fn structure_tag(heap: &impl AsHeap, x: Word) -> Result<Word> {
    let heap = heap.as_heap();

    let record = expect_kind(heap, x, BlockKind::Structure, FaultCode::BadStruct, "structure")?;
    Ok(heap.slot(record, 0))
}

/// Returns a field of a structure with the given tag by fixnum index
pub fn structure_field(heap: &impl AsHeap, x: Word, tag: Word, index: Word) -> Result<Word> {
    let record = check_structure(heap, x, tag)?;
    let heap = heap.as_heap();

    let index = expect_index(index, heap.block_size(record) - 1, "structure-ref")?;
    Ok(heap.slot(record, index + 1))
}

/// Replaces a field of a structure with the given tag
pub fn set_structure_field(
    heap: &mut impl AsHeap,
    x: Word,
    tag: Word,
    index: Word,
    value: Word,
) -> Result<()> {
    let record = check_structure(&*heap, x, tag)?;
    let heap = heap.as_heap_mut();

    let index = expect_index(index, heap.block_size(record) - 1, "structure-set!")?;
    heap.mutate(record, index + 1, value);
    Ok(())
}
