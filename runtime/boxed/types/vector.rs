use crate::boxed::types::{expect_index, expect_kind};
use crate::boxed::{AsHeap, BlockKind, Heap};
use crate::fault::{FaultCode, Result};
use crate::word::Word;

fn expect_vector(heap: &Heap, x: Word, site: &'static str) -> Result<Word> {
    expect_kind(heap, x, BlockKind::Vector, FaultCode::NoVector, site)
}

/// Allocates a vector of `len` slots all holding `fill`
pub fn make_vector(heap: &mut impl AsHeap, len: usize, fill: Word) -> Result<Word> {
    let heap = heap.as_heap_mut();

    let vector = heap.alloc(BlockKind::Vector, len)?;
    for index in 0..len {
        heap.set_slot(vector, index, fill);
    }

    Ok(vector)
}

/// Allocates a vector holding the given values
pub fn vector(heap: &mut impl AsHeap, values: &[Word]) -> Result<Word> {
    let heap = heap.as_heap_mut();

    let vector = heap.alloc(BlockKind::Vector, values.len())?;
    for (index, value) in values.iter().enumerate() {
        heap.set_slot(vector, index, *value);
    }

    Ok(vector)
}

pub fn vectorp(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(heap.as_heap().has_kind(x, BlockKind::Vector))
}

pub fn vector_length(heap: &impl AsHeap, vector: Word) -> Result<usize> {
    let heap = heap.as_heap();
    Ok(heap.block_size(expect_vector(heap, vector, "vector-length")?))
}

/// Returns the element at a fixnum index
pub fn vector_ref(heap: &impl AsHeap, vector: Word, index: Word) -> Result<Word> {
    let heap = heap.as_heap();

    let vector = expect_vector(heap, vector, "vector-ref")?;
    let index = expect_index(index, heap.block_size(vector), "vector-ref")?;
    Ok(heap.slot(vector, index))
}

/// Replaces the element at a fixnum index
pub fn vector_set(heap: &mut impl AsHeap, vector: Word, index: Word, value: Word) -> Result<()> {
    let heap = heap.as_heap_mut();

    let vector = expect_vector(heap, vector, "vector-set!")?;
    let index = expect_index(index, heap.block_size(vector), "vector-set!")?;
    heap.mutate(vector, index, value);
    Ok(())
}

/// Copies the elements of a vector out of the heap
pub fn vector_to_vec(heap: &impl AsHeap, vector: Word) -> Result<Vec<Word>> {
    let heap = heap.as_heap();

    let vector = expect_vector(heap, vector, "vector->list")?;
    Ok((0..heap.block_size(vector))
        .map(|index| heap.slot(vector, index))
        .collect())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fill_and_access() {
        let mut heap = Heap::with_capacity(64);

        let v = make_vector(&mut heap, 3, Word::FALSE).unwrap();
        assert_eq!(Word::TRUE, vectorp(&heap, v));
        assert_eq!(3, vector_length(&heap, v).unwrap());
        assert_eq!(Word::FALSE, vector_ref(&heap, v, Word::fix(2)).unwrap());

        vector_set(&mut heap, v, Word::fix(1), Word::fix(9)).unwrap();
        assert_eq!(
            vec![Word::FALSE, Word::fix(9), Word::FALSE],
            vector_to_vec(&heap, v).unwrap()
        );
    }

    #[test]
    fn empty_vector() {
        let mut heap = Heap::with_capacity(64);

        let v = vector(&mut heap, &[]).unwrap();
        assert_eq!(0, vector_length(&heap, v).unwrap());

        let fault = vector_ref(&heap, v, Word::fix(0)).unwrap_err();
        assert_eq!(FaultCode::OutOfRange, fault.code());
    }

    #[test]
    fn bad_indices() {
        let mut heap = Heap::with_capacity(64);
        let v = vector(&mut heap, &[Word::fix(1), Word::fix(2)]).unwrap();

        assert_eq!(
            FaultCode::OutOfRange,
            vector_ref(&heap, v, Word::fix(-1)).unwrap_err().code()
        );
        assert_eq!(
            FaultCode::OutOfRange,
            vector_ref(&heap, v, Word::fix(2)).unwrap_err().code()
        );
        assert_eq!(
            FaultCode::NoFixnum,
            vector_ref(&heap, v, Word::TRUE).unwrap_err().code()
        );
    }

    #[test]
    fn not_a_vector() {
        let mut heap = Heap::with_capacity(64);
        let string = heap.alloc(BlockKind::String, 3).unwrap();

        assert_eq!(Word::FALSE, vectorp(&heap, string));
        assert_eq!(
            FaultCode::NoVector,
            vector_length(&heap, string).unwrap_err().code()
        );
        assert_eq!(
            FaultCode::NoVector,
            vector_length(&heap, Word::fix(3)).unwrap_err().code()
        );
    }
}
