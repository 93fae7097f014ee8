//! Boxed native addresses

use crate::boxed::{AsHeap, BlockKind, Heap};
use crate::fault::{Fault, FaultCode, Result};
use crate::word::Word;

/// Boxes a native address
pub fn mpointer(heap: &mut impl AsHeap, address: usize) -> Result<Word> {
    let heap = heap.as_heap_mut();

    let pointer = heap.alloc(BlockKind::Pointer, 1)?;
    heap.set_raw_slot(pointer, 0, address);
    Ok(pointer)
}

/// Boxes a native address or returns `#f` for the null address
pub fn mpointer_or_false(heap: &mut impl AsHeap, address: usize) -> Result<Word> {
    if address == 0 {
        Ok(Word::FALSE)
    } else {
        mpointer(heap, address)
    }
}

/// Boxes a native address with a type tag
pub fn tagged_pointer(heap: &mut impl AsHeap, address: usize, tag: Word) -> Result<Word> {
    let heap = heap.as_heap_mut();

    let pointer = heap.alloc(BlockKind::TaggedPointer, 2)?;
    heap.set_raw_slot(pointer, 0, address);
    heap.set_slot(pointer, 1, tag);
    Ok(pointer)
}

fn is_safe_pointer(heap: &Heap, x: Word) -> bool {
    matches!(
        heap.kind(x),
        Some(BlockKind::Pointer) | Some(BlockKind::TaggedPointer)
    )
}

/// Returns `#t` for plain pointers
pub fn pointerp(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(heap.as_heap().has_kind(x, BlockKind::Pointer))
}

pub fn tagged_pointerp(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(heap.as_heap().has_kind(x, BlockKind::TaggedPointer))
}

/// Returns `#t` for plain and tagged pointers
pub fn safe_pointerp(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(is_safe_pointer(heap.as_heap(), x))
}

/// Returns the address held by a plain or tagged pointer
pub fn pointer_address(heap: &impl AsHeap, x: Word) -> Result<usize> {
    let heap = heap.as_heap();

    if is_safe_pointer(heap, x) {
        Ok(heap.raw_slot(x, 0))
    } else {
        Err(Fault::at(FaultCode::NoPointer, "pointer->address").with_operand(x))
    }
}

/// Returns the tag of a tagged pointer
pub fn tagged_pointer_tag(heap: &impl AsHeap, x: Word) -> Result<Word> {
    let heap = heap.as_heap();

    if heap.has_kind(x, BlockKind::TaggedPointer) {
        Ok(heap.slot(x, 1))
    } else {
        Err(Fault::at(FaultCode::NoTaggedPointer, "pointer-tag").with_operand(x))
    }
}

/// Returns the address of a tagged pointer after checking its tag
pub fn check_tagged_pointer(heap: &impl AsHeap, x: Word, tag: Word) -> Result<usize> {
    if tagged_pointer_tag(heap, x)? != tag {
        return fault!(NoTaggedPointer, "pointer-tag", x, tag);
    }

    pointer_address(heap, x)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn plain_pointers() {
        let mut heap = Heap::with_capacity(64);

        let p = mpointer(&mut heap, 0x1234).unwrap();
        assert_eq!(Word::TRUE, pointerp(&heap, p));
        assert_eq!(Word::TRUE, safe_pointerp(&heap, p));
        assert_eq!(Word::FALSE, tagged_pointerp(&heap, p));
        assert_eq!(0x1234, pointer_address(&heap, p).unwrap());

        assert_eq!(Word::FALSE, mpointer_or_false(&mut heap, 0).unwrap());
        assert_eq!(
            FaultCode::NoPointer,
            pointer_address(&heap, Word::fix(0)).unwrap_err().code()
        );
    }

    #[test]
    fn tagged_pointers() {
        let mut heap = Heap::with_capacity(64);

        let p = tagged_pointer(&mut heap, 0x4000, Word::fix(7)).unwrap();
        assert_eq!(Word::TRUE, safe_pointerp(&heap, p));
        assert_eq!(Word::fix(7), tagged_pointer_tag(&heap, p).unwrap());
        assert_eq!(0x4000, check_tagged_pointer(&heap, p, Word::fix(7)).unwrap());
        assert_eq!(
            FaultCode::NoTaggedPointer,
            check_tagged_pointer(&heap, p, Word::fix(8)).unwrap_err().code()
        );

        // The address slot is opaque to the collector
        assert_eq!(1..2, heap.scannable_slots(p));
    }
}
