use std::iter::FusedIterator;

use crate::boxed::types::expect_kind;
use crate::boxed::{AsHeap, BlockKind, Heap};
use crate::fault::{Fault, FaultCode, Result};
use crate::word::Word;

fn alloc_pair(heap: &mut impl AsHeap, kind: BlockKind, car: Word, cdr: Word) -> Result<Word> {
    let heap = heap.as_heap_mut();

    let pair = heap.alloc(kind, 2)?;
    heap.set_slot(pair, 0, car);
    heap.set_slot(pair, 1, cdr);
    Ok(pair)
}

/// Allocates a pair
pub fn cons(heap: &mut impl AsHeap, car: Word, cdr: Word) -> Result<Word> {
    alloc_pair(heap, BlockKind::Pair, car, cdr)
}

/// Allocates a weak pair
///
/// The car does not keep its value alive. If the value is not otherwise reachable the car becomes
/// the broken weak pointer after a collection.
pub fn weak_cons(heap: &mut impl AsHeap, car: Word, cdr: Word) -> Result<Word> {
    alloc_pair(heap, BlockKind::WeakPair, car, cdr)
}

fn is_pair(heap: &Heap, x: Word) -> bool {
    matches!(heap.kind(x), Some(BlockKind::Pair) | Some(BlockKind::WeakPair))
}

/// Returns `#t` for strong and weak pairs
pub fn pairp(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(is_pair(heap.as_heap(), x))
}

pub fn weak_pairp(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(heap.as_heap().has_kind(x, BlockKind::WeakPair))
}

/// Returns `#t` for the empty list or a pair
pub fn listp(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(x.is_null() || is_pair(heap.as_heap(), x))
}

fn expect_pair(heap: &Heap, x: Word, site: &'static str) -> Result<Word> {
    if is_pair(heap, x) {
        Ok(x)
    } else {
        expect_kind(heap, x, BlockKind::Pair, FaultCode::NoPair, site)
    }
}

pub fn car(heap: &impl AsHeap, pair: Word) -> Result<Word> {
    let heap = heap.as_heap();
    Ok(heap.slot(expect_pair(heap, pair, "car")?, 0))
}

pub fn cdr(heap: &impl AsHeap, pair: Word) -> Result<Word> {
    let heap = heap.as_heap();
    Ok(heap.slot(expect_pair(heap, pair, "cdr")?, 1))
}

pub fn set_car(heap: &mut impl AsHeap, pair: Word, value: Word) -> Result<()> {
    let heap = heap.as_heap_mut();
    let pair = expect_pair(heap, pair, "set-car!")?;

    heap.mutate(pair, 0, value);
    Ok(())
}

pub fn set_cdr(heap: &mut impl AsHeap, pair: Word, value: Word) -> Result<()> {
    let heap = heap.as_heap_mut();
    let pair = expect_pair(heap, pair, "set-cdr!")?;

    heap.mutate(pair, 1, value);
    Ok(())
}

/// Builds a proper list of the given values
pub fn list(heap: &mut impl AsHeap, values: &[Word]) -> Result<Word> {
    list_with_tail(heap, values, Word::END_OF_LIST)
}

/// Builds a list of the given values ending in `tail`
pub fn list_with_tail(heap: &mut impl AsHeap, values: &[Word], tail: Word) -> Result<Word> {
    values
        .iter()
        .rev()
        .try_fold(tail, |rest, value| cons(heap, *value, rest))
}

/// Returns the length of a proper list
///
/// Cyclic lists and lists not ending in the empty list fault.
pub fn list_length(heap: &impl AsHeap, list: Word) -> Result<usize> {
    let heap = heap.as_heap();

    let mut slow = list;
    let mut fast = list;
    let mut length = 0;

    loop {
        if fast.is_null() {
            return Ok(length);
        }
        if !is_pair(heap, fast) {
            return Err(Fault::at(FaultCode::NotAProperList, "length").with_operand(list));
        }

        fast = heap.slot(fast, 1);
        length += 1;

        if length % 2 == 0 {
            slow = heap.slot(slow, 1);
            if slow == fast {
                return Err(
                    Fault::at(FaultCode::BadArgumentTypeCyclicList, "length").with_operand(list)
                );
            }
        }
    }
}

/// Returns the first pair in an association list whose car is identical to `key` or `#f`
pub fn assq(heap: &impl AsHeap, key: Word, alist: Word) -> Result<Word> {
    let heap = heap.as_heap();

    for entry in iter(heap, alist) {
        let entry = expect_pair(heap, entry, "assq")?;
        if heap.slot(entry, 0) == key {
            return Ok(entry);
        }
    }

    Ok(Word::FALSE)
}

/// Iterator over the elements of a list
///
/// Iteration stops at the first tail that is not a pair.
pub struct ListIterator<'h> {
    heap: &'h Heap,
    rest: Word,
}

/// Iterates over the elements of a list
pub fn iter(heap: &impl AsHeap, list: Word) -> ListIterator<'_> {
    ListIterator {
        heap: heap.as_heap(),
        rest: list,
    }
}

impl<'h> Iterator for ListIterator<'h> {
    type Item = Word;

    fn next(&mut self) -> Option<Word> {
        if !is_pair(self.heap, self.rest) {
            return None;
        }

        let head = self.heap.slot(self.rest, 0);
        self.rest = self.heap.slot(self.rest, 1);
        Some(head)
    }
}

impl<'h> FusedIterator for ListIterator<'h> {}
