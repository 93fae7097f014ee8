//! Locatives
//!
//! A locative refers to one element inside another block. Its opaque first slot holds the address
//! of the element, the second the byte offset of the element from the start of the block's data,
//! the third its [`LocativeKind`] and the fourth the block itself. Weak locatives store `#f` in the
//! fourth slot so they do not keep the block alive; if the block is reclaimed the address is
//! cleared and the locative is lost.
//!
//! Slot locatives may refer to any word block. Character locatives refer to strings and numeric
//! locatives refer to bytevectors.

use std::convert::{TryFrom, TryInto};

use strum::FromRepr;

use crate::boxed::{AsHeap, BlockKind, Heap};
use crate::fault::{Fault, FaultCode, Result};
use crate::num::{flonum, integer};
use crate::word::{Word, WORD_BYTES};

/// Element type a locative refers to
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromRepr)]
pub enum LocativeKind {
    Slot = 0,
    Char = 1,
    U8 = 2,
    S8 = 3,
    U16 = 4,
    S16 = 5,
    U32 = 6,
    S32 = 7,
    U64 = 8,
    S64 = 9,
    F32 = 10,
    F64 = 11,
}

impl LocativeKind {
    /// Returns the size of an element in bytes
    pub fn element_bytes(self) -> usize {
        use LocativeKind::*;

        match self {
            Slot => WORD_BYTES,
            Char | U8 | S8 => 1,
            U16 | S16 => 2,
            U32 | S32 | F32 => 4,
            U64 | S64 | F64 => 8,
        }
    }
}

const ADDRESS_SLOT: usize = 0;
const OFFSET_SLOT: usize = 1;
const KIND_SLOT: usize = 2;
const OBJECT_SLOT: usize = 3;

/// Creates a locative to element `index` of `object`
pub fn make_locative(
    heap: &mut impl AsHeap,
    kind: LocativeKind,
    object: Word,
    index: Word,
    weak: bool,
) -> Result<Word> {
    let heap = heap.as_heap_mut();
    let site = "make-locative";

    let expected = match kind {
        LocativeKind::Slot => heap.is_block(object) && !heap.header(object).is_byteblock(),
        LocativeKind::Char => heap.has_kind(object, BlockKind::String),
        _ => heap.has_kind(object, BlockKind::Bytevector),
    };
    if !expected {
        return fault!(BadArgumentType, site, object);
    }
    if !index.is_fixnum() {
        return fault!(NoFixnum, site, index);
    }

    let element_bytes = kind.element_bytes();
    let data_bytes = if kind == LocativeKind::Slot {
        heap.block_size(object) * WORD_BYTES
    } else {
        heap.block_size(object)
    };

    let offset = match usize::try_from(index.unfix()) {
        Ok(index) if (index + 1) * element_bytes <= data_bytes => index * element_bytes,
        _ => return fault!(OutOfRange, site, object, index),
    };

    let locative = heap.alloc(BlockKind::Locative, 4)?;
    heap.set_raw_slot(locative, ADDRESS_SLOT, object.to_raw() + WORD_BYTES + offset);
    heap.set_slot(locative, OFFSET_SLOT, Word::fix(offset as isize));
    heap.set_slot(locative, KIND_SLOT, Word::fix(kind as isize));
    heap.set_slot(
        locative,
        OBJECT_SLOT,
        if weak { Word::FALSE } else { object },
    );

    Ok(locative)
}

pub fn locativep(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(heap.as_heap().has_kind(x, BlockKind::Locative))
}

/// Resolved target of a live locative
struct Target {
    block: Word,
    offset: usize,
    kind: LocativeKind,
}

fn resolve(heap: &Heap, locative: Word, site: &'static str) -> Result<Target> {
    if !heap.has_kind(locative, BlockKind::Locative) {
        return fault!(NoLocative, site, locative);
    }

    let address = heap.raw_slot(locative, ADDRESS_SLOT);
    if address == 0 {
        return fault!(LostLocative, site, locative);
    }

    let offset = heap.slot(locative, OFFSET_SLOT).unfix() as usize;
    let kind = heap.slot(locative, KIND_SLOT).unfix() as u8;

    match LocativeKind::from_repr(kind) {
        Some(kind) => Ok(Target {
            block: Word::from_raw(address - offset - WORD_BYTES),
            offset,
            kind,
        }),
        None => fault!(NoLocative, site, locative),
    }
}

fn element<const N: usize>(heap: &Heap, target: &Target) -> [u8; N] {
    let mut bytes = [0; N];
    bytes.copy_from_slice(&heap.bytes(target.block)[target.offset..target.offset + N]);
    bytes
}

/// Returns the element a locative refers to
pub fn locative_ref(heap: &mut impl AsHeap, locative: Word) -> Result<Word> {
    let heap = heap.as_heap_mut();
    let target = resolve(heap, locative, "locative-ref")?;

    use LocativeKind::*;
    match target.kind {
        Slot => Ok(heap.slot(target.block, target.offset / WORD_BYTES)),
        Char => Ok(Word::make_char(u32::from(element::<1>(heap, &target)[0]))),
        U8 => Ok(Word::fix(u8::from_ne_bytes(element(heap, &target)) as isize)),
        S8 => Ok(Word::fix(i8::from_ne_bytes(element(heap, &target)) as isize)),
        U16 => Ok(Word::fix(u16::from_ne_bytes(element(heap, &target)) as isize)),
        S16 => Ok(Word::fix(i16::from_ne_bytes(element(heap, &target)) as isize)),
        U32 => {
            let n = u32::from_ne_bytes(element(heap, &target));
            integer::from_u64(heap, n.into())
        }
        S32 => {
            let n = i32::from_ne_bytes(element(heap, &target));
            integer::from_i64(heap, n.into())
        }
        U64 => {
            let n = u64::from_ne_bytes(element(heap, &target));
            integer::from_u64(heap, n)
        }
        S64 => {
            let n = i64::from_ne_bytes(element(heap, &target));
            integer::from_i64(heap, n)
        }
        F32 => {
            let f = f32::from_ne_bytes(element(heap, &target));
            flonum::flonum(heap, f.into())
        }
        F64 => {
            let f = f64::from_ne_bytes(element(heap, &target));
            flonum::flonum(heap, f)
        }
    }
}

fn real_value(heap: &Heap, value: Word, site: &'static str) -> Result<f64> {
    if value.is_fixnum() {
        Ok(value.unfix() as f64)
    } else if heap.has_kind(value, BlockKind::Flonum) {
        Ok(flonum::value(heap, value))
    } else {
        fault!(NoFlonum, site, value)
    }
}

fn narrow<T: TryFrom<i64>>(value: i64, operand: Word, site: &'static str) -> Result<T> {
    value
        .try_into()
        .map_err(|_| Fault::at(FaultCode::OutOfRange, site).with_operand(operand))
}

/// Replaces the element a locative refers to
pub fn locative_set(heap: &mut impl AsHeap, locative: Word, value: Word) -> Result<()> {
    let heap = heap.as_heap_mut();
    let site = "locative-set!";
    let target = resolve(heap, locative, site)?;

    use LocativeKind::*;
    let bytes: Vec<u8> = match target.kind {
        Slot => {
            heap.mutate(target.block, target.offset / WORD_BYTES, value);
            return Ok(());
        }
        Char => {
            if !value.is_char() || value.character() > 0xff {
                return fault!(NoChar, site, value);
            }
            vec![value.character() as u8]
        }
        U8 | S8 | U16 | S16 | U32 | S32 => {
            if !value.is_fixnum() {
                return fault!(NoFixnum, site, value);
            }

            let n = value.unfix() as i64;
            match target.kind {
                U8 => narrow::<u8>(n, value, site)?.to_ne_bytes().to_vec(),
                S8 => narrow::<i8>(n, value, site)?.to_ne_bytes().to_vec(),
                U16 => narrow::<u16>(n, value, site)?.to_ne_bytes().to_vec(),
                S16 => narrow::<i16>(n, value, site)?.to_ne_bytes().to_vec(),
                U32 => narrow::<u32>(n, value, site)?.to_ne_bytes().to_vec(),
                _ => narrow::<i32>(n, value, site)?.to_ne_bytes().to_vec(),
            }
        }
        U64 => integer::to_u64(heap, value)?.to_ne_bytes().to_vec(),
        S64 => integer::to_i64(heap, value)?.to_ne_bytes().to_vec(),
        F32 => (real_value(heap, value, site)? as f32).to_ne_bytes().to_vec(),
        F64 => real_value(heap, value, site)?.to_ne_bytes().to_vec(),
    };

    heap.bytes_mut(target.block)[target.offset..target.offset + bytes.len()]
        .copy_from_slice(&bytes);
    Ok(())
}

/// Returns the block a locative refers in to
///
/// Weak locatives return `#f` as the block is not recorded.
pub fn locative_to_object(heap: &impl AsHeap, locative: Word) -> Result<Word> {
    let heap = heap.as_heap();

    if !heap.has_kind(locative, BlockKind::Locative) {
        return fault!(NoLocative, "locative->object", locative);
    }
    Ok(heap.slot(locative, OBJECT_SLOT))
}

/// Returns the element kind of a locative
pub fn locative_kind(heap: &impl AsHeap, locative: Word) -> Result<LocativeKind> {
    resolve(heap.as_heap(), locative, "locative-kind").map(|target| target.kind)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::boxed::types::{str, vector};

    #[test]
    fn slot_locatives() {
        let mut heap = Heap::with_capacity(256);

        let v = vector::vector(&mut heap, &[Word::fix(1), Word::fix(2), Word::fix(3)]).unwrap();
        let loc = make_locative(&mut heap, LocativeKind::Slot, v, Word::fix(1), false).unwrap();

        assert_eq!(Word::TRUE, locativep(&heap, loc));
        assert_eq!(Word::fix(2), locative_ref(&mut heap, loc).unwrap());
        assert_eq!(v, locative_to_object(&heap, loc).unwrap());
        assert_eq!(LocativeKind::Slot, locative_kind(&heap, loc).unwrap());

        locative_set(&mut heap, loc, Word::TRUE).unwrap();
        assert_eq!(Word::TRUE, vector::vector_ref(&heap, v, Word::fix(1)).unwrap());

        // Only the target block is traced
        assert_eq!(1..4, heap.scannable_slots(loc));
    }

    #[test]
    fn bounds() {
        let mut heap = Heap::with_capacity(256);

        let v = vector::vector(&mut heap, &[Word::fix(1)]).unwrap();
        assert_eq!(
            FaultCode::OutOfRange,
            make_locative(&mut heap, LocativeKind::Slot, v, Word::fix(1), false)
                .unwrap_err()
                .code()
        );
        assert_eq!(
            FaultCode::OutOfRange,
            make_locative(&mut heap, LocativeKind::Slot, v, Word::fix(-1), false)
                .unwrap_err()
                .code()
        );

        let bv = str::bytevector(&mut heap, &[0; 6]).unwrap();
        assert_eq!(
            FaultCode::OutOfRange,
            make_locative(&mut heap, LocativeKind::U32, bv, Word::fix(1), false)
                .unwrap_err()
                .code()
        );
        assert_eq!(
            FaultCode::BadArgumentType,
            make_locative(&mut heap, LocativeKind::Char, bv, Word::fix(0), false)
                .unwrap_err()
                .code()
        );
    }

    #[test]
    fn char_locatives() {
        let mut heap = Heap::with_capacity(256);

        let s = str::string(&mut heap, "abc").unwrap();
        let loc = make_locative(&mut heap, LocativeKind::Char, s, Word::fix(2), false).unwrap();

        assert_eq!(Word::from_char('c'), locative_ref(&mut heap, loc).unwrap());
        locative_set(&mut heap, loc, Word::from_char('z')).unwrap();
        assert_eq!(Some("abz"), str::string_to_str(&heap, s).unwrap());
    }

    #[test]
    fn numeric_locatives() {
        let mut heap = Heap::with_capacity(256);

        let bv = str::bytevector(&mut heap, &[0; 16]).unwrap();

        let s16 = make_locative(&mut heap, LocativeKind::S16, bv, Word::fix(1), false).unwrap();
        locative_set(&mut heap, s16, Word::fix(-2)).unwrap();
        assert_eq!(Word::fix(-2), locative_ref(&mut heap, s16).unwrap());
        assert_eq!(
            FaultCode::OutOfRange,
            locative_set(&mut heap, s16, Word::fix(40000))
                .unwrap_err()
                .code()
        );

        let u8_loc = make_locative(&mut heap, LocativeKind::U8, bv, Word::fix(2), false).unwrap();
        let low_byte = (-2i16).to_ne_bytes()[0];
        assert_eq!(
            Word::fix(low_byte as isize),
            locative_ref(&mut heap, u8_loc).unwrap()
        );

        let f64_loc = make_locative(&mut heap, LocativeKind::F64, bv, Word::fix(1), false).unwrap();
        locative_set(&mut heap, f64_loc, Word::fix(3)).unwrap();
        let value = locative_ref(&mut heap, f64_loc).unwrap();
        assert_eq!(3.0, flonum::value(&heap, value));
    }

    #[test]
    fn weak_locatives() {
        let mut heap = Heap::with_capacity(256);

        let v = vector::vector(&mut heap, &[Word::fix(1)]).unwrap();
        let loc = make_locative(&mut heap, LocativeKind::Slot, v, Word::fix(0), true).unwrap();
        assert_eq!(Word::FALSE, locative_to_object(&heap, loc).unwrap());

        heap.begin_collection(None);
        let new_loc = heap.evacuate(loc).unwrap();
        heap.settle_weak_references();
        heap.end_collection();

        let fault = locative_ref(&mut heap, new_loc).unwrap_err();
        assert_eq!(FaultCode::LostLocative, fault.code());
    }

    #[test]
    fn relocated_locatives() {
        let mut heap = Heap::with_capacity(256);

        let v = vector::vector(&mut heap, &[Word::fix(1), Word::fix(2)]).unwrap();
        let loc = make_locative(&mut heap, LocativeKind::Slot, v, Word::fix(1), true).unwrap();

        heap.begin_collection(None);
        let new_v = heap.evacuate(v).unwrap();
        let new_loc = heap.evacuate(loc).unwrap();
        heap.settle_weak_references();
        heap.end_collection();

        assert_ne!(v, new_v);
        assert_eq!(Word::fix(2), locative_ref(&mut heap, new_loc).unwrap());
    }
}
