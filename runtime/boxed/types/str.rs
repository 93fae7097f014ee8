//! Byte blocks
//!
//! Strings, bytevectors and lambda info share one layout: a byte block holding the raw bytes with
//! no terminator. Strings are UTF-8 by convention but nothing here requires it.

use std::ffi::CString;

use crate::boxed::types::{expect_index, expect_kind};
use crate::boxed::{AsHeap, BlockKind, Heap};
use crate::fault::{Fault, FaultCode, Result};
use crate::word::Word;

fn expect_string(heap: &Heap, x: Word, site: &'static str) -> Result<Word> {
    expect_kind(heap, x, BlockKind::String, FaultCode::NoString, site)
}

fn expect_bytevector(heap: &Heap, x: Word, site: &'static str) -> Result<Word> {
    expect_kind(heap, x, BlockKind::Bytevector, FaultCode::NoBytevector, site)
}

fn alloc_bytes(heap: &mut Heap, kind: BlockKind, bytes: &[u8], permanent: bool) -> Result<Word> {
    let block = if permanent {
        heap.alloc_permanent(kind, bytes.len())?
    } else {
        heap.alloc(kind, bytes.len())?
    };

    heap.bytes_mut(block).copy_from_slice(bytes);
    Ok(block)
}

/// Allocates a string of `len` copies of the byte `fill`
pub fn make_string(heap: &mut impl AsHeap, len: usize, fill: u8) -> Result<Word> {
    let heap = heap.as_heap_mut();

    let string = heap.alloc(BlockKind::String, len)?;
    for byte in heap.bytes_mut(string) {
        *byte = fill;
    }

    Ok(string)
}

/// Allocates a string holding a copy of `value`
pub fn string(heap: &mut impl AsHeap, value: &str) -> Result<Word> {
    alloc_bytes(heap.as_heap_mut(), BlockKind::String, value.as_bytes(), false)
}

/// Allocates a bytevector holding a copy of `bytes`
pub fn bytevector(heap: &mut impl AsHeap, bytes: &[u8]) -> Result<Word> {
    alloc_bytes(heap.as_heap_mut(), BlockKind::Bytevector, bytes, false)
}

/// Allocates a string in the permanent space
pub fn static_string(heap: &mut impl AsHeap, value: &str) -> Result<Word> {
    alloc_bytes(heap.as_heap_mut(), BlockKind::String, value.as_bytes(), true)
}

/// Allocates a bytevector in the permanent space
pub fn static_bytevector(heap: &mut impl AsHeap, bytes: &[u8]) -> Result<Word> {
    alloc_bytes(heap.as_heap_mut(), BlockKind::Bytevector, bytes, true)
}

/// Allocates diagnostic lambda info in the permanent space
pub fn static_lambda_info(heap: &mut impl AsHeap, info: &str) -> Result<Word> {
    alloc_bytes(heap.as_heap_mut(), BlockKind::LambdaInfo, info.as_bytes(), true)
}

pub fn stringp(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(heap.as_heap().has_kind(x, BlockKind::String))
}

pub fn bytevectorp(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(heap.as_heap().has_kind(x, BlockKind::Bytevector))
}

pub fn lambda_infop(heap: &impl AsHeap, x: Word) -> Word {
    Word::make_bool(heap.as_heap().has_kind(x, BlockKind::LambdaInfo))
}

/// Returns the bytes of a string
pub fn string_bytes(heap: &impl AsHeap, string: Word) -> Result<&[u8]> {
    let heap = heap.as_heap();
    Ok(heap.bytes(expect_string(heap, string, "string->bytes")?))
}

/// Returns the contents of a string if they are valid UTF-8
pub fn string_to_str(heap: &impl AsHeap, string: Word) -> Result<Option<&str>> {
    string_bytes(heap, string).map(|bytes| std::str::from_utf8(bytes).ok())
}

pub fn string_length(heap: &impl AsHeap, string: Word) -> Result<usize> {
    string_bytes(heap, string).map(<[u8]>::len)
}

pub fn bytevector_length(heap: &impl AsHeap, bytevector: Word) -> Result<usize> {
    let heap = heap.as_heap();
    Ok(heap.block_size(expect_bytevector(heap, bytevector, "bytevector-length")?))
}

/// Returns the byte at a fixnum index of a string as a character
pub fn subchar(heap: &impl AsHeap, string: Word, index: Word) -> Result<Word> {
    let heap = heap.as_heap();

    let bytes = heap.bytes(expect_string(heap, string, "string-ref")?);
    let index = expect_index(index, bytes.len(), "string-ref")?;
    Ok(Word::make_char(u32::from(bytes[index])))
}

/// Replaces the byte at a fixnum index of a string
pub fn set_subchar(heap: &mut impl AsHeap, string: Word, index: Word, c: Word) -> Result<()> {
    let heap = heap.as_heap_mut();

    let string = expect_string(heap, string, "string-set!")?;
    if !c.is_char() || c.character() > 0xff {
        return Err(Fault::at(FaultCode::NoChar, "string-set!").with_operand(c));
    }

    let bytes = heap.bytes_mut(string);
    let index = expect_index(index, bytes.len(), "string-set!")?;
    bytes[index] = c.character() as u8;
    Ok(())
}

/// Returns the byte at a fixnum index of a bytevector as a fixnum
pub fn subbyte(heap: &impl AsHeap, bytevector: Word, index: Word) -> Result<Word> {
    let heap = heap.as_heap();

    let bytes = heap.bytes(expect_bytevector(heap, bytevector, "bytevector-u8-ref")?);
    let index = expect_index(index, bytes.len(), "bytevector-u8-ref")?;
    Ok(Word::fix(bytes[index] as isize))
}

/// Replaces the byte at a fixnum index of a bytevector
pub fn set_subbyte(heap: &mut impl AsHeap, bytevector: Word, index: Word, byte: Word) -> Result<()> {
    let heap = heap.as_heap_mut();

    let bytevector = expect_bytevector(heap, bytevector, "bytevector-u8-set!")?;
    if !byte.is_fixnum() || !(0..=0xff).contains(&byte.unfix()) {
        return Err(Fault::at(FaultCode::OutOfRange, "bytevector-u8-set!").with_operand(byte));
    }

    let bytes = heap.bytes_mut(bytevector);
    let index = expect_index(index, bytes.len(), "bytevector-u8-set!")?;
    bytes[index] = byte.unfix() as u8;
    Ok(())
}

/// Compares two strings byte by byte
pub fn string_equal(heap: &impl AsHeap, a: Word, b: Word) -> Result<Word> {
    let heap = heap.as_heap();

    let a = heap.bytes(expect_string(heap, a, "string=?")?);
    let b = heap.bytes(expect_string(heap, b, "string=?")?);
    Ok(Word::make_bool(a == b))
}

/// Reinterprets a freshly built string as a bytevector
pub fn string_to_bytevector(heap: &mut impl AsHeap, string: Word) -> Result<Word> {
    let heap = heap.as_heap_mut();

    let string = expect_string(heap, string, "string->bytevector")?;
    heap.reclassify(string, BlockKind::Bytevector);
    Ok(string)
}

/// Reinterprets a freshly built string as lambda info
pub fn string_to_lambda_info(heap: &mut impl AsHeap, string: Word) -> Result<Word> {
    let heap = heap.as_heap_mut();

    let string = expect_string(heap, string, "string->lambda-info")?;
    heap.reclassify(string, BlockKind::LambdaInfo);
    Ok(string)
}

/// Returns the text of lambda info
pub fn lambda_info_text(heap: &impl AsHeap, info: Word) -> Result<&[u8]> {
    let heap = heap.as_heap();
    Ok(heap.bytes(expect_kind(
        heap,
        info,
        BlockKind::LambdaInfo,
        FaultCode::BadArgumentType,
        "lambda-info",
    )?))
}

/// Copies a string in to a NUL terminated C string
///
/// Strings containing a NUL byte have no C representation.
pub fn to_c_string(heap: &impl AsHeap, string: Word) -> Result<CString> {
    let bytes = string_bytes(heap, string)?;

    CString::new(bytes).map_err(|_| {
        Fault::at(FaultCode::AsciizRepresentation, "string->c-string").with_operand(string)
    })
}
