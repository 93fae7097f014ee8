//! Symbols and keywords
//!
//! A symbol block holds its global value, its name string and its property list. Keywords use the
//! same layout with a property list of `#f` and evaluate to themselves.

use crate::boxed::types::{expect_kind, str};
use crate::boxed::{AsHeap, BlockKind, Heap};
use crate::fault::{FaultCode, Result};
use crate::intern::{KEYWORD_TABLE, SYMBOL_TABLE};
use crate::word::Word;

const VALUE_SLOT: usize = 0;
const NAME_SLOT: usize = 1;
const PLIST_SLOT: usize = 2;

fn is_symbol_block(heap: &Heap, x: Word) -> bool {
    heap.has_kind(x, BlockKind::Symbol)
}

fn expect_symbol(heap: &Heap, x: Word, site: &'static str) -> Result<Word> {
    expect_kind(heap, x, BlockKind::Symbol, FaultCode::NoSymbol, site)
}

fn intern_block(
    heap: &mut Heap,
    table: &str,
    name: &str,
    plist: Word,
    self_evaluating: bool,
) -> Result<Word> {
    if let Some(existing) = heap
        .symbol_tables()
        .find(table)
        .and_then(|table| table.lookup(name))
    {
        return Ok(existing);
    }

    let name_string = str::string(heap, name)?;
    let symbol = heap.alloc(BlockKind::Symbol, 3)?;

    heap.set_slot(
        symbol,
        VALUE_SLOT,
        if self_evaluating { symbol } else { Word::UNBOUND },
    );
    heap.set_slot(symbol, NAME_SLOT, name_string);
    heap.set_slot(symbol, PLIST_SLOT, plist);

    heap.symbol_tables_mut().add(table, 0).insert(name, symbol);
    Ok(symbol)
}

/// Returns the symbol with the given name in the default symbol table
///
/// Interning the same name twice returns the same block.
pub fn intern(heap: &mut impl AsHeap, name: &str) -> Result<Word> {
    intern_in(heap, SYMBOL_TABLE, name)
}

/// Returns the symbol with the given name in a named table
///
/// The table is created if it does not exist.
pub fn intern_in(heap: &mut impl AsHeap, table: &str, name: &str) -> Result<Word> {
    intern_block(heap.as_heap_mut(), table, name, Word::END_OF_LIST, false)
}

/// Returns the keyword with the given name
pub fn intern_keyword(heap: &mut impl AsHeap, name: &str) -> Result<Word> {
    intern_block(heap.as_heap_mut(), KEYWORD_TABLE, name, Word::FALSE, true)
}

/// Returns the symbol with the given name if it has been interned
pub fn find_symbol(heap: &impl AsHeap, name: &str) -> Option<Word> {
    heap.as_heap()
        .symbol_tables()
        .find(SYMBOL_TABLE)
        .and_then(|table| table.lookup(name))
}

/// Returns `#t` for symbols that are not keywords
pub fn symbolp(heap: &impl AsHeap, x: Word) -> Word {
    let heap = heap.as_heap();
    Word::make_bool(is_symbol_block(heap, x) && heap.slot(x, PLIST_SLOT) != Word::FALSE)
}

pub fn keywordp(heap: &impl AsHeap, x: Word) -> Word {
    let heap = heap.as_heap();
    Word::make_bool(is_symbol_block(heap, x) && heap.slot(x, PLIST_SLOT) == Word::FALSE)
}

/// Returns `#t` if the symbol has a global value
pub fn boundp(heap: &impl AsHeap, symbol: Word) -> Result<Word> {
    let heap = heap.as_heap();

    let symbol = expect_symbol(heap, symbol, "bound?")?;
    Ok(Word::make_bool(heap.slot(symbol, VALUE_SLOT) != Word::UNBOUND))
}

/// Returns the global value of a symbol
///
/// Unbound symbols return the unbound singleton.
pub fn symbol_value(heap: &impl AsHeap, symbol: Word) -> Result<Word> {
    let heap = heap.as_heap();
    Ok(heap.slot(expect_symbol(heap, symbol, "symbol-value")?, VALUE_SLOT))
}

pub fn set_symbol_value(heap: &mut impl AsHeap, symbol: Word, value: Word) -> Result<()> {
    let heap = heap.as_heap_mut();

    let symbol = expect_symbol(heap, symbol, "set!")?;
    heap.mutate(symbol, VALUE_SLOT, value);
    Ok(())
}

/// Returns the name string of a symbol or keyword
pub fn symbol_name(heap: &impl AsHeap, symbol: Word) -> Result<Word> {
    let heap = heap.as_heap();
    Ok(heap.slot(expect_symbol(heap, symbol, "symbol->string")?, NAME_SLOT))
}

/// Returns the property list of a symbol
pub fn symbol_plist(heap: &impl AsHeap, symbol: Word) -> Result<Word> {
    let heap = heap.as_heap();
    Ok(heap.slot(expect_symbol(heap, symbol, "symbol-plist")?, PLIST_SLOT))
}

/// Replaces the property list of a symbol
///
/// Keywords have no property list and fault.
pub fn set_symbol_plist(heap: &mut impl AsHeap, symbol: Word, plist: Word) -> Result<()> {
    if !symbolp(&*heap, symbol).is_true() {
        return fault!(NoSymbol, "set-symbol-plist!", symbol);
    }

    heap.as_heap_mut().mutate(symbol, PLIST_SLOT, plist);
    Ok(())
}

/// Returns `#t` if the symbol's name contains a namespace separator
pub fn namespacedp(heap: &impl AsHeap, symbol: Word) -> Result<Word> {
    let heap = heap.as_heap();

    let name = symbol_name(heap, symbol)?;
    Ok(Word::make_bool(heap.bytes(name).contains(&b'#')))
}

/// Returns if a symbol must be kept when saving the symbol table
///
/// A symbol persists if it is bound or has a non-empty property list. Keywords never do.
pub fn persistable(heap: &impl AsHeap, symbol: Word) -> Result<bool> {
    let heap = heap.as_heap();

    let symbol = expect_symbol(heap, symbol, "persistable")?;
    let plist = heap.slot(symbol, PLIST_SLOT);
    let bound = heap.slot(symbol, VALUE_SLOT) != Word::UNBOUND;

    Ok((bound || plist != Word::END_OF_LIST) && plist != Word::FALSE)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::boxed::types::list;

    #[test]
    fn interning() {
        let mut heap = Heap::with_capacity(256);

        let first = intern(&mut heap, "foo").unwrap();
        let second = intern(&mut heap, "foo").unwrap();
        let other = intern(&mut heap, "bar").unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(Some(first), find_symbol(&heap, "foo"));
        assert_eq!(None, find_symbol(&heap, "baz"));

        let name = symbol_name(&heap, first).unwrap();
        assert_eq!(Some("foo"), str::string_to_str(&heap, name).unwrap());
    }

    #[test]
    fn separate_tables() {
        let mut heap = Heap::with_capacity(256);

        let symbol = intern(&mut heap, "name").unwrap();
        let keyword = intern_keyword(&mut heap, "name").unwrap();
        let module = intern_in(&mut heap, "module", "name").unwrap();

        assert_ne!(symbol, keyword);
        assert_ne!(symbol, module);
        assert_eq!(module, intern_in(&mut heap, "module", "name").unwrap());
    }

    #[test]
    fn symbols_and_keywords() {
        let mut heap = Heap::with_capacity(256);

        let symbol = intern(&mut heap, "sym").unwrap();
        let keyword = intern_keyword(&mut heap, "key").unwrap();

        assert_eq!(Word::TRUE, symbolp(&heap, symbol));
        assert_eq!(Word::FALSE, keywordp(&heap, symbol));
        assert_eq!(Word::FALSE, symbolp(&heap, keyword));
        assert_eq!(Word::TRUE, keywordp(&heap, keyword));
        assert_eq!(Word::FALSE, symbolp(&heap, Word::fix(1)));

        assert_eq!(keyword, symbol_value(&heap, keyword).unwrap());
        assert_eq!(Word::TRUE, boundp(&heap, keyword).unwrap());
    }

    #[test]
    fn values() {
        let mut heap = Heap::with_capacity(256);
        let symbol = intern(&mut heap, "x").unwrap();

        assert_eq!(Word::FALSE, boundp(&heap, symbol).unwrap());
        assert_eq!(Word::UNBOUND, symbol_value(&heap, symbol).unwrap());
        assert!(!persistable(&heap, symbol).unwrap());

        set_symbol_value(&mut heap, symbol, Word::fix(42)).unwrap();
        assert_eq!(Word::TRUE, boundp(&heap, symbol).unwrap());
        assert_eq!(Word::fix(42), symbol_value(&heap, symbol).unwrap());
        assert!(persistable(&heap, symbol).unwrap());

        assert_eq!(
            FaultCode::NoSymbol,
            symbol_value(&heap, Word::TRUE).unwrap_err().code()
        );
    }

    #[test]
    fn plists() {
        let mut heap = Heap::with_capacity(256);

        let symbol = intern(&mut heap, "y").unwrap();
        let keyword = intern_keyword(&mut heap, "k").unwrap();
        let plist = list::list(&mut heap, &[Word::fix(1), Word::fix(2)]).unwrap();

        set_symbol_plist(&mut heap, symbol, plist).unwrap();
        assert_eq!(plist, symbol_plist(&heap, symbol).unwrap());
        assert!(persistable(&heap, symbol).unwrap());

        assert!(!persistable(&heap, keyword).unwrap());
        assert_eq!(
            FaultCode::NoSymbol,
            set_symbol_plist(&mut heap, keyword, plist).unwrap_err().code()
        );
    }

    #[test]
    fn namespaces() {
        let mut heap = Heap::with_capacity(256);

        let plain = intern(&mut heap, "car").unwrap();
        let qualified = intern(&mut heap, "scheme#car").unwrap();

        assert_eq!(Word::FALSE, namespacedp(&heap, plain).unwrap());
        assert_eq!(Word::TRUE, namespacedp(&heap, qualified).unwrap());
    }
}
