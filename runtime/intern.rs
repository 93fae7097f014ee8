//! Symbol tables
//!
//! Each table maps interned names to their symbol blocks. Several named tables coexist; symbols
//! and keywords are kept apart by default and embedders can add further namespaces.

use std::collections::HashMap;

use crate::word::Word;

/// Name of the table ordinary symbols are interned in
pub const SYMBOL_TABLE: &str = "symbols";
/// Name of the table keywords are interned in
pub const KEYWORD_TABLE: &str = "keywords";

const DEFAULT_TABLE_SIZE: usize = 2999;

/// Named table of interned symbols
#[derive(Debug)]
pub struct SymbolTable {
    name: Box<str>,
    entries: HashMap<Box<str>, Word>,
}

impl SymbolTable {
    fn with_capacity(name: &str, capacity: usize) -> SymbolTable {
        SymbolTable {
            name: name.into(),
            entries: HashMap::with_capacity(capacity),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the symbol interned under `name`
    pub fn lookup(&self, name: &str) -> Option<Word> {
        self.entries.get(name).copied()
    }

    pub(crate) fn insert(&mut self, name: &str, symbol: Word) {
        self.entries.insert(name.into(), symbol);
    }

    /// Returns the number of symbols the table holds before it reallocates
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    /// Returns the number of interned symbols
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over interned names and their symbols
    pub fn iter(&self) -> impl Iterator<Item = (&str, Word)> {
        self.entries.iter().map(|(name, symbol)| (name.as_ref(), *symbol))
    }
}

/// Chain of symbol tables
#[derive(Debug)]
pub struct SymbolTables {
    tables: Vec<SymbolTable>,
}

impl SymbolTables {
    /// Returns the default symbol and keyword tables
    pub fn new() -> SymbolTables {
        SymbolTables {
            tables: vec![
                SymbolTable::with_capacity(SYMBOL_TABLE, DEFAULT_TABLE_SIZE),
                SymbolTable::with_capacity(KEYWORD_TABLE, DEFAULT_TABLE_SIZE),
            ],
        }
    }

    /// Returns a chain with no tables
    ///
    /// This holds the place of the heap's tables while their entries are being updated.
    pub(crate) fn detached() -> SymbolTables {
        SymbolTables { tables: Vec::new() }
    }

    /// Adds a new empty table returning it
    ///
    /// An existing table with the same name is returned unchanged.
    pub fn add(&mut self, name: &str, capacity: usize) -> &mut SymbolTable {
        let index = match self.tables.iter().position(|table| table.name() == name) {
            Some(index) => index,
            None => {
                log::debug!("adding symbol table {}", name);
                self.tables.push(SymbolTable::with_capacity(name, capacity));
                self.tables.len() - 1
            }
        };

        &mut self.tables[index]
    }

    /// Returns the table with the given name
    pub fn find(&self, name: &str) -> Option<&SymbolTable> {
        self.tables.iter().find(|table| table.name() == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut SymbolTable> {
        self.tables.iter_mut().find(|table| table.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SymbolTable> {
        self.tables.iter()
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut Word> {
        self.tables
            .iter_mut()
            .flat_map(|table| table.entries.values_mut())
    }
}

impl Default for SymbolTables {
    fn default() -> SymbolTables {
        SymbolTables::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_tables() {
        let tables = SymbolTables::new();

        assert!(tables.find(SYMBOL_TABLE).is_some());
        assert!(tables.find(KEYWORD_TABLE).is_some());
        assert!(tables.find("other").is_none());
    }

    #[test]
    fn add_is_idempotent() {
        let mut tables = SymbolTables::new();

        tables.add("module", 16).insert("x", Word::fix(1));
        tables.add("module", 16);

        assert_eq!(3, tables.iter().count());
        assert_eq!(
            Some(Word::fix(1)),
            tables.find("module").and_then(|table| table.lookup("x"))
        );
    }
}
