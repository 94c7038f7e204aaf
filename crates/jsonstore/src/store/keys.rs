use string_interner::{backend::BucketBackend, symbol::SymbolU32, StringInterner, Symbol};

/// Coarse classification of an object key, computed once when the key is interned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyClass {
    Regular,
    /// Vendor extension, e.g. `x-internal`.
    Extension,
    /// Reserved keyword, e.g. `$ref`.
    Keyword,
}

impl KeyClass {
    #[must_use]
    pub fn of(key: &str) -> KeyClass {
        if key.starts_with('$') {
            KeyClass::Keyword
        } else if key.starts_with("x-") {
            KeyClass::Extension
        } else {
            KeyClass::Regular
        }
    }
}

/// Canonical object key. Two keys from the same store are equal iff their text is equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InternedKey {
    pub(crate) store: u64,
    pub(crate) symbol: SymbolU32,
}

impl InternedKey {
    /// Identity of the store that interned this key.
    #[must_use]
    pub fn store_id(&self) -> u64 {
        self.store
    }
}

#[derive(Debug)]
pub(crate) struct Keys {
    interner: StringInterner<BucketBackend<SymbolU32>, ahash::RandomState>,
    /// Indexed by symbol.
    classes: Vec<KeyClass>,
}

impl Default for Keys {
    fn default() -> Self {
        Keys {
            interner: StringInterner::new(),
            classes: Vec::new(),
        }
    }
}

impl Keys {
    pub(crate) fn intern(&mut self, text: &str) -> SymbolU32 {
        let symbol = self.interner.get_or_intern(text);
        if symbol.to_usize() == self.classes.len() {
            self.classes.push(KeyClass::of(text));
        }
        symbol
    }

    pub(crate) fn lookup(&self, text: &str) -> Option<SymbolU32> {
        self.interner.get(text)
    }

    pub(crate) fn resolve(&self, symbol: SymbolU32) -> Option<&str> {
        self.interner.resolve(symbol)
    }

    pub(crate) fn class(&self, symbol: SymbolU32) -> Option<KeyClass> {
        self.classes.get(symbol.to_usize()).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.classes.len()
    }
}
