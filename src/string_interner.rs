use serde::Serialize;
use std::collections::HashMap;

#[derive(PartialEq, Debug, Clone, Copy, Hash, Eq, PartialOrd, Ord, Serialize)]
pub struct Symbol(u32);

/// Owns every identifier and literal text seen by the tokenizer, so that
/// tokens and syntax nodes can refer to them by a small copyable handle.
#[derive(Default, Serialize)]
pub struct StringInterner {
    symbols: HashMap<Box<str>, Symbol>,
    strings: Vec<Box<str>>,
}

impl StringInterner {
    pub fn new() -> StringInterner {
        StringInterner::default()
    }

    pub fn add(&mut self, text: &str) -> Symbol {
        if let Some(sym) = self.symbols.get(text) {
            return *sym;
        }

        let sym = Symbol(self.strings.len() as u32);
        let s: Box<str> = text.into();

        self.strings.push(s.clone());
        self.symbols.insert(s, sym);

        sym
    }

    pub fn find_symbol(&self, text: &str) -> Option<Symbol> {
        self.symbols.get(text).copied()
    }

    pub fn get(&self, symbol: &Symbol) -> &str {
        &self.strings[symbol.0 as usize]
    }

    /// The `pkg.Name` key under which imported types are registered.
    pub fn qualified(&self, package: &Symbol, name: &Symbol) -> String {
        format!("{}.{}", self.get(package), self.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_dedupes_identifiers() {
        let mut interner = StringInterner::new();

        let a = interner.add("MySlice");
        let b = interner.add("time");
        let c = interner.add("Time");
        let d = interner.add("Time");

        assert_eq!(c, d);
        assert_ne!(a, b);
        assert_ne!(b, c);

        assert_eq!(interner.get(&a), "MySlice");
        assert_eq!(interner.get(&b), "time");
        assert_eq!(interner.get(&c), "Time");

        assert_eq!(interner.find_symbol("time"), Some(b));
        assert_eq!(interner.qualified(&b, &c), "time.Time");
        assert_eq!(interner.find_symbol("Location"), None);
    }
}
