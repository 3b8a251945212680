//! Atom interning.
//!
//! Every unique byte sequence interned through this module maps to exactly
//! one `StringId`; byte-equal atoms are handle-equal (the atom-uniqueness
//! invariant). Interning itself is case-sensitive on content —
//! `"Forward"` and `"forward"` are different atoms with different ids — but
//! name *lookup* at the language level (procedure names, primitive names,
//! variable names) is case-insensitive, so `Interner` separately maintains a
//! folded-case index used only for that purpose.

use ahash::AHashMap;

/// Handle into the atom interner.
///
/// `u32` keeps heap nodes small; four billion unique atoms is far more than
/// any realistic workspace needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, serde::Serialize, serde::Deserialize)]
pub struct StringId(u32);

impl StringId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// ASCII case-fold used for all language-level name comparisons.
#[must_use]
pub fn fold_case(s: &str) -> String {
    s.to_ascii_lowercase()
}

/// The atom interner.
///
/// Stores each unique string once in `strings`, plus a reverse index for
/// interning lookups and a separate case-folded index so that callers doing
/// name resolution (procedure/primitive/variable lookup) don't need to
/// allocate a folded copy of every candidate on every lookup.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Interner {
    strings: Vec<Box<str>>,
    by_value: AHashMap<Box<str>, StringId>,
    /// folded(name) -> ids of every interned spelling that folds to it, most
    /// recently interned last. Case-insensitive lookups take the last one,
    /// matching "last definition wins" for things like procedure redefinition
    /// that go through this same folding.
    by_fold: AHashMap<Box<str>, Vec<StringId>>,
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `s`, returning the existing id if this exact byte sequence
    /// was already interned (atom uniqueness).
    pub fn intern(&mut self, s: &str) -> StringId {
        if let Some(&id) = self.by_value.get(s) {
            return id;
        }
        let id = StringId(self.strings.len() as u32);
        self.strings.push(s.into());
        self.by_value.insert(s.into(), id);
        self.by_fold.entry(fold_case(s)).or_default().push(id);
        id
    }

    #[must_use]
    pub fn get(&self, id: StringId) -> &str {
        &self.strings[id.index()]
    }

    /// Looks up the most recently interned spelling matching `name`,
    /// case-insensitively. Returns `None` if nothing with this folded name
    /// has ever been interned.
    #[must_use]
    pub fn find_ci(&self, name: &str) -> Option<StringId> {
        self.by_fold.get(&fold_case(name)).and_then(|ids| ids.last().copied())
    }

    /// True if `a` and `b` are the same atom ignoring case — the
    /// "lookups are case-insensitive" rule of, used for
    /// things like comparing a quoted word against a catch tag.
    #[must_use]
    pub fn eq_ci(&self, a: StringId, b: StringId) -> bool {
        a == b || fold_case(self.get(a)) == fold_case(self.get(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atom_uniqueness() {
        let mut interns = Interner::new();
        let a1 = interns.intern("hello");
        let a2 = interns.intern("hello");
        let b = interns.intern("world");
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
    }

    #[test]
    fn case_sensitive_interning_case_insensitive_lookup() {
        let mut interns = Interner::new();
        let lower = interns.intern("forward");
        let upper = interns.intern("FORWARD");
        assert_ne!(lower, upper, "distinct byte sequences intern to distinct handles");
        assert_eq!(interns.find_ci("Forward"), Some(upper), "lookup takes the most recent spelling");
        assert!(interns.eq_ci(lower, upper));
    }
}
