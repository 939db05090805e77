//! The macro table: an ordered collection of macro entries, looked up by
//! name and scanned in declaration order by the expander.

/// A single `#define`. Object-like macros have an empty `params` and
/// `variadic == false`. A macro's replacement text is stored verbatim and is
/// never parsed at definition time — parsing (parameter substitution,
/// stringification, pasting) happens lazily, once per expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroEntry {
    pub name: String,
    pub value: String,
    pub params: Vec<String>,
    pub variadic: bool,
    /// Fast short-circuit for the common `#define A A` / `#define A B` +
    /// `#define B A` mutual-reference pattern, set in [`MacroTable::add`] and
    /// recomputed globally on [`MacroTable::remove`].
    pub is_cyclic: bool,
}

impl MacroEntry {
    pub fn object_like(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), params: Vec::new(), variadic: false, is_cyclic: false }
    }

    pub fn function_like(
        name: impl Into<String>,
        value: impl Into<String>,
        params: Vec<String>,
        variadic: bool,
    ) -> Self {
        Self { name: name.into(), value: value.into(), params, variadic, is_cyclic: false }
    }

    pub fn is_function_like(&self) -> bool {
        !self.params.is_empty() || self.variadic
    }
}

/// Ordered insertion sequence of [`MacroEntry`] values. Names are not
/// required to be unique: a later `#define` of an existing name is appended
/// rather than replacing the earlier entry, and [`MacroTable::lookup`]
/// returns the *last* matching entry so that observable behavior matches
/// source-level redefinition.
#[derive(Debug, Default, Clone)]
pub struct MacroTable {
    entries: Vec<MacroEntry>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self { entries: Vec::with_capacity(crate::config::MACRO_TABLE_CHUNK) }
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&MacroEntry> {
        self.entries.get(i)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MacroEntry> {
        self.entries.iter()
    }

    /// Index of the last entry whose name matches `name` (case-sensitive).
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.entries.iter().rposition(|e| e.name == name)
    }

    pub fn lookup_entry(&self, name: &str) -> Option<&MacroEntry> {
        self.lookup(name).and_then(|i| self.entries.get(i))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn add_object(&mut self, name: impl Into<String>, value: impl Into<String>) -> usize {
        self.add(MacroEntry::object_like(name, value))
    }

    /// Appends `entry`, marking mutual self-reference cycles against every
    /// existing entry: any entry `E` whose name equals `entry.value` and
    /// whose value equals `entry.name` is a direct two-cycle, and both
    /// entries get `is_cyclic = true`.
    pub fn add(&mut self, entry: MacroEntry) -> usize {
        let mut entry = entry;
        for existing in &mut self.entries {
            if existing.name == entry.value && existing.value == entry.name {
                existing.is_cyclic = true;
                entry.is_cyclic = true;
            }
        }
        self.entries.push(entry);
        self.entries.len() - 1
    }

    pub fn add_all(&mut self, entries: impl IntoIterator<Item = MacroEntry>) {
        for entry in entries {
            self.add(entry);
        }
    }

    pub fn insert_at(&mut self, index: usize, entry: MacroEntry) {
        let index = index.min(self.entries.len());
        self.entries.insert(index, entry);
        self.recompute_cycles();
    }

    /// Removes the entry at `index`, if any, and recomputes `is_cyclic`
    /// flags for the whole table (a removal can break a mutual reference).
    pub fn remove(&mut self, index: usize) -> Option<MacroEntry> {
        if index >= self.entries.len() {
            return None;
        }
        let removed = self.entries.remove(index);
        self.recompute_cycles();
        Some(removed)
    }

    /// Removes the last entry named `name`, per `#undef` semantics.
    pub fn undef(&mut self, name: &str) -> bool {
        match self.lookup(name) {
            Some(i) => {
                self.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn recompute_cycles(&mut self) {
        for e in &mut self.entries {
            e.is_cyclic = false;
        }
        let snapshot: Vec<(String, String)> =
            self.entries.iter().map(|e| (e.name.clone(), e.value.clone())).collect();
        for i in 0..snapshot.len() {
            for j in 0..snapshot.len() {
                if i == j {
                    continue;
                }
                if snapshot[i].0 == snapshot[j].1 && snapshot[i].1 == snapshot[j].0 {
                    self.entries[i].is_cyclic = true;
                    self.entries[j].is_cyclic = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_returns_last_match() {
        let mut t = MacroTable::new();
        t.add_object("A", "1");
        t.add_object("A", "2");
        let idx = t.lookup("A").unwrap();
        assert_eq!(t.get(idx).unwrap().value, "2");
    }

    #[test]
    fn mutual_reference_sets_cyclic_flag() {
        let mut t = MacroTable::new();
        t.add_object("A", "B");
        t.add_object("B", "A");
        assert!(t.lookup_entry("A").unwrap().is_cyclic);
        assert!(t.lookup_entry("B").unwrap().is_cyclic);
    }

    #[test]
    fn remove_recomputes_cycles() {
        let mut t = MacroTable::new();
        t.add_object("A", "B");
        t.add_object("B", "A");
        let idx = t.lookup("B").unwrap();
        t.remove(idx);
        assert!(!t.lookup_entry("A").unwrap().is_cyclic);
    }

    #[test]
    fn undef_removes_last_match_only() {
        let mut t = MacroTable::new();
        t.add_object("A", "1");
        t.add_object("A", "2");
        assert!(t.undef("A"));
        assert_eq!(t.lookup_entry("A").unwrap().value, "1");
    }

    #[test]
    fn clear_empties_table() {
        let mut t = MacroTable::new();
        t.add_object("A", "1");
        t.clear();
        assert_eq!(t.size(), 0);
    }
}
