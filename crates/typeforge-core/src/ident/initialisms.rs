//! Initialism table used during canonicalization.

use rustc_hash::FxHashSet;

/// Initialisms preserved as a unit by default.
///
/// Only entries that are very unlikely to be ordinary words belong here:
/// "ID" is fine, "AND" is not.
const COMMON: &[&str] = &[
    "API", "ASCII", "CPU", "CSS", "DB", "DNS", "EOF", "GUID", "HTML", "HTTP", "HTTPS", "ID", "IP",
    "JSON", "LHS", "NTP", "QPS", "RAM", "RHS", "RPC", "SLA", "SMTP", "SSH", "TLS", "TTL", "UI",
    "UID", "URI", "URL", "UTF8", "UUID", "VM", "XML",
];

/// A case-insensitive set of initialisms.
///
/// Entries are stored in their canonical uppercase form; lookups
/// uppercase the word first.
#[derive(Debug, Clone)]
pub struct Initialisms {
    entries: FxHashSet<String>,
}

impl Initialisms {
    /// An empty table: no word is treated as an initialism.
    pub fn empty() -> Self {
        Self {
            entries: FxHashSet::default(),
        }
    }

    /// The default table.
    pub fn common() -> Self {
        Self::empty().with_extra(COMMON.iter().copied())
    }

    /// Merge additional entries into the table.
    pub fn with_extra<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for entry in extra {
            self.insert(entry.as_ref());
        }
        self
    }

    /// Add a single entry. Blank entries are ignored.
    pub fn insert(&mut self, entry: &str) {
        let entry = entry.trim();
        if !entry.is_empty() {
            self.entries.insert(entry.to_uppercase());
        }
    }

    /// Canonical form of `word` if it is an initialism.
    pub fn lookup(&self, word: &str) -> Option<&str> {
        self.entries
            .get(word.to_uppercase().as_str())
            .map(String::as_str)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.lookup(word).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Initialisms {
    fn default() -> Self {
        Self::common()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let table = Initialisms::common();
        assert_eq!(table.lookup("id"), Some("ID"));
        assert_eq!(table.lookup("Url"), Some("URL"));
        assert_eq!(table.lookup("utf8"), Some("UTF8"));
        assert_eq!(table.lookup("user"), None);
    }

    #[test]
    fn test_with_extra() {
        let table = Initialisms::empty().with_extra(["sku", " ", "Sql"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("SKU"), Some("SKU"));
        assert_eq!(table.lookup("sql"), Some("SQL"));
        assert!(!table.contains("id"));
    }
}
