//! Alias lookup boundary.
//!
//! The engine consumes aliases through the [`AliasLookup`] trait: forward
//! lookups drive the alias-required filter, and the reverse lookup lets the
//! participant resolver turn a contact name embedded in a fragment filename
//! back into a number. The persistent store format behind the trait is the
//! caller's concern.

use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::phone::PhoneNumber;

/// Read-only alias resolution.
///
/// Implementations must be cheap to call per message; the filter pipeline
/// consults [`has_alias`](AliasLookup::has_alias) for every record when the
/// alias-required filter is active.
pub trait AliasLookup: Send + Sync {
    /// Returns `true` if `phone` has a registered alias.
    fn has_alias(&self, phone: &PhoneNumber) -> bool;

    /// Returns the display alias for `phone`, if registered.
    fn alias_for(&self, phone: &PhoneNumber) -> Option<String>;

    /// Reverse lookup: the number registered under `alias`, if any.
    ///
    /// Matching is case-insensitive for ASCII.
    fn number_for_alias(&self, alias: &str) -> Option<PhoneNumber>;
}

/// In-memory alias store.
///
/// # Example
///
/// ```
/// use voicepack::alias::{AliasLookup, MemoryAliasStore};
/// use voicepack::phone::PhoneNumber;
///
/// let mut store = MemoryAliasStore::new();
/// let number = PhoneNumber::normalize("+15550100200")?;
/// store.insert(number.clone(), "Alice");
///
/// assert!(store.has_alias(&number));
/// assert_eq!(store.number_for_alias("alice"), Some(number));
/// # Ok::<(), voicepack::VoicepackError>(())
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryAliasStore {
    forward: HashMap<PhoneNumber, String>,
}

impl MemoryAliasStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an alias for a number, replacing any existing one.
    pub fn insert(&mut self, phone: PhoneNumber, alias: impl Into<String>) {
        self.forward.insert(phone, alias.into());
    }

    /// Loads a store from a JSON object mapping numbers to aliases:
    /// `{"+15550100200": "Alice", ...}`.
    ///
    /// Keys are normalized on load; unparseable keys are skipped.
    pub fn load_json(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let map: HashMap<String, String> = serde_json::from_str(&raw)?;

        let mut store = Self::new();
        for (key, alias) in map {
            if let Ok(phone) = PhoneNumber::normalize(&key) {
                store.insert(phone, alias);
            }
        }
        Ok(store)
    }

    /// Returns the number of registered aliases.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

impl AliasLookup for MemoryAliasStore {
    fn has_alias(&self, phone: &PhoneNumber) -> bool {
        self.forward.contains_key(phone)
    }

    fn alias_for(&self, phone: &PhoneNumber) -> Option<String> {
        self.forward.get(phone).cloned()
    }

    fn number_for_alias(&self, alias: &str) -> Option<PhoneNumber> {
        self.forward
            .iter()
            .find(|(_, a)| a.eq_ignore_ascii_case(alias))
            .map(|(n, _)| n.clone())
    }
}

/// A store with no aliases. Useful when no alias file is supplied.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAliases;

impl AliasLookup for NoAliases {
    fn has_alias(&self, _phone: &PhoneNumber) -> bool {
        false
    }

    fn alias_for(&self, _phone: &PhoneNumber) -> Option<String> {
        None
    }

    fn number_for_alias(&self, _alias: &str) -> Option<PhoneNumber> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn num(s: &str) -> PhoneNumber {
        PhoneNumber::normalize(s).unwrap()
    }

    #[test]
    fn test_forward_lookup() {
        let mut store = MemoryAliasStore::new();
        store.insert(num("+15550100200"), "Alice");

        assert!(store.has_alias(&num("+15550100200")));
        assert_eq!(store.alias_for(&num("+15550100200")).as_deref(), Some("Alice"));
        assert!(!store.has_alias(&num("+15550100300")));
    }

    #[test]
    fn test_reverse_lookup_case_insensitive() {
        let mut store = MemoryAliasStore::new();
        store.insert(num("+15550100200"), "Alice");

        assert_eq!(store.number_for_alias("ALICE"), Some(num("+15550100200")));
        assert_eq!(store.number_for_alias("Bob"), None);
    }

    #[test]
    fn test_load_json_normalizes_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"(555) 010-0200": "Alice", "garbage": "Bob"}}"#
        )
        .unwrap();

        let store = MemoryAliasStore::load_json(file.path()).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.has_alias(&num("+15550100200")));
    }

    #[test]
    fn test_no_aliases() {
        let store = NoAliases;
        assert!(!store.has_alias(&num("+15550100200")));
        assert!(store.number_for_alias("Alice").is_none());
    }
}
