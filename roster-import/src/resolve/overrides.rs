//! Hand-curated identifier tables
//!
//! Both tables are plain configuration handed to the resolver at construction
//! time. Nothing here knows about the registry: an override whose target does
//! not exist is simply never applied.

use std::collections::HashMap;

use roster_common::config::{CompoundAlias, OverrideRule};

use super::normalize::{normalize_identifier, normalized_local_part};

/// Historical identifier → canonical identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideEntry {
    pub from_identifier: String,
    pub to_identifier: String,
}

impl OverrideEntry {
    pub fn new(from_identifier: impl Into<String>, to_identifier: impl Into<String>) -> Self {
        Self {
            from_identifier: from_identifier.into(),
            to_identifier: to_identifier.into(),
        }
    }
}

/// Ordered override list with a normalized lookup index
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    entries: Vec<OverrideEntry>,
    by_from: HashMap<String, Vec<usize>>,
}

impl OverrideTable {
    pub fn new(entries: Vec<OverrideEntry>) -> Self {
        let mut by_from: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, entry) in entries.iter().enumerate() {
            by_from
                .entry(normalize_identifier(&entry.from_identifier))
                .or_default()
                .push(index);
        }
        Self { entries, by_from }
    }

    pub fn from_rules(rules: &[OverrideRule]) -> Self {
        Self::new(
            rules
                .iter()
                .map(|rule| OverrideEntry::new(rule.from.clone(), rule.to.clone()))
                .collect(),
        )
    }

    /// Entries whose `from_identifier` matches `raw` case-insensitively, in
    /// configuration order
    pub fn candidates<'a>(&'a self, raw: &str) -> impl Iterator<Item = &'a OverrideEntry> + 'a {
        self.by_from
            .get(&normalize_identifier(raw))
            .into_iter()
            .flatten()
            .map(move |&index| &self.entries[index])
    }

    pub fn entries(&self) -> &[OverrideEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compact local parts that stand for a separator-containing form
///
/// `adisasmito` → `adi.sasmito` lets `adisasmito@...` reach
/// `adi.sasmito.s.pd@...` through the prefix tier.
#[derive(Debug, Clone, Default)]
pub struct CompoundAliases {
    expanded_by_compact: HashMap<String, String>,
}

impl CompoundAliases {
    pub fn new<I, C, E>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, E)>,
        C: AsRef<str>,
        E: AsRef<str>,
    {
        let mut expanded_by_compact = HashMap::new();
        for (compact, expanded) in pairs {
            // First definition of a compact form wins
            expanded_by_compact
                .entry(normalized_local_part(compact.as_ref()))
                .or_insert_with(|| normalized_local_part(expanded.as_ref()));
        }
        Self { expanded_by_compact }
    }

    pub fn from_config(aliases: &[CompoundAlias]) -> Self {
        Self::new(aliases.iter().map(|a| (&a.compact, &a.expanded)))
    }

    /// Expanded form for a normalized local part
    pub fn expand(&self, local: &str) -> Option<&str> {
        self.expanded_by_compact.get(local).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.expanded_by_compact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded_by_compact.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_are_case_insensitive_and_ordered() {
        let table = OverrideTable::new(vec![
            OverrideEntry::new("Budi@School.id", "ghost@school.id"),
            OverrideEntry::new("other@school.id", "x@school.id"),
            OverrideEntry::new("budi@school.id", "budi.santoso@school.id"),
        ]);

        let targets: Vec<&str> = table
            .candidates("  BUDI@school.id")
            .map(|e| e.to_identifier.as_str())
            .collect();

        assert_eq!(targets, vec!["ghost@school.id", "budi.santoso@school.id"]);
        assert_eq!(table.candidates("nobody@school.id").count(), 0);
    }

    #[test]
    fn test_from_rules() {
        let table = OverrideTable::from_rules(&[OverrideRule {
            from: "a@x".to_string(),
            to: "b@x".to_string(),
        }]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.entries()[0], OverrideEntry::new("a@x", "b@x"));
    }

    #[test]
    fn test_compound_alias_uses_local_parts() {
        let aliases = CompoundAliases::new([("AdiSasmito@school.id", "Adi.Sasmito")]);
        assert_eq!(aliases.expand("adisasmito"), Some("adi.sasmito"));
        assert_eq!(aliases.expand("adi"), None);
    }

    #[test]
    fn test_first_alias_definition_wins() {
        let aliases = CompoundAliases::new([("rini", "rini.w"), ("rini", "rini.x")]);
        assert_eq!(aliases.expand("rini"), Some("rini.w"));
        assert_eq!(aliases.len(), 1);
    }
}
