//! In-memory index of canonical entities
//!
//! Entities keep the order storage returned them in (insertion order). The
//! prefix and substring lookups scan in that order and return the first hit,
//! which makes their tie-break reproducible across runs.

use std::collections::HashMap;

use crate::models::{CanonicalEntity, RegistryKind};

use super::normalize::{alphabetic_only, local_part, normalize_identifier};

#[derive(Debug, Clone)]
struct RegistryEntry {
    entity: CanonicalEntity,
    /// Normalized local part of the primary identifier
    local: String,
    /// `local` with non-letters removed
    cleaned_local: String,
}

/// Snapshot of one kind's canonical entities
#[derive(Debug, Clone)]
pub struct CanonicalRegistry {
    kind: RegistryKind,
    entries: Vec<RegistryEntry>,
    by_identifier: HashMap<String, usize>,
}

impl CanonicalRegistry {
    pub fn new(kind: RegistryKind, entities: Vec<CanonicalEntity>) -> Self {
        let mut by_identifier = HashMap::with_capacity(entities.len());
        let entries: Vec<RegistryEntry> = entities
            .into_iter()
            .enumerate()
            .map(|(index, entity)| {
                // Duplicate identifiers keep their first position
                by_identifier
                    .entry(entity.normalized_identifier.clone())
                    .or_insert(index);
                let local = local_part(&entity.normalized_identifier).to_string();
                let cleaned_local = alphabetic_only(&local);
                RegistryEntry {
                    entity,
                    local,
                    cleaned_local,
                }
            })
            .collect();

        Self {
            kind,
            entries,
            by_identifier,
        }
    }

    pub fn empty(kind: RegistryKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn kind(&self) -> RegistryKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-insensitive equality on the primary identifier
    pub fn find_exact(&self, raw: &str) -> Option<&CanonicalEntity> {
        self.by_identifier
            .get(&normalize_identifier(raw))
            .map(|&index| &self.entries[index].entity)
    }

    /// First entity whose local part starts with `local` followed by `.` or `_`
    pub fn find_by_local_prefix(&self, local: &str) -> Option<&CanonicalEntity> {
        if local.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|e| is_separated_prefix(&e.local, local))
            .map(|e| &e.entity)
    }

    /// First entity whose local part is `expanded` or extends it after a separator
    pub fn find_by_expanded_local(&self, expanded: &str) -> Option<&CanonicalEntity> {
        if expanded.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.local == expanded || is_separated_prefix(&e.local, expanded))
            .map(|e| &e.entity)
    }

    /// First entity whose letters-only local part contains `cleaned`
    pub fn find_by_substring(&self, cleaned: &str) -> Option<&CanonicalEntity> {
        if cleaned.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.cleaned_local.contains(cleaned))
            .map(|e| &e.entity)
    }
}

fn is_separated_prefix(candidate: &str, prefix: &str) -> bool {
    candidate
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('_'))
}

/// The registries one batch resolves against
///
/// Kinds that were not loaded behave as empty registries.
#[derive(Debug, Clone)]
pub struct RegistrySet {
    teachers: CanonicalRegistry,
    classes: CanonicalRegistry,
    subjects: CanonicalRegistry,
}

impl RegistrySet {
    pub fn empty() -> Self {
        Self {
            teachers: CanonicalRegistry::empty(RegistryKind::Teacher),
            classes: CanonicalRegistry::empty(RegistryKind::Class),
            subjects: CanonicalRegistry::empty(RegistryKind::Subject),
        }
    }

    pub fn insert(&mut self, registry: CanonicalRegistry) {
        match registry.kind() {
            RegistryKind::Teacher => self.teachers = registry,
            RegistryKind::Class => self.classes = registry,
            RegistryKind::Subject => self.subjects = registry,
        }
    }

    pub fn with(mut self, registry: CanonicalRegistry) -> Self {
        self.insert(registry);
        self
    }

    pub fn get(&self, kind: RegistryKind) -> &CanonicalRegistry {
        match kind {
            RegistryKind::Teacher => &self.teachers,
            RegistryKind::Class => &self.classes,
            RegistryKind::Subject => &self.subjects,
        }
    }
}

impl Default for RegistrySet {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn registry(identifiers: &[&str]) -> CanonicalRegistry {
        CanonicalRegistry::new(
            RegistryKind::Teacher,
            identifiers
                .iter()
                .map(|id| CanonicalEntity::new(Uuid::new_v4(), *id, *id))
                .collect(),
        )
    }

    #[test]
    fn test_find_exact_ignores_case() {
        let reg = registry(&["Budi.Santoso@school.id"]);
        assert!(reg.find_exact("budi.santoso@SCHOOL.id").is_some());
        assert!(reg.find_exact("budi@school.id").is_none());
    }

    #[test]
    fn test_duplicate_identifiers_keep_first() {
        let reg = registry(&["a@x", "A@X"]);
        assert_eq!(reg.find_exact("a@x").unwrap().primary_identifier, "a@x");
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_local_prefix_requires_separator() {
        let reg = registry(&["budiman@x", "budi_s@x"]);
        assert_eq!(
            reg.find_by_local_prefix("budi").unwrap().primary_identifier,
            "budi_s@x"
        );
        assert!(reg.find_by_local_prefix("").is_none());
    }

    #[test]
    fn test_expanded_local_matches_equal_or_extended() {
        let reg = registry(&["adi.sasmito.s.pd@x"]);
        assert!(reg.find_by_expanded_local("adi.sasmito").is_some());
        assert!(reg.find_by_expanded_local("adi.sasmito.s.pd").is_some());
        assert!(reg.find_by_expanded_local("adi.sas").is_none());
    }

    #[test]
    fn test_substring_first_in_registry_order() {
        let reg = registry(&["x.rina.y@x", "rina@x"]);
        assert_eq!(
            reg.find_by_substring("rina").unwrap().primary_identifier,
            "x.rina.y@x"
        );
        assert!(reg.find_by_substring("").is_none());
    }

    #[test]
    fn test_registry_set_defaults_to_empty() {
        let set = RegistrySet::empty().with(registry(&["a@x"]));
        assert_eq!(set.get(RegistryKind::Teacher).len(), 1);
        assert!(set.get(RegistryKind::Class).is_empty());
        assert_eq!(set.get(RegistryKind::Subject).kind(), RegistryKind::Subject);
    }
}
