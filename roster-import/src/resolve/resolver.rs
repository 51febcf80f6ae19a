//! Tiered identifier resolver

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use roster_common::config::ResolverConfig;

use crate::models::CanonicalEntity;

use super::normalize::{alphabetic_only, normalized_local_part};
use super::overrides::{CompoundAliases, OverrideTable};
use super::registry::CanonicalRegistry;

/// Which tier produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Exact,
    Override,
    NormalizedPrefix,
    Substring,
    Unresolved,
}

impl MatchStatus {
    /// 1-based tier number; UNRESOLVED sorts after every real tier
    pub fn tier(self) -> u8 {
        match self {
            MatchStatus::Exact => 1,
            MatchStatus::Override => 2,
            MatchStatus::NormalizedPrefix => 3,
            MatchStatus::Substring => 4,
            MatchStatus::Unresolved => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Exact => "EXACT",
            MatchStatus::Override => "OVERRIDE",
            MatchStatus::NormalizedPrefix => "NORMALIZED_PREFIX",
            MatchStatus::Substring => "SUBSTRING",
            MatchStatus::Unresolved => "UNRESOLVED",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolving one raw identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub status: MatchStatus,
    pub entity: Option<CanonicalEntity>,
    pub matched_tier: u8,
    /// The identifier exactly as supplied
    pub raw_identifier: String,
}

impl MatchResult {
    fn matched(status: MatchStatus, raw: &str, entity: &CanonicalEntity) -> Self {
        Self {
            status,
            entity: Some(entity.clone()),
            matched_tier: status.tier(),
            raw_identifier: raw.to_string(),
        }
    }

    fn unresolved(raw: &str) -> Self {
        Self {
            status: MatchStatus::Unresolved,
            entity: None,
            matched_tier: MatchStatus::Unresolved.tier(),
            raw_identifier: raw.to_string(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.entity.is_some()
    }

    /// Canonical identifier when resolved, otherwise the raw identifier
    pub fn resolved_identifier(&self) -> &str {
        self.entity
            .as_ref()
            .map_or(self.raw_identifier.as_str(), |e| e.primary_identifier.as_str())
    }
}

/// Resolves raw identifiers against a registry
///
/// Holds only configuration; registries are passed per call so one resolver
/// serves every batch.
#[derive(Debug, Clone, Default)]
pub struct IdentifierResolver {
    overrides: OverrideTable,
    aliases: CompoundAliases,
}

impl IdentifierResolver {
    pub fn new(overrides: OverrideTable, aliases: CompoundAliases) -> Self {
        Self { overrides, aliases }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(
            OverrideTable::from_rules(&config.overrides),
            CompoundAliases::from_config(&config.compound_aliases),
        )
    }

    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    /// Resolve one identifier; always returns a result
    pub fn resolve(&self, raw: &str, registry: &CanonicalRegistry) -> MatchResult {
        let result = self.resolve_tiers(raw, registry);
        debug!(
            registry = %registry.kind(),
            raw = %raw,
            status = %result.status,
            resolved = %result.resolved_identifier(),
            "Resolved identifier"
        );
        result
    }

    pub fn resolve_all<'a, I>(&self, raws: I, registry: &CanonicalRegistry) -> Vec<MatchResult>
    where
        I: IntoIterator<Item = &'a str>,
    {
        raws.into_iter()
            .map(|raw| self.resolve(raw, registry))
            .collect()
    }

    fn resolve_tiers(&self, raw: &str, registry: &CanonicalRegistry) -> MatchResult {
        if raw.trim().is_empty() {
            return MatchResult::unresolved(raw);
        }

        // Tier 1: EXACT
        if let Some(entity) = registry.find_exact(raw) {
            return MatchResult::matched(MatchStatus::Exact, raw, entity);
        }

        // Tier 2: OVERRIDE, only when the target exists
        for entry in self.overrides.candidates(raw) {
            match registry.find_exact(&entry.to_identifier) {
                Some(entity) => return MatchResult::matched(MatchStatus::Override, raw, entity),
                None => debug!(
                    from = %entry.from_identifier,
                    to = %entry.to_identifier,
                    "Override target not in registry, ignoring"
                ),
            }
        }

        let raw_local = normalized_local_part(raw);

        // Tier 3: NORMALIZED_PREFIX, compound aliases first
        if let Some(expanded) = self.aliases.expand(&raw_local) {
            if let Some(entity) = registry.find_by_expanded_local(expanded) {
                return MatchResult::matched(MatchStatus::NormalizedPrefix, raw, entity);
            }
        }
        if let Some(entity) = registry.find_by_local_prefix(&raw_local) {
            return MatchResult::matched(MatchStatus::NormalizedPrefix, raw, entity);
        }

        // Tier 4: SUBSTRING. Several entities can contain the same letters;
        // the first in registry order is taken without further ranking.
        if let Some(entity) = registry.find_by_substring(&alphabetic_only(&raw_local)) {
            return MatchResult::matched(MatchStatus::Substring, raw, entity);
        }

        MatchResult::unresolved(raw)
    }
}
