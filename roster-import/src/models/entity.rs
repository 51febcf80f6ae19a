//! Entity kinds and canonical entity snapshots

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::resolve::normalize::normalize_identifier;

/// Kind of row a batch imports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Teacher,
    Student,
    Class,
    Subject,
    Schedule,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Teacher,
        EntityKind::Student,
        EntityKind::Class,
        EntityKind::Subject,
        EntityKind::Schedule,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Teacher => "teacher",
            EntityKind::Student => "student",
            EntityKind::Class => "class",
            EntityKind::Subject => "subject",
            EntityKind::Schedule => "schedule",
        }
    }

    /// Registries whose entities rows of this kind may reference
    pub fn referenced_registries(self) -> &'static [RegistryKind] {
        match self {
            EntityKind::Teacher => &[RegistryKind::Class],
            EntityKind::Student => &[RegistryKind::Class],
            EntityKind::Class => &[RegistryKind::Teacher],
            EntityKind::Subject => &[],
            EntityKind::Schedule => &[
                RegistryKind::Class,
                RegistryKind::Teacher,
                RegistryKind::Subject,
            ],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    /// Accepts singular and plural forms, case-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "teacher" | "teachers" => Ok(EntityKind::Teacher),
            "student" | "students" => Ok(EntityKind::Student),
            "class" | "classes" => Ok(EntityKind::Class),
            "subject" | "subjects" => Ok(EntityKind::Subject),
            "schedule" | "schedules" => Ok(EntityKind::Schedule),
            other => Err(format!("unknown entity kind: {}", other)),
        }
    }
}

/// Kinds that other rows refer to, and therefore have a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    Teacher,
    Class,
    Subject,
}

impl RegistryKind {
    pub const ALL: [RegistryKind; 3] = [RegistryKind::Teacher, RegistryKind::Class, RegistryKind::Subject];

    pub fn as_str(self) -> &'static str {
        match self {
            RegistryKind::Teacher => "teacher",
            RegistryKind::Class => "class",
            RegistryKind::Subject => "subject",
        }
    }

    pub fn entity_kind(self) -> EntityKind {
        match self {
            RegistryKind::Teacher => EntityKind::Teacher,
            RegistryKind::Class => EntityKind::Class,
            RegistryKind::Subject => EntityKind::Subject,
        }
    }
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<EntityKind>()? {
            EntityKind::Teacher => Ok(RegistryKind::Teacher),
            EntityKind::Class => Ok(RegistryKind::Class),
            EntityKind::Subject => Ok(RegistryKind::Subject),
            other => Err(format!("{} has no registry", other)),
        }
    }
}

/// Stored entity as seen by one batch
///
/// Snapshots are read once when the batch starts and never refreshed, so a
/// batch resolves against one consistent view even if storage changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub id: Uuid,
    /// Identifier other rows use to refer to this entity (email, class name, ...)
    pub primary_identifier: String,
    /// Trimmed, lower-cased `primary_identifier`
    pub normalized_identifier: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl CanonicalEntity {
    pub fn new(id: Uuid, primary_identifier: impl Into<String>, display_name: impl Into<String>) -> Self {
        let primary_identifier = primary_identifier.into();
        Self {
            id,
            normalized_identifier: normalize_identifier(&primary_identifier),
            primary_identifier,
            display_name: display_name.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_extra(mut self, key: &str, value: Option<&str>) -> Self {
        if let Some(value) = value {
            self.extra.insert(key.to_string(), value.to_string());
        }
        self
    }
}
