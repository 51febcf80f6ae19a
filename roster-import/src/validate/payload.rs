//! Validated, fully-resolved rows ready for persistence

use std::fmt;
use uuid::Uuid;

use crate::models::{CanonicalEntity, EntityKind};
use crate::resolve::normalize::normalize_identifier;
use crate::resolve::MatchResult;

/// A foreign-key-like column after resolution
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub column: &'static str,
    pub matched: MatchResult,
}

impl Reference {
    /// Canonical identifier, or the raw value when left unresolved
    pub fn identifier(&self) -> &str {
        self.matched.resolved_identifier().trim()
    }

    pub fn entity_id(&self) -> Option<Uuid> {
        self.matched.entity.as_ref().map(|e| e.id)
    }
}

/// Identity of a row for upsert purposes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
    pub kind: EntityKind,
    pub value: String,
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersonPayload {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Homeroom class for teachers, enrolled class for students
    pub class: Option<Reference>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassPayload {
    pub name: String,
    pub grade: Option<String>,
    pub homeroom_teacher: Option<Reference>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectPayload {
    pub name: String,
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulePayload {
    pub class: Reference,
    pub teacher: Reference,
    pub subject: Reference,
    pub day: u8,
    /// `HH:MM`
    pub start_time: String,
    /// `HH:MM`
    pub end_time: String,
}

/// One validated row, tagged by kind
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedPayload {
    Teacher(PersonPayload),
    Student(PersonPayload),
    Class(ClassPayload),
    Subject(SubjectPayload),
    Schedule(SchedulePayload),
}

impl ValidatedPayload {
    pub fn kind(&self) -> EntityKind {
        match self {
            ValidatedPayload::Teacher(_) => EntityKind::Teacher,
            ValidatedPayload::Student(_) => EntityKind::Student,
            ValidatedPayload::Class(_) => EntityKind::Class,
            ValidatedPayload::Subject(_) => EntityKind::Subject,
            ValidatedPayload::Schedule(_) => EntityKind::Schedule,
        }
    }

    pub fn natural_key(&self) -> NaturalKey {
        let value = match self {
            ValidatedPayload::Teacher(p) | ValidatedPayload::Student(p) => {
                normalize_identifier(&p.email)
            }
            ValidatedPayload::Class(c) => normalize_identifier(&c.name),
            ValidatedPayload::Subject(s) => normalize_identifier(&s.name),
            ValidatedPayload::Schedule(s) => format!(
                "{}|{}|{}|{}|{}",
                normalize_identifier(s.class.identifier()),
                normalize_identifier(s.teacher.identifier()),
                normalize_identifier(s.subject.identifier()),
                s.day,
                s.start_time
            ),
        };
        NaturalKey {
            kind: self.kind(),
            value,
        }
    }

    pub fn references(&self) -> Vec<&Reference> {
        match self {
            ValidatedPayload::Teacher(p) | ValidatedPayload::Student(p) => {
                p.class.iter().collect()
            }
            ValidatedPayload::Class(c) => c.homeroom_teacher.iter().collect(),
            ValidatedPayload::Subject(_) => Vec::new(),
            ValidatedPayload::Schedule(s) => vec![&s.class, &s.teacher, &s.subject],
        }
    }

    /// Canonical view of the stored row under the given id
    pub fn to_entity(&self, id: Uuid) -> CanonicalEntity {
        match self {
            ValidatedPayload::Teacher(p) => CanonicalEntity::new(id, p.email.as_str(), p.name.as_str())
                .with_extra("homeroom_class", p.class.as_ref().map(Reference::identifier)),
            ValidatedPayload::Student(p) => CanonicalEntity::new(id, p.email.as_str(), p.name.as_str())
                .with_extra("class_name", p.class.as_ref().map(Reference::identifier)),
            ValidatedPayload::Class(c) => CanonicalEntity::new(id, c.name.as_str(), c.name.as_str())
                .with_extra("grade", c.grade.as_deref())
                .with_extra(
                    "homeroom_teacher_email",
                    c.homeroom_teacher.as_ref().map(Reference::identifier),
                ),
            ValidatedPayload::Subject(s) => CanonicalEntity::new(id, s.name.as_str(), s.name.as_str())
                .with_extra("code", s.code.as_deref()),
            ValidatedPayload::Schedule(s) => {
                let display = format!(
                    "{} {} day {} {}-{}",
                    s.class.identifier(),
                    s.subject.identifier(),
                    s.day,
                    s.start_time,
                    s.end_time
                );
                CanonicalEntity::new(id, self.natural_key().value, display)
                    .with_extra("class_name", Some(s.class.identifier()))
                    .with_extra("teacher_email", Some(s.teacher.identifier()))
                    .with_extra("subject_name", Some(s.subject.identifier()))
                    .with_extra("end_time", Some(s.end_time.as_str()))
            }
        }
    }
}
