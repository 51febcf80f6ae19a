//! Row validation
//!
//! Checks run in a fixed order so a row always reports the same error:
//! required columns, then value formats, then references, then in-batch
//! duplicates. Every problem is returned as a `ValidationError`; nothing here
//! panics or aborts the batch.

use std::collections::HashMap;
use thiserror::Error;

use roster_common::config::ScheduleConfig;

use crate::models::{BatchRow, EntityKind, ErrorKind, RegistryKind};
use crate::resolve::{IdentifierResolver, MatchStatus, RegistrySet};

use super::payload::{
    ClassPayload, NaturalKey, PersonPayload, Reference, SchedulePayload, SubjectPayload,
    ValidatedPayload,
};
use super::schema::{self, columns};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {column}")]
    MissingRequiredField { column: &'static str },

    #[error("Unresolved reference: {column} '{value}' matches no existing {registry}")]
    UnresolvedReference {
        column: &'static str,
        value: String,
        registry: RegistryKind,
    },

    #[error("Duplicate in batch: {key} already appears in row {first_row}")]
    DuplicateInBatch { key: String, first_row: usize },

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::MissingRequiredField { .. } => ErrorKind::MissingRequiredField,
            ValidationError::UnresolvedReference { .. } => ErrorKind::UnresolvedReference,
            ValidationError::DuplicateInBatch { .. } => ErrorKind::DuplicateInBatch,
            ValidationError::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
        }
    }
}

/// What to do with a reference no tier could resolve
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReferencePolicy {
    /// Fail the row
    #[default]
    Strict,
    /// Keep the original value (best-effort email fix)
    PassThrough,
}

/// Business constraints that come from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRules {
    pub policy: ReferencePolicy,
    pub day_min: u8,
    pub day_max: u8,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self::from_config(&ScheduleConfig::default())
    }
}

impl ValidationRules {
    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self {
            policy: ReferencePolicy::Strict,
            day_min: config.day_min,
            day_max: config.day_max,
        }
    }

    pub fn with_policy(mut self, policy: ReferencePolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Validates the rows of one batch
///
/// Remembers the natural keys of rows it has accepted so far, which is what
/// turns a repeated key into `DuplicateInBatch`. Use one validator per batch.
pub struct RowValidator<'a> {
    resolver: &'a IdentifierResolver,
    registries: &'a RegistrySet,
    rules: ValidationRules,
    seen: HashMap<NaturalKey, usize>,
}

impl<'a> RowValidator<'a> {
    pub fn new(
        resolver: &'a IdentifierResolver,
        registries: &'a RegistrySet,
        rules: ValidationRules,
    ) -> Self {
        Self {
            resolver,
            registries,
            rules,
            seen: HashMap::new(),
        }
    }

    pub fn validate(
        &mut self,
        row: &BatchRow,
        kind: EntityKind,
    ) -> Result<ValidatedPayload, ValidationError> {
        for column in columns(kind).iter().filter(|c| c.required) {
            if row.get(column.name).is_none() {
                return Err(ValidationError::MissingRequiredField {
                    column: column.name,
                });
            }
        }

        let payload = match kind {
            EntityKind::Teacher => ValidatedPayload::Teacher(self.person(row, kind)?),
            EntityKind::Student => ValidatedPayload::Student(self.person(row, kind)?),
            EntityKind::Class => ValidatedPayload::Class(self.class(row)?),
            EntityKind::Subject => ValidatedPayload::Subject(SubjectPayload {
                name: required(row, schema::SUBJECT)?.to_string(),
                code: row.get(schema::CODE).map(str::to_string),
            }),
            EntityKind::Schedule => ValidatedPayload::Schedule(self.schedule(row)?),
        };

        let key = payload.natural_key();
        if let Some(&first_row) = self.seen.get(&key) {
            return Err(ValidationError::DuplicateInBatch {
                key: key.to_string(),
                first_row,
            });
        }
        self.seen.insert(key, row.row_index);

        Ok(payload)
    }

    fn person(&self, row: &BatchRow, kind: EntityKind) -> Result<PersonPayload, ValidationError> {
        let email = required(row, schema::EMAIL)?;
        check_email(schema::EMAIL, email)?;

        if let Some(role) = row.get(schema::ROLE) {
            if !role.eq_ignore_ascii_case(kind.as_str()) {
                return Err(ValidationError::ConstraintViolation(format!(
                    "Role '{}' does not match a {} import",
                    role, kind
                )));
            }
        }

        let class = self.optional_reference(row, schema::CLASS_NAME, RegistryKind::Class)?;
        if kind == EntityKind::Student && class.is_none() {
            return Err(ValidationError::MissingRequiredField {
                column: schema::CLASS_NAME,
            });
        }

        Ok(PersonPayload {
            name: required(row, schema::NAME)?.to_string(),
            email: email.to_string(),
            password: required(row, schema::PASSWORD)?.to_string(),
            class,
        })
    }

    fn class(&self, row: &BatchRow) -> Result<ClassPayload, ValidationError> {
        Ok(ClassPayload {
            name: required(row, schema::CLASS_NAME)?.to_string(),
            grade: row.get(schema::GRADE).map(str::to_string),
            homeroom_teacher: self.optional_reference(
                row,
                schema::HOMEROOM_TEACHER_EMAIL,
                RegistryKind::Teacher,
            )?,
        })
    }

    fn schedule(&self, row: &BatchRow) -> Result<SchedulePayload, ValidationError> {
        let day = self.parse_day(required(row, schema::DAY)?)?;
        let start_time = parse_time(schema::START_TIME, required(row, schema::START_TIME)?)?;
        let end_time = parse_time(schema::END_TIME, required(row, schema::END_TIME)?)?;
        if start_time >= end_time {
            return Err(ValidationError::ConstraintViolation(format!(
                "StartTime {} must be before EndTime {}",
                start_time, end_time
            )));
        }

        Ok(SchedulePayload {
            class: self.reference(schema::CLASS_NAME, required(row, schema::CLASS_NAME)?, RegistryKind::Class)?,
            teacher: self.reference(
                schema::TEACHER_EMAIL,
                required(row, schema::TEACHER_EMAIL)?,
                RegistryKind::Teacher,
            )?,
            subject: self.reference(schema::SUBJECT, required(row, schema::SUBJECT)?, RegistryKind::Subject)?,
            day,
            start_time,
            end_time,
        })
    }

    fn parse_day(&self, value: &str) -> Result<u8, ValidationError> {
        let day: i64 = value.parse().map_err(|_| {
            ValidationError::ConstraintViolation(format!("Day '{}' is not an integer", value))
        })?;
        let range = i64::from(self.rules.day_min)..=i64::from(self.rules.day_max);
        if !range.contains(&day) {
            return Err(ValidationError::ConstraintViolation(format!(
                "Day {} is outside {}-{}",
                day, self.rules.day_min, self.rules.day_max
            )));
        }
        // In range of two u8 bounds, so the conversion cannot fail
        u8::try_from(day).map_err(|_| {
            ValidationError::ConstraintViolation(format!("Day {} is out of range", day))
        })
    }

    fn optional_reference(
        &self,
        row: &BatchRow,
        column: &'static str,
        registry: RegistryKind,
    ) -> Result<Option<Reference>, ValidationError> {
        row.get(column)
            .map(|value| self.reference(column, value, registry))
            .transpose()
    }

    fn reference(
        &self,
        column: &'static str,
        value: &str,
        registry: RegistryKind,
    ) -> Result<Reference, ValidationError> {
        let matched = self.resolver.resolve(value, self.registries.get(registry));
        if matched.status == MatchStatus::Unresolved && self.rules.policy == ReferencePolicy::Strict {
            return Err(ValidationError::UnresolvedReference {
                column,
                value: matched.raw_identifier,
                registry,
            });
        }
        Ok(Reference { column, matched })
    }
}

fn required<'r>(row: &'r BatchRow, column: &'static str) -> Result<&'r str, ValidationError> {
    row.get(column)
        .ok_or(ValidationError::MissingRequiredField { column })
}

fn check_email(column: &str, value: &str) -> Result<(), ValidationError> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ValidationError::ConstraintViolation(format!(
            "{} '{}' is not an email address",
            column, value
        )))
    }
}

/// Accept `H:MM` or `HH:MM`, return zero-padded `HH:MM`
///
/// Padding makes lexicographic order equal to time order.
fn parse_time(column: &str, value: &str) -> Result<String, ValidationError> {
    let invalid = || {
        ValidationError::ConstraintViolation(format!(
            "{} '{}' is not a valid HH:MM time",
            column, value
        ))
    };

    let (hours, minutes) = value.split_once(':').ok_or_else(invalid)?;
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(hours) || hours.len() > 2 || !all_digits(minutes) || minutes.len() != 2 {
        return Err(invalid());
    }

    let hours: u8 = hours.parse().map_err(|_| invalid())?;
    let minutes: u8 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    Ok(format!("{:02}:{:02}", hours, minutes))
}
