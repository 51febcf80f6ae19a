//! Column schemas per entity kind
//!
//! | Kind     | Columns (* = required)                                          |
//! |----------|-----------------------------------------------------------------|
//! | teacher  | Name*, Email*, Password*, Role, ClassName                       |
//! | student  | Name*, Email*, Password*, Role, ClassName*                      |
//! | class    | ClassName*, Grade, HomeroomTeacherEmail                         |
//! | subject  | Subject*, Code                                                  |
//! | schedule | ClassName*, TeacherEmail*, Subject*, Day*, StartTime*, EndTime* |

use crate::models::{EntityKind, RegistryKind};

pub const NAME: &str = "Name";
pub const EMAIL: &str = "Email";
pub const PASSWORD: &str = "Password";
pub const ROLE: &str = "Role";
pub const CLASS_NAME: &str = "ClassName";
pub const GRADE: &str = "Grade";
pub const HOMEROOM_TEACHER_EMAIL: &str = "HomeroomTeacherEmail";
pub const SUBJECT: &str = "Subject";
pub const CODE: &str = "Code";
pub const TEACHER_EMAIL: &str = "TeacherEmail";
pub const DAY: &str = "Day";
pub const START_TIME: &str = "StartTime";
pub const END_TIME: &str = "EndTime";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub required: bool,
    /// Registry the column's value is resolved against
    pub reference: Option<RegistryKind>,
}

const fn required(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        required: true,
        reference: None,
    }
}

const fn optional(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        required: false,
        reference: None,
    }
}

const fn reference(name: &'static str, required: bool, registry: RegistryKind) -> ColumnSpec {
    ColumnSpec {
        name,
        required,
        reference: Some(registry),
    }
}

const TEACHER_COLUMNS: &[ColumnSpec] = &[
    required(NAME),
    required(EMAIL),
    required(PASSWORD),
    optional(ROLE),
    reference(CLASS_NAME, false, RegistryKind::Class),
];

const STUDENT_COLUMNS: &[ColumnSpec] = &[
    required(NAME),
    required(EMAIL),
    required(PASSWORD),
    optional(ROLE),
    reference(CLASS_NAME, true, RegistryKind::Class),
];

const CLASS_COLUMNS: &[ColumnSpec] = &[
    required(CLASS_NAME),
    optional(GRADE),
    reference(HOMEROOM_TEACHER_EMAIL, false, RegistryKind::Teacher),
];

const SUBJECT_COLUMNS: &[ColumnSpec] = &[required(SUBJECT), optional(CODE)];

const SCHEDULE_COLUMNS: &[ColumnSpec] = &[
    reference(CLASS_NAME, true, RegistryKind::Class),
    reference(TEACHER_EMAIL, true, RegistryKind::Teacher),
    reference(SUBJECT, true, RegistryKind::Subject),
    required(DAY),
    required(START_TIME),
    required(END_TIME),
];

/// Columns of a kind in template order
pub fn columns(kind: EntityKind) -> &'static [ColumnSpec] {
    match kind {
        EntityKind::Teacher => TEACHER_COLUMNS,
        EntityKind::Student => STUDENT_COLUMNS,
        EntityKind::Class => CLASS_COLUMNS,
        EntityKind::Subject => SUBJECT_COLUMNS,
        EntityKind::Schedule => SCHEDULE_COLUMNS,
    }
}

pub fn required_columns(kind: EntityKind) -> impl Iterator<Item = &'static str> {
    columns(kind).iter().filter(|c| c.required).map(|c| c.name)
}
