//! Row validation and validated payloads

pub mod payload;
pub mod schema;
pub mod validator;

pub use payload::{
    ClassPayload, NaturalKey, PersonPayload, Reference, SchedulePayload, SubjectPayload,
    ValidatedPayload,
};
pub use schema::{columns, required_columns, ColumnSpec};
pub use validator::{ReferencePolicy, RowValidator, ValidationError, ValidationRules};
