//! SQLite store
//!
//! Each upsert runs in its own transaction: look up the natural key, then
//! insert or update. Registries are read with `ORDER BY rowid`, which is
//! insertion order for these tables.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::path::Path;
use uuid::Uuid;

use roster_common::db::init_database;
use roster_common::password::hash_password;

use crate::models::{CanonicalEntity, EntityKind, ImportSummary, RegistryKind, WriteKind};
use crate::validate::{
    ClassPayload, NaturalKey, PersonPayload, Reference, SchedulePayload, SubjectPayload,
    ValidatedPayload,
};

use super::{BatchRecord, CanonicalStore, StoreError, Upserted};

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database file, creating the schema when needed
    pub async fn open(db_path: &Path) -> roster_common::Result<Self> {
        Ok(Self::new(init_database(db_path).await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Table and natural-key column of each kind
fn table(kind: EntityKind) -> (&'static str, &'static str) {
    match kind {
        EntityKind::Teacher => ("teachers", "email_key"),
        EntityKind::Student => ("students", "email_key"),
        EntityKind::Class => ("classes", "name_key"),
        EntityKind::Subject => ("subjects", "name_key"),
        EntityKind::Schedule => ("schedules", "schedule_key"),
    }
}

fn parse_guid(row: &SqliteRow) -> Result<Uuid, StoreError> {
    let guid: String = row.try_get("guid")?;
    Uuid::parse_str(&guid).map_err(|e| StoreError::Corrupt(format!("guid '{}': {}", guid, e)))
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_usize(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

fn guid_text(reference: Option<&Reference>) -> Option<String> {
    reference
        .and_then(Reference::entity_id)
        .map(|id| id.to_string())
}

async fn existing_guid(
    tx: &mut Transaction<'_, Sqlite>,
    key: &NaturalKey,
) -> Result<Option<Uuid>, StoreError> {
    let (table, key_column) = table(key.kind);
    let sql = format!("SELECT guid FROM {} WHERE {} = ?", table, key_column);
    let row = sqlx::query(&sql)
        .bind(&key.value)
        .fetch_optional(&mut **tx)
        .await?;

    row.as_ref().map(parse_guid).transpose()
}

async fn write_teacher(
    tx: &mut Transaction<'_, Sqlite>,
    guid: Uuid,
    key: &NaturalKey,
    p: &PersonPayload,
) -> Result<(), StoreError> {
    let password = hash_password(&p.password);
    sqlx::query(
        r#"
        INSERT INTO teachers (
            guid, email, email_key, name, password_hash, password_salt, homeroom_class,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        ON CONFLICT(email_key) DO UPDATE SET
            email = excluded.email,
            name = excluded.name,
            password_hash = excluded.password_hash,
            password_salt = excluded.password_salt,
            homeroom_class = excluded.homeroom_class,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(guid.to_string())
    .bind(&p.email)
    .bind(&key.value)
    .bind(&p.name)
    .bind(&password.hash)
    .bind(&password.salt)
    .bind(p.class.as_ref().map(Reference::identifier))
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn write_student(
    tx: &mut Transaction<'_, Sqlite>,
    guid: Uuid,
    key: &NaturalKey,
    p: &PersonPayload,
) -> Result<(), StoreError> {
    let class = p
        .class
        .as_ref()
        .ok_or_else(|| StoreError::Internal("student row without a class".to_string()))?;
    let password = hash_password(&p.password);
    sqlx::query(
        r#"
        INSERT INTO students (
            guid, email, email_key, name, password_hash, password_salt, class_name,
            class_guid, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        ON CONFLICT(email_key) DO UPDATE SET
            email = excluded.email,
            name = excluded.name,
            password_hash = excluded.password_hash,
            password_salt = excluded.password_salt,
            class_name = excluded.class_name,
            class_guid = excluded.class_guid,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(guid.to_string())
    .bind(&p.email)
    .bind(&key.value)
    .bind(&p.name)
    .bind(&password.hash)
    .bind(&password.salt)
    .bind(class.identifier())
    .bind(guid_text(Some(class)))
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn write_class(
    tx: &mut Transaction<'_, Sqlite>,
    guid: Uuid,
    key: &NaturalKey,
    c: &ClassPayload,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO classes (
            guid, name, name_key, grade, homeroom_teacher_email, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        ON CONFLICT(name_key) DO UPDATE SET
            name = excluded.name,
            grade = excluded.grade,
            homeroom_teacher_email = excluded.homeroom_teacher_email,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(guid.to_string())
    .bind(&c.name)
    .bind(&key.value)
    .bind(&c.grade)
    .bind(c.homeroom_teacher.as_ref().map(Reference::identifier))
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn write_subject(
    tx: &mut Transaction<'_, Sqlite>,
    guid: Uuid,
    key: &NaturalKey,
    s: &SubjectPayload,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO subjects (guid, name, name_key, code, created_at, updated_at)
        VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        ON CONFLICT(name_key) DO UPDATE SET
            name = excluded.name,
            code = excluded.code,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(guid.to_string())
    .bind(&s.name)
    .bind(&key.value)
    .bind(&s.code)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn write_schedule(
    tx: &mut Transaction<'_, Sqlite>,
    guid: Uuid,
    key: &NaturalKey,
    s: &SchedulePayload,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO schedules (
            guid, schedule_key, class_name, teacher_email, subject_name, day,
            start_time, end_time, class_guid, teacher_guid, subject_guid,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        ON CONFLICT(schedule_key) DO UPDATE SET
            end_time = excluded.end_time,
            class_guid = excluded.class_guid,
            teacher_guid = excluded.teacher_guid,
            subject_guid = excluded.subject_guid,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(guid.to_string())
    .bind(&key.value)
    .bind(s.class.identifier())
    .bind(s.teacher.identifier())
    .bind(s.subject.identifier())
    .bind(i64::from(s.day))
    .bind(&s.start_time)
    .bind(&s.end_time)
    .bind(guid_text(Some(&s.class)))
    .bind(guid_text(Some(&s.teacher)))
    .bind(guid_text(Some(&s.subject)))
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn entity_from_row(kind: RegistryKind, row: &SqliteRow) -> Result<CanonicalEntity, StoreError> {
    let id = parse_guid(row)?;
    let entity = match kind {
        RegistryKind::Teacher => {
            let email: String = row.try_get("email")?;
            let name: String = row.try_get("name")?;
            let homeroom: Option<String> = row.try_get("homeroom_class")?;
            CanonicalEntity::new(id, email, name).with_extra("homeroom_class", homeroom.as_deref())
        }
        RegistryKind::Class => {
            let name: String = row.try_get("name")?;
            let grade: Option<String> = row.try_get("grade")?;
            let homeroom: Option<String> = row.try_get("homeroom_teacher_email")?;
            CanonicalEntity::new(id, name.as_str(), name.as_str())
                .with_extra("grade", grade.as_deref())
                .with_extra("homeroom_teacher_email", homeroom.as_deref())
        }
        RegistryKind::Subject => {
            let name: String = row.try_get("name")?;
            let code: Option<String> = row.try_get("code")?;
            CanonicalEntity::new(id, name.as_str(), name.as_str()).with_extra("code", code.as_deref())
        }
    };
    Ok(entity)
}

#[async_trait]
impl CanonicalStore for SqliteStore {
    async fn find_all(&self, kind: RegistryKind) -> Result<Vec<CanonicalEntity>, StoreError> {
        let sql = match kind {
            RegistryKind::Teacher => {
                "SELECT guid, email, name, homeroom_class FROM teachers ORDER BY rowid"
            }
            RegistryKind::Class => {
                "SELECT guid, name, grade, homeroom_teacher_email FROM classes ORDER BY rowid"
            }
            RegistryKind::Subject => "SELECT guid, name, code FROM subjects ORDER BY rowid",
        };

        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter().map(|row| entity_from_row(kind, row)).collect()
    }

    async fn upsert(
        &self,
        key: &NaturalKey,
        payload: &ValidatedPayload,
    ) -> Result<Upserted, StoreError> {
        let mut tx = self.pool.begin().await?;

        let existing = existing_guid(&mut tx, key).await?;
        let guid = existing.unwrap_or_else(Uuid::new_v4);

        match payload {
            ValidatedPayload::Teacher(p) => write_teacher(&mut tx, guid, key, p).await?,
            ValidatedPayload::Student(p) => write_student(&mut tx, guid, key, p).await?,
            ValidatedPayload::Class(c) => write_class(&mut tx, guid, key, c).await?,
            ValidatedPayload::Subject(s) => write_subject(&mut tx, guid, key, s).await?,
            ValidatedPayload::Schedule(s) => write_schedule(&mut tx, guid, key, s).await?,
        }

        tx.commit().await?;

        Ok(Upserted {
            entity: payload.to_entity(guid),
            write: if existing.is_some() {
                WriteKind::Updated
            } else {
                WriteKind::Created
            },
        })
    }

    async fn count(&self, kind: EntityKind) -> Result<usize, StoreError> {
        let (table, _) = table(kind);
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(to_usize(count))
    }

    async fn record_batch(&self, record: &BatchRecord) -> Result<(), StoreError> {
        let errors = serde_json::to_string(&record.errors)
            .map_err(|e| StoreError::Internal(format!("serialize batch errors: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO import_batches (
                batch_id, kind, total_rows, imported, failed, skipped, cancelled,
                errors, started_at, finished_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.batch_id.to_string())
        .bind(record.kind.as_str())
        .bind(to_i64(record.total_rows))
        .bind(to_i64(record.summary.imported))
        .bind(to_i64(record.summary.failed))
        .bind(to_i64(record.summary.skipped))
        .bind(record.cancelled)
        .bind(errors)
        .bind(&record.started_at)
        .bind(&record.finished_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_batch(&self, batch_id: Uuid) -> Result<Option<BatchRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT batch_id, kind, total_rows, imported, failed, skipped, cancelled,
                   errors, started_at, finished_at
            FROM import_batches
            WHERE batch_id = ?
            "#,
        )
        .bind(batch_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let kind: String = row.try_get("kind")?;
        let errors: String = row.try_get("errors")?;

        Ok(Some(BatchRecord {
            batch_id,
            kind: kind.parse().map_err(StoreError::Corrupt)?,
            total_rows: to_usize(row.try_get("total_rows")?),
            summary: ImportSummary {
                imported: to_usize(row.try_get("imported")?),
                failed: to_usize(row.try_get("failed")?),
                skipped: to_usize(row.try_get("skipped")?),
            },
            cancelled: row.try_get("cancelled")?,
            errors: serde_json::from_str(&errors)
                .map_err(|e| StoreError::Corrupt(format!("batch errors: {}", e)))?,
            started_at: row.try_get("started_at")?,
            finished_at: row.try_get("finished_at")?,
        }))
    }
}
