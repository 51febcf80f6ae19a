//! Batch orchestration
//!
//! A batch runs in three steps:
//!
//! 1. Load a registry snapshot for every kind the rows may reference. The
//!    loads run concurrently and all finish before the first row.
//! 2. Walk the rows in order. Each row is validated, then upserted, and turns
//!    into exactly one `RowOutcome`. A failing row never stops the batch.
//! 3. Fold the outcomes into an `ImportReport`.
//!
//! Cancellation is checked between rows only, so a row is never half-written.

use std::io::Read;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use roster_common::time::now_rfc3339;

use crate::models::{BatchRow, EntityKind, ErrorKind, ImportReport, RegistryKind, RowOutcome};
use crate::resolve::{
    CanonicalRegistry, IdentifierResolver, MatchResult, OverrideEntry, RegistrySet,
};
use crate::store::{BatchRecord, CanonicalStore, StoreError};
use crate::validate::{ReferencePolicy, RowValidator, ValidationRules};

use super::source::{rows_from_csv, BatchInputError};

/// Errors that stop a batch before any row is processed
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Input(#[from] BatchInputError),

    #[error("Failed to load {kind} registry: {source}")]
    Registry {
        kind: RegistryKind,
        #[source]
        source: StoreError,
    },
}

/// Runs batches against one store
#[derive(Clone)]
pub struct BatchProcessor {
    store: Arc<dyn CanonicalStore>,
    resolver: Arc<IdentifierResolver>,
    rules: ValidationRules,
}

impl BatchProcessor {
    pub fn new(
        store: Arc<dyn CanonicalStore>,
        resolver: Arc<IdentifierResolver>,
        rules: ValidationRules,
    ) -> Self {
        Self {
            store,
            resolver,
            rules,
        }
    }

    /// Same store and resolver, different reference policy
    pub fn with_policy(&self, policy: ReferencePolicy) -> Self {
        Self {
            rules: self.rules.clone().with_policy(policy),
            ..self.clone()
        }
    }

    pub fn store(&self) -> &Arc<dyn CanonicalStore> {
        &self.store
    }

    /// Snapshot the registries rows of `kind` refer to
    ///
    /// Registries the kind never references stay empty.
    pub async fn load_registries(&self, kind: EntityKind) -> Result<RegistrySet, BatchError> {
        let wanted = kind.referenced_registries();
        let load = |registry: RegistryKind| async move {
            if !wanted.contains(&registry) {
                return Ok(CanonicalRegistry::empty(registry));
            }
            self.store
                .find_all(registry)
                .await
                .map(|entities| CanonicalRegistry::new(registry, entities))
                .map_err(|source| BatchError::Registry {
                    kind: registry,
                    source,
                })
        };

        let (teachers, classes, subjects) = tokio::try_join!(
            load(RegistryKind::Teacher),
            load(RegistryKind::Class),
            load(RegistryKind::Subject)
        )?;

        debug!(
            kind = %kind,
            teachers = teachers.len(),
            classes = classes.len(),
            subjects = subjects.len(),
            "Registries loaded"
        );

        Ok(RegistrySet::empty()
            .with(teachers)
            .with(classes)
            .with(subjects))
    }

    pub async fn process(
        &self,
        rows: Vec<BatchRow>,
        kind: EntityKind,
    ) -> Result<ImportReport, BatchError> {
        self.process_with_cancel(rows, kind, &CancellationToken::new())
            .await
    }

    /// Process rows in order until done or cancelled
    pub async fn process_with_cancel(
        &self,
        rows: Vec<BatchRow>,
        kind: EntityKind,
        cancel: &CancellationToken,
    ) -> Result<ImportReport, BatchError> {
        let registries = self.load_registries(kind).await?;
        self.warn_inert_overrides(kind, &registries);

        info!(kind = %kind, rows = rows.len(), "Batch started");

        let mut validator = RowValidator::new(&self.resolver, &registries, self.rules.clone());
        let mut outcomes = Vec::with_capacity(rows.len());
        let mut cancelled = false;

        for row in &rows {
            if !cancelled && cancel.is_cancelled() {
                info!(
                    kind = %kind,
                    rows_processed = outcomes.len(),
                    "Batch cancelled"
                );
                cancelled = true;
            }

            let outcome = if cancelled {
                RowOutcome::skipped(row.row_index, "batch cancelled")
            } else {
                self.process_row(&mut validator, row, kind).await
            };
            outcomes.push(outcome);
        }

        let report = ImportReport::from_outcomes(outcomes, cancelled);
        let summary = report.summary();
        info!(
            kind = %kind,
            imported = summary.imported,
            failed = summary.failed,
            skipped = summary.skipped,
            cancelled,
            "Batch finished"
        );

        Ok(report)
    }

    /// Process a batch and keep its summary in the batch history
    ///
    /// A history write failure is logged and does not discard the report.
    pub async fn import(
        &self,
        rows: Vec<BatchRow>,
        kind: EntityKind,
        cancel: &CancellationToken,
    ) -> Result<(Uuid, ImportReport), BatchError> {
        let batch_id = Uuid::new_v4();
        let started_at = now_rfc3339();

        let report = self.process_with_cancel(rows, kind, cancel).await?;

        let record = BatchRecord::from_report(batch_id, kind, &report, started_at, now_rfc3339());
        if let Err(e) = self.store.record_batch(&record).await {
            warn!(batch_id = %batch_id, error = %e, "Failed to record batch history");
        }

        Ok((batch_id, report))
    }

    /// Parse CSV text and import it
    pub async fn import_csv<R: Read>(
        &self,
        reader: R,
        kind: EntityKind,
        cancel: &CancellationToken,
    ) -> Result<(Uuid, ImportReport), BatchError> {
        let rows = rows_from_csv(reader, kind)?;
        self.import(rows, kind, cancel).await
    }

    /// Resolve identifiers against one registry without importing anything
    ///
    /// Unresolved identifiers are returned as-is, which is what a best-effort
    /// email fix would keep.
    pub async fn audit(
        &self,
        identifiers: &[String],
        registry: RegistryKind,
    ) -> Result<Vec<MatchResult>, BatchError> {
        let entities = self
            .store
            .find_all(registry)
            .await
            .map_err(|source| BatchError::Registry {
                kind: registry,
                source,
            })?;
        let snapshot = CanonicalRegistry::new(registry, entities);

        let results = self
            .resolver
            .resolve_all(identifiers.iter().map(String::as_str), &snapshot);

        info!(
            registry = %registry,
            identifiers = results.len(),
            unresolved = results.iter().filter(|r| !r.is_resolved()).count(),
            "Resolution audit finished"
        );

        Ok(results)
    }

    async fn process_row(
        &self,
        validator: &mut RowValidator<'_>,
        row: &BatchRow,
        kind: EntityKind,
    ) -> RowOutcome {
        if row.is_blank() {
            debug!(row = row.row_index, "Skipping blank row");
            return RowOutcome::skipped(row.row_index, "blank row");
        }

        let payload = match validator.validate(row, kind) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(row = row.row_index, kind = %kind, error = %e, "Row failed validation");
                return RowOutcome::failed(row.row_index, e.kind(), e.to_string());
            }
        };

        let key = payload.natural_key();
        match self.store.upsert(&key, &payload).await {
            Ok(upserted) => {
                debug!(
                    row = row.row_index,
                    key = %key,
                    write = ?upserted.write,
                    "Row imported"
                );
                RowOutcome::imported(row.row_index, upserted.entity, upserted.write)
            }
            Err(e) => {
                warn!(row = row.row_index, key = %key, error = %e, "Row failed to persist");
                RowOutcome::failed(
                    row.row_index,
                    ErrorKind::PersistenceError,
                    format!("Persistence error: {}", e),
                )
            }
        }
    }

    /// Override entries whose target is in none of the registries `kind` loads
    ///
    /// The flag is true only when every registry was loaded. Otherwise a
    /// missing target may live in a registry this batch never read.
    fn inert_overrides<'a>(
        &'a self,
        kind: EntityKind,
        registries: &RegistrySet,
    ) -> (Vec<&'a OverrideEntry>, bool) {
        let wanted = kind.referenced_registries();
        if wanted.is_empty() {
            return (Vec::new(), false);
        }
        let definitive = RegistryKind::ALL.iter().all(|r| wanted.contains(r));
        let inert = self
            .resolver
            .overrides()
            .entries()
            .iter()
            .filter(|entry| {
                !wanted
                    .iter()
                    .any(|r| registries.get(*r).find_exact(&entry.to_identifier).is_some())
            })
            .collect();
        (inert, definitive)
    }

    fn warn_inert_overrides(&self, kind: EntityKind, registries: &RegistrySet) {
        let (inert, definitive) = self.inert_overrides(kind, registries);
        for entry in inert {
            if definitive {
                warn!(
                    from = %entry.from_identifier,
                    to = %entry.to_identifier,
                    "Override target not found in any registry; entry is inert"
                );
            } else {
                debug!(
                    kind = %kind,
                    from = %entry.from_identifier,
                    to = %entry.to_identifier,
                    "Override target not in this batch's registries"
                );
            }
        }
    }
}
