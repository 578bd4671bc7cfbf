//! [`RotationJob`]: bounded-concurrency rotation over many stored fields.
//!
//! Each field is rotated independently. A field that fails (bad envelope,
//! wrong old key, store conflict) is reported and skipped; it never blocks or
//! corrupts any other field. Order of completion is unspecified; the final
//! report is sorted by field id.

use std::collections::HashMap;
use std::sync::Arc;

use common::protocol::{FailedField, FieldRecord, RotatedField, RotationReport};
use common::FieldError;
use tokio::task::{Id, JoinSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::rotate_field;
use crate::crypto::KdfParams;
use crate::key::MasterKey;
use crate::pool::DerivationPool;

/// Failure code reported when the storage collaborator rejects a replacement.
pub const STORE_ERROR_CODE: &str = "store_error";

type Outcome = Result<String, &'static str>;

/// The storage collaborator's side of rotation.
///
/// Implementations own atomicity: `replace` should store `replacement` only
/// if the field still holds `current` (compare-and-swap), so a concurrent
/// write is never clobbered by a stale rotation.
#[cfg_attr(test, mockall::automock)]
pub trait EnvelopeStore: Send + Sync {
    fn replace(&self, field_id: &str, current: &str, replacement: &str) -> anyhow::Result<()>;
}

/// A rotation from one master key and KDF cost to another.
///
/// Either side may be unchanged: same key with new parameters migrates a
/// cost change, same parameters with a new key is a plain key rotation.
#[derive(Clone, Debug)]
pub struct RotationJob {
    old: Arc<MasterKey>,
    old_params: KdfParams,
    new: Arc<MasterKey>,
    new_params: KdfParams,
    pool: DerivationPool,
}

impl RotationJob {
    /// Create a job rotating from (`old`, `old_params`) to (`new`,
    /// `new_params`), bounded by `pool`.
    pub fn new(
        old: Arc<MasterKey>,
        old_params: KdfParams,
        new: Arc<MasterKey>,
        new_params: KdfParams,
        pool: DerivationPool,
    ) -> Self {
        Self {
            old,
            old_params,
            new,
            new_params,
            pool,
        }
    }

    /// Rotate every record and return the new envelopes. Nothing is persisted.
    pub async fn run(&self, fields: Vec<FieldRecord>) -> RotationReport {
        self.execute(fields, None).await
    }

    /// Rotate every record and hand each new envelope to `store`.
    ///
    /// Only fields whose replacement `store` accepted are reported as
    /// rotated.
    pub async fn run_with_store<S>(&self, fields: Vec<FieldRecord>, store: Arc<S>) -> RotationReport
    where
        S: EnvelopeStore + 'static,
    {
        let store: Arc<dyn EnvelopeStore> = store;
        self.execute(fields, Some(store)).await
    }

    async fn execute(
        &self,
        fields: Vec<FieldRecord>,
        store: Option<Arc<dyn EnvelopeStore>>,
    ) -> RotationReport {
        let job_id = Uuid::new_v4();
        let mut report = RotationReport::new(job_id);
        info!(%job_id, fields = fields.len(), "key rotation started");

        let mut tasks = JoinSet::new();
        let mut pending = HashMap::new();
        for record in fields {
            if record.envelope.is_empty() {
                report.skipped.push(record.id);
                continue;
            }
            let job = self.clone();
            let store = store.clone();
            let id = record.id.clone();
            let handle = tasks.spawn(async move { job.rotate_one(&record, store).await });
            pending.insert(handle.id(), id);
        }

        collect(job_id, tasks, pending, &mut report).await;

        report.rotated.sort_by(|a, b| a.id.cmp(&b.id));
        report.skipped.sort();
        report.failed.sort_by(|a, b| a.id.cmp(&b.id));

        info!(
            %job_id,
            rotated = report.rotated.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "key rotation finished"
        );
        report
    }

    /// Rotate one record, then persist it if a store was given.
    /// Errors are reduced to a failure code before leaving this function.
    async fn rotate_one(
        &self,
        record: &FieldRecord,
        store: Option<Arc<dyn EnvelopeStore>>,
    ) -> Outcome {
        let (old, new) = (self.old.clone(), self.new.clone());
        let (old_params, new_params) = (self.old_params, self.new_params);
        let current = record.envelope.clone();
        let replacement = self
            .pool
            .run(move || rotate_field(&current, &old, &old_params, &new, &new_params))
            .await
            .map_err(|e| e.code())?;

        if let Some(store) = store {
            let (id, current, next) = (record.id.clone(), record.envelope.clone(), replacement.clone());
            let stored = tokio::task::spawn_blocking(move || store.replace(&id, &current, &next))
                .await
                .map_err(anyhow::Error::from)
                .and_then(|result| result);
            if let Err(e) = stored {
                warn!(field_id = %record.id, error = %e, "store rejected rotated envelope");
                return Err(STORE_ERROR_CODE);
            }
        }
        Ok(replacement)
    }
}

/// Drain `tasks` into `report`, mapping each task back to its field through
/// `pending`. A task that panicked or was cancelled still counts as a failed
/// field, so every submitted record appears in the report exactly once.
async fn collect(
    job_id: Uuid,
    mut tasks: JoinSet<Outcome>,
    mut pending: HashMap<Id, String>,
    report: &mut RotationReport,
) {
    while let Some(joined) = tasks.join_next_with_id().await {
        let (task_id, outcome) = match joined {
            Ok((task_id, outcome)) => (task_id, outcome),
            Err(e) => {
                warn!(%job_id, error = %e, "rotation task did not complete");
                (e.id(), Err(FieldError::Internal(e.to_string()).code()))
            }
        };
        let Some(id) = pending.remove(&task_id) else {
            continue;
        };
        match outcome {
            Ok(envelope) => {
                debug!(%job_id, field_id = %id, "field rotated");
                report.rotated.push(RotatedField { id, envelope });
            }
            Err(code) => {
                warn!(%job_id, field_id = %id, code, "field rotation failed; original envelope retained");
                report.failed.push(FailedField {
                    id,
                    code: code.into(),
                });
            }
        }
    }
}
