//! Record and report types exchanged with the storage collaborator.
//!
//! Persistence lives outside the core. Callers hand batch rotation a list of
//! [`FieldRecord`]s read from storage and receive a [`RotationReport`] saying
//! which fields got a new envelope and which must stay on the old one.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One stored encrypted field as read by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    /// Caller-defined identifier (e.g. `"patients/42/ssn"`). Opaque to the core.
    pub id: String,
    /// The stored envelope string, or `""` for an empty field.
    pub envelope: String,
}

impl FieldRecord {
    /// Construct a [`FieldRecord`] from an id and envelope.
    pub fn new(id: impl Into<String>, envelope: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            envelope: envelope.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A field that was re-encrypted under the new master key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotatedField {
    pub id: String,
    /// The replacement envelope. The caller owns swapping it into storage
    /// unless the job was run against an `EnvelopeStore`.
    pub envelope: String,
}

/// A field whose rotation failed. Its stored envelope is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedField {
    pub id: String,
    /// Machine-readable failure code (e.g. `"rotation_abort"`, `"store_error"`).
    pub code: String,
}

/// Outcome of one batch rotation job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationReport {
    /// Identifier attached to every log line the job emits.
    pub job_id: Uuid,
    pub rotated: Vec<RotatedField>,
    /// Ids of empty fields; nothing to rotate.
    pub skipped: Vec<String>,
    pub failed: Vec<FailedField>,
}

impl RotationReport {
    /// Create an empty report for `job_id`.
    pub fn new(job_id: Uuid) -> Self {
        Self {
            job_id,
            ..Self::default()
        }
    }

    /// Total number of records the job looked at.
    pub fn total(&self) -> usize {
        self.rotated.len() + self.skipped.len() + self.failed.len()
    }

    /// Returns `true` if no field failed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
