//! Error taxonomy shared by every field-encryption operation.

use thiserror::Error;

/// Top-level field-encryption error type.
///
/// Variants map to stable machine codes returned by [`FieldError::code`]:
/// - [`FieldError::Configuration`] → `configuration_error`
/// - [`FieldError::Format`] → `format_error`
/// - [`FieldError::Authentication`] → `authentication_failure`
/// - [`FieldError::RotationAbort`] → `rotation_abort`
/// - [`FieldError::Internal`] → `internal_error`
///
/// No variant ever carries plaintext, envelope bytes, or key material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// The master key is missing or too short, or the KDF cost parameters are
    /// unusable. Fatal: raised at startup, before the first field is touched.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The input is not a well-formed envelope. The message names the
    /// structural problem only.
    #[error("malformed envelope: {0}")]
    Format(String),

    /// Tag verification failed.
    ///
    /// Deliberately carries no detail: a bad tag, a wrong key, and corrupted
    /// ciphertext are indistinguishable to the caller.
    #[error("authentication failed")]
    Authentication,

    /// The decrypt phase of a rotation failed. The original envelope is left
    /// untouched and must be treated as not yet rotated.
    #[error("rotation aborted: {0}")]
    RotationAbort(#[source] Box<FieldError>),

    /// A worker-pool level failure (closed pool, panicked task).
    #[error("internal error: {0}")]
    Internal(String),
}

impl FieldError {
    /// Returns the stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            FieldError::Configuration(_) => "configuration_error",
            FieldError::Format(_) => "format_error",
            FieldError::Authentication => "authentication_failure",
            FieldError::RotationAbort(_) => "rotation_abort",
            FieldError::Internal(_) => "internal_error",
        }
    }

    /// Returns `true` if the caller can keep serving other fields after this
    /// error. Only configuration errors are fatal.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, FieldError::Configuration(_))
    }

    /// Wrap a decrypt-phase failure as a [`FieldError::RotationAbort`].
    pub fn rotation_abort(cause: FieldError) -> Self {
        FieldError::RotationAbort(Box::new(cause))
    }
}
