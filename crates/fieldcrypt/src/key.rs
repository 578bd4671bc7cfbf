//! [`MasterKey`]: the process-wide secret every derived key is computed from.
//!
//! # Lifecycle
//!
//! 1. At startup the master key is read from trusted configuration and
//!    validated exactly once by [`MasterKey::new`].
//! 2. It is then shared read-only (typically behind an `Arc`) for the life of
//!    the process. There is no setter and no interior mutability.
//! 3. On drop the secret bytes are overwritten with zeroes.
//!
//! # Security invariants
//!
//! - The master key is **never** used as a cipher key directly; it is only
//!   ever fed to [`crate::crypto::kdf::derive`].
//! - It is never persisted, logged, or printed, not even through `Debug`.

use std::fmt;

use common::FieldError;
use zeroize::Zeroizing;

/// Minimum master key length, in characters.
pub const MIN_MASTER_KEY_CHARS: usize = 32;

/// Validated master secret.
pub struct MasterKey(Zeroizing<String>);

impl MasterKey {
    /// Validate and wrap a master secret.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Configuration`] if the secret is blank or shorter
    /// than [`MIN_MASTER_KEY_CHARS`] characters.
    pub fn new(secret: impl Into<String>) -> Result<Self, FieldError> {
        let secret = Zeroizing::new(secret.into());
        if secret.trim().is_empty() {
            return Err(FieldError::Configuration(
                "master key is missing".into(),
            ));
        }
        if secret.chars().count() < MIN_MASTER_KEY_CHARS {
            return Err(FieldError::Configuration(format!(
                "master key must be at least {MIN_MASTER_KEY_CHARS} characters"
            )));
        }
        Ok(Self(secret))
    }

    /// Like [`MasterKey::new`], but treats `None` as a missing key.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Configuration`] if the secret is absent or invalid.
    pub fn from_optional(secret: Option<&str>) -> Result<Self, FieldError> {
        match secret {
            Some(s) => Self::new(s),
            None => Err(FieldError::Configuration(
                "master key is missing".into(),
            )),
        }
    }

    /// Raw secret bytes, for key derivation only.
    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}
