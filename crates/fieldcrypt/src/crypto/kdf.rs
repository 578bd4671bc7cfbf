//! Argon2id derivation of single-use field keys from the master key.
//!
//! Every encryption draws a fresh 32-byte salt, so every envelope is sealed
//! under a different derived key. Decryption recomputes the same key from the
//! salt stored in the envelope.

use std::fmt;

use argon2::{Algorithm, Argon2, Params, Version};
use common::FieldError;
use tracing::warn;
use zeroize::Zeroizing;

use super::random_bytes;
use crate::key::MasterKey;

/// Byte length of the per-envelope salt (32 bytes = 256 bits).
pub const SALT_LEN: usize = 32;

/// Byte length of a derived AES-256 key.
pub const DERIVED_KEY_LEN: usize = 32;

/// Baseline Argon2id memory cost: 19 MiB.
pub const DEFAULT_MEMORY_KIB: u32 = 19 * 1024;

/// Baseline Argon2id pass count.
pub const DEFAULT_ITERATIONS: u32 = 2;

/// Baseline Argon2id lane count.
pub const DEFAULT_PARALLELISM: u32 = 1;

/// Argon2id cost parameters.
///
/// The defaults (19 MiB, 2 passes, 1 lane) are the OWASP Argon2id baseline.
/// On a current x86-64 server core a release build derives one key in well
/// under 50 ms. Each in-flight derivation holds `memory_kib` of working
/// memory, which is why callers fanning out over many fields should go through
/// [`crate::pool::DerivationPool`].
///
/// Envelopes do not record these values. Data sealed under one set of
/// parameters only opens under the same set; changing them requires rotating
/// stored fields with [`crate::rotation::rotate_field`], passing the old and
/// new parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    memory_kib: u32,
    iterations: u32,
    parallelism: u32,
}

impl KdfParams {
    /// Build a validated parameter set.
    ///
    /// Values below the baseline are accepted but logged at `warn`.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Configuration`] if Argon2 rejects the combination
    /// (e.g. zero passes, or less than 8 KiB of memory per lane).
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, FieldError> {
        let params = Self {
            memory_kib,
            iterations,
            parallelism,
        };
        params.argon2_params()?;

        if memory_kib < DEFAULT_MEMORY_KIB || iterations < DEFAULT_ITERATIONS {
            warn!(
                memory_kib,
                iterations,
                recommended_memory_kib = DEFAULT_MEMORY_KIB,
                recommended_iterations = DEFAULT_ITERATIONS,
                "argon2 cost below recommended baseline"
            );
        }
        Ok(params)
    }

    pub fn memory_kib(&self) -> u32 {
        self.memory_kib
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    fn argon2_params(&self) -> Result<Params, FieldError> {
        Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(DERIVED_KEY_LEN),
        )
        .map_err(|e| FieldError::Configuration(format!("invalid argon2 parameters: {e}")))
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: DEFAULT_MEMORY_KIB,
            iterations: DEFAULT_ITERATIONS,
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

/// A 256-bit key derived for exactly one AEAD operation.
///
/// Zeroed on drop.
pub struct DerivedKey(Zeroizing<[u8; DERIVED_KEY_LEN]>);

impl DerivedKey {
    pub(crate) fn as_bytes(&self) -> &[u8; DERIVED_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Draw a fresh salt from the OS CSPRNG.
pub fn generate_salt() -> [u8; SALT_LEN] {
    random_bytes()
}

/// Derive the field key for `salt` from `master`.
///
/// Pure: the same `(master, salt, params)` always yields the same key.
///
/// # Errors
///
/// Returns [`FieldError::Configuration`] if `params` is unusable. Parameters
/// built through [`KdfParams::new`] or [`KdfParams::default`] never fail here.
pub fn derive(
    master: &MasterKey,
    salt: &[u8; SALT_LEN],
    params: &KdfParams,
) -> Result<DerivedKey, FieldError> {
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.argon2_params()?);

    let mut key = Zeroizing::new([0u8; DERIVED_KEY_LEN]);
    argon2
        .hash_password_into(master.as_bytes(), salt, key.as_mut())
        .map_err(|e| FieldError::Configuration(format!("key derivation failed: {e}")))?;

    Ok(DerivedKey(key))
}
