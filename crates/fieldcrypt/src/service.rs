//! [`FieldService`]: async facade that routes every derivation through the
//! shared [`DerivationPool`].

use std::sync::Arc;

use common::FieldError;
use tracing::info;
use zeroize::Zeroizing;

use crate::config::Config;
use crate::crypto::KdfParams;
use crate::field::FieldCipher;
use crate::key::MasterKey;
use crate::pool::DerivationPool;
use crate::rotation::RotationJob;

/// Shared state for async callers.
///
/// All fields are cheaply cloneable (`Arc`-backed), so request handlers can
/// clone the service freely.
#[derive(Clone, Debug)]
pub struct FieldService {
    cipher: FieldCipher,
    pool: DerivationPool,
}

impl FieldService {
    /// Create a [`FieldService`] from a cipher and a pool.
    pub fn new(cipher: FieldCipher, pool: DerivationPool) -> Self {
        Self { cipher, pool }
    }

    /// Build from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Configuration`] if the master key or KDF
    /// parameters are invalid.
    pub fn from_config(cfg: &Config) -> Result<Self, FieldError> {
        let cipher = FieldCipher::from_config(cfg)?;
        let pool = DerivationPool::new(cfg.max_concurrent_derivations);
        info!(
            kdf_memory_kib = cipher.params().memory_kib(),
            kdf_iterations = cipher.params().iterations(),
            kdf_parallelism = cipher.params().parallelism(),
            max_concurrent_derivations = pool.size(),
            "field encryption ready"
        );
        Ok(Self::new(cipher, pool))
    }

    /// The synchronous cipher, for callers already off the async executor.
    pub fn cipher(&self) -> &FieldCipher {
        &self.cipher
    }

    pub fn pool(&self) -> &DerivationPool {
        &self.pool
    }

    /// Pooled [`FieldCipher::encrypt_field`].
    pub async fn encrypt_field(&self, plaintext: impl Into<String>) -> Result<String, FieldError> {
        let cipher = self.cipher.clone();
        let plaintext = Zeroizing::new(plaintext.into());
        self.pool.run(move || cipher.encrypt_field(&plaintext)).await
    }

    /// Pooled [`FieldCipher::decrypt_field`].
    pub async fn decrypt_field(&self, envelope: impl Into<String>) -> Result<String, FieldError> {
        let cipher = self.cipher.clone();
        let envelope = envelope.into();
        self.pool.run(move || cipher.decrypt_field(&envelope)).await
    }

    /// Pooled [`FieldCipher::decrypt_masked`].
    pub async fn decrypt_masked(
        &self,
        envelope: impl Into<String>,
        visible_suffix_len: usize,
    ) -> Result<String, FieldError> {
        let cipher = self.cipher.clone();
        let envelope = envelope.into();
        self.pool
            .run(move || cipher.decrypt_masked(&envelope, visible_suffix_len))
            .await
    }

    /// A job rotating fields sealed under `previous` and `previous_params`
    /// onto this service's key and parameters, sharing this service's pool so
    /// rotation and live traffic draw from one budget.
    pub fn rotation_from(&self, previous: Arc<MasterKey>, previous_params: KdfParams) -> RotationJob {
        RotationJob::new(
            previous,
            previous_params,
            self.cipher.master().clone(),
            *self.cipher.params(),
            self.pool.clone(),
        )
    }

    /// The rotation `cfg` asks for, if any.
    ///
    /// `PREVIOUS_ENCRYPTION_KEY` defaults to this service's key and
    /// `PREVIOUS_KDF_*` to its parameters. Returns `None` when neither
    /// differs, since there is nothing to migrate.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Configuration`] if a previous value is invalid.
    pub fn rotation_from_config(&self, cfg: &Config) -> Result<Option<RotationJob>, FieldError> {
        let previous_params = cfg.previous_kdf_params()?;
        let previous = cfg.previous_master_key()?;
        if previous.is_none() && previous_params == *self.cipher.params() {
            return Ok(None);
        }
        let previous = previous
            .map(Arc::new)
            .unwrap_or_else(|| self.cipher.master().clone());
        info!(
            key_changed = cfg.previous_encryption_key.is_some(),
            previous_kdf_memory_kib = previous_params.memory_kib(),
            previous_kdf_iterations = previous_params.iterations(),
            "rotation configured"
        );
        Ok(Some(self.rotation_from(previous, previous_params)))
    }
}
