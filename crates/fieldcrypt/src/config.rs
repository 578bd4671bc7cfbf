//! Configuration loading and validation for field encryption.
//!
//! All values are read from environment variables at startup. Hosts should
//! call [`Config::from_env`] before serving anything; a missing or short
//! master key fails there, not on the first request.

use std::fmt;

use anyhow::{Context, Result};
use common::FieldError;
use serde::Deserialize;
use zeroize::Zeroize;

use crate::crypto::kdf::{self, KdfParams};
use crate::key::MasterKey;

/// Validated field-encryption configuration.
///
/// The `KDF_*` cost parameters are bound to stored data: envelopes do not
/// record them, so an envelope only decrypts under the parameters it was
/// sealed with. To change them, set `PREVIOUS_KDF_*` to the old values and
/// rotate every stored field (see [`Config::previous_kdf_params`]).
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Master secret every field key is derived from. **Required**, at least
    /// 32 characters.
    pub encryption_key: Option<String>,

    /// Master secret being rotated away from, if a rotation is in progress.
    pub previous_encryption_key: Option<String>,

    /// Argon2id memory cost in KiB.
    #[serde(default = "default_kdf_memory_kib")]
    pub kdf_memory_kib: u32,

    /// Argon2id pass count.
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Argon2id lane count.
    #[serde(default = "default_kdf_parallelism")]
    pub kdf_parallelism: u32,

    /// Memory cost existing envelopes were sealed with, if it differs from
    /// `kdf_memory_kib`.
    #[serde(default)]
    pub previous_kdf_memory_kib: Option<u32>,

    /// Pass count existing envelopes were sealed with.
    #[serde(default)]
    pub previous_kdf_iterations: Option<u32>,

    /// Lane count existing envelopes were sealed with.
    #[serde(default)]
    pub previous_kdf_parallelism: Option<u32>,

    /// Upper bound on key derivations running at once.
    #[serde(default = "default_max_concurrent_derivations")]
    pub max_concurrent_derivations: usize,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_kdf_memory_kib() -> u32 {
    kdf::DEFAULT_MEMORY_KIB
}
fn default_kdf_iterations() -> u32 {
    kdf::DEFAULT_ITERATIONS
}
fn default_kdf_parallelism() -> u32 {
    kdf::DEFAULT_PARALLELISM
}
fn default_max_concurrent_derivations() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed, or if validation
    /// fails. Validation failures wrap a [`FieldError::Configuration`].
    pub fn from_env() -> Result<Self> {
        Self::from_builder(config::Config::builder().add_source(config::Environment::default()))
    }

    fn from_builder(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let cfg = builder
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// The validated master key.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Configuration`] if `ENCRYPTION_KEY` is absent or
    /// shorter than 32 characters.
    pub fn master_key(&self) -> Result<MasterKey, FieldError> {
        MasterKey::from_optional(self.encryption_key.as_deref())
    }

    /// The master key being rotated away from, if one is configured.
    pub fn previous_master_key(&self) -> Result<Option<MasterKey>, FieldError> {
        self.previous_encryption_key
            .as_deref()
            .map(MasterKey::new)
            .transpose()
    }

    /// The Argon2id cost parameters.
    pub fn kdf_params(&self) -> Result<KdfParams, FieldError> {
        KdfParams::new(self.kdf_memory_kib, self.kdf_iterations, self.kdf_parallelism)
    }

    /// The Argon2id cost parameters existing envelopes were sealed with.
    ///
    /// Each `PREVIOUS_KDF_*` value falls back to its current `KDF_*`
    /// counterpart, so this equals [`Config::kdf_params`] unless a cost
    /// migration is configured.
    pub fn previous_kdf_params(&self) -> Result<KdfParams, FieldError> {
        KdfParams::new(
            self.previous_kdf_memory_kib.unwrap_or(self.kdf_memory_kib),
            self.previous_kdf_iterations.unwrap_or(self.kdf_iterations),
            self.previous_kdf_parallelism.unwrap_or(self.kdf_parallelism),
        )
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        self.master_key().context("ENCRYPTION_KEY is invalid")?;
        self.previous_master_key()
            .context("PREVIOUS_ENCRYPTION_KEY is invalid")?;
        self.kdf_params().context("KDF parameters are invalid")?;
        self.previous_kdf_params()
            .context("PREVIOUS_KDF parameters are invalid")?;

        if self.max_concurrent_derivations == 0 {
            anyhow::bail!("MAX_CONCURRENT_DERIVATIONS must be > 0");
        }
        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |k: &Option<String>| k.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("Config")
            .field("encryption_key", &redact(&self.encryption_key))
            .field("previous_encryption_key", &redact(&self.previous_encryption_key))
            .field("kdf_memory_kib", &self.kdf_memory_kib)
            .field("kdf_iterations", &self.kdf_iterations)
            .field("kdf_parallelism", &self.kdf_parallelism)
            .field("previous_kdf_memory_kib", &self.previous_kdf_memory_kib)
            .field("previous_kdf_iterations", &self.previous_kdf_iterations)
            .field("previous_kdf_parallelism", &self.previous_kdf_parallelism)
            .field("max_concurrent_derivations", &self.max_concurrent_derivations)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Drop for Config {
    fn drop(&mut self) {
        self.encryption_key.zeroize();
        self.previous_encryption_key.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0123456789abcdef0123456789abcdef";

    fn valid() -> Config {
        Config {
            encryption_key: Some(KEY.into()),
            previous_encryption_key: None,
            kdf_memory_kib: default_kdf_memory_kib(),
            kdf_iterations: default_kdf_iterations(),
            kdf_parallelism: default_kdf_parallelism(),
            previous_kdf_memory_kib: None,
            previous_kdf_iterations: None,
            previous_kdf_parallelism: None,
            max_concurrent_derivations: 2,
            log_level: default_log_level(),
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_kdf_memory_kib(), 19456);
        assert_eq!(default_kdf_iterations(), 2);
        assert_eq!(default_kdf_parallelism(), 1);
        assert!(default_max_concurrent_derivations() >= 1);
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn validate_accepts_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_key() {
        let mut cfg = valid();
        cfg.encryption_key = None;
        let err = cfg.validate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FieldError>(),
            Some(FieldError::Configuration(_))
        ));
    }

    #[test]
    fn validate_rejects_short_key() {
        let mut cfg = valid();
        cfg.encryption_key = Some("short".into());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_short_previous_key() {
        let mut cfg = valid();
        cfg.previous_encryption_key = Some("short".into());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut cfg = valid();
        cfg.max_concurrent_derivations = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_unusable_kdf_params() {
        let mut cfg = valid();
        cfg.kdf_iterations = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn previous_kdf_params_default_to_current() {
        let cfg = valid();
        assert_eq!(cfg.previous_kdf_params().unwrap(), cfg.kdf_params().unwrap());
    }

    #[test]
    fn previous_kdf_params_override_per_field() {
        let mut cfg = valid();
        cfg.previous_kdf_memory_kib = Some(64);
        cfg.previous_kdf_iterations = Some(1);
        let previous = cfg.previous_kdf_params().unwrap();
        assert_eq!(previous.memory_kib(), 64);
        assert_eq!(previous.iterations(), 1);
        assert_eq!(previous.parallelism(), default_kdf_parallelism());
    }

    #[test]
    fn validate_rejects_unusable_previous_kdf_params() {
        let mut cfg = valid();
        cfg.previous_kdf_iterations = Some(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn loads_previous_kdf_params_from_sources() {
        let builder = config::Config::builder()
            .set_override("encryption_key", KEY)
            .unwrap()
            .set_override("previous_kdf_memory_kib", 8192)
            .unwrap();
        let cfg = Config::from_builder(builder).unwrap();
        assert_eq!(cfg.previous_kdf_memory_kib, Some(8192));
        assert_eq!(cfg.previous_kdf_params().unwrap().memory_kib(), 8192);
    }

    #[test]
    fn loads_from_sources_with_defaults() {
        let builder = config::Config::builder()
            .set_override("encryption_key", KEY)
            .unwrap();
        let cfg = Config::from_builder(builder).unwrap();
        assert_eq!(cfg.kdf_memory_kib, 19456);
        assert_eq!(cfg.log_level, "info");
        assert!(cfg.previous_master_key().unwrap().is_none());
    }

    #[test]
    fn load_fails_without_key() {
        assert!(Config::from_builder(config::Config::builder()).is_err());
    }

    #[test]
    fn keys_redacted_in_debug() {
        let mut cfg = valid();
        cfg.previous_encryption_key = Some("fedcba9876543210fedcba9876543210".into());
        let printed = format!("{cfg:?}");
        assert!(printed.contains("[REDACTED]"));
        assert!(!printed.contains(KEY));
        assert!(!printed.contains("fedcba"));
    }
}
