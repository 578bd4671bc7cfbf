//! `fieldcrypt`: field-level authenticated encryption for sensitive values.
//!
//! Each value is sealed into a self-describing envelope string before it is
//! handed to storage:
//!
//! ```text
//! plaintext ─▶ Argon2id(master key, fresh salt) ─▶ AES-256-GCM(fresh nonce)
//!           ─▶ "<salt>:<nonce>:<tag>:<ciphertext>"   (lowercase hex)
//! ```
//!
//! Host startup sequence:
//! 1. Load and validate [`Config`] from environment variables. A missing or
//!    short master key fails here.
//! 2. Initialise logging with [`telemetry::init_telemetry`].
//! 3. Build a [`FieldService`] (async, pooled) or a [`FieldCipher`] (sync).
//! 4. If `PREVIOUS_ENCRYPTION_KEY` or `PREVIOUS_KDF_*` is set, run the job
//!    from [`FieldService::rotation_from_config`] over stored fields.
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use fieldcrypt::{Config, FieldService};
//!
//! let cfg = Config::from_env()?;
//! fieldcrypt::telemetry::init_telemetry(&cfg.log_level)?;
//! let fields = FieldService::from_config(&cfg)?;
//!
//! let stored = fields.encrypt_field("123-45-6789").await?;
//! assert!(fieldcrypt::looks_like_envelope(&stored));
//! let shown = fields.decrypt_masked(stored, 4).await?;
//! assert_eq!(shown, "*******6789");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crypto;
pub mod envelope;
pub mod field;
pub mod key;
pub mod mask;
pub mod pool;
pub mod rotation;
pub mod service;
pub mod telemetry;

pub use common::protocol::{FailedField, FieldRecord, RotatedField, RotationReport};
pub use common::FieldError;

pub use crate::config::Config;
pub use crate::crypto::KdfParams;
pub use crate::envelope::detect::looks_like_envelope;
pub use crate::envelope::Envelope;
pub use crate::field::FieldCipher;
pub use crate::key::MasterKey;
pub use crate::mask::{mask_for_display, DEFAULT_VISIBLE_SUFFIX};
pub use crate::pool::DerivationPool;
pub use crate::rotation::{rotate_field, EnvelopeStore, RotationJob};
pub use crate::service::FieldService;
