//! [`FieldCipher`]: the string-in, string-out surface persistence-layer field
//! transformers call.

use std::sync::Arc;

use common::FieldError;
use zeroize::Zeroizing;

use crate::config::Config;
use crate::crypto::{self, KdfParams};
use crate::envelope::{detect::looks_like_envelope, Envelope};
use crate::key::MasterKey;
use crate::mask::mask_for_display;

/// Encrypts and decrypts single field values under one master key.
///
/// Cheap to clone: the master key is shared behind an `Arc` and never
/// mutated. Every method is a pure function of its arguments, the shared key,
/// and the OS CSPRNG, so one instance can serve any number of threads.
#[derive(Clone, Debug)]
pub struct FieldCipher {
    master: Arc<MasterKey>,
    params: KdfParams,
}

impl FieldCipher {
    /// Create a [`FieldCipher`] owning `master`.
    pub fn new(master: MasterKey, params: KdfParams) -> Self {
        Self::from_shared(Arc::new(master), params)
    }

    /// Create a [`FieldCipher`] over an already shared master key.
    pub fn from_shared(master: Arc<MasterKey>, params: KdfParams) -> Self {
        Self { master, params }
    }

    /// Build from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Configuration`] if the master key or KDF
    /// parameters are invalid.
    pub fn from_config(cfg: &Config) -> Result<Self, FieldError> {
        Ok(Self::new(cfg.master_key()?, cfg.kdf_params()?))
    }

    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    pub(crate) fn master(&self) -> &Arc<MasterKey> {
        &self.master
    }

    /// Encrypt a field value into an envelope string.
    ///
    /// By convention empty and whitespace-only values are not encrypted: they
    /// map to the empty-string sentinel `""`.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Internal`] only on an AEAD length overflow.
    pub fn encrypt_field(&self, plaintext: &str) -> Result<String, FieldError> {
        if plaintext.trim().is_empty() {
            return Ok(String::new());
        }
        Ok(crypto::seal(&self.master, &self.params, plaintext.as_bytes())?.encode())
    }

    /// Decrypt an envelope string back to the field value. `""` maps to `""`.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Format`] if `envelope` is not well formed and
    /// [`FieldError::Authentication`] if it does not verify under this key.
    pub fn decrypt_field(&self, envelope: &str) -> Result<String, FieldError> {
        if envelope.is_empty() {
            return Ok(String::new());
        }
        let envelope = Envelope::decode(envelope)?;
        let plaintext = crypto::open(&self.master, &self.params, &envelope)?;
        // Only this crate writes envelopes, and it only seals `str` bytes.
        String::from_utf8(plaintext.to_vec()).map_err(|_| FieldError::Authentication)
    }

    /// Migration write path: leave values that already look like envelopes
    /// alone, encrypt everything else.
    ///
    /// Relies on [`looks_like_envelope`], so a plaintext value shaped like an
    /// envelope is left unencrypted.
    pub fn protect_if_plain(&self, value: &str) -> Result<String, FieldError> {
        if looks_like_envelope(value) {
            return Ok(value.to_owned());
        }
        self.encrypt_field(value)
    }

    /// Migration read path: decrypt values that look like envelopes, return
    /// everything else as stored.
    pub fn decrypt_if_envelope(&self, value: &str) -> Result<String, FieldError> {
        if looks_like_envelope(value) {
            return self.decrypt_field(value);
        }
        Ok(value.to_owned())
    }

    /// Decrypt and immediately mask for display. The unmasked plaintext is
    /// zeroed before returning.
    pub fn decrypt_masked(&self, envelope: &str, visible_suffix_len: usize) -> Result<String, FieldError> {
        let plaintext = Zeroizing::new(self.decrypt_field(envelope)?);
        Ok(mask_for_display(&plaintext, visible_suffix_len))
    }
}
