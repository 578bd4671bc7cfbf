//! Key derivation and AES-256-GCM primitives, and the two compositions that
//! turn them into envelopes.
//!
//! This module is intentionally free of configuration, async, and logging
//! dependencies. Everything here is a pure function of its arguments plus
//! the OS CSPRNG.
//!
//! # Forward path
//!
//! ```text
//! plaintext ─▶ derive(master, fresh salt) ─▶ AES-256-GCM(fresh nonce) ─▶ Envelope
//! ```

pub mod cipher;
pub mod kdf;

pub use cipher::{NONCE_LEN, TAG_LEN};
pub use kdf::{KdfParams, SALT_LEN};

use aes_gcm::aead::{rand_core::RngCore, OsRng};
use common::FieldError;
use zeroize::Zeroizing;

use crate::envelope::Envelope;
use crate::key::MasterKey;

/// Fill an `N`-byte array from the OS CSPRNG.
pub(crate) fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Encrypt `plaintext` into a new [`Envelope`] under `master`.
///
/// Draws a fresh salt and a fresh nonce on every call, so sealing the same
/// plaintext twice never yields the same envelope.
///
/// # Errors
///
/// Propagates [`FieldError::Configuration`] from derivation and
/// [`FieldError::Internal`] from an AEAD length overflow.
pub fn seal(master: &MasterKey, params: &KdfParams, plaintext: &[u8]) -> Result<Envelope, FieldError> {
    let salt = kdf::generate_salt();
    let nonce = cipher::generate_nonce();
    let key = kdf::derive(master, &salt, params)?;
    let (ciphertext, tag) = cipher::encrypt(plaintext, &key, &nonce)?;
    Ok(Envelope::new(salt, nonce, tag, ciphertext))
}

/// Decrypt `envelope` under `master`, re-deriving the key from the envelope's
/// own salt. The recovered plaintext is zeroed when dropped.
///
/// # Errors
///
/// Returns [`FieldError::Authentication`] if the tag does not verify.
pub fn open(
    master: &MasterKey,
    params: &KdfParams,
    envelope: &Envelope,
) -> Result<Zeroizing<Vec<u8>>, FieldError> {
    let key = kdf::derive(master, &envelope.salt, params)?;
    let plaintext = cipher::decrypt(&envelope.ciphertext, &key, &envelope.nonce, &envelope.tag)?;
    Ok(Zeroizing::new(plaintext))
}
