//! AES-256-GCM encryption and decryption of individual field values.
//!
//! **Parameters:** 16-byte nonce, 128-bit detached authentication tag. GCM
//! accepts non-96-bit nonces by hashing them through GHASH first; the wider
//! nonce matches the stored envelope layout.
//!
//! **Nonce discipline:** nonces come from the OS CSPRNG on every call. Never
//! pass a counter, a timestamp, or a nonce read back from an existing envelope
//! to [`encrypt`]. GCM nonce reuse under one key breaks both confidentiality
//! and authentication. Per-envelope salts already make the key unique, but
//! nonce randomness is required independently of that.

use aes_gcm::{
    aead::{consts::U16, AeadInPlace, KeyInit},
    aes::Aes256,
    AesGcm, Key, Nonce, Tag,
};
use common::FieldError;
use thiserror::Error;

use super::kdf::DerivedKey;
use super::random_bytes;

/// Byte length of the GCM nonce (16 bytes = 128 bits).
pub const NONCE_LEN: usize = 16;

/// Byte length of the GCM authentication tag (16 bytes = 128 bits).
pub const TAG_LEN: usize = 16;

/// AES-256-GCM with a 128-bit nonce and the standard 128-bit tag.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Errors produced by the cipher layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// Tag verification failed: wrong key, tampered tag, or corrupted
    /// ciphertext. Which one is never reported.
    #[error("authentication failed")]
    AuthenticationFailure,

    /// AES-GCM refused to encrypt (plaintext beyond the GCM length limit).
    #[error("aead encryption failed")]
    EncryptionFailure,
}

impl From<CipherError> for FieldError {
    fn from(e: CipherError) -> Self {
        match e {
            CipherError::AuthenticationFailure => FieldError::Authentication,
            CipherError::EncryptionFailure => FieldError::Internal(e.to_string()),
        }
    }
}

/// Draw a fresh nonce from the OS CSPRNG.
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    random_bytes()
}

/// Encrypt `plaintext` under `key` and `nonce`.
///
/// Returns the ciphertext (same length as the plaintext) and the detached tag.
///
/// # Errors
///
/// Returns [`CipherError::EncryptionFailure`] only if the plaintext exceeds
/// the GCM message length limit.
pub fn encrypt(
    plaintext: &[u8],
    key: &DerivedKey,
    nonce: &[u8; NONCE_LEN],
) -> Result<(Vec<u8>, [u8; TAG_LEN]), CipherError> {
    let cipher = build_cipher(key);
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::<U16>::from_slice(nonce), b"", &mut buffer)
        .map_err(|_| CipherError::EncryptionFailure)?;

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(&tag);
    Ok((buffer, tag_bytes))
}

/// Verify `tag` and decrypt `ciphertext`.
///
/// The tag is checked (in constant time) over the whole ciphertext before any
/// keystream is applied, so no plaintext byte is produced for a forged input.
///
/// # Errors
///
/// Returns [`CipherError::AuthenticationFailure`] for every failure.
pub fn decrypt(
    ciphertext: &[u8],
    key: &DerivedKey,
    nonce: &[u8; NONCE_LEN],
    tag: &[u8; TAG_LEN],
) -> Result<Vec<u8>, CipherError> {
    let cipher = build_cipher(key);
    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            Nonce::<U16>::from_slice(nonce),
            b"",
            &mut buffer,
            Tag::<U16>::from_slice(tag),
        )
        .map_err(|_| CipherError::AuthenticationFailure)?;
    Ok(buffer)
}

fn build_cipher(key: &DerivedKey) -> Aes256Gcm16 {
    Aes256Gcm16::new(Key::<Aes256Gcm16>::from_slice(key.as_bytes()))
}
