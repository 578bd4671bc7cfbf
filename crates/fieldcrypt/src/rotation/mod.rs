//! Re-encryption of stored fields under a new master key.
//!
//! # Module invariants
//!
//! - Both master keys and both sets of KDF cost parameters are explicit.
//!   Nothing here reads or swaps a shared "current key", so rotations under
//!   different key pairs can run concurrently with each other and with
//!   normal traffic.
//! - Envelopes do not record their KDF cost, so a cost change is migrated
//!   exactly like a key change: decrypt under the old parameters, seal under
//!   the new ones.
//! - No persistence. [`rotate_field`] returns a new envelope; replacing the
//!   stored value (atomically) is the storage collaborator's job, either
//!   directly or through [`EnvelopeStore`].
//! - A failed decrypt leaves the caller holding the original envelope.

pub mod batch;

pub use batch::{EnvelopeStore, RotationJob};

use common::FieldError;

use crate::crypto::{self, KdfParams};
use crate::envelope::Envelope;
use crate::key::MasterKey;

/// Re-encrypt one envelope string from `old` to `new`.
///
/// Decrypts with a key derived from `old`, `old_params` and the envelope's
/// own salt, then seals the recovered plaintext under `new` and `new_params`
/// with a fresh salt and nonce. The result never shares salt or nonce with
/// the input. An empty field stays empty.
///
/// Passing the same key twice with different parameters migrates a field
/// across a KDF cost change.
///
/// # Errors
///
/// Returns [`FieldError::RotationAbort`] wrapping the decrypt-phase failure
/// ([`FieldError::Format`] or [`FieldError::Authentication`]).
pub fn rotate_field(
    envelope: &str,
    old: &MasterKey,
    old_params: &KdfParams,
    new: &MasterKey,
    new_params: &KdfParams,
) -> Result<String, FieldError> {
    if envelope.is_empty() {
        return Ok(String::new());
    }

    let plaintext = Envelope::decode(envelope)
        .map_err(FieldError::from)
        .and_then(|parsed| crypto::open(old, old_params, &parsed))
        .map_err(FieldError::rotation_abort)?;

    Ok(crypto::seal(new, new_params, &plaintext)?.encode())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldCipher;
    use std::sync::Arc;

    const OLD: &str = "0123456789abcdef0123456789abcdef";
    const NEW: &str = "fedcba9876543210fedcba9876543210";

    fn params() -> KdfParams {
        KdfParams::new(64, 1, 1).unwrap()
    }

    fn keys() -> (Arc<MasterKey>, Arc<MasterKey>) {
        (
            Arc::new(MasterKey::new(OLD).unwrap()),
            Arc::new(MasterKey::new(NEW).unwrap()),
        )
    }

    #[test]
    fn rotated_envelope_decrypts_under_new_key_only() {
        let (old, new) = keys();
        let old_cipher = FieldCipher::from_shared(old.clone(), params());
        let new_cipher = FieldCipher::from_shared(new.clone(), params());

        let e = old_cipher.encrypt_field("123-45-6789").unwrap();
        let e2 = rotate_field(&e, &old, &params(), &new, &params()).unwrap();

        assert_ne!(e, e2);
        assert_eq!(new_cipher.decrypt_field(&e2).unwrap(), "123-45-6789");
        assert_eq!(old_cipher.decrypt_field(&e2), Err(FieldError::Authentication));
        // The original is still readable under the old key.
        assert_eq!(old_cipher.decrypt_field(&e).unwrap(), "123-45-6789");
    }

    #[test]
    fn rotation_uses_fresh_salt_and_nonce() {
        let (old, _) = keys();
        let cipher = FieldCipher::from_shared(old.clone(), params());
        let e = cipher.encrypt_field("same key rotation").unwrap();
        // Rotating onto the same key still produces a new envelope.
        let e2 = rotate_field(&e, &old, &params(), &old, &params()).unwrap();
        let (a, b) = (Envelope::decode(&e).unwrap(), Envelope::decode(&e2).unwrap());
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.nonce, b.nonce);
        assert_eq!(cipher.decrypt_field(&e2).unwrap(), "same key rotation");
    }

    #[test]
    fn wrong_old_key_aborts() {
        let (old, new) = keys();
        let e = FieldCipher::from_shared(new.clone(), params())
            .encrypt_field("x")
            .unwrap();
        let err = rotate_field(&e, &old, &params(), &new, &params()).unwrap_err();
        assert_eq!(err, FieldError::rotation_abort(FieldError::Authentication));
    }

    #[test]
    fn malformed_envelope_aborts() {
        let (old, new) = keys();
        let err = rotate_field("not an envelope", &old, &params(), &new, &params()).unwrap_err();
        assert!(matches!(
            err,
            FieldError::RotationAbort(ref cause) if matches!(**cause, FieldError::Format(_))
        ));
    }

    #[test]
    fn migrates_across_kdf_cost_change() {
        let (key, _) = keys();
        let light = params();
        let heavier = KdfParams::new(128, 2, 1).unwrap();
        let before = FieldCipher::from_shared(key.clone(), light);
        let after = FieldCipher::from_shared(key.clone(), heavier);

        let stored = before.encrypt_field("123-45-6789").unwrap();
        // Changing the cost alone makes stored data unreadable...
        assert_eq!(after.decrypt_field(&stored), Err(FieldError::Authentication));

        // ...until it is rotated from the old cost to the new one.
        let migrated = rotate_field(&stored, &key, &light, &key, &heavier).unwrap();
        assert_eq!(after.decrypt_field(&migrated).unwrap(), "123-45-6789");
        assert_eq!(before.decrypt_field(&migrated), Err(FieldError::Authentication));
    }

    #[test]
    fn key_and_cost_change_together() {
        let (old, new) = keys();
        let heavier = KdfParams::new(128, 2, 1).unwrap();
        let stored = FieldCipher::from_shared(old.clone(), params())
            .encrypt_field("1990-04-12")
            .unwrap();
        let migrated = rotate_field(&stored, &old, &params(), &new, &heavier).unwrap();
        assert_eq!(
            FieldCipher::from_shared(new, heavier).decrypt_field(&migrated).unwrap(),
            "1990-04-12"
        );
    }

    #[test]
    fn wrong_old_params_abort() {
        let (old, new) = keys();
        let stored = FieldCipher::from_shared(old.clone(), params())
            .encrypt_field("x")
            .unwrap();
        let guessed = KdfParams::new(128, 2, 1).unwrap();
        let err = rotate_field(&stored, &old, &guessed, &new, &params()).unwrap_err();
        assert_eq!(err, FieldError::rotation_abort(FieldError::Authentication));
    }

    #[test]
    fn empty_field_stays_empty() {
        let (old, new) = keys();
        assert_eq!(rotate_field("", &old, &params(), &new, &params()).unwrap(), "");
    }
}
