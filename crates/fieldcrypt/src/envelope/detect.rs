//! Cheap "does this look like an envelope?" classification for migration code.

use super::{Segment, DELIMITER};

/// Returns `true` if `value` has the shape of an envelope: four
/// `:`-separated hex segments, the first three exactly 64, 32 and 32
/// characters wide, and a non-empty, even-length ciphertext segment.
/// [`Envelope::decode`](super::Envelope::decode) rejects an empty
/// ciphertext as well, so anything this returns `false` for also fails to
/// decode.
///
/// This is a heuristic, not a cryptographic check. A plaintext value that
/// happens to have this shape is misclassified as encrypted, and a value that
/// passes may still fail to decrypt. Use it only to tell already-protected
/// values from raw plaintext while scanning existing data; never as the basis
/// of a security decision.
pub fn looks_like_envelope(value: &str) -> bool {
    let mut segments = value.split(DELIMITER);
    let shape = [Segment::Salt, Segment::Nonce, Segment::Tag, Segment::Ciphertext];

    for segment in shape {
        let Some(text) = segments.next() else {
            return false;
        };
        let width_ok = match segment.hex_len() {
            Some(width) => text.len() == width,
            None => !text.is_empty() && text.len() % 2 == 0,
        };
        if !width_ok || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return false;
        }
    }
    segments.next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn well_formed() -> String {
        format!("{}:{}:{}:{}", "a1".repeat(32), "b2".repeat(16), "c3".repeat(16), "d4e5")
    }

    #[test]
    fn accepts_well_formed_envelope() {
        assert!(looks_like_envelope(&well_formed()));
    }

    #[test]
    fn rejects_plaintext_and_empty() {
        assert!(!looks_like_envelope("plain text"));
        assert!(!looks_like_envelope(""));
        assert!(!looks_like_envelope("123-45-6789"));
    }

    #[test]
    fn rejects_wrong_segment_count() {
        assert!(!looks_like_envelope("ab:cd:ef"));
        assert!(!looks_like_envelope(&format!("{}:00", well_formed())));
    }

    #[test]
    fn rejects_empty_or_odd_ciphertext() {
        let base = format!("{}:{}:{}", "a1".repeat(32), "b2".repeat(16), "c3".repeat(16));
        assert!(!looks_like_envelope(&format!("{base}:")));
        assert!(!looks_like_envelope(&format!("{base}:abc")));
    }

    #[test]
    fn rejects_non_hex_segment() {
        let s = format!("{}:{}:{}:{}", "a1".repeat(32), "b2".repeat(16), "c3".repeat(16), "xyz0");
        assert!(!looks_like_envelope(&s));
    }

    #[test]
    fn hex_shaped_plaintext_is_misclassified() {
        // Documented limitation: shape is all the detector can see.
        let lookalike = format!("{}:{}:{}:00", "0".repeat(64), "0".repeat(32), "0".repeat(32));
        assert!(looks_like_envelope(&lookalike));
    }
}
