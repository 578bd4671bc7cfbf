//! The persisted envelope: codec and format detection.
//!
//! # Envelope format
//!
//! ```text
//! <hex(salt, 32 B)>:<hex(nonce, 16 B)>:<hex(tag, 16 B)>:<hex(ciphertext)>
//! ```
//!
//! Four lowercase-hex segments, always in this order, so the value fits a
//! plain text column. The envelope carries everything decryption needs
//! besides the master key. There is no version marker; values written by
//! earlier deployments decode unchanged.

pub mod detect;

use std::fmt;
use std::str::FromStr;

use common::FieldError;
use thiserror::Error;

use crate::crypto::{NONCE_LEN, SALT_LEN, TAG_LEN};

/// Separator between envelope segments.
pub const DELIMITER: char = ':';

/// Number of segments in a well-formed envelope.
pub const SEGMENT_COUNT: usize = 4;

/// One encrypted field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Key-derivation salt.
    pub salt: [u8; SALT_LEN],
    /// AES-GCM nonce.
    pub nonce: [u8; NONCE_LEN],
    /// AES-GCM authentication tag.
    pub tag: [u8; TAG_LEN],
    /// Ciphertext, same length as the plaintext.
    pub ciphertext: Vec<u8>,
}

/// Envelope segment names, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Salt,
    Nonce,
    Tag,
    Ciphertext,
}

impl Segment {
    /// Required hex width, or `None` for the variable-length ciphertext.
    pub fn hex_len(self) -> Option<usize> {
        match self {
            Segment::Salt => Some(SALT_LEN * 2),
            Segment::Nonce => Some(NONCE_LEN * 2),
            Segment::Tag => Some(TAG_LEN * 2),
            Segment::Ciphertext => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Segment::Salt => "salt",
            Segment::Nonce => "nonce",
            Segment::Tag => "tag",
            Segment::Ciphertext => "ciphertext",
        })
    }
}

/// Structural decode failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("expected {SEGMENT_COUNT} segments, found {0}")]
    SegmentCount(usize),

    #[error("{segment} segment must be {expected} hex characters, found {actual}")]
    SegmentLength {
        segment: Segment,
        expected: usize,
        actual: usize,
    },

    #[error("{0} segment is not valid hex")]
    InvalidHex(Segment),

    #[error("ciphertext segment is empty")]
    EmptyCiphertext,
}

impl From<EnvelopeError> for FieldError {
    fn from(e: EnvelopeError) -> Self {
        FieldError::Format(e.to_string())
    }
}

impl Envelope {
    /// Assemble an envelope from its four parts.
    pub fn new(
        salt: [u8; SALT_LEN],
        nonce: [u8; NONCE_LEN],
        tag: [u8; TAG_LEN],
        ciphertext: Vec<u8>,
    ) -> Self {
        Self {
            salt,
            nonce,
            tag,
            ciphertext,
        }
    }

    /// Encode to the canonical lowercase-hex string.
    pub fn encode(&self) -> String {
        format!(
            "{}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}",
            hex::encode(self.salt),
            hex::encode(self.nonce),
            hex::encode(self.tag),
            hex::encode(&self.ciphertext),
        )
    }

    /// Parse an envelope string.
    ///
    /// Hex digits are accepted in either case; [`Envelope::encode`] always
    /// writes lowercase.
    ///
    /// # Errors
    ///
    /// Returns an [`EnvelopeError`] if the string does not have exactly four
    /// `:`-separated segments, if a segment is not hex, if the salt, nonce
    /// or tag segment is not exactly 64, 32 or 32 hex characters, or if the
    /// ciphertext is empty. Blank field values are stored as `""` and never
    /// sealed, so an empty ciphertext is always malformed data.
    pub fn decode(s: &str) -> Result<Self, EnvelopeError> {
        let parts: Vec<&str> = s.split(DELIMITER).collect();
        let [salt, nonce, tag, ciphertext] = parts.as_slice() else {
            return Err(EnvelopeError::SegmentCount(parts.len()));
        };
        if ciphertext.is_empty() {
            return Err(EnvelopeError::EmptyCiphertext);
        }

        Ok(Self {
            salt: decode_fixed(Segment::Salt, salt)?,
            nonce: decode_fixed(Segment::Nonce, nonce)?,
            tag: decode_fixed(Segment::Tag, tag)?,
            ciphertext: hex::decode(ciphertext)
                .map_err(|_| EnvelopeError::InvalidHex(Segment::Ciphertext))?,
        })
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Envelope {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

fn decode_fixed<const N: usize>(segment: Segment, text: &str) -> Result<[u8; N], EnvelopeError> {
    if text.len() != N * 2 {
        return Err(EnvelopeError::SegmentLength {
            segment,
            expected: N * 2,
            actual: text.len(),
        });
    }
    let mut out = [0u8; N];
    hex::decode_to_slice(text, &mut out).map_err(|_| EnvelopeError::InvalidHex(segment))?;
    Ok(out)
}
