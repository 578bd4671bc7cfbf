//! Redaction of decrypted values for display.
//!
//! Works on plaintext only. The masked string keeps the original length and
//! the trailing characters, nothing else, so it cannot be reversed.

/// Character substituted for every hidden position.
pub const MASK_CHAR: char = '*';

/// Number of trailing characters left visible by default.
pub const DEFAULT_VISIBLE_SUFFIX: usize = 4;

/// Mask all but the last `visible_suffix_len` characters of `plaintext`.
///
/// Lengths are counted in Unicode scalar values. If the value has at most
/// `visible_suffix_len` characters, every character is masked.
///
/// ```
/// use fieldcrypt::mask::mask_for_display;
///
/// assert_eq!(mask_for_display("123-45-6789", 4), "*******6789");
/// assert_eq!(mask_for_display("ab", 4), "**");
/// ```
pub fn mask_for_display(plaintext: &str, visible_suffix_len: usize) -> String {
    let len = plaintext.chars().count();
    let hidden = if len <= visible_suffix_len {
        len
    } else {
        len - visible_suffix_len
    };

    plaintext
        .chars()
        .enumerate()
        .map(|(i, c)| if i < hidden { MASK_CHAR } else { c })
        .collect()
}

/// [`mask_for_display`] for a possibly absent value; `None` yields `""`.
pub fn mask_optional(plaintext: Option<&str>, visible_suffix_len: usize) -> String {
    plaintext
        .map(|p| mask_for_display(p, visible_suffix_len))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_all_but_suffix() {
        assert_eq!(mask_for_display("123-45-6789", DEFAULT_VISIBLE_SUFFIX), "*******6789");
        assert_eq!(mask_for_display("4111111111111111", 4), "************1111");
    }

    #[test]
    fn short_values_fully_masked() {
        assert_eq!(mask_for_display("ab", 4), "**");
        assert_eq!(mask_for_display("abcd", 4), "****");
        assert_eq!(mask_for_display("abcde", 4), "*bcde");
    }

    #[test]
    fn empty_and_absent_yield_empty() {
        assert_eq!(mask_for_display("", 4), "");
        assert_eq!(mask_optional(None, 4), "");
        assert_eq!(mask_optional(Some("1990-04-12"), 2), "********12");
    }

    #[test]
    fn zero_suffix_masks_everything() {
        assert_eq!(mask_for_display("secret", 0), "******");
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert_eq!(mask_for_display("Zoë Ünal", 3), "*****nal");
        assert_eq!(mask_for_display("éé", 4).chars().count(), 2);
    }
}
