//! Size accounting in host string units
//!
//! The host store measures strings in UTF-16 code units and is assumed to
//! spend two bytes on each. Every size in the workspace goes through here so
//! the codec threshold and the quota math agree.

use crate::constants::BYTES_PER_CHAR_UNIT;

/// Length of `text` in UTF-16 code units
pub fn char_units(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Estimated bytes a single key/value pair occupies in the host store
pub fn entry_size(key: &str, value: &str) -> u64 {
    (char_units(key) + char_units(value)) as u64 * BYTES_PER_CHAR_UNIT
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ascii_units() {
        assert_eq!(char_units(""), 0);
        assert_eq!(char_units("hyvve"), 5);
    }

    #[test]
    fn test_non_bmp_counts_surrogate_pairs() {
        // U+1F600 is encoded as a surrogate pair
        assert_eq!(char_units("\u{1F600}"), 2);
        assert_eq!(char_units("é"), 1);
    }

    #[test]
    fn test_entry_size() {
        assert_eq!(entry_size("ab", "cde"), 10);
        assert_eq!(entry_size("", ""), 0);
    }

    proptest! {
        #[test]
        fn proptest_entry_size_is_twice_units(key in ".{0,32}", value in ".{0,256}") {
            let expected = (char_units(&key) + char_units(&value)) as u64 * 2;
            prop_assert_eq!(entry_size(&key, &value), expected);
        }
    }
}
