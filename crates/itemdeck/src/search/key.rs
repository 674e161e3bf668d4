//! Compact substring keys.

/// Maximum number of decimal digits in an identifier (`1_000_000` has 7).
pub const MAX_DIGITS: usize = 7;

/// A run of 1 to `MAX_DIGITS` decimal digits packed into 32 bits.
///
/// The low 3 bits hold the digit count and the rest the numeric value, so
/// `"7"`, `"07"` and `"007"` are three distinct keys. Values stay below
/// `10^7 < 2^24`, which leaves plenty of headroom in the shifted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SubstringKey(u32);

#[allow(clippy::len_without_is_empty)]
impl SubstringKey {
    /// Packs a digit run given its numeric value and length.
    #[inline]
    pub(crate) fn new(value: u32, len: usize) -> Self {
        debug_assert!((1..=MAX_DIGITS).contains(&len));
        Self((value << 3) | len as u32)
    }

    /// Parses a string made only of ASCII digits.
    ///
    /// Returns `None` for empty input, non-digits, or more than
    /// `MAX_DIGITS` digits (no identifier can contain such a run).
    pub fn from_digits(digits: &str) -> Option<Self> {
        if digits.is_empty() || digits.len() > MAX_DIGITS {
            return None;
        }
        let mut value = 0u32;
        for byte in digits.bytes() {
            if !byte.is_ascii_digit() {
                return None;
            }
            value = value * 10 + u32::from(byte - b'0');
        }
        Some(Self::new(value, digits.len()))
    }

    /// Number of digits in the run.
    #[inline]
    pub fn len(self) -> usize {
        (self.0 & 0b111) as usize
    }

    /// Numeric value of the run (leading zeros dropped).
    #[inline]
    pub fn value(self) -> u32 {
        self.0 >> 3
    }
}

impl std::fmt::Display for SubstringKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:0width$}", self.value(), width = self.len())
    }
}

/// Calls `visit` once per contiguous digit run of `id`'s decimal form.
///
/// An id with repeated runs (e.g. `11` contains `"1"` twice) visits the same
/// key more than once; callers dedup.
pub(crate) fn for_each_substring(id: u32, mut visit: impl FnMut(SubstringKey)) {
    let mut digits = [0u8; 10];
    let mut len = 0;
    let mut rest = id;
    loop {
        digits[len] = (rest % 10) as u8;
        len += 1;
        rest /= 10;
        if rest == 0 {
            break;
        }
    }
    digits[..len].reverse();

    for start in 0..len {
        let mut value = 0u32;
        for end in start..len.min(start + MAX_DIGITS) {
            value = value * 10 + u32::from(digits[end]);
            visit(SubstringKey::new(value, end - start + 1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(id: u32) -> Vec<String> {
        let mut keys = Vec::new();
        for_each_substring(id, |key| keys.push(key.to_string()));
        keys
    }

    #[test]
    fn leading_zeros_are_distinct_keys() {
        let seven = SubstringKey::from_digits("7").unwrap();
        let zero_seven = SubstringKey::from_digits("07").unwrap();
        let double_zero_seven = SubstringKey::from_digits("007").unwrap();
        assert_ne!(seven, zero_seven);
        assert_ne!(zero_seven, double_zero_seven);
        assert_eq!(double_zero_seven.value(), 7);
        assert_eq!(double_zero_seven.len(), 3);
        assert_eq!(double_zero_seven.to_string(), "007");
    }

    #[test]
    fn from_digits_rejects_bad_input() {
        assert_eq!(SubstringKey::from_digits(""), None);
        assert_eq!(SubstringKey::from_digits("12a"), None);
        assert_eq!(SubstringKey::from_digits("-1"), None);
        assert_eq!(SubstringKey::from_digits("12345678"), None);
        assert!(SubstringKey::from_digits("1000000").is_some());
    }

    #[test]
    fn substrings_of_single_digit() {
        assert_eq!(collect(5), vec!["5"]);
    }

    #[test]
    fn substrings_of_multi_digit() {
        assert_eq!(collect(123), vec!["1", "12", "123", "2", "23", "3"]);
    }

    #[test]
    fn substrings_keep_zero_runs() {
        let keys = collect(1000000);
        assert_eq!(keys.len(), 28);
        assert!(keys.contains(&"000000".to_string()));
        assert!(keys.contains(&"1000000".to_string()));
    }

    #[test]
    fn repeated_runs_are_visited_repeatedly() {
        assert_eq!(collect(11), vec!["1", "11", "1"]);
    }
}
