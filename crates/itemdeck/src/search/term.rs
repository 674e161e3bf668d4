//! Resolution of raw search input.

use super::key::SubstringKey;
use crate::types::ItemId;

/// What a raw search string asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTerm {
    /// Empty input: no filter.
    All,
    /// Only digits: ids containing this run.
    Substring(SubstringKey),
    /// `item #<n>` / `item <n>`: exactly this id.
    Exact(ItemId),
    /// Anything else, or a reference to an id outside the catalog.
    Nothing,
}

impl SearchTerm {
    /// Resolves `raw` against a catalog of `item_count` items.
    ///
    /// Digits are read as a number first, so `"0042"` searches for `42` and
    /// an all-zero run for `0`. The index itself stays exact.
    /// The item form is case-insensitive and allows `#` or `:` between the
    /// word and the number.
    pub fn parse(raw: &str, item_count: u32) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::All;
        }

        if trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
            let digits = match trimmed.trim_start_matches('0') {
                "" => "0",
                digits => digits,
            };
            return SubstringKey::from_digits(digits).map_or(Self::Nothing, Self::Substring);
        }

        match parse_item_reference(trimmed) {
            Some(value) if value <= u64::from(item_count) => u32::try_from(value)
                .ok()
                .and_then(ItemId::new)
                .map_or(Self::Nothing, Self::Exact),
            _ => Self::Nothing,
        }
    }

    /// Returns true for the unfiltered listing.
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

/// Extracts `<n>` from `item <n>`, `Item #<n>`, `ITEM:<n>` and friends.
fn parse_item_reference(input: &str) -> Option<u64> {
    let prefix = input.get(..4)?;
    if !prefix.eq_ignore_ascii_case("item") {
        return None;
    }
    let number = input[4..].trim_start_matches(|c: char| c.is_whitespace() || c == '#' || c == ':');
    if number.is_empty() || !number.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    number.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: u32) -> ItemId {
        ItemId::new(value).unwrap()
    }

    #[test]
    fn empty_and_whitespace_mean_all() {
        assert_eq!(SearchTerm::parse("", 10), SearchTerm::All);
        assert_eq!(SearchTerm::parse("   ", 10), SearchTerm::All);
        assert!(SearchTerm::parse("\t", 10).is_all());
    }

    #[test]
    fn digits_become_substring_keys() {
        assert_eq!(
            SearchTerm::parse("42", 10),
            SearchTerm::Substring(SubstringKey::from_digits("42").unwrap())
        );
        assert_eq!(SearchTerm::parse("12345678", 10), SearchTerm::Nothing);
    }

    #[test]
    fn leading_zeros_are_dropped_before_lookup() {
        let key = |digits| SearchTerm::Substring(SubstringKey::from_digits(digits).unwrap());
        assert_eq!(SearchTerm::parse(" 007 ", 10), key("7"));
        assert_eq!(SearchTerm::parse("0042", 10), key("42"));
        assert_eq!(SearchTerm::parse("000", 10), key("0"));
        assert_eq!(SearchTerm::parse("0", 10), key("0"));
        assert_eq!(SearchTerm::parse("00000000042", 10), key("42"));
        assert_eq!(SearchTerm::parse("0123456789", 10), SearchTerm::Nothing);
    }

    #[test]
    fn item_references_resolve_to_one_id() {
        assert_eq!(SearchTerm::parse("item #5", 10), SearchTerm::Exact(id(5)));
        assert_eq!(SearchTerm::parse("Item 5", 10), SearchTerm::Exact(id(5)));
        assert_eq!(SearchTerm::parse("ITEM#10", 10), SearchTerm::Exact(id(10)));
        assert_eq!(SearchTerm::parse("item: 3", 10), SearchTerm::Exact(id(3)));
        assert_eq!(SearchTerm::parse("item5", 10), SearchTerm::Exact(id(5)));
    }

    #[test]
    fn item_references_out_of_range_match_nothing() {
        assert_eq!(SearchTerm::parse("item #0", 10), SearchTerm::Nothing);
        assert_eq!(SearchTerm::parse("item #11", 10), SearchTerm::Nothing);
        assert_eq!(
            SearchTerm::parse("item #99999999999999999999999", 10),
            SearchTerm::Nothing
        );
    }

    #[test]
    fn other_input_matches_nothing() {
        assert_eq!(SearchTerm::parse("abc", 10), SearchTerm::Nothing);
        assert_eq!(SearchTerm::parse("12abc", 10), SearchTerm::Nothing);
        assert_eq!(SearchTerm::parse("item", 10), SearchTerm::Nothing);
        assert_eq!(SearchTerm::parse("items 5", 10), SearchTerm::Nothing);
        assert_eq!(SearchTerm::parse("item 5 please", 10), SearchTerm::Nothing);
        assert_eq!(SearchTerm::parse("-5", 10), SearchTerm::Nothing);
        assert_eq!(SearchTerm::parse("ïtem 5", 10), SearchTerm::Nothing);
    }
}
