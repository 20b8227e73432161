//! Commodity icon lookup.

/// Substring table mapping commodity keywords to dashboard icon names.
/// Checked in order; first hit wins.
const ICON_TABLE: &[(&str, &str)] = &[
    ("beras", "rice"),
    ("cabai", "chili"),
    ("cabe", "chili"),
    ("telur", "egg"),
    ("ayam", "chicken"),
    ("daging", "meat"),
    ("sapi", "meat"),
    ("bawang", "onion"),
    ("minyak", "oil"),
    ("gula", "sugar"),
    ("kopi", "coffee"),
    ("teh", "tea"),
    ("ikan", "fish"),
    ("udang", "shrimp"),
    ("tomat", "tomato"),
    ("kentang", "potato"),
    ("sayur", "vegetable"),
    ("tahu", "tofu"),
    ("tempe", "tofu"),
    ("santan", "coconut"),
    ("kelapa", "coconut"),
    ("terigu", "flour"),
    ("tepung", "flour"),
];

pub const DEFAULT_ICON: &str = "package";

/// Icon for a commodity keyword. Matching is case-insensitive and by
/// substring, so "harga cabai merah" still resolves to the chili icon.
pub fn icon_for_keyword(keyword: &str) -> &'static str {
    let normalized = keyword.to_lowercase();
    ICON_TABLE
        .iter()
        .find(|(needle, _)| normalized.contains(needle))
        .map(|(_, icon)| *icon)
        .unwrap_or(DEFAULT_ICON)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_keyword() {
        assert_eq!(icon_for_keyword("beras"), "rice");
        assert_eq!(icon_for_keyword("cabai"), "chili");
        assert_eq!(icon_for_keyword("telur"), "egg");
    }

    #[test]
    fn test_substring_match_with_qualifiers() {
        assert_eq!(icon_for_keyword("cabai merah keriting"), "chili");
        assert_eq!(icon_for_keyword("bawang merah"), "onion");
        assert_eq!(icon_for_keyword("minyak goreng"), "oil");
    }

    #[test]
    fn test_match_is_case_insensitive() {
        assert_eq!(icon_for_keyword("Beras Premium"), "rice");
        assert_eq!(icon_for_keyword("TELUR AYAM"), "egg");
    }

    #[test]
    fn test_unknown_keyword_falls_back_to_package() {
        assert_eq!(icon_for_keyword("durian montong"), DEFAULT_ICON);
        assert_eq!(icon_for_keyword(""), DEFAULT_ICON);
    }

    #[test]
    fn test_lookup_is_deterministic() {
        // "telur ayam" contains both "telur" and "ayam"; table order decides.
        assert_eq!(icon_for_keyword("telur ayam"), "egg");
        assert_eq!(icon_for_keyword("telur ayam"), "egg");
    }
}
