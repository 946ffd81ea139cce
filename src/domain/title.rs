//! Title normalization
//!
//! Display titles scraped from the gallery are turned into a canonical key that is
//! shared by the dedup store and the image directory. The mapping is lossy on purpose:
//! two display titles that normalize identically are treated as the same artwork.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

/// Maximum length of a canonical title, in characters
pub const MAX_TITLE_LEN: usize = 50;

/// Extension appended to every stored image
pub const IMAGE_EXTENSION: &str = ".jpg";

lazy_static! {
    static ref NON_ALPHANUMERIC: Regex = Regex::new("[^0-9a-zA-Z]+").expect("static regex");
}

/// Canonical title plus the filename the image is stored under
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedTitle {
    pub canonical: String,
    pub filename: String,
}

impl NormalizedTitle {
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}

impl fmt::Display for NormalizedTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// Normalize a raw display title.
///
/// Every run of non-alphanumeric characters collapses to a single space, the result
/// is trimmed and cut to [`MAX_TITLE_LEN`] characters. The filename replaces spaces
/// with underscores and carries [`IMAGE_EXTENSION`].
pub fn normalize(raw_title: &str) -> NormalizedTitle {
    let collapsed = NON_ALPHANUMERIC.replace_all(raw_title.trim(), " ");
    let trimmed = collapsed.trim();

    // Only ASCII survives the regex, so byte length equals char length here.
    let canonical = if trimmed.len() > MAX_TITLE_LEN {
        trimmed[..MAX_TITLE_LEN].trim_end().to_string()
    } else {
        trimmed.to_string()
    };

    let filename = format!("{}{}", canonical.replace(' ', "_"), IMAGE_EXTENSION);

    NormalizedTitle { canonical, filename }
}

/// Recover the canonical title from a stored image filename
pub fn title_from_filename(filename: &str) -> String {
    filename
        .strip_suffix(IMAGE_EXTENSION)
        .unwrap_or(filename)
        .replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("Starry Night", "Starry Night", "Starry_Night.jpg")]
    #[case("  The Hay-Wain  ", "The Hay Wain", "The_Hay_Wain.jpg")]
    #[case("Portrait of a Lady, 'Mrs Smith'", "Portrait of a Lady Mrs Smith", "Portrait_of_a_Lady_Mrs_Smith.jpg")]
    #[case("Café de Flore", "Caf de Flore", "Caf_de_Flore.jpg")]
    #[case("", "", ".jpg")]
    #[case("!!!", "", ".jpg")]
    fn normalizes_display_titles(#[case] raw: &str, #[case] canonical: &str, #[case] filename: &str) {
        let normalized = normalize(raw);
        assert_eq!(normalized.canonical, canonical);
        assert_eq!(normalized.filename, filename);
    }

    #[test]
    fn truncates_to_fifty_characters() {
        let raw = "A".repeat(80);
        let normalized = normalize(&raw);
        assert_eq!(normalized.canonical.len(), MAX_TITLE_LEN);
        assert_eq!(normalized.filename, format!("{}.jpg", "A".repeat(MAX_TITLE_LEN)));
    }

    #[test]
    fn truncation_never_leaves_a_trailing_space() {
        // 49 letters, a separator, then more text: the cut lands right after the space
        let raw = format!("{} tail of the title", "B".repeat(49));
        let normalized = normalize(&raw);
        assert_eq!(normalized.canonical, "B".repeat(49));
    }

    #[test]
    fn colliding_titles_share_a_key() {
        let a = normalize("Sunset -- over the Sea");
        let b = normalize("Sunset: over   the Sea!");
        assert_eq!(a, b);
    }

    #[test]
    fn filename_round_trips_to_title() {
        let normalized = normalize("The Fighting Temeraire");
        assert_eq!(title_from_filename(&normalized.filename), normalized.canonical);
    }

    proptest! {
        #[test]
        fn canonical_titles_are_bounded_and_clean(raw in "\\PC{0,200}") {
            let normalized = normalize(&raw);
            let canonical = &normalized.canonical;

            prop_assert!(canonical.chars().count() <= MAX_TITLE_LEN);
            prop_assert!(canonical.chars().all(|c| c.is_ascii_alphanumeric() || c == ' '));
            prop_assert!(!canonical.starts_with(' '));
            prop_assert!(!canonical.ends_with(' '));
            prop_assert!(!canonical.contains("  "));
        }

        #[test]
        fn normalization_is_idempotent(raw in "\\PC{0,120}") {
            let once = normalize(&raw);
            let twice = normalize(&once.canonical);
            prop_assert_eq!(once, twice);
        }
    }
}
