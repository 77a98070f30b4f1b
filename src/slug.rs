//! Canonical slugs used as document ids.
//!
//! Every place-keyed document (mappings, safety, cost of living, analytics)
//! is addressed by the same deterministic slug, so two spellings of one
//! place collapse to one id.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Builds the canonical id of a place from its name components.
///
/// Empty components are skipped. The result is accent-stripped, lowercased,
/// hyphen-joined, limited to letters and hyphens, with hyphen runs collapsed
/// and no leading or trailing hyphen.
///
/// ```
/// use destination_rater::slug::canonical_id;
///
/// assert_eq!(canonical_id("", "Kraków", "", "Poland"), "krakow-poland");
/// assert_eq!(canonical_id("", "São Paulo", "", "Brazil"), "saopaulo-brazil");
/// ```
pub fn canonical_id(
    sublocality: &str,
    city: &str,
    state_or_province: &str,
    country: &str,
) -> String {
    let joined = [sublocality, city, state_or_province, country]
        .iter()
        .filter(|part| !part.is_empty())
        .map(|part| strip_accents(part))
        .collect::<Vec<_>>()
        .join("-");

    let kept: String = joined
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphabetic() || *c == '-')
        .collect();

    collapse_hyphens(&kept)
}

/// Slug of a `(city, country)` pair, the key of every per-city collection.
pub fn city_country_id(city: &str, country: &str) -> String {
    canonical_id("", city, "", country)
}

/// Slug of a country on its own, the key of `country-safety` documents and
/// of ranking caps.
pub fn country_id(country: &str) -> String {
    canonical_id("", "", "", country)
}

/// Cleans an arbitrary stored document id.
///
/// Unlike [`canonical_id`] this keeps digits, since legacy ids were built
/// from free-form spreadsheet columns.
pub fn clean_document_id(id: &str) -> String {
    let kept: String = strip_accents(id)
        .nfc()
        .collect::<String>()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_numeric() || *c == '-')
        .collect();

    collapse_hyphens(&kept)
}

fn strip_accents(value: &str) -> String {
    value.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

fn collapse_hyphens(value: &str) -> String {
    value
        .split('-')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_id_strips_accents() {
        assert_eq!(canonical_id("", "Kraków", "", "Poland"), "krakow-poland");
        assert_eq!(canonical_id("", "São Paulo", "", "Brazil"), "saopaulo-brazil");
        assert_eq!(canonical_id("", "Zürich", "", "Switzerland"), "zurich-switzerland");
    }

    #[test]
    fn test_canonical_id_keeps_component_order() {
        assert_eq!(
            canonical_id("Brooklyn", "New York", "New York", "United States"),
            "brooklyn-newyork-newyork-unitedstates"
        );
        assert_eq!(
            canonical_id("", "Portland", "Oregon", "United States"),
            "portland-oregon-unitedstates"
        );
    }

    #[test]
    fn test_canonical_id_collapses_and_trims_hyphens() {
        assert_eq!(
            canonical_id("", "Minneapolis-St. Paul", "", "United States"),
            "minneapolis-stpaul-unitedstates"
        );
        assert_eq!(canonical_id("", "-Guinea-", "", "--"), "guinea");
        assert_eq!(canonical_id("", "Ho Chi Minh City", "", "Vietnam"), "hochiminhcity-vietnam");
    }

    #[test]
    fn test_canonical_id_drops_digits_and_punctuation() {
        assert_eq!(canonical_id("", "St. John's 2", "", "Canada"), "stjohns-canada");
    }

    #[test]
    fn test_canonical_id_is_idempotent() {
        let once = canonical_id("", "Kraków", "", "Poland");
        assert_eq!(canonical_id("", &once, "", ""), once);
    }

    #[test]
    fn test_city_and_country_helpers() {
        assert_eq!(city_country_id("Mexico City", "Mexico"), "mexicocity-mexico");
        assert_eq!(country_id("United Kingdom"), "unitedkingdom");
    }

    #[test]
    fn test_clean_document_id_keeps_digits() {
        assert_eq!(clean_document_id("Malmö--Sweden "), "malmo-sweden");
        assert_eq!(clean_document_id("-district9-southafrica-"), "district9-southafrica");
        assert_eq!(clean_document_id("already-clean"), "already-clean");
    }
}
