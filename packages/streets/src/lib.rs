#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Street name normalization for intersection lookups.
//!
//! OSM and geocoder data for the municipality is inconsistent about two
//! things: road-type prefixes are sometimes abbreviated ("Avenida La
//! Estrella" vs "Av. La Estrella") and Spanish diacritics are sometimes
//! dropped ("Peñaflor" vs "Penaflor"). This module turns a free-text
//! street name into an anchored matching pattern that tolerates both,
//! suitable for Overpass `~` name filters and for local [`Regex`]
//! matching.

use regex::Regex;
use std::sync::LazyLock;

/// Recognized road-type prefix tokens, with optional trailing period.
///
/// The full alternation is re-attached to every prefixed pattern so that
/// "Av Pudahuel" matches a way tagged "Avenida Pudahuel" and vice versa.
const PREFIX_ALTERNATION: &str = r"(?:Avenida|Av\.?|Avda\.?|Calle|Cll\.?|Pasaje|Pje\.?)\s+";

/// Detects a leading road-type prefix token on a trimmed street name.
static PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:avenida|av\.?|avda\.?|calle|cll\.?|pasaje|pje\.?)\s+")
        .expect("valid regex")
});

/// An anchored, accent- and prefix-tolerant street name pattern.
///
/// Produced deterministically by [`normalize`]; the same input always
/// yields the same pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPattern {
    pattern: String,
    had_prefix: bool,
}

impl NormalizedPattern {
    /// The pattern text, for use in an Overpass `~"...",i` name filter.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Whether the source name carried a recognized road-type prefix.
    #[must_use]
    pub const fn had_prefix(&self) -> bool {
        self.had_prefix
    }

    /// Compiles the pattern for local case-insensitive matching.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] if the pattern fails to compile; this
    /// does not happen for patterns produced by [`normalize`].
    pub fn to_regex(&self) -> Result<Regex, regex::Error> {
        Regex::new(&format!("(?i){}", self.pattern))
    }
}

/// Builds an accent- and prefix-tolerant matching pattern for a street
/// name.
///
/// Returns `None` when the name is empty after trimming; callers use
/// that to skip the pattern-dependent topology tiers.
///
/// The pipeline, in order:
/// 1. Trim and collapse internal whitespace.
/// 2. Strip a leading recognized prefix token ("Avenida"/"Av."/"Avda."/
///    "Calle"/"Cll."/"Pasaje"/"Pje."), remembering that one was present.
/// 3. Escape regex metacharacters in the remaining body.
/// 4. Widen each vowel and n/ñ to a character class covering its
///    accented variants.
/// 5. Anchor with `^...$`, re-attaching the full prefix alternation when
///    a prefix was stripped.
#[must_use]
pub fn normalize(name: &str) -> Option<NormalizedPattern> {
    let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }

    let (body, had_prefix) = PREFIX_RE.find(&collapsed).map_or_else(
        || (collapsed.as_str(), false),
        |m| (&collapsed[m.end()..], true),
    );

    let body = widen_diacritics(&regex::escape(body));

    let pattern = if had_prefix {
        format!("^{PREFIX_ALTERNATION}{body}$")
    } else {
        format!("^{body}$")
    };

    Some(NormalizedPattern {
        pattern,
        had_prefix,
    })
}

/// Replaces every vowel and n/ñ (either case) with a character class
/// covering its accented variants.
///
/// Runs after escaping, which only introduces backslashes and ASCII
/// punctuation, so escape sequences are never rewritten. Letters that
/// already carry an accent are left literal; case-insensitive matching
/// is the pattern consumer's concern (`,i` in Overpass, `(?i)` locally).
fn widen_diacritics(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len() * 2);
    for c in escaped.chars() {
        match c {
            'a' | 'A' => out.push_str("[aáàäâ]"),
            'e' | 'E' => out.push_str("[eéèëê]"),
            'i' | 'I' => out.push_str("[iíìïî]"),
            'o' | 'O' => out.push_str("[oóòöô]"),
            'u' | 'U' => out.push_str("[uúùüû]"),
            'n' | 'N' | 'ñ' | 'Ñ' => out.push_str("[nñ]"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regex_for(name: &str) -> Regex {
        normalize(name)
            .expect("non-empty name")
            .to_regex()
            .expect("pattern compiles")
    }

    #[test]
    fn empty_name_yields_none() {
        assert!(normalize("").is_none());
        assert!(normalize("   ").is_none());
        assert!(normalize("\t\n").is_none());
    }

    #[test]
    fn collapses_internal_whitespace() {
        assert_eq!(normalize("Av  Lo   Boza"), normalize("Av Lo Boza"));
    }

    #[test]
    fn prefix_variants_match_each_other() {
        let re = regex_for("Av Pudahuel");
        assert!(re.is_match("Avenida Pudahuel"));
        assert!(re.is_match("Avda. Pudahuel"));
        assert!(re.is_match("AV. PUDAHUEL"));
        assert!(re.is_match("av pudahuel"));
    }

    #[test]
    fn full_vocabulary_is_attached_regardless_of_matched_token() {
        // The data sometimes tags an avenue as "Calle ..."; any
        // recognized prefix on the input admits any recognized prefix
        // in the data.
        let re = regex_for("Avenida San Pablo");
        assert!(re.is_match("Calle San Pablo"));
        assert!(re.is_match("Pje. San Pablo"));
    }

    #[test]
    fn unprefixed_name_does_not_accept_a_prefix() {
        let re = regex_for("El Tranque");
        assert!(re.is_match("El Tranque"));
        assert!(!re.is_match("Avenida El Tranque"));
    }

    #[test]
    fn prefixed_pattern_requires_some_prefix() {
        let re = regex_for("Pasaje Los Alerces");
        assert!(re.is_match("Pje Los Alerces"));
        assert!(!re.is_match("Los Alerces"));
    }

    #[test]
    fn accented_input_matches_plain_form() {
        let re = regex_for("Peñaflor");
        assert!(re.is_match("Peñaflor"));
        assert!(re.is_match("Penaflor"));
    }

    #[test]
    fn plain_input_matches_accented_form() {
        let re = regex_for("Penaflor");
        assert!(re.is_match("Peñaflor"));

        let re = regex_for("Jose Maria Caro");
        assert!(re.is_match("José María Caro"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let re = regex_for("el abrazo");
        assert!(re.is_match("El Abrazo"));
        assert!(re.is_match("EL ABRAZO"));
    }

    #[test]
    fn pattern_is_anchored() {
        let re = regex_for("Lo Boza");
        assert!(re.is_match("Lo Boza"));
        assert!(!re.is_match("Lo Bozal"));
        assert!(!re.is_match("Camino Lo Boza"));
    }

    #[test]
    fn metacharacters_are_escaped() {
        let re = regex_for("Gral. Bonilla (norte)");
        assert!(re.is_match("Gral. Bonilla (norte)"));
        assert!(!re.is_match("GralX Bonilla (norte)"));
    }

    #[test]
    fn normalization_is_deterministic() {
        let a = normalize("Avda. José Joaquín Pérez").unwrap();
        let b = normalize("Avda. José Joaquín Pérez").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn reports_prefix_detection() {
        assert!(normalize("Calle Nueva").unwrap().had_prefix());
        assert!(!normalize("Laguna Sur").unwrap().had_prefix());
    }
}
