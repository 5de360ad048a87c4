//! Address normalization
//!
//! Rewrites free-text Russian facility addresses into geocoder queries:
//!
//! ```text
//! "410012, Саратовская обл., г. Саратов, ул. Московская, д. 5, корп. 2"
//!   → "Россия, Саратов, улица Московская, дом 5"
//! ```
//!
//! Steps, per comma-separated segment: remove postal codes, expand
//! abbreviations, collapse whitespace. Leading region/district clauses are
//! skipped, a leading country or locality is dropped, and the address is
//! cut at the first stop-word (district, region, building qualifier). The
//! same rules apply inside a segment, so addresses written without commas
//! keep their street. The result is prefixed with the country and the locality.
//!
//! Normalization never fails; at worst the result is just the prefix.

use crate::error::{FacmapError, FacmapResult};
use crate::types::AddressQuery;
use facmap_common::config::NormalizerSection;
use facmap_common::text::collapse_whitespace;
use regex::Regex;

/// Country prefix used when none is configured
pub const DEFAULT_COUNTRY: &str = "Россия";

/// Standalone 6-digit Russian postal codes
pub const DEFAULT_POSTAL_CODE_PATTERN: &str = r"\b\d{6}\b";

/// Region and district words
///
/// Segments carrying them are skipped before the street and end the address after it.
pub const DEFAULT_ADMIN_WORDS: [&str; 5] = ["область", "край", "район", "округ", "республика"];

/// Words from which the remainder of the address is dropped
pub const DEFAULT_STOP_WORDS: [&str; 15] = [
    "область",
    "край",
    "район",
    "округ",
    "республика",
    "корпус",
    "строение",
    "литер",
    "литера",
    "квартира",
    "офис",
    "помещение",
    "этаж",
    "ТЦ",
    "ТРЦ",
];

/// Built-in abbreviation table: (abbreviation, expansion, dot required)
///
/// Order matters: `пр-т` and `просп.` must be seen before `пр.`.
const DEFAULT_ABBREVIATIONS: [(&str, &str, bool); 17] = [
    ("пр-т", "проспект", false),
    ("просп", "проспект", true),
    ("пр", "проезд", true),
    ("ул", "улица", false),
    ("пер", "переулок", false),
    ("пл", "площадь", false),
    ("ш", "шоссе", true),
    ("б-р", "бульвар", false),
    ("наб", "набережная", false),
    ("мкрн", "микрорайон", false),
    ("мкр", "микрорайон", false),
    ("обл", "область", false),
    ("р-н", "район", false),
    ("корп", "корпус", false),
    ("стр", "строение", true),
    ("кв", "квартира", true),
    ("пом", "помещение", true),
];

/// One compiled substitution
#[derive(Debug, Clone)]
struct Substitution {
    pattern: Regex,
    replacement: String,
}

impl Substitution {
    fn compile(pattern: &str, replacement: &str) -> FacmapResult<Self> {
        Ok(Self {
            pattern: Regex::new(pattern).map_err(|e| FacmapError::pattern(pattern, e))?,
            replacement: replacement.to_string(),
        })
    }

    /// `ул.` / `ул` followed by anything → `улица `
    fn word(abbreviation: &str, expansion: &str, dot_required: bool) -> FacmapResult<Self> {
        let dot = if dot_required { r"\." } else { r"\.?" };
        let pattern = format!(r"(?i)\b{}\b{}\s*", regex::escape(abbreviation), dot);
        Self::compile(&pattern, &format!("{} ", expansion))
    }

    fn apply(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, self.replacement.as_str())
            .into_owned()
    }
}

/// Address normalizer with compiled rules
#[derive(Debug, Clone)]
pub struct AddressNormalizer {
    country: String,
    postal_code: Regex,
    substitutions: Vec<Substitution>,
    admin_words: Option<Regex>,
    stop_words: Option<Regex>,
}

impl AddressNormalizer {
    /// Rules for Russian addresses
    pub fn russian() -> FacmapResult<Self> {
        Self::from_config(&NormalizerSection::default())
    }

    /// Build rules from the `[normalizer]` section (missing values use the built-ins)
    pub fn from_config(section: &NormalizerSection) -> FacmapResult<Self> {
        let country = section
            .country
            .clone()
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string());

        let postal_pattern = section
            .postal_code_pattern
            .as_deref()
            .unwrap_or(DEFAULT_POSTAL_CODE_PATTERN);
        let postal_code =
            Regex::new(postal_pattern).map_err(|e| FacmapError::pattern(postal_pattern, e))?;

        let mut substitutions = Vec::new();
        for rule in &section.abbreviations {
            substitutions.push(Substitution::compile(&rule.pattern, &rule.replacement)?);
        }
        for (abbreviation, expansion, dot_required) in DEFAULT_ABBREVIATIONS {
            substitutions.push(Substitution::word(abbreviation, expansion, dot_required)?);
        }
        // "д. 5" is a house number; "д. Ивановка" is a village and stays as is
        substitutions.push(Substitution::compile(r"(?i)\bд\b\.?\s*(\d)", "дом ${1}")?);
        // City markers carry no information for the geocoder
        substitutions.push(Substitution::compile(r"(?i)\b(?:г|гор)\b\.?\s*", "")?);

        let admin_words = match &section.admin_words {
            Some(words) => word_alternation(words.as_slice())?,
            None => word_alternation(&DEFAULT_ADMIN_WORDS[..])?,
        };
        let stop_words = match &section.stop_words {
            Some(words) => word_alternation(words.as_slice())?,
            None => word_alternation(&DEFAULT_STOP_WORDS[..])?,
        };

        Ok(Self {
            country,
            postal_code,
            substitutions,
            admin_words,
            stop_words,
        })
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    /// All normalized forms of one address
    pub fn prepare(&self, raw: &str, locality: &str) -> AddressQuery {
        AddressQuery {
            raw: raw.trim().to_string(),
            locality: locality.trim().to_string(),
            canonical: self.canonical(raw, locality),
            flattened: self.flatten(raw),
        }
    }

    /// Expand abbreviations and collapse whitespace, keeping commas
    pub fn expand_abbreviations(&self, text: &str) -> String {
        let expanded = self
            .substitutions
            .iter()
            .fold(text.to_string(), |acc, substitution| substitution.apply(&acc));
        collapse_whitespace(&expanded)
    }

    /// Single-line form: postal codes removed, abbreviations expanded, no commas
    pub fn flatten(&self, raw: &str) -> String {
        let without_postal = self.postal_code.replace_all(raw, "");
        let expanded = self.expand_abbreviations(&without_postal);
        collapse_whitespace(&expanded.replace(',', " "))
    }

    /// Canonical query `"{country}, {locality}, {street}, {house}"`
    pub fn canonical(&self, raw: &str, locality: &str) -> String {
        let locality = self.clean_segment(locality);
        let mut parts: Vec<String> = vec![self.country.clone()];
        if !locality.is_empty() {
            parts.push(locality.clone());
        }

        let mut kept: Vec<String> = Vec::new();
        'segments: for segment in raw.split(',') {
            let mut rest = self.clean_segment(segment);

            loop {
                // Country and locality are already in the prefix
                let stripped = strip_leading_word(&rest, &self.country).unwrap_or(&rest);
                let stripped = strip_leading_word(stripped, &locality).unwrap_or(stripped);
                if stripped.is_empty() {
                    continue 'segments;
                }
                rest = stripped.to_string();

                if let Some(admin) = self.admin_words.as_ref().and_then(|re| re.find(&rest)) {
                    // The region or district name precedes its admin word
                    let street = drop_last_word(&rest[..admin.start()]);
                    if !street.is_empty() {
                        kept.push(street.to_string());
                        break 'segments;
                    }
                    if !kept.is_empty() {
                        break 'segments;
                    }
                    rest = rest[admin.end()..].trim().to_string();
                    continue;
                }

                if let Some(stop) = self.stop_words.as_ref().and_then(|re| re.find(&rest)) {
                    let head = rest[..stop.start()].trim();
                    if !head.is_empty() {
                        kept.push(head.to_string());
                    }
                    break 'segments;
                }

                kept.push(rest);
                continue 'segments;
            }
        }

        parts.extend(kept);
        parts.join(", ")
    }

    fn clean_segment(&self, segment: &str) -> String {
        let without_postal = self.postal_code.replace_all(segment, "");
        self.expand_abbreviations(&without_postal)
    }
}

fn same_text(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// `text` without its last whitespace-separated word
fn drop_last_word(text: &str) -> &str {
    text.trim()
        .rsplit_once(char::is_whitespace)
        .map(|(head, _)| head.trim_end())
        .unwrap_or("")
}

/// Remainder of `text` when it starts with the whole word `word`
fn strip_leading_word<'a>(text: &'a str, word: &str) -> Option<&'a str> {
    let len = word.chars().count();
    if word.is_empty() || text.chars().count() < len {
        return None;
    }
    let split = text
        .char_indices()
        .nth(len)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let (head, tail) = text.split_at(split);
    if !same_text(head, word) || !(tail.is_empty() || tail.starts_with(char::is_whitespace)) {
        return None;
    }
    Some(tail.trim_start())
}

/// `(?i)\b(?:w1|w2|...)\b`, or None for an empty list
fn word_alternation<S: AsRef<str>>(words: &[S]) -> FacmapResult<Option<Regex>> {
    let escaped: Vec<String> = words
        .iter()
        .map(|w| w.as_ref().trim())
        .filter(|w| !w.is_empty())
        .map(regex::escape)
        .collect();
    if escaped.is_empty() {
        return Ok(None);
    }
    let pattern = format!(r"(?i)\b(?:{})\b", escaped.join("|"));
    Regex::new(&pattern)
        .map(Some)
        .map_err(|e| FacmapError::pattern(&pattern, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use facmap_common::config::AbbreviationRule;

    fn normalizer() -> AddressNormalizer {
        AddressNormalizer::russian().unwrap()
    }

    #[test]
    fn test_canonical_full_address() {
        let n = normalizer();
        assert_eq!(
            n.canonical(
                "410012, Саратовская обл., г. Саратов, ул. Московская, д. 5, корп. 2",
                "Саратов"
            ),
            "Россия, Саратов, улица Московская, дом 5"
        );
    }

    #[test]
    fn test_canonical_truncates_inside_segment() {
        let n = normalizer();
        assert_eq!(
            n.canonical("пр-т Строителей 12 корпус 3", "Энгельс"),
            "Россия, Энгельс, проспект Строителей 12"
        );
    }

    #[test]
    fn test_canonical_skips_leading_district() {
        let n = normalizer();
        assert_eq!(
            n.canonical("Энгельсский р-н, с. Шумейка, ул. Садовая, 3", "с. Шумейка"),
            "Россия, с. Шумейка, улица Садовая, 3"
        );
    }

    #[test]
    fn test_canonical_district_after_street_truncates() {
        let n = normalizer();
        assert_eq!(
            n.canonical("ул. Чапаева, 20, Кировский район", "Саратов"),
            "Россия, Саратов, улица Чапаева, 20"
        );
    }

    #[test]
    fn test_canonical_single_segment_with_trailing_district() {
        let n = normalizer();
        assert_eq!(
            n.canonical("ул. Чапаева 20 Кировский район", "Саратов"),
            "Россия, Саратов, улица Чапаева 20"
        );
        assert_eq!(
            n.canonical("пр-т Строителей 12 Энгельсский р-н", "Энгельс"),
            "Россия, Энгельс, проспект Строителей 12"
        );
    }

    #[test]
    fn test_canonical_single_segment_with_leading_region() {
        let n = normalizer();
        assert_eq!(
            n.canonical("Саратовская обл г. Саратов ул. Московская д. 5", "Саратов"),
            "Россия, Саратов, улица Московская дом 5"
        );
        assert_eq!(
            n.canonical(
                "Саратовская область Энгельсский район с. Шумейка ул. Садовая 3",
                "Шумейка"
            ),
            "Россия, Шумейка, с. Шумейка улица Садовая 3"
        );
    }

    #[test]
    fn test_canonical_single_segment_keeps_street() {
        let n = normalizer();
        assert_eq!(
            n.canonical("ул. Рахова д. 1", "Саратов"),
            "Россия, Саратов, улица Рахова дом 1"
        );
        assert_eq!(
            n.canonical("г. Саратов ул. Московская д. 5", "Саратов"),
            "Россия, Саратов, улица Московская дом 5"
        );
        assert_ne!(
            n.canonical("Саратовская обл ул. Московская д. 5", "Саратов"),
            n.canonical("Саратовская обл ул. Рахова д. 1", "Саратов")
        );
    }

    #[test]
    fn test_canonical_without_locality_or_address() {
        let n = normalizer();
        assert_eq!(n.canonical("", ""), "Россия");
        assert_eq!(n.canonical("ул. Ленина, 1", ""), "Россия, улица Ленина, 1");
    }

    #[test]
    fn test_canonical_always_prefixed_and_postal_free() {
        let n = normalizer();
        let samples = [
            ("440000, г. Пенза, ул. Московская, 1", "Пенза"),
            ("Пенза 440000 Московская 1", "Пенза"),
            ("Россия, 410056, Саратов, ул. Рахова, 1", "г. Саратов"),
            ("", "Балаково"),
            ("413100", ""),
        ];
        let postal = Regex::new(r"\b\d{6}\b").unwrap();
        for (raw, locality) in samples {
            let canonical = n.canonical(raw, locality);
            assert!(canonical.starts_with("Россия"), "{}", canonical);
            assert!(!postal.is_match(&canonical), "{}", canonical);
        }
    }

    #[test]
    fn test_locality_city_marker_removed_and_duplicate_dropped() {
        let n = normalizer();
        assert_eq!(
            n.canonical("г. Саратов, ул. Рахова, 1", "г. Саратов"),
            "Россия, Саратов, улица Рахова, 1"
        );
    }

    #[test]
    fn test_house_abbreviation_needs_a_number() {
        let n = normalizer();
        assert_eq!(n.expand_abbreviations("д. 5"), "дом 5");
        assert_eq!(n.expand_abbreviations("д.5"), "дом 5");
        assert_eq!(n.expand_abbreviations("д. Ивановка"), "д. Ивановка");
    }

    #[test]
    fn test_expansion_keeps_full_words() {
        let n = normalizer();
        assert_eq!(n.expand_abbreviations("улица Пролетарская"), "улица Пролетарская");
        assert_eq!(n.expand_abbreviations("ул.Ленина"), "улица Ленина");
        assert_eq!(n.expand_abbreviations("пр. Кирова"), "проезд Кирова");
        assert_eq!(n.expand_abbreviations("просп. Кирова"), "проспект Кирова");
        assert_eq!(n.expand_abbreviations("пер. Мирный"), "переулок Мирный");
        assert_eq!(n.expand_abbreviations("пл. Победы"), "площадь Победы");
    }

    #[test]
    fn test_flatten_removes_commas_and_postal_code() {
        let n = normalizer();
        assert_eq!(
            n.flatten("410012, г. Саратов, ул. Московская, д. 5"),
            "Саратов улица Московская дом 5"
        );
    }

    #[test]
    fn test_prepare_fills_all_forms() {
        let n = normalizer();
        let query = n.prepare(" ул. Рахова, 1 ", "Саратов");
        assert_eq!(query.raw, "ул. Рахова, 1");
        assert_eq!(query.locality, "Саратов");
        assert_eq!(query.canonical, "Россия, Саратов, улица Рахова, 1");
        assert_eq!(query.flattened, "улица Рахова 1");
    }

    #[test]
    fn test_configured_rules() {
        let section = NormalizerSection {
            country: Some("Казахстан".to_string()),
            abbreviations: vec![AbbreviationRule {
                pattern: r"(?i)\bмкр-н\b\.?\s*".to_string(),
                replacement: "микрорайон ".to_string(),
            }],
            stop_words: Some(vec!["блок".to_string()]),
            ..Default::default()
        };
        let n = AddressNormalizer::from_config(&section).unwrap();
        assert_eq!(
            n.canonical("мкр-н Самал, 5, блок А", "Алматы"),
            "Казахстан, Алматы, микрорайон Самал, 5"
        );
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let section = NormalizerSection {
            postal_code_pattern: Some("(".to_string()),
            ..Default::default()
        };
        let err = AddressNormalizer::from_config(&section).unwrap_err();
        assert!(matches!(err, FacmapError::Pattern { .. }));
    }
}
