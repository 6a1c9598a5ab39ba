//! Maps heterogeneous upstream records onto [`CanonicalRecord`] and decides
//! which of them look like real cities.
use crate::config::PollutionRange;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::ops::RangeInclusive;
use std::sync::LazyLock;

/// An untyped record as delivered by the pollution source.
pub type RawRecord = Map<String, Value>;

const NAME_FIELDS: &[&str] = &["city", "name", "town", "place"];
const REGION_FIELDS: &[&str] = &["country", "nation", "iso_country", "countryName"];
const POLLUTION_FIELDS: &[&str] = &["pollution", "aqi", "pm25", "value"];

const C0_CONTROLS: RangeInclusive<char> = '\u{0}'..='\u{1F}';

const EDGE_PUNCTUATION: &[char] = &[',', '.', ';', ':', '(', ')', '-'];

// Kept lowercase unless they start the name.
const PARTICLES: &[&str] = &[
    "of", "and", "the", "de", "la", "di", "da", "du", "von", "van", "al", "el", "le", "del",
];

const MAX_NAME_TOKENS: usize = 5;

/// Administrative, geographic and organizational terms that never appear in a city name.
static BANNED_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(province|region|district|county|state|prefecture|oblast|krai|governorate|department|river|lake|sea|mount|island|islands|archipelago|desert|airport|station|university|company|corp|ltd|inc)\b",
    )
    .expect("valid regex")
});

/// Placeholder values some feeds emit instead of a name.
static JUNK_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(n/a|unknown|null|city|tbd|na)$").expect("valid regex"));

/// Uniqueness key of a city, used for deduplication and as the description cache key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub name: String,
    pub region: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    pub name: String,
    pub region: String,
    pub pollution_value: f64,
}

impl CanonicalRecord {
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            name: self.name.clone(),
            region: self.region.clone(),
        }
    }
}

/// Access to a raw record by an ordered list of accepted field names.
pub trait RawFieldSource {
    /// Returns the value of the first alias that is present. Nulls and empty
    /// strings count as missing.
    fn field(&self, aliases: &[&str]) -> Option<&Value>;
}

impl RawFieldSource for RawRecord {
    fn field(&self, aliases: &[&str]) -> Option<&Value> {
        aliases
            .iter()
            .filter_map(|alias| self.get(*alias))
            .find(|value| match value {
                Value::Null => false,
                Value::String(s) => !s.is_empty(),
                _ => true,
            })
    }
}

/// Maps a raw record to its canonical form. Returns `None` when any of the
/// name, region or pollution fields is missing or cannot be coerced.
pub fn normalize<R>(raw: &R) -> Option<CanonicalRecord>
where
    R: RawFieldSource + ?Sized,
{
    let name = raw.field(NAME_FIELDS).and_then(normalize_text)?;
    let region = raw.field(REGION_FIELDS).and_then(normalize_text)?;
    let pollution_value = raw.field(POLLUTION_FIELDS).and_then(to_number)?;

    Some(CanonicalRecord {
        name,
        region,
        pollution_value,
    })
}

/// Cleans a free-text place name and title-cases it.
pub fn normalize_text(value: &Value) -> Option<String> {
    let raw = value.as_str()?;

    // C0 controls, tabs and newlines included, are removed outright.
    let cleaned: String = raw.chars().filter(|c| !C0_CONTROLS.contains(c)).collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed =
        collapsed.trim_matches(|c: char| c.is_whitespace() || EDGE_PUNCTUATION.contains(&c));

    if trimmed.is_empty() {
        return None;
    }

    let words: Vec<String> = trimmed
        .split(' ')
        .enumerate()
        .map(|(i, word)| title_case_word(word, i == 0))
        .collect();

    Some(words.join(" "))
}

fn title_case_word(word: &str, is_first: bool) -> String {
    let lower = word.to_lowercase();
    if !is_first && PARTICLES.contains(&lower.as_str()) {
        return lower;
    }

    let hyphenated = lower.split('-').map(capitalize).collect::<Vec<_>>().join("-");
    hyphenated
        .split('\'')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join("'")
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Coerces a pollution indicator to a number.
///
/// Strings are read with every `,` treated as a decimal point, so `"12,5"` is
/// 12.5 but a thousands separator is misread: `"1,234.5"` parses as 1.234.
/// Only the leading numeric part of a string is used (`"120 ug/m3"` is 120).
pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_leading_float(&s.replace(',', ".")),
        _ => None,
    }
}

fn parse_leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let digits_from = |start: usize| {
        bytes
            .get(start..)
            .map_or(0, |rest| rest.iter().take_while(|b| b.is_ascii_digit()).count())
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_digits = digits_from(end);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digits_from(end + 1);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = digits_from(exp_end);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Decides whether a canonical record is plausible enough to keep.
pub fn is_valid(record: &CanonicalRecord, range: &PollutionRange) -> bool {
    !record.region.is_empty()
        && is_likely_city(&record.name)
        && range.contains(record.pollution_value)
}

fn is_likely_city(name: &str) -> bool {
    if name.chars().count() < 2 {
        return false;
    }

    if name.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }

    if BANNED_WORD_RE.is_match(name) || JUNK_NAME_RE.is_match(name) {
        return false;
    }

    name.split_whitespace().count() <= MAX_NAME_TOKENS
}
