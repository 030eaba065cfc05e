//! UK postcode normalization.
//!
//! Raw input from forms and upstream APIs arrives in any casing and spacing
//! (`"sw1a1aa"`, `" SW1A  1AA "`). Every provider call goes through
//! [`normalize`] first so that downstream code only ever sees the canonical
//! `OUTCODE INCODE` form.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::address::LookupError;

const INCODE_LEN: usize = 3;

fn grammar() -> &'static Regex {
    static GRAMMAR: OnceLock<Regex> = OnceLock::new();
    GRAMMAR.get_or_init(|| {
        Regex::new(r"^[A-Z]{1,2}[0-9][A-Z0-9]?[0-9][A-Z]{2}$").expect("postcode grammar compiles")
    })
}

/// Canonical uppercase postcode with a single space before the incode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NormalizedPostcode(String);

impl NormalizedPostcode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn outcode(&self) -> &str {
        let split = self.0.len() - INCODE_LEN - 1;
        &self.0[..split]
    }

    pub fn incode(&self) -> &str {
        &self.0[self.0.len() - INCODE_LEN..]
    }

    /// Compact form without the separating space, as some APIs expect in paths.
    pub fn compact(&self) -> String {
        self.0.replace(' ', "")
    }
}

impl fmt::Display for NormalizedPostcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for NormalizedPostcode {
    type Error = LookupError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        normalize(&value)
    }
}

impl From<NormalizedPostcode> for String {
    fn from(value: NormalizedPostcode) -> Self {
        value.0
    }
}

/// Strip whitespace, uppercase, validate, and re-space a raw postcode.
pub fn normalize(raw: &str) -> Result<NormalizedPostcode, LookupError> {
    let compact = compact_upper(raw);

    if !grammar().is_match(&compact) {
        return Err(LookupError::InvalidPostcodeFormat {
            input: raw.trim().to_string(),
        });
    }

    let (outcode, incode) = compact.split_at(compact.len() - INCODE_LEN);
    Ok(NormalizedPostcode(format!("{outcode} {incode}")))
}

/// Whitespace-free uppercase form used for partial postcodes that cannot be
/// normalized yet (autocomplete queries).
pub(crate) fn compact_upper(raw: &str) -> String {
    raw.chars()
        .filter(|ch| !ch.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_lowercase_compact_input() {
        let postcode = normalize("sw1a1aa").expect("valid postcode");
        assert_eq!(postcode.as_str(), "SW1A 1AA");
        assert_eq!(postcode.outcode(), "SW1A");
        assert_eq!(postcode.incode(), "1AA");
    }

    #[test]
    fn collapses_irregular_spacing() {
        for raw in [" EC1A 1BB ", "ec1a    1bb", "E C 1 A 1 B B", "\tM1 1AE\n"] {
            let postcode = normalize(raw).expect("valid postcode");
            assert_eq!(postcode.as_str().matches(' ').count(), 1, "{raw}");
            assert_eq!(postcode.incode().len(), 3);
        }
        assert_eq!(normalize("m11ae").unwrap().as_str(), "M1 1AE");
        assert_eq!(normalize("b338th").unwrap().as_str(), "B33 8TH");
        assert_eq!(normalize("cr26xh").unwrap().as_str(), "CR2 6XH");
        assert_eq!(normalize("dn551pt").unwrap().as_str(), "DN55 1PT");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["sw1a1aa", "W1A 0AX", "ec1a 1bb", "GU16 7HF"] {
            let once = normalize(raw).expect("valid");
            let twice = normalize(once.as_str()).expect("still valid");
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn rejects_malformed_postcodes() {
        for raw in ["", "SW1A", "12345", "SW1A 1A", "SW1A 1AAA", "1SW 1AA", "SW1A 11A", "ABC1 1AA"] {
            match normalize(raw) {
                Err(LookupError::InvalidPostcodeFormat { .. }) => {}
                other => panic!("expected invalid format for {raw:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn deserializes_through_normalizer() {
        let postcode: NormalizedPostcode =
            serde_json::from_str("\"sw1a1aa\"").expect("deserializes");
        assert_eq!(postcode.to_string(), "SW1A 1AA");
        assert!(serde_json::from_str::<NormalizedPostcode>("\"nope\"").is_err());
        assert_eq!(postcode.compact(), "SW1A1AA");
    }
}
