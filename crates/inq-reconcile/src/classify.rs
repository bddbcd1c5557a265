//! Category classification.
//!
//! The register splits cases into ordinary vs. "precatória" by a marker
//! substring in the free-text annotation. This module is the only place that
//! convention is matched; the Postgres source reuses [`CategoryMarker::like_pattern`].

use anyhow::{bail, Result};

use crate::Category;

pub const DEFAULT_DEPRECATED_MARKER: &str = "precatória";

/// Case-insensitive substring marker identifying [`Category::Deprecated`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryMarker {
    needle: String,
}

impl CategoryMarker {
    pub fn new(marker: &str) -> Result<Self> {
        let trimmed = marker.trim();
        if trimmed.is_empty() {
            bail!("category marker must not be empty");
        }
        Ok(Self {
            needle: trimmed.to_lowercase(),
        })
    }

    /// Lowercased marker text.
    pub fn as_str(&self) -> &str {
        &self.needle
    }

    /// Presence of the marker anywhere in the annotation is sufficient.
    /// A missing annotation is ordinary.
    pub fn classify(&self, annotation: Option<&str>) -> Category {
        match annotation {
            Some(text) if text.to_lowercase().contains(&self.needle) => Category::Deprecated,
            _ => Category::Ordinary,
        }
    }

    pub fn matches(&self, category: Category, annotation: Option<&str>) -> bool {
        self.classify(annotation) == category
    }

    /// `ILIKE` pattern equivalent to [`classify`](Self::classify) returning
    /// `Deprecated`. Escape character is `\`.
    pub fn like_pattern(&self) -> String {
        let mut out = String::with_capacity(self.needle.len() + 2);
        out.push('%');
        for c in self.needle.chars() {
            if matches!(c, '%' | '_' | '\\') {
                out.push('\\');
            }
            out.push(c);
        }
        out.push('%');
        out
    }
}

impl Default for CategoryMarker {
    fn default() -> Self {
        Self {
            needle: DEFAULT_DEPRECATED_MARKER.to_string(),
        }
    }
}

/// Characters stripped from both ends of an identifier. Exactly the Unicode
/// `White_Space` set, spelled out so the Postgres source can bind the same set
/// into `btrim(identifier, $n)` instead of relying on server locale.
pub const IDENTIFIER_TRIM_CHARS: &[char] = &[
    '\u{0009}', '\u{000A}', '\u{000B}', '\u{000C}', '\u{000D}', '\u{0020}', '\u{0085}',
    '\u{00A0}', '\u{1680}', '\u{2000}', '\u{2001}', '\u{2002}', '\u{2003}', '\u{2004}',
    '\u{2005}', '\u{2006}', '\u{2007}', '\u{2008}', '\u{2009}', '\u{200A}', '\u{2028}',
    '\u{2029}', '\u{202F}', '\u{205F}', '\u{3000}',
];

/// [`IDENTIFIER_TRIM_CHARS`] as one string, for binding into SQL.
pub fn identifier_trim_set() -> String {
    IDENTIFIER_TRIM_CHARS.iter().collect()
}

/// Dedup key for entries: trimmed case number with ASCII letters uppercased.
///
/// Only ASCII is case-folded; the Postgres source does the same with
/// `translate`, so neither side depends on a collation.
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim_matches(IDENTIFIER_TRIM_CHARS).to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_match_is_case_insensitive_substring() {
        let m = CategoryMarker::default();
        assert_eq!(m.classify(Some("Carta PRECATÓRIA n.º 12")), Category::Deprecated);
        assert_eq!(m.classify(Some("precatória")), Category::Deprecated);
        assert_eq!(m.classify(Some("inquérito comum")), Category::Ordinary);
        assert_eq!(m.classify(Some("")), Category::Ordinary);
        assert_eq!(m.classify(None), Category::Ordinary);
    }

    #[test]
    fn partial_marker_text_stays_ordinary() {
        let m = CategoryMarker::default();
        assert_eq!(m.classify(Some("precat")), Category::Ordinary);
    }

    #[test]
    fn empty_marker_is_rejected() {
        assert!(CategoryMarker::new("   ").is_err());
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        let m = CategoryMarker::new("50%_off\\x").unwrap();
        assert_eq!(m.like_pattern(), "%50\\%\\_off\\\\x%");
        assert_eq!(CategoryMarker::default().like_pattern(), "%precatória%");
    }

    #[test]
    fn identifiers_normalize_to_upper_trimmed() {
        assert_eq!(normalize_identifier("  123/25.0pbcsc "), "123/25.0PBCSC");
        assert_eq!(normalize_identifier("\u{a0}123/25"), "123/25");
        assert_eq!(normalize_identifier("\t123/25\n"), "123/25");
        assert_eq!(normalize_identifier("\u{3000}12/25\u{202f}"), "12/25");
    }

    #[test]
    fn non_ascii_letters_keep_their_case() {
        assert_eq!(normalize_identifier("7/25-ç"), "7/25-ç");
    }

    #[test]
    fn trim_set_is_exactly_unicode_whitespace() {
        for c in (0u32..=0x10FFFF).filter_map(char::from_u32) {
            assert_eq!(
                IDENTIFIER_TRIM_CHARS.contains(&c),
                c.is_whitespace(),
                "U+{:04X}",
                c as u32
            );
        }
        assert_eq!(identifier_trim_set().chars().count(), IDENTIFIER_TRIM_CHARS.len());
    }
}
