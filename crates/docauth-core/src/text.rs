//! Text normalization for case- and whitespace-insensitive matching.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Any run of Unicode whitespace (spaces, tabs, newlines, NBSP, ...)
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// Normalize text for comparison.
///
/// Every run of whitespace collapses to a single ASCII space, the result is
/// lowercased and trimmed. Absent text (`None`) normalizes to the empty
/// string, so a missing page behaves exactly like an empty one.
///
/// ```
/// use docauth_core::text::normalize;
///
/// assert_eq!(normalize("  Contract\n\tTERMS "), "contract terms");
/// assert_eq!(normalize(None::<&str>), "");
/// ```
pub fn normalize<'a>(text: impl Into<Option<&'a str>>) -> String {
    let Some(text) = text.into() else {
        return String::new();
    };

    WHITESPACE_RUN
        .replace_all(text, " ")
        .to_lowercase()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("Hello   \t\n  World"), "hello world");
        assert_eq!(normalize("a\r\nb"), "a b");
    }

    #[test]
    fn test_normalize_unicode_whitespace() {
        assert_eq!(normalize("Fecha:\u{00a0}\u{2003}Hoy"), "fecha: hoy");
    }

    #[test]
    fn test_normalize_trims_and_lowercases() {
        assert_eq!(normalize("\n  CONTRATO de Servicios  \n"), "contrato de servicios");
        assert_eq!(normalize("ÁRBOL Ñandú"), "árbol ñandú");
    }

    #[test]
    fn test_normalize_absent_is_empty() {
        assert_eq!(normalize(None::<&str>), "");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \t\n "), "");
    }

    #[test]
    fn test_normalize_idempotent() {
        let samples = [
            "",
            "   ",
            "This is the Contract Terms page.",
            "  Mixed\tCASE\n\nand   spacing ",
            "línea uno\u{00a0}\u{00a0}línea DOS",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(once.as_str()), once, "not idempotent for {:?}", sample);
        }
    }
}
