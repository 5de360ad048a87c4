//! Text helpers for spreadsheet headers and free-text cells

/// Collapse every run of whitespace to a single space and trim the ends
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a spreadsheet column header
///
/// Spreadsheets exported from office suites carry non-breaking spaces and
/// typographic hyphens in headers ("Инженер‑энергетик"). Those are folded
/// to their ASCII counterparts before whitespace is collapsed, so that
/// lookups by the plain column name succeed.
pub fn normalize_header(header: &str) -> String {
    let folded: String = header
        .chars()
        .map(|c| match c {
            '\u{00A0}' | '\u{2007}' | '\u{202F}' => ' ',
            '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2212}' => '-',
            other => other,
        })
        .collect();
    collapse_whitespace(&folded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  ул.   Московская \t 5 "), "ул. Московская 5");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn test_normalize_header_folds_nbsp_and_hyphens() {
        assert_eq!(normalize_header("Населенный\u{00A0}пункт"), "Населенный пункт");
        assert_eq!(normalize_header("Инженер\u{2011}энергетик"), "Инженер-энергетик");
        assert_eq!(normalize_header("  Механик   КТО "), "Механик КТО");
    }
}
