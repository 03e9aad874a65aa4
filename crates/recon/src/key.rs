//! Join-key normalization.
//!
//! Spreadsheet round-trips turn identifiers like `123` into `123.0` and
//! users type the same product with different casing. Keys are therefore
//! compared only after [`normalize_key`].

use caseless::default_case_fold_str;

use crate::model::{format_number, CellValue};

/// Size variants that mean "this product has no size".
const NO_SIZE_VARIANTS: [&str; 4] = ["no_size", "no size", "nosize", "no-size"];

/// Full Unicode case fold (`"STRASSE"` and `"straße"` fold alike).
pub fn fold(s: &str) -> String {
    default_case_fold_str(s)
}

/// Normalize an identifier cell into its join key: trimmed, case-folded, and
/// with a spreadsheet `.0` artifact removed. Blank cells give `""`, which
/// never matches anything.
pub fn normalize_key(value: &CellValue) -> String {
    match value {
        CellValue::Empty => String::new(),
        CellValue::Number(n) if n.is_nan() => String::new(),
        CellValue::Number(n) => format_number(*n),
        CellValue::Text(s) => normalize_key_str(s),
    }
}

/// [`normalize_key`] for an already-stringified identifier.
pub fn normalize_key_str(s: &str) -> String {
    let folded = fold(s.trim());
    strip_numeric_artifact(&folded).to_string()
}

/// `"123.0"` → `"123"`. The part before `.0` must be digits with at most
/// one further dot (`"1.5.0"` → `"1.5"`); anything else is returned as-is.
pub fn strip_numeric_artifact(s: &str) -> &str {
    let Some(stem) = s.strip_suffix(".0") else {
        return s;
    };
    if stem.is_empty() {
        return s;
    }
    let mut dots = 0;
    let numeric = stem.chars().all(|c| {
        if c == '.' {
            dots += 1;
            dots <= 1
        } else {
            c.is_ascii_digit()
        }
    });
    // a lone "." stem has no digits
    if numeric && stem != "." { stem } else { s }
}

/// Normalize a size cell. Returns `None` for blank cells and the
/// "no size" variants.
pub fn normalize_size(value: &CellValue) -> Option<String> {
    if value.is_blank() {
        return None;
    }
    let raw = value.display();
    let trimmed = raw.trim();
    let s = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    if s.is_empty() {
        return None;
    }
    if NO_SIZE_VARIANTS.contains(&fold(s).as_str()) {
        return None;
    }
    Some(s.to_string())
}

/// Split an item name such as `"Shirt - M"` on its last `" - "` into
/// `(title, size)`. Names without a usable size come back whole with `None`.
pub fn split_title_size(item_name: &CellValue) -> (String, Option<String>) {
    if item_name.is_blank() {
        return (String::new(), None);
    }
    let raw = item_name.display();
    let s = strip_numeric_artifact(raw.trim());

    if let Some((left, right)) = s.rsplit_once(" - ") {
        let title = left.trim();
        let size = normalize_size(&CellValue::text(right.trim()));
        if !title.is_empty() {
            if let Some(size) = size {
                return (title.to_string(), Some(size));
            }
        }
    }

    (s.trim().to_string(), None)
}

/// Build the case-folded `"<title> - <size>"` key, or the title key alone
/// when there is no size. An empty title gives `""`.
pub fn title_size_key(title: &str, size: Option<&str>) -> String {
    let title = normalize_key_str(title);
    if title.is_empty() {
        return String::new();
    }
    match size.map(str::trim).filter(|s| !s.is_empty()) {
        Some(size) => format!("{title} - {}", fold(size)),
        None => title,
    }
}

/// Outcome of parsing a stock cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Parsed(i64),
    /// Blank cell, counts as zero.
    Blank,
    /// Unparseable content, counts as zero.
    Invalid,
}

impl Quantity {
    pub fn value(self) -> i64 {
        match self {
            Self::Parsed(n) => n,
            Self::Blank | Self::Invalid => 0,
        }
    }
}

/// Parse a stock cell leniently: thousands separators are ignored and
/// decimals are truncated toward zero.
pub fn parse_quantity(value: &CellValue) -> Quantity {
    match value {
        CellValue::Empty => Quantity::Blank,
        CellValue::Number(n) => truncate(*n),
        CellValue::Text(s) => {
            let cleaned: String = s.chars().filter(|&c| c != ',').collect();
            let cleaned = cleaned.trim();
            if cleaned.is_empty() {
                return Quantity::Blank;
            }
            match cleaned.parse::<f64>() {
                Ok(n) => truncate(n),
                Err(_) => Quantity::Invalid,
            }
        }
    }
}

fn truncate(n: f64) -> Quantity {
    if !n.is_finite() || n.abs() >= 9.2e18 {
        return Quantity::Invalid;
    }
    Quantity::Parsed(n.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::text(s)
    }

    #[test]
    fn trims_and_folds_case() {
        assert_eq!(normalize_key(&text("  ABC123 ")), "abc123");
        assert_eq!(normalize_key(&text("abc123")), normalize_key(&text("ABC123")));
    }

    #[test]
    fn folds_beyond_ascii() {
        assert_eq!(normalize_key(&text("STRASSE-1")), normalize_key(&text("straße-1")));
        assert_eq!(normalize_key(&text("Straße-1")), "strasse-1");
        // final sigma folds to the medial form
        assert_eq!(normalize_key(&text("οδος-1")), normalize_key(&text("οδοσ-1")));
        assert_eq!(normalize_key(&text("ΟΔΟΣ-1")), normalize_key(&text("οδος-1")));
    }

    #[test]
    fn strips_float_artifact() {
        assert_eq!(normalize_key(&text("123.0")), "123");
        assert_eq!(normalize_key(&text(" 500.0 ")), "500");
        assert_eq!(normalize_key(&text("1.5.0")), "1.5");
    }

    #[test]
    fn keeps_non_numeric_dot_zero() {
        assert_eq!(normalize_key(&text("v2.0")), "v2.0");
        assert_eq!(normalize_key(&text(".0")), ".0");
        assert_eq!(normalize_key(&text("-5.0")), "-5.0");
        assert_eq!(normalize_key(&text("12.50")), "12.50");
        assert_eq!(strip_numeric_artifact("..0"), "..0");
    }

    #[test]
    fn numeric_cells_use_integer_form() {
        assert_eq!(normalize_key(&CellValue::Number(123.0)), "123");
        assert_eq!(normalize_key(&CellValue::Number(12.5)), "12.5");
        assert_eq!(normalize_key(&CellValue::Number(f64::NAN)), "");
        assert_eq!(normalize_key(&CellValue::Empty), "");
    }

    #[test]
    fn number_and_text_forms_agree() {
        assert_eq!(normalize_key(&CellValue::Number(500.0)), normalize_key(&text("500.0")));
    }

    #[test]
    fn size_normalization() {
        assert_eq!(normalize_size(&text(" M ")), Some("M".into()));
        assert_eq!(normalize_size(&text("42.0")), Some("42".into()));
        assert_eq!(normalize_size(&CellValue::Number(42.0)), Some("42".into()));
        assert_eq!(normalize_size(&text("No Size")), None);
        assert_eq!(normalize_size(&text("NO-SIZE")), None);
        assert_eq!(normalize_size(&text("   ")), None);
        assert_eq!(normalize_size(&CellValue::Empty), None);
    }

    #[test]
    fn splits_on_last_separator() {
        assert_eq!(
            split_title_size(&text("Polo - Navy - XL")),
            ("Polo - Navy".into(), Some("XL".into()))
        );
        assert_eq!(split_title_size(&text("Mug")), ("Mug".into(), None));
        assert_eq!(split_title_size(&text("Mug - no size")), ("Mug - no size".into(), None));
        assert_eq!(split_title_size(&text(" - M")), ("- M".into(), None));
        assert_eq!(split_title_size(&CellValue::Empty), (String::new(), None));
    }

    #[test]
    fn title_size_keys() {
        assert_eq!(title_size_key("Shirt ", Some("M")), "shirt - m");
        assert_eq!(title_size_key("Shirt", None), "shirt");
        assert_eq!(title_size_key("  ", Some("M")), "");
        assert_eq!(title_size_key("Maß", Some("XL")), title_size_key("MASS", Some("xl")));
    }

    #[test]
    fn quantities() {
        assert_eq!(parse_quantity(&CellValue::Number(10.0)), Quantity::Parsed(10));
        assert_eq!(parse_quantity(&CellValue::Number(7.9)), Quantity::Parsed(7));
        assert_eq!(parse_quantity(&text("1,250")), Quantity::Parsed(1250));
        assert_eq!(parse_quantity(&text(" 3.0 ")), Quantity::Parsed(3));
        assert_eq!(parse_quantity(&text("-2")), Quantity::Parsed(-2));
        assert_eq!(parse_quantity(&text("  ")), Quantity::Blank);
        assert_eq!(parse_quantity(&CellValue::Empty), Quantity::Blank);
        assert_eq!(parse_quantity(&text("n/a")), Quantity::Invalid);
        assert_eq!(parse_quantity(&text("n/a")).value(), 0);
    }
}
