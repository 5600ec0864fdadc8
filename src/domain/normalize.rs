//! Price-text normalization.
//!
//! Marketplace price strings arrive in every locale convention at once:
//! `"1 200,50 €"`, `"EUR 45.00"`, `"45,00€"`, with regular or non-breaking
//! spaces. The parser keeps only digits, separators, and whitespace, then
//! decides which separator is the decimal one.

/// Parses heterogeneous currency text into a numeric amount.
///
/// Comma is the decimal separator when no period is present; otherwise the
/// period is decimal and commas are thousands separators. Returns `None`
/// when nothing numeric remains or the remainder fails to parse.
pub fn normalize(text: &str) -> Option<f64> {
    let mut kept = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_digit() || c == ',' || c == '.' || c.is_whitespace() {
            kept.push(c);
        }
    }

    let compact: String = kept.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = if compact.contains('.') {
        compact.replace(',', "")
    } else {
        compact.replace(',', ".")
    };

    if digits.is_empty() {
        return None;
    }
    digits.parse::<f64>().ok()
}
