//! Locale-tolerant number parsing for scraped text
//!
//! Listing text mixes numbers with words ("Scored 8,5", "1.234 reviews"),
//! and sites localise separators. Both `.` and `,` are accepted as decimal or
//! group separators; anything that cannot be read as a number is `None`.

use regex::Regex;
use std::sync::LazyLock;

static DECIMAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)*").expect("valid regex"));
static INTEGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,\u{a0}\u{202f} ]\d{3})*").expect("valid regex"));

/// Parses the first number in `text` as a decimal
///
/// Separator rules:
/// - both `.` and `,` present: the one occurring last is the decimal mark
/// - one kind occurring once: it is the decimal mark (`8,5` → 8.5)
/// - one kind occurring repeatedly: group separators (`1.234.567`)
pub fn parse_decimal(text: &str) -> Option<f64> {
    let token = DECIMAL_RE.find(text)?.as_str();

    let dots = token.matches('.').count();
    let commas = token.matches(',').count();

    let normalized = match (dots, commas) {
        (0, 0) => token.to_string(),
        (_, 0) if dots > 1 => token.replace('.', ""),
        (0, _) if commas > 1 => token.replace(',', ""),
        (_, 0) => token.to_string(),
        (0, _) => token.replace(',', "."),
        _ => {
            let last_dot = token.rfind('.')?;
            let last_comma = token.rfind(',')?;
            if last_comma > last_dot {
                token.replace('.', "").replace(',', ".")
            } else {
                token.replace(',', "")
            }
        }
    };

    normalized.parse().ok()
}

/// Parses the first number in `text` as a non-negative integer
///
/// Group separators (`.`, `,`, spaces) between three-digit groups are
/// dropped. A number with a fractional part is not an integer and yields
/// `None`.
pub fn parse_integer(text: &str) -> Option<u64> {
    let found = INTEGER_RE.find(text)?;

    let mut rest = text[found.end()..].chars();
    if let (Some('.' | ','), Some(next)) = (rest.next(), rest.next()) {
        if next.is_ascii_digit() {
            return None;
        }
    }

    found
        .as_str()
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .ok()
}
