//! Numeric coercion for amounts typed as text

/// Read a human-typed amount: `"1.234,56 €"`, `"$1,234.56"`, `"30 %"`.
///
/// When both separators appear, the last one is the decimal mark. A lone
/// comma is a decimal mark. A lone dot followed by exactly three digits is a
/// thousands separator (Spanish style) unless the integer part is zero.
pub fn parse_number_text(input: &str) -> Option<f64> {
    let cleaned: String = input
        .trim()
        .trim_start_matches("EUR")
        .trim_end_matches("EUR")
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '€' | '$' | '£' | '%' | '\''))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let (negative, body) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };
    if body.is_empty() || !body.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return None;
    }

    let normalized = match (body.rfind('.'), body.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => body.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => body.replace(',', ""),
        (None, Some(_)) if body.matches(',').count() == 1 => body.replace(',', "."),
        (None, Some(_)) => body.replace(',', ""),
        (Some(dot), None) => {
            let dots = body.matches('.').count();
            let decimals = body.len() - dot - 1;
            let integer_part = &body[..dot];
            if dots > 1 || (decimals == 3 && !integer_part.trim_start_matches('0').is_empty()) {
                body.replace('.', "")
            } else {
                body.to_string()
            }
        }
        (None, None) => body.to_string(),
    };

    let value: f64 = normalized.parse().ok()?;
    Some(if negative { -value } else { value })
}
