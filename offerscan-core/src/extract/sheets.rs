//! Sheet resolver: pick a worksheet by fuzzy name

use crate::error::ExtractError;
use regex::Regex;

/// First sheet whose name contains a match for `pattern`.
///
/// When nothing matches, `fallback` is returned as-is (it may not exist in
/// the workbook; opening it is the caller's problem).
pub fn resolve_sheet_name(
    sheet_names: &[String],
    pattern: &Regex,
    fallback: Option<&str>,
) -> Result<String, ExtractError> {
    resolve_sheet_name_filtered(sheet_names, pattern, fallback, |_| false)
}

/// Like [`resolve_sheet_name`], but among several candidates prefers the
/// first one for which `has_images` is false. If every candidate has
/// images, the first candidate is returned anyway.
pub fn resolve_sheet_name_filtered<F>(
    sheet_names: &[String],
    pattern: &Regex,
    fallback: Option<&str>,
    mut has_images: F,
) -> Result<String, ExtractError>
where
    F: FnMut(&str) -> bool,
{
    let candidates: Vec<&String> = sheet_names
        .iter()
        .filter(|name| pattern.is_match(name))
        .collect();

    let Some(first) = candidates.first() else {
        return match fallback {
            Some(name) => {
                tracing::debug!(pattern = pattern.as_str(), fallback = name, "sheet fallback used");
                Ok(name.to_string())
            }
            None => Err(ExtractError::SheetNotFound {
                pattern: pattern.as_str().to_string(),
            }),
        };
    };

    if candidates.len() == 1 {
        return Ok(first.to_string());
    }

    let chosen = candidates
        .iter()
        .find(|name| !has_images(name))
        .unwrap_or(first);
    Ok(chosen.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::RegexBuilder;

    fn pattern(p: &str) -> Regex {
        RegexBuilder::new(p).case_insensitive(true).build().unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_case_insensitive_search() {
        let sheets = names(&["Ficha", "SAP_2023", "Notes"]);
        assert_eq!(
            resolve_sheet_name(&sheets, &pattern("ficha"), None).unwrap(),
            "Ficha"
        );
        assert_eq!(
            resolve_sheet_name(&sheets, &pattern("sap"), None).unwrap(),
            "SAP_2023"
        );
    }

    #[test]
    fn test_fallback_when_nothing_matches() {
        let sheets = names(&["Data1", "Data2"]);
        assert_eq!(
            resolve_sheet_name(&sheets, &pattern("ficha"), Some("FICHA")).unwrap(),
            "FICHA"
        );
        let err = resolve_sheet_name(&sheets, &pattern("ficha"), None).unwrap_err();
        assert!(matches!(err, ExtractError::SheetNotFound { .. }));
    }

    #[test]
    fn test_table_pattern_word_boundaries() {
        let table = pattern(r"\b(?:SAP|^Oferta)\b");
        let sheets = names(&["Ficha", "Listado SAP", "Oferta"]);
        assert_eq!(resolve_sheet_name(&sheets, &table, None).unwrap(), "Listado SAP");

        let sheets = names(&["Ficha", "SAPIENS", "Contraoferta"]);
        assert!(resolve_sheet_name(&sheets, &table, None).is_err());
    }

    #[test]
    fn test_image_filter_prefers_sheet_without_images() {
        let sheets = names(&["SAP logo", "SAP", "Notes"]);
        let chosen =
            resolve_sheet_name_filtered(&sheets, &pattern("sap"), None, |name| name == "SAP logo")
                .unwrap();
        assert_eq!(chosen, "SAP");
    }

    #[test]
    fn test_image_filter_falls_back_to_first_candidate() {
        let sheets = names(&["SAP a", "SAP b"]);
        let chosen = resolve_sheet_name_filtered(&sheets, &pattern("sap"), None, |_| true).unwrap();
        assert_eq!(chosen, "SAP a");
    }
}
