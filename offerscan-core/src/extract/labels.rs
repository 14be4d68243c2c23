//! Label locator: find values next to matching label cells

use crate::reader::{CellValue, SheetSnapshot};
use crate::specs::LabelSpecs;
use std::collections::BTreeMap;

/// Resolve every label in `specs` against one sheet.
///
/// Cells are visited in the snapshot's row-major order. Each cell is tested
/// against the labels still unresolved, in file order, and is consumed by
/// the first label whose pattern matches it, whether or not a value sits at
/// that label's offset. A label resolves the first time its target cell is
/// populated and is never revisited after that.
pub fn locate_labels(
    snapshot: &SheetSnapshot,
    specs: &LabelSpecs,
) -> BTreeMap<String, Option<CellValue>> {
    let mut found: Vec<Option<CellValue>> = vec![None; specs.len()];
    let mut unresolved = specs.len();

    for ((row, col), value) in snapshot.iter() {
        if unresolved == 0 {
            break;
        }
        let text = value.to_string();

        for (slot, spec) in found.iter_mut().zip(specs.iter()) {
            if slot.is_some() || !spec.matches(&text) {
                continue;
            }
            if let Some(target) = spec
                .target(row, col)
                .and_then(|(r, c)| snapshot.get(r, c))
            {
                *slot = Some(target.clone());
                unresolved -= 1;
            }
            break;
        }
    }

    specs
        .names()
        .map(str::to_string)
        .zip(found)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specs::LabelSpec;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn specs(entries: &[(&str, &str, i64, i64)]) -> LabelSpecs {
        LabelSpecs::new(
            entries
                .iter()
                .map(|(name, pattern, up, right)| LabelSpec::new(*name, *pattern, *up, *right).unwrap())
                .collect(),
        )
    }

    #[test]
    fn test_value_to_the_right() {
        let sheet = SheetSnapshot::from_cells(
            "Ficha",
            vec![(5, 2, text("Total:")), (5, 3, CellValue::Int(42))],
        );
        let result = locate_labels(&sheet, &specs(&[("total", "Total:?", 0, 1)]));
        assert_eq!(result["total"], Some(CellValue::Int(42)));
    }

    #[test]
    fn test_every_label_present_even_when_missing() {
        let sheet = SheetSnapshot::from_cells("Ficha", vec![(1, 1, text("Cliente"))]);
        let result = locate_labels(
            &sheet,
            &specs(&[("client_name", "Cliente", 0, 1), ("offer_price", "Precio", 0, 1)]),
        );
        assert_eq!(result.len(), 2);
        assert_eq!(result["client_name"], None);
        assert_eq!(result["offer_price"], None);
    }

    #[test]
    fn test_offset_up_reads_row_above() {
        let sheet = SheetSnapshot::from_cells(
            "Ficha",
            vec![(3, 4, text("Importe")), (4, 4, text("Precio ofertado"))],
        );
        let result = locate_labels(&sheet, &specs(&[("offer_price", "precio", 1, 0)]));
        assert_eq!(result["offer_price"], Some(text("Importe")));
    }

    #[test]
    fn test_out_of_sheet_target_is_skipped() {
        let sheet = SheetSnapshot::from_cells(
            "Ficha",
            vec![
                (1, 1, text("Fecha")),
                (6, 1, text("Fecha oferta")),
                (5, 1, text("12/03/2023")),
            ],
        );
        let result = locate_labels(&sheet, &specs(&[("offer_date", "fecha", 1, 0)]));
        assert_eq!(result["offer_date"], Some(text("12/03/2023")));
    }

    #[test]
    fn test_first_match_wins() {
        let sheet = SheetSnapshot::from_cells(
            "Ficha",
            vec![
                (2, 1, text("Precio")),
                (2, 2, CellValue::Int(100)),
                (7, 1, text("Precio")),
                (7, 2, CellValue::Int(999)),
            ],
        );
        let result = locate_labels(&sheet, &specs(&[("offer_price", "precio", 0, 1)]));
        assert_eq!(result["offer_price"], Some(CellValue::Int(100)));
    }

    #[test]
    fn test_empty_target_keeps_searching() {
        let sheet = SheetSnapshot::from_cells(
            "Ficha",
            vec![
                (2, 1, text("Precio")),
                (7, 1, text("Precio")),
                (7, 2, CellValue::Int(999)),
            ],
        );
        let result = locate_labels(&sheet, &specs(&[("offer_price", "precio", 0, 1)]));
        assert_eq!(result["offer_price"], Some(CellValue::Int(999)));
    }

    #[test]
    fn test_cell_consumed_by_first_matching_label() {
        // "Precio tasación" matches both patterns; the earlier label takes it
        let sheet = SheetSnapshot::from_cells(
            "Ficha",
            vec![
                (1, 1, text("Precio tasación")),
                (1, 2, CellValue::Int(200)),
                (2, 1, text("Precio")),
                (2, 2, CellValue::Int(150)),
            ],
        );
        let result = locate_labels(
            &sheet,
            &specs(&[
                ("appraisal_price", "precio tasaci", 0, 1),
                ("offer_price", "precio", 0, 1),
            ]),
        );
        assert_eq!(result["appraisal_price"], Some(CellValue::Int(200)));
        assert_eq!(result["offer_price"], Some(CellValue::Int(150)));
    }

    #[test]
    fn test_resolved_label_frees_later_cells() {
        let sheet = SheetSnapshot::from_cells(
            "Ficha",
            vec![
                (1, 1, text("Precio")),
                (1, 2, CellValue::Int(150)),
                (2, 1, text("Precio tasación")),
                (2, 2, CellValue::Int(200)),
            ],
        );
        let result = locate_labels(
            &sheet,
            &specs(&[
                ("offer_price", "precio", 0, 1),
                ("appraisal_price", "precio", 0, 1),
            ]),
        );
        assert_eq!(result["offer_price"], Some(CellValue::Int(150)));
        assert_eq!(result["appraisal_price"], Some(CellValue::Int(200)));
    }

    #[test]
    fn test_numeric_cells_are_matched_as_text() {
        let sheet = SheetSnapshot::from_cells(
            "Ficha",
            vec![(1, 1, CellValue::Int(2023)), (2, 1, text("Q1"))],
        );
        let result = locate_labels(&sheet, &specs(&[("period", "20\\d\\d", -1, 0)]));
        assert_eq!(result["period"], Some(text("Q1")));
    }
}
