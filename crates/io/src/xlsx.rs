// Excel comparison report
//
// Two same-schema record sets, every row pair at or above the similarity
// threshold written side by side. Differing cells are colored (dark red on
// the left document, dark green on the right); matching cells stay plain.

use std::path::Path;

use baseliner_recon::matcher::{similarity_join, KeyField};
use baseliner_recon::model::RecordSet;
use rust_xlsxwriter::{Color, Format, Workbook};

const LEFT_DIFF: u32 = 0x8B0000; // dark red
const RIGHT_DIFF: u32 = 0x006400; // dark green

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompareStats {
    pub pairs: usize,
    pub cells_differing: usize,
}

pub fn write_comparison(
    left: &RecordSet,
    right: &RecordSet,
    threshold: f64,
    path: &Path,
) -> Result<CompareStats, String> {
    if left.schema != right.schema {
        return Err("the two record sets have different columns".into());
    }

    let keys: Vec<KeyField> = left.schema.iter().map(|f| KeyField::same(f.as_str())).collect();
    let pairs = similarity_join(left, right, &keys, threshold).map_err(|e| e.to_string())?;

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name("Comparison Results")
        .map_err(|e| e.to_string())?;

    let left_format = Format::new().set_font_color(Color::RGB(LEFT_DIFF));
    let right_format = Format::new().set_font_color(Color::RGB(RIGHT_DIFF));

    let columns = left.schema.len();
    worksheet.write_string(0, 0, "Left Row").map_err(|e| e.to_string())?;
    worksheet.write_string(0, 1, "Right Row").map_err(|e| e.to_string())?;
    worksheet.write_string(0, 2, "Similarity").map_err(|e| e.to_string())?;
    for (c, name) in left.schema.iter().enumerate() {
        worksheet
            .write_string(0, (3 + c) as u16, name.as_str())
            .map_err(|e| e.to_string())?;
        worksheet
            .write_string(0, (3 + columns + c) as u16, format!("{name} (right)"))
            .map_err(|e| e.to_string())?;
    }

    let mut stats = CompareStats::default();

    for (i, pair) in pairs.iter().enumerate() {
        let row = (i + 1) as u32;
        let lrec = &left.records[pair.left_row];
        let rrec = &right.records[pair.right_row];

        worksheet
            .write_number(row, 0, (pair.left_row + 1) as f64)
            .map_err(|e| e.to_string())?;
        worksheet
            .write_number(row, 1, (pair.right_row + 1) as f64)
            .map_err(|e| e.to_string())?;
        worksheet
            .write_number(row, 2, pair.score)
            .map_err(|e| e.to_string())?;

        for (c, field) in left.schema.iter().enumerate() {
            let lval = lrec.value(field);
            let rval = rrec.value(field);
            let lcol = (3 + c) as u16;
            let rcol = (3 + columns + c) as u16;

            if lval != rval {
                stats.cells_differing += 1;
                worksheet
                    .write_string_with_format(row, lcol, lval, &left_format)
                    .map_err(|e| e.to_string())?;
                worksheet
                    .write_string_with_format(row, rcol, rval, &right_format)
                    .map_err(|e| e.to_string())?;
            } else {
                worksheet.write_string(row, lcol, lval).map_err(|e| e.to_string())?;
                worksheet.write_string(row, rcol, rval).map_err(|e| e.to_string())?;
            }
        }
        stats.pairs += 1;
    }

    workbook.save(path).map_err(|e| e.to_string())?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv::import_from_string;
    use tempfile::tempdir;

    #[test]
    fn rejects_mismatched_schemas() {
        let a = import_from_string("Name,Service\nr1,ssh\n", b',').unwrap();
        let b = import_from_string("Name,Port\nr1,22\n", b',').unwrap();
        let dir = tempdir().unwrap();
        let err = write_comparison(&a, &b, 0.7, &dir.path().join("out.xlsx")).unwrap_err();
        assert!(err.contains("different columns"));
    }

    #[test]
    fn writes_similar_pairs_and_counts_diffs() {
        let a = import_from_string(
            "Name,Service\nallow-web,tcp-443\ndeny-guest,any\n",
            b',',
        )
        .unwrap();
        let b = import_from_string(
            "Name,Service\nallow-web,tcp-8443\nunrelated-thing,icmp\n",
            b',',
        )
        .unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let stats = write_comparison(&a, &b, 0.7, &path).unwrap();

        assert_eq!(stats.pairs, 1);
        assert_eq!(stats.cells_differing, 1); // only Service differs
        let written = std::fs::metadata(&path).unwrap();
        assert!(written.len() > 0);
    }

    #[test]
    fn no_pairs_is_valid_output() {
        let a = import_from_string("Name\nalpha\n", b',').unwrap();
        let b = import_from_string("Name\nomega-nine\n", b',').unwrap();
        let dir = tempdir().unwrap();
        let stats = write_comparison(&a, &b, 0.9, &dir.path().join("out.xlsx")).unwrap();
        assert_eq!(stats, CompareStats::default());
    }
}
