// CSV import/export for header-carrying record sets

use std::io::Read;
use std::path::Path;

use baseliner_recon::model::{Record, RecordSet};

pub fn import(path: &Path) -> Result<RecordSet, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    import_from_string(&content, delimiter)
}

pub fn import_with_delimiter(path: &Path, delimiter: u8) -> Result<RecordSet, String> {
    let content = read_file_as_utf8(path)?;
    import_from_string(&content, delimiter)
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252 exports
/// from Excel and firewall managers).
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| format!("cannot open {}: {e}", path.display()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Detect the most likely field delimiter by checking field-count
/// consistency across the first few lines. The delimiter producing the most
/// consistent count above one field wins; comma on a tie-less sample.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample: Vec<&str> = content.lines().take(10).collect();
    if sample.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let target = counts[0];
        if target <= 1 {
            continue;
        }
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

pub fn import_from_string(content: &str, delimiter: u8) -> Result<RecordSet, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            // firewall exports often carry a BOM glued to the first header
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.to_string()
        })
        .collect();

    let mut set = RecordSet::new(headers.clone());
    for result in reader.records() {
        let row = result.map_err(|e| e.to_string())?;
        let mut record = Record::new();
        for (i, header) in headers.iter().enumerate() {
            record.insert(header.clone(), row.get(i).unwrap_or(""));
        }
        set.push(record);
    }
    Ok(set)
}

/// Values of one column, in row order. A missing column is an error, not an
/// empty list.
pub fn column_values(set: &RecordSet, column: &str) -> Result<Vec<String>, String> {
    if !set.has_field(column) {
        return Err(format!("missing column '{column}'"));
    }
    Ok(set
        .records
        .iter()
        .map(|r| r.value(column).to_string())
        .collect())
}

/// Write records in a fixed column order. Columns absent from a record
/// (e.g. derived columns on pass-through rows) become empty cells.
pub fn export(set: &RecordSet, columns: &[String], path: &Path) -> Result<(), String> {
    let data = export_to_string(set, columns)?;
    std::fs::write(path, data).map_err(|e| format!("cannot write {}: {e}", path.display()))
}

pub fn export_to_string(set: &RecordSet, columns: &[String]) -> Result<String, String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(columns).map_err(|e| e.to_string())?;
    for record in &set.records {
        let row: Vec<&str> = columns.iter().map(|c| record.value(c)).collect();
        writer.write_record(&row).map_err(|e| e.to_string())?;
    }
    let bytes = writer.into_inner().map_err(|e| e.to_string())?;
    String::from_utf8(bytes).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn import_reads_headers_and_rows() {
        let set = import_from_string("Name,IP\nweb-1,10.1.2.3\ndb-1,10.2.0.9\n", b',').unwrap();
        assert_eq!(set.schema, vec!["Name", "IP"]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.records[1].value("IP"), "10.2.0.9");
    }

    #[test]
    fn import_strips_bom_from_first_header() {
        let set = import_from_string("\u{feff}Name,IP\nweb-1,10.1.2.3\n", b',').unwrap();
        assert_eq!(set.schema[0], "Name");
    }

    #[test]
    fn sniff_detects_semicolons() {
        let content = "Name;IP;Zone\na;10.0.0.1;inside\nb;10.0.0.2;dmz\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn sniff_defaults_to_comma() {
        assert_eq!(sniff_delimiter("single-column\nvalues\n"), b',');
    }

    #[test]
    fn column_values_requires_column() {
        let set = import_from_string("Boundary\n10.0.0.0/8\n172.16.0.0/12\n", b',').unwrap();
        let values = column_values(&set, "Boundary").unwrap();
        assert_eq!(values, vec!["10.0.0.0/8", "172.16.0.0/12"]);
        assert!(column_values(&set, "Subnet").is_err());
    }

    #[test]
    fn export_uses_fixed_column_order() {
        let set = import_from_string("B,A\n1,2\n", b',').unwrap();
        let columns = vec!["A".to_string(), "B".to_string(), "Derived".to_string()];
        let out = export_to_string(&set, &columns).unwrap();
        assert_eq!(out, "A,B,Derived\n2,1,\n");
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let set = import_from_string("Name,Verdict\nr1,baseline\n", b',').unwrap();
        export(&set, &set.schema.clone(), &path).unwrap();
        let back = import(&path).unwrap();
        assert_eq!(back.schema, set.schema);
        assert_eq!(back.records, set.records);
    }

    #[test]
    fn non_utf8_is_decoded_as_windows_1252() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // 0xE9 = é in Windows-1252
        std::fs::write(&path, b"Name\ncaf\xe9\n").unwrap();
        let set = import(&path).unwrap();
        assert_eq!(set.records[0].value("Name"), "café");
    }
}
