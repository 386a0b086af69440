//! `blr compare` — styled Excel comparison of two same-schema CSVs.

use std::path::PathBuf;

use crate::exit_codes::{EXIT_IO, EXIT_SCHEMA_MISMATCH};
use crate::util::import_csv;
use crate::CliError;

pub fn cmd_compare(
    left: PathBuf,
    right: PathBuf,
    threshold: f64,
    output: PathBuf,
) -> Result<(), CliError> {
    let left_set = import_csv(&left)?;
    let right_set = import_csv(&right)?;

    let stats = baseliner_io::xlsx::write_comparison(&left_set, &right_set, threshold, &output)
        .map_err(|e| {
            let code = if e.contains("different columns") {
                EXIT_SCHEMA_MISMATCH
            } else {
                EXIT_IO
            };
            CliError::new(code, e)
        })?;

    eprintln!(
        "wrote {} similar pair(s) ({} differing cell(s)) to {}",
        stats.pairs,
        stats.cells_differing,
        output.display(),
    );
    Ok(())
}
