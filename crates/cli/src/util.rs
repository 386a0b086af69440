use std::path::{Path, PathBuf};

use baseliner_recon::model::RecordSet;

use crate::exit_codes::EXIT_IO;
use crate::CliError;

/// Import a CSV, mapping loader failures onto the IO exit code.
pub fn import_csv(path: &Path) -> Result<RecordSet, CliError> {
    baseliner_io::csv::import(path).map_err(|e| CliError::new(EXIT_IO, e))
}

/// Write to the given path, or print to stdout when no path was given.
pub fn write_or_print(
    set: &RecordSet,
    columns: &[String],
    output: Option<&PathBuf>,
) -> Result<(), CliError> {
    match output {
        Some(path) => baseliner_io::csv::export(set, columns, path)
            .map_err(|e| CliError::new(EXIT_IO, e)),
        None => {
            let text = baseliner_io::csv::export_to_string(set, columns)
                .map_err(|e| CliError::new(EXIT_IO, e))?;
            print!("{text}");
            Ok(())
        }
    }
}

/// Short display name for a file, used as a document tag in join output.
pub fn file_label(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}
