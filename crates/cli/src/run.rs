//! `blr run` / `blr validate` — config-driven reconciliation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use baseliner_recon::engine::{load_records, output_columns, run, RunInput};
use baseliner_recon::model::RecordSet;
use baseliner_recon::RunConfig;

use crate::exit_codes::{EXIT_FINDINGS, EXIT_IO, EXIT_MISSING_COLUMN};
use crate::{engine_err, CliError};

pub fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| CliError::new(EXIT_IO, format!("cannot read config: {e}")))?;
    let config = RunConfig::from_toml(&config_str).map_err(engine_err)?;

    // File references in the config resolve relative to the config file
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let boundaries = load_boundaries(&config, base_dir)?;

    let mut sources: HashMap<String, RecordSet> = HashMap::new();
    for (name, source_config) in &config.sources {
        let path = base_dir.join(&source_config.file);
        let data = baseliner_io::csv::read_file_as_utf8(&path)
            .map_err(|e| CliError::new(EXIT_IO, e))?;
        let set = load_records(name, &data, source_config).map_err(engine_err)?;
        sources.insert(name.clone(), set);
    }

    let subject_schema = sources[&config.subject].schema.clone();
    let input = RunInput { boundaries, sources };
    let report = run(&config, &input).map_err(engine_err)?;

    if !quiet {
        for skipped in &report.skipped_boundaries {
            eprintln!("note: skipped boundary '{}': {}", skipped.value, skipped.reason);
        }
    }

    // Annotated CSV when the config asks for one
    if let Some(ref file) = config.output.file {
        let columns = output_columns(&config, &subject_schema);
        let out_set = RecordSet { schema: columns.clone(), records: report.rows.clone() };
        let path = base_dir.join(file);
        baseliner_io::csv::export(&out_set, &columns, &path)
            .map_err(|e| CliError::new(EXIT_IO, e))?;
        if !quiet {
            eprintln!("wrote {}", path.display());
        }
    }

    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| CliError::new(EXIT_IO, format!("JSON serialization error: {e}")))?;

    if let Some(ref file) = config.output.json {
        let path = base_dir.join(file);
        std::fs::write(&path, &json_str)
            .map_err(|e| CliError::new(EXIT_IO, format!("cannot write {}: {e}", path.display())))?;
        if !quiet {
            eprintln!("wrote {}", path.display());
        }
    }

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::new(EXIT_IO, format!("cannot write {}: {e}", path.display())))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    // Human summary to stderr
    let s = &report.summary;
    eprintln!(
        "recon '{}': {} records — {} baseline, {} non-baseline, {} negated, {} unknown, {} pairs",
        config.name, s.total_records, s.baseline, s.non_baseline, s.negated, s.unknown,
        s.pairs_matched,
    );

    if s.non_baseline > 0 || s.negated > 0 {
        return Err(CliError::new(
            EXIT_FINDINGS,
            format!(
                "{} non-baseline and {} negated record(s) found",
                s.non_baseline, s.negated
            ),
        ));
    }

    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| CliError::new(EXIT_IO, format!("cannot read config: {e}")))?;
    let config = RunConfig::from_toml(&config_str).map_err(engine_err)?;

    eprintln!(
        "valid: recon '{}' with {} source(s){}",
        config.name,
        config.sources.len(),
        match config.join {
            Some(ref join) => format!(", joining '{}' to '{}'", join.left, join.right),
            None => String::new(),
        },
    );
    Ok(())
}

fn load_boundaries(config: &RunConfig, base_dir: &Path) -> Result<Vec<String>, CliError> {
    let path = base_dir.join(&config.baseline.file);
    let set = baseliner_io::csv::import(&path).map_err(|e| CliError::new(EXIT_IO, e))?;
    baseliner_io::csv::column_values(&set, &config.baseline.column).map_err(|e| {
        CliError::new(
            EXIT_MISSING_COLUMN,
            format!("baseline file {}: {e}", path.display()),
        )
    })
}
