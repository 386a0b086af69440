//! `blr classify` / `blr join` / `blr dedupe` — single-file operations.

use std::path::PathBuf;

use baseliner_recon::annotate::{annotate, derived_columns};
use baseliner_recon::classify::classify_records;
use baseliner_recon::config::MatchStrategy;
use baseliner_recon::matcher::{deduplicate, exact_join, similarity_join, KeyField};
use baseliner_recon::model::{Record, RecordSet};
use baseliner_recon::SubnetTable;

use crate::exit_codes::{EXIT_MISSING_COLUMN, EXIT_USAGE};
use crate::util::{file_label, import_csv, write_or_print};
use crate::{engine_err, CliError};

#[allow(clippy::too_many_arguments)]
pub fn cmd_classify(
    rules: PathBuf,
    baseline: PathBuf,
    boundary_column: String,
    source_column: Option<String>,
    dest_column: Option<String>,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    if source_column.is_none() && dest_column.is_none() {
        return Err(CliError::new(
            EXIT_USAGE,
            "nothing to classify without an address column",
        )
        .with_hint("pass --source-column and/or --dest-column"));
    }

    let baseline_set = import_csv(&baseline)?;
    let boundaries = baseliner_io::csv::column_values(&baseline_set, &boundary_column)
        .map_err(|e| {
            CliError::new(
                EXIT_MISSING_COLUMN,
                format!("baseline file {}: {e}", baseline.display()),
            )
        })?;
    let (table, skipped) = SubnetTable::build(&boundaries);

    if !quiet {
        for s in &skipped {
            eprintln!("note: skipped boundary '{}': {}", s.value, s.reason);
        }
    }

    let rules_set = import_csv(&rules)?;
    let label = file_label(&rules);
    let classifications = classify_records(
        &label,
        &rules_set,
        source_column.as_deref(),
        dest_column.as_deref(),
        &table,
    )
    .map_err(engine_err)?;

    let mut columns = rules_set.schema.clone();
    columns.extend(derived_columns().iter().map(|c| c.to_string()));

    let mut out_set = RecordSet::new(columns.clone());
    let mut baseline_count = 0;
    for (record, classification) in rules_set.records.iter().zip(&classifications) {
        if classification.verdict == baseliner_recon::Verdict::Baseline {
            baseline_count += 1;
        }
        out_set.push(annotate(record, classification, None));
    }

    write_or_print(&out_set, &columns, output.as_ref())?;

    if !quiet {
        eprintln!(
            "classified {} rule(s) against {} boundary subnet(s) — {} in baseline",
            rules_set.len(),
            table.len(),
            baseline_count,
        );
    }
    Ok(())
}

pub fn cmd_join(
    left: PathBuf,
    right: PathBuf,
    on: Vec<String>,
    right_on: Vec<String>,
    strategy: MatchStrategy,
    threshold: f64,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    if !right_on.is_empty() && right_on.len() != on.len() {
        return Err(CliError::new(
            EXIT_USAGE,
            format!("--right-on has {} field(s), --on has {}", right_on.len(), on.len()),
        ));
    }

    let left_set = import_csv(&left)?;
    let right_set = import_csv(&right)?;

    let keys: Vec<KeyField> = if right_on.is_empty() {
        on.iter().map(|f| KeyField::same(f.as_str())).collect()
    } else {
        on.iter()
            .zip(&right_on)
            .map(|(l, r)| KeyField::mapped(l.as_str(), r.as_str()))
            .collect()
    };

    let pairs = match strategy {
        MatchStrategy::Exact => exact_join(&left_set, &right_set, &keys),
        MatchStrategy::Similarity => similarity_join(&left_set, &right_set, &keys, threshold),
    }
    .map_err(engine_err)?;

    // Paired rows interleaved: the left row, then its matching right row,
    // tagged with the originating document and 1-based data row.
    let mut columns: Vec<String> = on.clone();
    columns.extend(["Row".to_string(), "Document".to_string(), "Score".to_string()]);

    let left_label = file_label(&left);
    let right_label = file_label(&right);

    let mut out_set = RecordSet::new(columns.clone());
    for pair in &pairs {
        let lrec = &left_set.records[pair.left_row];
        let rrec = &right_set.records[pair.right_row];

        let mut lrow = Record::new();
        let mut rrow = Record::new();
        for key in &keys {
            lrow.insert(key.left.clone(), lrec.value(&key.left));
            rrow.insert(key.left.clone(), rrec.value(&key.right));
        }
        lrow.insert("Row", (pair.left_row + 1).to_string());
        lrow.insert("Document", left_label.clone());
        lrow.insert("Score", format!("{:.3}", pair.score));
        rrow.insert("Row", (pair.right_row + 1).to_string());
        rrow.insert("Document", right_label.clone());
        rrow.insert("Score", format!("{:.3}", pair.score));

        out_set.push(lrow);
        out_set.push(rrow);
    }

    write_or_print(&out_set, &columns, output.as_ref())?;
    eprintln!("{} pair(s) found", pairs.len());
    Ok(())
}

pub fn cmd_dedupe(
    input: PathBuf,
    on: Vec<String>,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let set = import_csv(&input)?;
    let label = file_label(&input);

    let keys = if on.is_empty() { None } else { Some(on.as_slice()) };
    let deduped = deduplicate(&label, &set, keys).map_err(engine_err)?;

    let dropped = set.len() - deduped.len();
    write_or_print(&deduped, &deduped.schema.clone(), output.as_ref())?;
    eprintln!("dropped {dropped} duplicate row(s), kept {}", deduped.len());
    Ok(())
}
