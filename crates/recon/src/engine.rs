use std::collections::HashMap;

use crate::annotate::{annotate, derived_columns};
use crate::classify::classify_records;
use crate::config::{MatchStrategy, RunConfig, SourceConfig};
use crate::error::EngineError;
use crate::evidence::summarize;
use crate::matcher::{exact_join, similarity_join};
use crate::model::{PeerMatch, Record, RecordSet, RunMeta, RunReport};
use crate::subnet::SubnetTable;

/// Pre-loaded inputs, keyed the same way as the config's sources.
pub struct RunInput {
    /// Boundary column values from the baseline file.
    pub boundaries: Vec<String>,
    pub sources: HashMap<String, RecordSet>,
}

/// Run one reconciliation pass: build the subnet table, classify the
/// subject records, pair them against the join peer, annotate, summarize.
pub fn run(config: &RunConfig, input: &RunInput) -> Result<RunReport, EngineError> {
    let (table, skipped) = SubnetTable::build(&input.boundaries);

    let subject_set = input.sources.get(&config.subject).ok_or_else(|| {
        EngineError::UnknownSource(format!("subject '{}' has no data", config.subject))
    })?;
    let subject_cfg = &config.sources[&config.subject];

    let classifications = classify_records(
        &config.subject,
        subject_set,
        subject_cfg.source_column.as_deref(),
        subject_cfg.dest_column.as_deref(),
        &table,
    )?;

    // One peer list per subject row; every qualifying pair is kept.
    let mut peers: Vec<Vec<PeerMatch>> = vec![Vec::new(); subject_set.len()];
    let mut pairs_matched = 0;

    if let Some(ref join) = config.join {
        let right_set = input.sources.get(&join.right).ok_or_else(|| {
            EngineError::UnknownSource(format!("join right source '{}' has no data", join.right))
        })?;
        let right_cfg = &config.sources[&join.right];

        let keys = join.keys();
        let pairs = match join.strategy {
            MatchStrategy::Exact => exact_join(subject_set, right_set, &keys)?,
            MatchStrategy::Similarity => {
                similarity_join(subject_set, right_set, &keys, join.threshold)?
            }
        };
        pairs_matched = pairs.len();

        for pair in pairs {
            let identity = peer_identity(right_cfg, right_set, pair.right_row);
            peers[pair.left_row].push(PeerMatch {
                identity,
                row: pair.right_row,
                score: pair.score,
            });
        }
    }

    let mut rows = Vec::new();
    for (i, record) in subject_set.records.iter().enumerate() {
        let classification = &classifications[i];
        if peers[i].is_empty() {
            rows.push(annotate(record, classification, None));
        } else {
            for peer in &peers[i] {
                rows.push(annotate(record, classification, Some(peer)));
            }
        }
    }

    let summary = summarize(&classifications, pairs_matched);

    Ok(RunReport {
        meta: RunMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        skipped_boundaries: skipped,
        rows,
    })
}

/// Column order for CSV output: the configured order (or the subject's
/// schema), then the derived columns.
pub fn output_columns(config: &RunConfig, subject_schema: &[String]) -> Vec<String> {
    let mut columns: Vec<String> = if config.output.columns.is_empty() {
        subject_schema.to_vec()
    } else {
        config.output.columns.clone()
    };
    columns.extend(derived_columns().iter().map(|c| c.to_string()));
    columns
}

fn peer_identity(cfg: &SourceConfig, set: &RecordSet, row: usize) -> String {
    cfg.id_column
        .as_deref()
        .map(|col| set.records[row].value(col))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("row {}", row + 1))
}

/// Load CSV text into a record set, tolerating a byte-order marker on the
/// first header. Columns the config names must exist.
pub fn load_records(
    source_name: &str,
    csv_data: &str,
    cfg: &SourceConfig,
) -> Result<RecordSet, EngineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| EngineError::Io(e.to_string()))?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.to_string()
        })
        .collect();

    for column in [&cfg.id_column, &cfg.source_column, &cfg.dest_column]
        .into_iter()
        .flatten()
    {
        if !headers.iter().any(|h| h == column) {
            return Err(EngineError::MissingColumn {
                source: source_name.to_string(),
                column: column.clone(),
            });
        }
    }

    let mut set = RecordSet::new(headers.clone());
    for result in reader.records() {
        let row = result.map_err(|e| EngineError::Io(e.to_string()))?;
        let mut record = Record::new();
        for (i, header) in headers.iter().enumerate() {
            record.insert(header.clone(), row.get(i).unwrap_or(""));
        }
        set.push(record);
    }

    Ok(set)
}
