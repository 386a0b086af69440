use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::subnet::SkippedBoundary;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A single row: an ordered field-name → value mapping.
///
/// Field iteration order is insertion order and is part of the observable
/// contract; derived columns always land after the source columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self { fields: IndexMap::new() }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Value of `field`, or `""` when absent. Most callers treat a missing
    /// field and an empty cell the same way.
    pub fn value(&self, field: &str) -> &str {
        self.get(field).unwrap_or("")
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// An ordered sequence of records sharing one schema. Immutable during a
/// processing pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordSet {
    pub schema: Vec<String>,
    pub records: Vec<Record>,
}

impl RecordSet {
    pub fn new(schema: Vec<String>) -> Self {
        Self { schema, records: Vec::new() }
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.schema.iter().any(|f| f == field)
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Final label attached to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    Baseline,
    NonBaseline,
    Negated,
    Unknown,
}

impl Verdict {
    /// Precedence when multiple signals apply: negated > baseline >
    /// non-baseline > unknown.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Negated => 3,
            Self::Baseline => 2,
            Self::NonBaseline => 1,
            Self::Unknown => 0,
        }
    }

    pub fn strongest(a: Verdict, b: Verdict) -> Verdict {
        if b.precedence() > a.precedence() {
            b
        } else {
            a
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Baseline => write!(f, "baseline"),
            Self::NonBaseline => write!(f, "non-baseline"),
            Self::Negated => write!(f, "negated"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Which rule field produced the hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Source,
    Destination,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Destination => write!(f, "destination"),
        }
    }
}

/// Outcome of looking an address expression up in a subnet table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Membership {
    /// First containing subnet, in table insertion order.
    Subnet(String),
    /// An `any` wildcard token matched unconditionally.
    Any,
    NoMatch,
}

impl Membership {
    pub fn is_match(&self) -> bool {
        !matches!(self, Self::NoMatch)
    }

    /// Cell text for the matched-subnet evidence column.
    pub fn label(&self) -> &str {
        match self {
            Self::Subnet(s) => s.as_str(),
            Self::Any => "any",
            Self::NoMatch => "",
        }
    }
}

/// Per-record verdict plus supporting evidence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleClassification {
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_subnet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_side: Option<Side>,
}

impl RuleClassification {
    pub fn unknown() -> Self {
        Self { verdict: Verdict::Unknown, matched_subnet: None, matched_side: None }
    }
}

// ---------------------------------------------------------------------------
// Pair matching
// ---------------------------------------------------------------------------

/// One qualifying pair from a join. Row indices are zero-based positions in
/// the two input sets; every qualifying pair is retained, so one left row
/// may appear in several pairs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchPair {
    pub left_row: usize,
    pub right_row: usize,
    pub score: f64,
}

/// Identity of the peer record carried into an annotated row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerMatch {
    pub identity: String,
    pub row: usize,
    pub score: f64,
}

// ---------------------------------------------------------------------------
// Summary + report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total_records: usize,
    pub baseline: usize,
    pub non_baseline: usize,
    pub negated: usize,
    pub unknown: usize,
    pub pairs_matched: usize,
    pub verdict_counts: HashMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub meta: RunMeta,
    pub summary: Summary,
    pub skipped_boundaries: Vec<SkippedBoundary>,
    pub rows: Vec<Record>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_preserves_field_order() {
        let mut r = Record::new();
        r.insert("Name", "edge-fw");
        r.insert("Source Address", "10.1.0.0/16");
        r.insert("Action", "permit");
        let fields: Vec<&str> = r.iter().map(|(k, _)| k).collect();
        assert_eq!(fields, vec!["Name", "Source Address", "Action"]);
    }

    #[test]
    fn verdict_precedence_order() {
        assert_eq!(Verdict::strongest(Verdict::Baseline, Verdict::Negated), Verdict::Negated);
        assert_eq!(Verdict::strongest(Verdict::Negated, Verdict::Baseline), Verdict::Negated);
        assert_eq!(
            Verdict::strongest(Verdict::NonBaseline, Verdict::Baseline),
            Verdict::Baseline
        );
        assert_eq!(
            Verdict::strongest(Verdict::Unknown, Verdict::NonBaseline),
            Verdict::NonBaseline
        );
    }

    #[test]
    fn membership_labels() {
        assert_eq!(Membership::Subnet("10.0.0.0/8".into()).label(), "10.0.0.0/8");
        assert_eq!(Membership::Any.label(), "any");
        assert_eq!(Membership::NoMatch.label(), "");
        assert!(!Membership::NoMatch.is_match());
    }
}
