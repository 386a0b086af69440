use std::collections::HashMap;

use crate::model::{RuleClassification, Summary, Verdict};

/// Compute per-verdict counts for the run report.
pub fn summarize(classifications: &[RuleClassification], pairs_matched: usize) -> Summary {
    let mut verdict_counts: HashMap<String, usize> = HashMap::new();
    let mut baseline = 0;
    let mut non_baseline = 0;
    let mut negated = 0;
    let mut unknown = 0;

    for c in classifications {
        *verdict_counts.entry(c.verdict.to_string()).or_insert(0) += 1;
        match c.verdict {
            Verdict::Baseline => baseline += 1,
            Verdict::NonBaseline => non_baseline += 1,
            Verdict::Negated => negated += 1,
            Verdict::Unknown => unknown += 1,
        }
    }

    Summary {
        total_records: classifications.len(),
        baseline,
        non_baseline,
        negated,
        unknown,
        pairs_matched,
        verdict_counts,
    }
}
