use crate::error::EngineError;
use crate::model::{Membership, RecordSet, RuleClassification, Side, Verdict};
use crate::subnet::{split_expressions, AddrExpr, SubnetTable};

/// Outcome of classifying one address field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOutcome {
    /// Evidence for the first negated token whose inner expression matches.
    pub negated: Option<Membership>,
    /// First positive match across the field's tokens.
    pub matched: Membership,
}

impl FieldOutcome {
    fn none() -> Self {
        Self { negated: None, matched: Membership::NoMatch }
    }
}

/// Classify every token of an address field. A `[negate]` token only
/// registers when its inner expression would itself match; a positive hit
/// elsewhere in the same field never outranks it.
pub fn classify_field(field: &str, table: &SubnetTable) -> FieldOutcome {
    let mut outcome = FieldOutcome::none();

    for token in split_expressions(field) {
        let expr = AddrExpr::parse(token);
        if expr.is_negated() {
            if outcome.negated.is_none() {
                let inner = expr.inner().membership(table);
                if inner.is_match() {
                    outcome.negated = Some(inner);
                }
            }
        } else if !outcome.matched.is_match() {
            outcome.matched = expr.membership(table);
        }
    }

    outcome
}

/// Classify a rule by its source field first, falling back to the
/// destination only when the source produced nothing. "Baseline" is a
/// property of the connection — either endpoint's declared range can
/// satisfy it.
pub fn classify_rule(
    source_field: &str,
    dest_field: &str,
    table: &SubnetTable,
) -> RuleClassification {
    let source = classify_field(source_field, table);
    if let Some(evidence) = source.negated {
        return negated(evidence, Side::Source);
    }
    if source.matched.is_match() {
        return baseline(source.matched, Side::Source);
    }

    let dest = classify_field(dest_field, table);
    if let Some(evidence) = dest.negated {
        return negated(evidence, Side::Destination);
    }
    if dest.matched.is_match() {
        return baseline(dest.matched, Side::Destination);
    }

    if source_field.trim().is_empty() && dest_field.trim().is_empty() {
        RuleClassification::unknown()
    } else {
        RuleClassification {
            verdict: Verdict::NonBaseline,
            matched_subnet: None,
            matched_side: None,
        }
    }
}

/// Classify every record of a set by its configured address columns.
/// Missing columns are fatal before any record is touched.
pub fn classify_records(
    source_name: &str,
    set: &RecordSet,
    source_column: Option<&str>,
    dest_column: Option<&str>,
    table: &SubnetTable,
) -> Result<Vec<RuleClassification>, EngineError> {
    for column in [source_column, dest_column].into_iter().flatten() {
        if !set.has_field(column) {
            return Err(EngineError::MissingColumn {
                source: source_name.to_string(),
                column: column.to_string(),
            });
        }
    }

    Ok(set
        .records
        .iter()
        .map(|record| {
            let src = source_column.map(|c| record.value(c)).unwrap_or("");
            let dst = dest_column.map(|c| record.value(c)).unwrap_or("");
            classify_rule(src, dst, table)
        })
        .collect())
}

fn baseline(membership: Membership, side: Side) -> RuleClassification {
    RuleClassification {
        verdict: Verdict::Baseline,
        matched_subnet: Some(membership.label().to_string()),
        matched_side: Some(side),
    }
}

fn negated(evidence: Membership, side: Side) -> RuleClassification {
    RuleClassification {
        verdict: Verdict::Negated,
        matched_subnet: Some(evidence.label().to_string()),
        matched_side: Some(side),
    }
}
