use strsim::normalized_levenshtein;

use crate::error::EngineError;
use crate::model::{MatchPair, RecordSet};

pub const DEFAULT_THRESHOLD: f64 = 0.7;

/// One join key: a field on the left set paired with a field on the right.
/// Sets with different schemas join through an explicit mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyField {
    pub left: String,
    pub right: String,
}

impl KeyField {
    pub fn same(name: impl Into<String>) -> Self {
        let name = name.into();
        Self { left: name.clone(), right: name }
    }

    pub fn mapped(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self { left: left.into(), right: right.into() }
    }
}

/// Trim + case-fold, applied to every key value before comparison.
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Join on exact normalized equality of every key field. All pairs across
/// the cross product are emitted, left set outer / right set inner;
/// downstream reports index by row position, so the order is contractual.
pub fn exact_join(
    left: &RecordSet,
    right: &RecordSet,
    keys: &[KeyField],
) -> Result<Vec<MatchPair>, EngineError> {
    check_keys(left, right, keys)?;

    let mut pairs = Vec::new();
    for (li, lrec) in left.records.iter().enumerate() {
        for (ri, rrec) in right.records.iter().enumerate() {
            let all_equal = keys
                .iter()
                .all(|k| normalize(lrec.value(&k.left)) == normalize(rrec.value(&k.right)));
            if all_equal {
                pairs.push(MatchPair { left_row: li, right_row: ri, score: 1.0 });
            }
        }
    }
    Ok(pairs)
}

/// Join on blended string similarity: per key field a normalized
/// edit-distance ratio in 0.0–1.0, averaged across fields, accepted at or
/// above `threshold`. Every qualifying pair is retained — ambiguity is
/// surfaced for human review, not resolved.
pub fn similarity_join(
    left: &RecordSet,
    right: &RecordSet,
    keys: &[KeyField],
    threshold: f64,
) -> Result<Vec<MatchPair>, EngineError> {
    check_keys(left, right, keys)?;

    let mut pairs = Vec::new();
    for (li, lrec) in left.records.iter().enumerate() {
        for (ri, rrec) in right.records.iter().enumerate() {
            let total: f64 = keys
                .iter()
                .map(|k| {
                    normalized_levenshtein(
                        &normalize(lrec.value(&k.left)),
                        &normalize(rrec.value(&k.right)),
                    )
                })
                .sum();
            let score = total / keys.len() as f64;
            if score >= threshold {
                pairs.push(MatchPair { left_row: li, right_row: ri, score });
            }
        }
    }
    Ok(pairs)
}

/// Drop rows identical to an already-emitted row, comparing the full row or
/// the given key subset. First-seen order is preserved.
pub fn deduplicate(
    source_name: &str,
    set: &RecordSet,
    key_fields: Option<&[String]>,
) -> Result<RecordSet, EngineError> {
    if let Some(keys) = key_fields {
        for key in keys {
            if !set.has_field(key) {
                return Err(EngineError::MissingColumn {
                    source: source_name.to_string(),
                    column: key.clone(),
                });
            }
        }
    }

    let mut seen = std::collections::HashSet::new();
    let mut out = RecordSet::new(set.schema.clone());

    for record in &set.records {
        let key: Vec<String> = match key_fields {
            Some(keys) => keys.iter().map(|k| record.value(k).to_string()).collect(),
            None => set.schema.iter().map(|f| record.value(f).to_string()).collect(),
        };
        if seen.insert(key) {
            out.push(record.clone());
        }
    }
    Ok(out)
}

fn check_keys(left: &RecordSet, right: &RecordSet, keys: &[KeyField]) -> Result<(), EngineError> {
    if keys.is_empty() {
        return Err(EngineError::ConfigValidation(
            "at least one key field is required".into(),
        ));
    }
    for key in keys {
        let left_ok = left.has_field(&key.left);
        let right_ok = right.has_field(&key.right);
        if !left_ok || !right_ok {
            return Err(EngineError::SchemaMismatch {
                field: if left_ok { key.right.clone() } else { key.left.clone() },
                left: presence(left_ok),
                right: presence(right_ok),
            });
        }
    }
    Ok(())
}

fn presence(ok: bool) -> String {
    if ok { "present".into() } else { "missing".into() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;

    fn set(field: &str, values: &[&str]) -> RecordSet {
        let mut s = RecordSet::new(vec![field.to_string()]);
        for v in values {
            s.push(Record::from_pairs([(field, *v)]));
        }
        s
    }

    #[test]
    fn exact_join_normalizes_keys() {
        let a = set("Name", &["alice", "bob"]);
        let b = set("Name", &["ALICE ", "carol"]);
        let pairs = exact_join(&a, &b, &[KeyField::same("Name")]).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].left_row, pairs[0].right_row), (0, 0));
    }

    #[test]
    fn exact_join_is_content_commutative() {
        let a = set("Name", &["x", "y", "z"]);
        let b = set("Name", &["y", "z", "w"]);
        let forward = exact_join(&a, &b, &[KeyField::same("Name")]).unwrap();
        let reverse = exact_join(&b, &a, &[KeyField::same("Name")]).unwrap();

        let fwd: std::collections::HashSet<(usize, usize)> =
            forward.iter().map(|p| (p.left_row, p.right_row)).collect();
        let rev: std::collections::HashSet<(usize, usize)> =
            reverse.iter().map(|p| (p.right_row, p.left_row)).collect();
        assert_eq!(fwd, rev);
    }

    #[test]
    fn exact_join_emits_left_outer_order() {
        let a = set("Name", &["b", "a"]);
        let b = set("Name", &["a", "b", "a"]);
        let pairs = exact_join(&a, &b, &[KeyField::same("Name")]).unwrap();
        let positions: Vec<(usize, usize)> =
            pairs.iter().map(|p| (p.left_row, p.right_row)).collect();
        assert_eq!(positions, vec![(0, 1), (1, 0), (1, 2)]);
    }

    #[test]
    fn exact_join_with_mapped_fields() {
        let mut a = RecordSet::new(vec!["Contract Name".into()]);
        a.push(Record::from_pairs([("Contract Name", "web-to-db")]));
        let mut b = RecordSet::new(vec!["Contract".into()]);
        b.push(Record::from_pairs([("Contract", "WEB-TO-DB")]));

        let keys = [KeyField::mapped("Contract Name", "Contract")];
        let pairs = exact_join(&a, &b, &keys).unwrap();
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn similarity_at_one_equals_exact() {
        let a = set("Name", &["alice", "bob", "carol"]);
        let b = set("Name", &["ALICE ", "bobby", "carol"]);
        let keys = [KeyField::same("Name")];

        let exact = exact_join(&a, &b, &keys).unwrap();
        let similar = similarity_join(&a, &b, &keys, 1.0).unwrap();
        let exact_pos: Vec<(usize, usize)> =
            exact.iter().map(|p| (p.left_row, p.right_row)).collect();
        let similar_pos: Vec<(usize, usize)> =
            similar.iter().map(|p| (p.left_row, p.right_row)).collect();
        assert_eq!(exact_pos, similar_pos);
    }

    #[test]
    fn similarity_keeps_all_qualifying_pairs() {
        let a = set("Name", &["deny-telnet"]);
        let b = set("Name", &["deny-telnet", "deny-telnets"]);
        let pairs = similarity_join(&a, &b, &[KeyField::same("Name")], 0.7).unwrap();
        // both candidates qualify; no best-match suppression
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].score, 1.0);
        assert!(pairs[1].score < 1.0 && pairs[1].score >= 0.7);
    }

    #[test]
    fn similarity_below_threshold_is_dropped() {
        let a = set("Name", &["alpha"]);
        let b = set("Name", &["omega-nine"]);
        let pairs = similarity_join(&a, &b, &[KeyField::same("Name")], 0.7).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn join_rejects_missing_key_field() {
        let a = set("Name", &["alice"]);
        let b = set("Label", &["alice"]);
        let err = exact_join(&a, &b, &[KeyField::same("Name")]).unwrap_err();
        assert!(matches!(err, EngineError::SchemaMismatch { .. }));
    }

    #[test]
    fn join_rejects_empty_key_list() {
        let a = set("Name", &["alice"]);
        let b = set("Name", &["alice"]);
        assert!(exact_join(&a, &b, &[]).is_err());
    }

    #[test]
    fn deduplicate_preserves_first_seen_order() {
        let s = set("Name", &["b", "a", "b", "c", "a"]);
        let out = deduplicate("rules", &s, None).unwrap();
        let names: Vec<&str> = out.records.iter().map(|r| r.value("Name")).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn deduplicate_is_idempotent() {
        let s = set("Name", &["x", "x", "y"]);
        let once = deduplicate("rules", &s, None).unwrap();
        let twice = deduplicate("rules", &once, None).unwrap();
        assert_eq!(once.records, twice.records);
    }

    #[test]
    fn deduplicate_on_key_subset() {
        let mut s = RecordSet::new(vec!["Name".into(), "Port".into()]);
        s.push(Record::from_pairs([("Name", "web"), ("Port", "80")]));
        s.push(Record::from_pairs([("Name", "web"), ("Port", "443")]));
        let keys = vec!["Name".to_string()];
        let out = deduplicate("rules", &s, Some(&keys)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.records[0].value("Port"), "80");
    }
}
