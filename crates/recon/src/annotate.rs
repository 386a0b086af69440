use crate::model::{PeerMatch, Record, RuleClassification};

pub const COL_SUBNET: &str = "Matched Subnet";
pub const COL_SIDE: &str = "Matched Side";
pub const COL_VERDICT: &str = "Verdict";
pub const COL_PEER: &str = "Matched Peer";
pub const COL_SCORE: &str = "Match Score";

/// The columns [`annotate`] appends, in order. Writers extend the output
/// schema with these.
pub fn derived_columns() -> [&'static str; 5] {
    [COL_SUBNET, COL_SIDE, COL_VERDICT, COL_PEER, COL_SCORE]
}

/// Build an annotated copy of `record`: the source fields in their original
/// order, then the verdict evidence and (when present) the matched peer's
/// identity and score. The input record is never mutated; every output row
/// carries all derived columns so the emitted schema stays rectangular.
pub fn annotate(
    record: &Record,
    classification: &RuleClassification,
    peer: Option<&PeerMatch>,
) -> Record {
    let mut out = record.clone();
    out.insert(COL_SUBNET, classification.matched_subnet.as_deref().unwrap_or(""));
    out.insert(
        COL_SIDE,
        classification
            .matched_side
            .map(|s| s.to_string())
            .unwrap_or_default(),
    );
    out.insert(COL_VERDICT, classification.verdict.to_string());
    match peer {
        Some(p) => {
            out.insert(COL_PEER, p.identity.clone());
            out.insert(COL_SCORE, format!("{:.3}", p.score));
        }
        None => {
            out.insert(COL_PEER, "");
            out.insert(COL_SCORE, "");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Side, Verdict};

    fn classification() -> RuleClassification {
        RuleClassification {
            verdict: Verdict::Baseline,
            matched_subnet: Some("10.0.0.0/8".into()),
            matched_side: Some(Side::Destination),
        }
    }

    #[test]
    fn input_record_is_untouched() {
        let record = Record::from_pairs([("Name", "r1"), ("Destination Address", "10.1.2.3")]);
        let before = record.clone();
        let _ = annotate(&record, &classification(), None);
        assert_eq!(record, before);
    }

    #[test]
    fn derived_columns_follow_source_columns() {
        let record = Record::from_pairs([("Name", "r1")]);
        let out = annotate(&record, &classification(), None);
        let fields: Vec<&str> = out.iter().map(|(k, _)| k).collect();
        assert_eq!(
            fields,
            vec!["Name", COL_SUBNET, COL_SIDE, COL_VERDICT, COL_PEER, COL_SCORE]
        );
        assert_eq!(out.value(COL_VERDICT), "baseline");
        assert_eq!(out.value(COL_SUBNET), "10.0.0.0/8");
        assert_eq!(out.value(COL_SIDE), "destination");
        assert_eq!(out.value(COL_PEER), "");
    }

    #[test]
    fn peer_identity_and_score_are_carried() {
        let record = Record::from_pairs([("Name", "r1")]);
        let peer = PeerMatch { identity: "npd-17".into(), row: 16, score: 0.875 };
        let out = annotate(&record, &classification(), Some(&peer));
        assert_eq!(out.value(COL_PEER), "npd-17");
        assert_eq!(out.value(COL_SCORE), "0.875");
    }

    #[test]
    fn unknown_verdict_leaves_evidence_blank() {
        let record = Record::from_pairs([("Name", "r1")]);
        let out = annotate(&record, &RuleClassification::unknown(), None);
        assert_eq!(out.value(COL_VERDICT), "unknown");
        assert_eq!(out.value(COL_SUBNET), "");
        assert_eq!(out.value(COL_SIDE), "");
    }
}
