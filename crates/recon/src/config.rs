use std::collections::HashMap;

use serde::Deserialize;

use crate::error::EngineError;
use crate::matcher::{KeyField, DEFAULT_THRESHOLD};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RunConfig {
    pub name: String,
    /// The record set that flows to the output, classified and (when a join
    /// is configured) paired against the other side.
    pub subject: String,
    pub baseline: BaselineConfig,
    pub sources: HashMap<String, SourceConfig>,
    #[serde(default)]
    pub join: Option<JoinConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Baseline + sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct BaselineConfig {
    pub file: String,
    #[serde(default = "default_boundary_column")]
    pub column: String,
}

fn default_boundary_column() -> String {
    "Boundary".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub file: String,
    /// Column naming the record in peer-evidence output.
    #[serde(default)]
    pub id_column: Option<String>,
    /// Address columns to classify, when this source carries them.
    #[serde(default)]
    pub source_column: Option<String>,
    #[serde(default)]
    pub dest_column: Option<String>,
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct JoinConfig {
    pub left: String,
    pub right: String,
    pub key_fields: Vec<String>,
    /// Field names on the right schema when they differ from the left.
    /// Empty means same names on both sides.
    #[serde(default)]
    pub right_key_fields: Vec<String>,
    #[serde(default = "default_strategy")]
    pub strategy: MatchStrategy,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl JoinConfig {
    /// Left/right key pairs, applying the cross-schema mapping when given.
    pub fn keys(&self) -> Vec<KeyField> {
        if self.right_key_fields.is_empty() {
            self.key_fields.iter().map(|f| KeyField::same(f.as_str())).collect()
        } else {
            self.key_fields
                .iter()
                .zip(&self.right_key_fields)
                .map(|(l, r)| KeyField::mapped(l, r))
                .collect()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Exact,
    Similarity,
}

fn default_strategy() -> MatchStrategy {
    MatchStrategy::Exact
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub json: Option<String>,
    /// Explicit column order for the CSV output; derived columns are
    /// appended after these. Empty means the subject's schema order.
    #[serde(default)]
    pub columns: Vec<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl RunConfig {
    pub fn from_toml(input: &str) -> Result<Self, EngineError> {
        let config: RunConfig =
            toml::from_str(input).map_err(|e| EngineError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.sources.is_empty() {
            return Err(EngineError::ConfigValidation(
                "at least one source is required".into(),
            ));
        }

        if !self.sources.contains_key(&self.subject) {
            return Err(EngineError::UnknownSource(format!(
                "subject '{}' not found in sources",
                self.subject
            )));
        }

        if self.baseline.column.trim().is_empty() {
            return Err(EngineError::ConfigValidation(
                "baseline.column must not be empty".into(),
            ));
        }

        if let Some(ref join) = self.join {
            for side in [&join.left, &join.right] {
                if !self.sources.contains_key(side) {
                    return Err(EngineError::UnknownSource(format!(
                        "join references '{side}' which is not a source"
                    )));
                }
            }
            if join.left != self.subject {
                return Err(EngineError::ConfigValidation(format!(
                    "join.left must be the subject source '{}', got '{}'",
                    self.subject, join.left
                )));
            }
            if join.key_fields.is_empty() {
                return Err(EngineError::ConfigValidation(
                    "join.key_fields must not be empty".into(),
                ));
            }
            if !join.right_key_fields.is_empty()
                && join.right_key_fields.len() != join.key_fields.len()
            {
                return Err(EngineError::ConfigValidation(format!(
                    "join.right_key_fields has {} entries, key_fields has {}",
                    join.right_key_fields.len(),
                    join.key_fields.len()
                )));
            }
            if !(join.threshold > 0.0 && join.threshold <= 1.0) {
                return Err(EngineError::ConfigValidation(format!(
                    "join.threshold must be in (0, 1], got {}",
                    join.threshold
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
name = "AWS baseline sweep"
subject = "rules"

[baseline]
file = "AWS_Baseline.csv"
column = "Boundary"

[sources.rules]
file = "AWS_Extraction.csv"
id_column = "Name"
source_column = "Source Address"
dest_column = "Destination Address"

[sources.npd]
file = "NPD_Extraction.csv"
id_column = "Name"

[join]
left = "rules"
right = "npd"
key_fields = ["Source Address", "Destination Address", "Service"]
strategy = "similarity"
threshold = 0.7

[output]
file = "annotated.csv"
json = "report.json"
"#;

    #[test]
    fn parse_valid_config() {
        let config = RunConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "AWS baseline sweep");
        assert_eq!(config.subject, "rules");
        assert_eq!(config.sources.len(), 2);
        let join = config.join.as_ref().unwrap();
        assert_eq!(join.strategy, MatchStrategy::Similarity);
        assert_eq!(join.threshold, 0.7);
        assert_eq!(join.keys().len(), 3);
        assert_eq!(join.keys()[0].left, join.keys()[0].right);
    }

    #[test]
    fn defaults_without_join() {
        let input = r#"
name = "Classify only"
subject = "rules"

[baseline]
file = "baseline.csv"

[sources.rules]
file = "rules.csv"
source_column = "Source Address"
"#;
        let config = RunConfig::from_toml(input).unwrap();
        assert!(config.join.is_none());
        assert_eq!(config.baseline.column, "Boundary");
        assert!(config.output.file.is_none());
    }

    #[test]
    fn join_strategy_defaults_to_exact() {
        let input = r#"
name = "Join"
subject = "a"

[baseline]
file = "baseline.csv"

[sources.a]
file = "a.csv"

[sources.b]
file = "b.csv"

[join]
left = "a"
right = "b"
key_fields = ["Name"]
"#;
        let config = RunConfig::from_toml(input).unwrap();
        let join = config.join.unwrap();
        assert_eq!(join.strategy, MatchStrategy::Exact);
        assert_eq!(join.threshold, DEFAULT_THRESHOLD);
    }

    #[test]
    fn mapped_key_fields() {
        let input = r#"
name = "Mapped"
subject = "a"

[baseline]
file = "baseline.csv"

[sources.a]
file = "a.csv"

[sources.b]
file = "b.csv"

[join]
left = "a"
right = "b"
key_fields = ["Contract Name"]
right_key_fields = ["Contract"]
"#;
        let config = RunConfig::from_toml(input).unwrap();
        let keys = config.join.unwrap().keys();
        assert_eq!(keys[0].left, "Contract Name");
        assert_eq!(keys[0].right, "Contract");
    }

    #[test]
    fn reject_unknown_subject() {
        let input = r#"
name = "Bad"
subject = "ghost"

[baseline]
file = "baseline.csv"

[sources.rules]
file = "rules.csv"
"#;
        let err = RunConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn reject_join_on_unknown_source() {
        let input = r#"
name = "Bad"
subject = "a"

[baseline]
file = "baseline.csv"

[sources.a]
file = "a.csv"

[join]
left = "a"
right = "c"
key_fields = ["Name"]
"#;
        let err = RunConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("'c'"));
    }

    #[test]
    fn reject_bad_threshold() {
        let input = r#"
name = "Bad"
subject = "a"

[baseline]
file = "baseline.csv"

[sources.a]
file = "a.csv"

[sources.b]
file = "b.csv"

[join]
left = "a"
right = "b"
key_fields = ["Name"]
threshold = 1.5
"#;
        let err = RunConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("threshold"));
    }

    #[test]
    fn reject_mismatched_right_key_fields() {
        let input = r#"
name = "Bad"
subject = "a"

[baseline]
file = "baseline.csv"

[sources.a]
file = "a.csv"

[sources.b]
file = "b.csv"

[join]
left = "a"
right = "b"
key_fields = ["Name", "Service"]
right_key_fields = ["Name"]
"#;
        let err = RunConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("right_key_fields"));
    }
}
