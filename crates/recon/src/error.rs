use std::fmt;

#[derive(Debug)]
pub enum EngineError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad threshold, dangling reference, etc.).
    ConfigValidation(String),
    /// A referenced source does not exist.
    UnknownSource(String),
    /// Missing required column in input data.
    MissingColumn { source: String, column: String },
    /// Join key fields don't line up across the two record sets.
    SchemaMismatch { field: String, left: String, right: String },
    /// IO error (file read, CSV decode, etc.).
    Io(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownSource(source) => write!(f, "unknown source: {source}"),
            Self::MissingColumn { source, column } => {
                write!(f, "source '{source}': missing column '{column}'")
            }
            Self::SchemaMismatch { field, left, right } => {
                write!(f, "join field '{field}' not present on both sides (left: {left}, right: {right})")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
