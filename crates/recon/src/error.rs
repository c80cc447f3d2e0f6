use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconError {
    /// Tables share no columns, or a table is structurally malformed
    /// (ragged rows, duplicate or blank headers).
    SchemaMismatch(String),
    /// Report mode outside the supported set.
    UnsupportedFormat(String),
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty file path, bad delimiter, etc.).
    ConfigValidation(String),
    /// CSV reader or writer fault.
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaMismatch(msg) => write!(f, "schema mismatch: {msg}"),
            Self::UnsupportedFormat(mode) => write!(
                f,
                "unsupported report format: \"{mode}\" (expected json, csv or html)"
            ),
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl From<csv::Error> for ReconError {
    fn from(err: csv::Error) -> Self {
        Self::Io(err.to_string())
    }
}
